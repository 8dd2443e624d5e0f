//! Fixed NTSC lookup tables.

/// Length counter load values, indexed by the top 5 bits of the register write.
pub(crate) const LENGTH_TABLE: [u8; 32] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96,
    22, 192, 24, 72, 26, 16, 28, 32, 30,
];

/// Noise timer periods in CPU cycles.
pub(crate) const NOISE_PERIOD_TABLE: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

/// DMC rate table: CPU cycles per sample bit output.
pub(crate) const DMC_RATE_TABLE: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

/// Triangle waveform: 32-step sequence (15 down to 0, then back up).
pub(crate) const TRIANGLE_SEQUENCE: [u8; 32] = [
    15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10,
    11, 12, 13, 14, 15,
];

/// Pulse duty waveforms: 12.5%, 25%, 50%, 25% negated.
pub(crate) const PULSE_DUTY: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

/// Frame sequencer step boundaries in CPU cycles.
pub(crate) const FOUR_STEP_SEQUENCE: [u16; 4] = [7457, 14913, 22371, 29829];
pub(crate) const FIVE_STEP_SEQUENCE: [u16; 5] = [7457, 14913, 22371, 29829, 37281];
