//! NES configuration.

/// Output sample rate used when none is given.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// NES configuration.
#[derive(Debug, Clone)]
pub struct NesConfig {
    /// iNES file contents.
    pub rom_data: Vec<u8>,
    /// Audio sample rate in Hz.
    pub sample_rate: u32,
}

impl NesConfig {
    #[must_use]
    pub fn new(rom_data: Vec<u8>) -> Self {
        Self {
            rom_data,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl Default for NesConfig {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
