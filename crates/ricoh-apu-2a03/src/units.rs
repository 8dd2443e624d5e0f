//! Envelope, length counter, and sweep units shared by the channels.

use serde::{Deserialize, Serialize};

use crate::tables::LENGTH_TABLE;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Decay envelope, clocked at quarter-frame rate.
///
/// When the loop flag is clear, the envelope counts down from 15 to 0 and
/// stays there. When loop is set, it wraps from 0 back to 15.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub(crate) start: bool,
    pub(crate) divider: u8,
    pub(crate) decay: u8,
    /// Volume, or divider period when decaying (register bits 0-3).
    pub(crate) volume: u8,
    pub(crate) constant_volume: bool,
    /// Loop flag (register bit 5, shared with length counter halt).
    pub(crate) looping: bool,
}

impl Envelope {
    /// Bits 0-5 of $4000/$4004/$400C.
    pub(crate) fn write(&mut self, value: u8) {
        self.looping = value & 0x20 != 0;
        self.constant_volume = value & 0x10 != 0;
        self.volume = value & 0x0F;
    }

    pub(crate) fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay = 15;
            self.divider = self.volume;
        } else if self.divider == 0 {
            self.divider = self.volume;
            if self.decay > 0 {
                self.decay -= 1;
            } else if self.looping {
                self.decay = 15;
            }
        } else {
            self.divider -= 1;
        }
    }

    /// Restore saved state, masking levels to 4 bits.
    pub(crate) fn load(&mut self, state: &Self) {
        self.start = state.start;
        self.divider = state.divider & 0x0F;
        self.decay = state.decay & 0x0F;
        self.volume = state.volume & 0x0F;
        self.constant_volume = state.constant_volume;
        self.looping = state.looping;
    }

    /// Current output level (0-15).
    pub(crate) fn output(&self) -> u8 {
        if self.constant_volume {
            self.volume
        } else {
            self.decay
        }
    }
}

// ---------------------------------------------------------------------------
// Length counter
// ---------------------------------------------------------------------------

/// Counts down at half-frame rate; the channel is silent at zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthCounter {
    pub(crate) counter: u8,
    pub(crate) halt: bool,
    pub(crate) enabled: bool,
}

impl LengthCounter {
    pub(crate) fn clock(&mut self) {
        if !self.halt && self.counter > 0 {
            self.counter -= 1;
        }
    }

    pub(crate) fn active(&self) -> bool {
        self.counter > 0
    }

    /// Load from the length table. Ignored while the channel is disabled.
    pub(crate) fn load(&mut self, index: u8) {
        if self.enabled {
            self.counter = LENGTH_TABLE[(index & 0x1F) as usize];
        }
    }

    /// Disabling clears the counter.
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

/// Pulse sweep unit. Moves the timer period by `period >> shift` on
/// half-frame clocks. The channel built with `extra_decrement` subtracts
/// one more when negating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sweep {
    pub(crate) enabled: bool,
    pub(crate) negate: bool,
    pub(crate) shift: u8,
    pub(crate) period: u8,
    pub(crate) divider: u8,
    pub(crate) reload: bool,
    pub(crate) extra_decrement: bool,
}

impl Sweep {
    pub(crate) fn new(extra_decrement: bool) -> Self {
        Self {
            extra_decrement,
            ..Self::default()
        }
    }

    /// $4001/$4005.
    pub(crate) fn write(&mut self, value: u8) {
        self.enabled = value & 0x80 != 0;
        self.period = (value >> 4) & 0x07;
        self.negate = value & 0x08 != 0;
        self.shift = value & 0x07;
        self.reload = true;
    }

    /// Restore saved state. The negate quirk stays with the channel.
    pub(crate) fn load(&mut self, state: &Self) {
        self.enabled = state.enabled;
        self.negate = state.negate;
        self.shift = state.shift & 0x07;
        self.period = state.period & 0x07;
        self.divider = state.divider & 0x07;
        self.reload = state.reload;
    }

    pub(crate) fn target_period(&self, current: u16) -> u16 {
        let delta = current >> self.shift;
        if self.negate {
            let target = current.wrapping_sub(delta);
            if self.extra_decrement {
                target.wrapping_sub(1)
            } else {
                target
            }
        } else {
            current.wrapping_add(delta)
        }
    }

    /// Clock at half-frame rate. Returns the new timer period.
    pub(crate) fn clock(&mut self, current: u16) -> u16 {
        let mut period = current;

        if self.divider == 0 && self.enabled && self.shift > 0 && current >= 8 {
            let target = self.target_period(current);
            if target <= 0x7FF {
                period = target;
            }
        }

        if self.divider == 0 || self.reload {
            self.divider = self.period;
            self.reload = false;
        } else {
            self.divider -= 1;
        }

        period
    }
}
