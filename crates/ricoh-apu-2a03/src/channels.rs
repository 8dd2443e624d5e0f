//! Pulse, triangle, and noise generators.

use serde::{Deserialize, Serialize};

use crate::tables::{NOISE_PERIOD_TABLE, PULSE_DUTY, TRIANGLE_SEQUENCE};
use crate::units::{Envelope, LengthCounter, Sweep};

// ---------------------------------------------------------------------------
// Pulse
// ---------------------------------------------------------------------------

/// Square wave channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pulse {
    /// 11-bit timer period.
    pub(crate) timer_period: u16,
    pub(crate) timer: u16,
    /// 8-step duty sequencer position.
    pub(crate) duty_pos: u8,
    pub(crate) duty: u8,
    pub(crate) envelope: Envelope,
    pub(crate) length: LengthCounter,
    pub(crate) sweep: Sweep,
}

impl Pulse {
    pub(crate) fn new(extra_sweep_decrement: bool) -> Self {
        Self {
            timer_period: 0,
            timer: 0,
            duty_pos: 0,
            duty: 0,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
            sweep: Sweep::new(extra_sweep_decrement),
        }
    }

    /// Register write, `reg` in 0-3.
    pub(crate) fn write(&mut self, reg: u16, value: u8) {
        match reg {
            0 => {
                self.duty = (value >> 6) & 0x03;
                self.length.halt = value & 0x20 != 0;
                self.envelope.write(value);
            }
            1 => self.sweep.write(value),
            2 => self.timer_period = (self.timer_period & 0x0700) | u16::from(value),
            _ => {
                self.timer_period = (self.timer_period & 0x00FF) | (u16::from(value & 0x07) << 8);
                self.length.load(value >> 3);
                self.envelope.start = true;
                self.duty_pos = 0;
            }
        }
    }

    /// Clocked every other CPU cycle.
    pub(crate) fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            self.duty_pos = (self.duty_pos + 1) % 8;
        } else {
            self.timer -= 1;
        }
    }

    /// Restore saved state. Sequencer indexes and periods are masked to
    /// their register widths.
    pub(crate) fn load(&mut self, state: &Self) {
        self.timer_period = state.timer_period & 0x07FF;
        self.timer = state.timer & 0x07FF;
        self.duty_pos = state.duty_pos & 0x07;
        self.duty = state.duty & 0x03;
        self.envelope.load(&state.envelope);
        self.length = state.length.clone();
        self.sweep.load(&state.sweep);
    }

    pub(crate) fn clock_sweep(&mut self) {
        self.timer_period = self.sweep.clock(self.timer_period);
    }

    /// Current output (0-15).
    pub(crate) fn output(&self) -> u8 {
        if !self.length.active()
            || PULSE_DUTY[self.duty as usize][self.duty_pos as usize] == 0
            || self.timer_period < 8
            || self.timer_period > 0x7FF
        {
            return 0;
        }
        self.envelope.output()
    }
}

// ---------------------------------------------------------------------------
// Triangle
// ---------------------------------------------------------------------------

/// Triangle wave channel. The timer ticks at CPU rate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub(crate) timer_period: u16,
    pub(crate) timer: u16,
    pub(crate) sequence_pos: u8,
    pub(crate) length: LengthCounter,
    pub(crate) linear_counter: u8,
    pub(crate) linear_reload_value: u8,
    pub(crate) linear_reload: bool,
    /// Control flag, also the length counter halt.
    pub(crate) control: bool,
}

impl Triangle {
    /// Register write, `reg` in 0-3.
    pub(crate) fn write(&mut self, reg: u16, value: u8) {
        match reg {
            0 => {
                self.control = value & 0x80 != 0;
                self.length.halt = self.control;
                self.linear_reload_value = value & 0x7F;
            }
            1 => {}
            2 => self.timer_period = (self.timer_period & 0x0700) | u16::from(value),
            _ => {
                self.timer_period = (self.timer_period & 0x00FF) | (u16::from(value & 0x07) << 8);
                self.length.load(value >> 3);
                self.linear_reload = true;
            }
        }
    }

    pub(crate) fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            if self.length.active() && self.linear_counter > 0 {
                self.sequence_pos = (self.sequence_pos + 1) % 32;
            }
        } else {
            self.timer -= 1;
        }
    }

    pub(crate) fn load(&mut self, state: &Self) {
        self.timer_period = state.timer_period & 0x07FF;
        self.timer = state.timer & 0x07FF;
        self.sequence_pos = state.sequence_pos & 0x1F;
        self.length = state.length.clone();
        self.linear_counter = state.linear_counter & 0x7F;
        self.linear_reload_value = state.linear_reload_value & 0x7F;
        self.linear_reload = state.linear_reload;
        self.control = state.control;
    }

    /// Quarter-frame clock.
    pub(crate) fn clock_linear_counter(&mut self) {
        if self.linear_reload {
            self.linear_counter = self.linear_reload_value;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.control {
            self.linear_reload = false;
        }
    }

    pub(crate) fn output(&self) -> u8 {
        if !self.length.active() || self.linear_counter == 0 {
            return 0;
        }
        // Ultrasonic periods are silenced rather than aliased
        if self.timer_period < 2 {
            return 0;
        }
        TRIANGLE_SEQUENCE[self.sequence_pos as usize]
    }
}

// ---------------------------------------------------------------------------
// Noise
// ---------------------------------------------------------------------------

/// Noise channel driven by a 15-bit LFSR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Noise {
    pub(crate) timer_period: u16,
    pub(crate) timer: u16,
    pub(crate) shift_register: u16,
    /// Short mode: feedback from bit 6 instead of bit 1.
    pub(crate) mode: bool,
    pub(crate) envelope: Envelope,
    pub(crate) length: LengthCounter,
}

impl Default for Noise {
    fn default() -> Self {
        Self {
            timer_period: NOISE_PERIOD_TABLE[0],
            timer: 0,
            shift_register: 1,
            mode: false,
            envelope: Envelope::default(),
            length: LengthCounter::default(),
        }
    }
}

impl Noise {
    /// Register write, `reg` in 0-3.
    pub(crate) fn write(&mut self, reg: u16, value: u8) {
        match reg {
            0 => {
                self.length.halt = value & 0x20 != 0;
                self.envelope.write(value);
            }
            1 => {}
            2 => {
                self.mode = value & 0x80 != 0;
                self.timer_period = NOISE_PERIOD_TABLE[(value & 0x0F) as usize];
            }
            _ => {
                self.length.load(value >> 3);
                self.envelope.start = true;
            }
        }
    }

    /// Restore saved state. The LFSR keeps 15 bits and never goes to zero.
    pub(crate) fn load(&mut self, state: &Self) {
        self.timer_period = state.timer_period;
        self.timer = state.timer;
        self.shift_register = match state.shift_register & 0x7FFF {
            0 => 1,
            bits => bits,
        };
        self.mode = state.mode;
        self.envelope.load(&state.envelope);
        self.length = state.length.clone();
    }

    /// Clocked every other CPU cycle.
    pub(crate) fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            let tap = if self.mode { 6 } else { 1 };
            let feedback = (self.shift_register & 1) ^ ((self.shift_register >> tap) & 1);
            self.shift_register = (self.shift_register >> 1) | (feedback << 14);
        } else {
            self.timer -= 1;
        }
    }

    pub(crate) fn output(&self) -> u8 {
        if !self.length.active() || self.shift_register & 1 != 0 {
            return 0;
        }
        self.envelope.output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_silenced_outside_period_range() {
        let mut pulse = Pulse::new(false);
        pulse.length.set_enabled(true);
        pulse.write(0, 0xDF); // duty 3, constant volume 15
        pulse.write(2, 0x07);
        pulse.write(3, 0x08);
        assert_eq!(pulse.duty_pos, 0);
        assert_eq!(pulse.output(), 0, "period 7 is below 8");

        pulse.write(2, 0x08);
        assert_eq!(pulse.output(), 15, "duty 3 step 0 is high");
    }

    #[test]
    fn triangle_needs_linear_counter() {
        let mut tri = Triangle::default();
        tri.length.set_enabled(true);
        tri.write(0, 0x81);
        tri.write(2, 0x40);
        tri.write(3, 0x08);
        assert_eq!(tri.output(), 0);
        tri.clock_linear_counter();
        assert_eq!(tri.linear_counter, 1);
        assert_eq!(tri.output(), 15);
        assert!(tri.linear_reload, "control flag keeps the reload flag");
    }

    #[test]
    fn noise_lfsr_long_mode_sequence() {
        let mut noise = Noise::default();
        noise.write(2, 0x00);
        // timer 0 clocks the LFSR on the first tick
        noise.clock_timer();
        assert_eq!(noise.shift_register, 0x4000, "bit0 ^ bit1 = 1 enters at bit 14");
    }

    #[test]
    fn noise_short_mode_uses_bit_six() {
        let mut noise = Noise::default();
        noise.write(2, 0x80);
        noise.shift_register = 0x0040;
        noise.clock_timer();
        assert_eq!(noise.shift_register, 0x4020);
    }
}
