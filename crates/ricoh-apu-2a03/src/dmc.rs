//! Delta modulation channel.
//!
//! A timer clocks a one-bit delta decoder fed from an 8-bit shift register.
//! When the shift register runs dry the sample buffer refills it, and an
//! empty sample buffer with bytes left to play raises a DMA request that
//! the driver answers with [`Dmc::receive_dma_byte`].

use serde::{Deserialize, Serialize};

use crate::tables::DMC_RATE_TABLE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dmc {
    /// 7-bit output level (0-127), written directly by $4011.
    pub(crate) output_level: u8,
    pub(crate) irq_enabled: bool,
    /// Stored and visible in $4015 bit 7; never raised on the CPU.
    pub(crate) irq_flag: bool,
    pub(crate) looping: bool,
    pub(crate) timer: u16,
    pub(crate) timer_period: u16,
    pub(crate) sample_address: u16,
    pub(crate) sample_length: u16,
    pub(crate) current_address: u16,
    pub(crate) bytes_remaining: u16,
    pub(crate) sample_buffer: u8,
    pub(crate) sample_buffer_empty: bool,
    pub(crate) shift_register: u8,
    pub(crate) bits_remaining: u8,
    pub(crate) silence: bool,
    pub(crate) dma_pending: bool,
}

impl Default for Dmc {
    fn default() -> Self {
        Self {
            output_level: 0,
            irq_enabled: false,
            irq_flag: false,
            looping: false,
            timer: DMC_RATE_TABLE[0],
            timer_period: DMC_RATE_TABLE[0],
            sample_address: 0xC000,
            sample_length: 1,
            current_address: 0xC000,
            bytes_remaining: 0,
            sample_buffer: 0,
            sample_buffer_empty: true,
            shift_register: 0,
            bits_remaining: 8,
            silence: true,
            dma_pending: false,
        }
    }
}

impl Dmc {
    /// Register write, `reg` in 0-3.
    pub(crate) fn write(&mut self, reg: u16, value: u8) {
        match reg {
            0 => {
                self.irq_enabled = value & 0x80 != 0;
                self.looping = value & 0x40 != 0;
                self.timer_period = DMC_RATE_TABLE[(value & 0x0F) as usize];
                if !self.irq_enabled {
                    self.irq_flag = false;
                }
            }
            1 => self.output_level = value & 0x7F,
            2 => self.sample_address = 0xC000 | (u16::from(value) << 6),
            _ => self.sample_length = (u16::from(value) << 4) | 1,
        }
    }

    /// $4015 bit 4.
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.bytes_remaining = 0;
            self.dma_pending = false;
        } else if self.bytes_remaining == 0 {
            self.current_address = self.sample_address;
            self.bytes_remaining = self.sample_length;
            if self.sample_buffer_empty {
                self.dma_pending = true;
            }
        }
        self.irq_flag = false;
    }

    /// Restore saved state. The output level keeps 7 bits and the bit
    /// counter stays in 1-8.
    pub(crate) fn load(&mut self, state: &Self) {
        self.output_level = state.output_level & 0x7F;
        self.irq_enabled = state.irq_enabled;
        self.irq_flag = state.irq_flag;
        self.looping = state.looping;
        self.timer = state.timer;
        self.timer_period = state.timer_period;
        self.sample_address = state.sample_address | 0x8000;
        self.sample_length = state.sample_length;
        self.current_address = state.current_address | 0x8000;
        self.bytes_remaining = state.bytes_remaining;
        self.sample_buffer = state.sample_buffer;
        self.sample_buffer_empty = state.sample_buffer_empty;
        self.shift_register = state.shift_register;
        self.bits_remaining = state.bits_remaining.clamp(1, 8);
        self.silence = state.silence;
        self.dma_pending = state.dma_pending;
    }

    /// Clocked every CPU cycle.
    pub(crate) fn tick(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            self.clock_output();
        } else {
            self.timer -= 1;
        }
    }

    fn clock_output(&mut self) {
        if !self.silence {
            if self.shift_register & 1 != 0 {
                if self.output_level <= 125 {
                    self.output_level += 2;
                }
            } else if self.output_level >= 2 {
                self.output_level -= 2;
            }
            self.shift_register >>= 1;
        }

        self.bits_remaining -= 1;
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            if self.sample_buffer_empty {
                self.silence = true;
            } else {
                self.silence = false;
                self.shift_register = self.sample_buffer;
                self.sample_buffer_empty = true;
            }
            if self.bytes_remaining > 0 {
                self.dma_pending = true;
            }
        }
    }

    /// Address of the byte the channel is waiting for.
    #[must_use]
    pub fn dma_address(&self) -> Option<u16> {
        (self.dma_pending && self.bytes_remaining > 0).then_some(self.current_address)
    }

    /// Deliver the byte fetched from [`Dmc::dma_address`].
    pub fn receive_dma_byte(&mut self, byte: u8) {
        self.dma_pending = false;
        if self.bytes_remaining == 0 {
            return;
        }
        self.sample_buffer = byte;
        self.sample_buffer_empty = false;

        // Address wraps $FFFF -> $8000
        self.current_address = if self.current_address == 0xFFFF {
            0x8000
        } else {
            self.current_address + 1
        };

        self.bytes_remaining -= 1;
        if self.bytes_remaining == 0 {
            if self.looping {
                self.current_address = self.sample_address;
                self.bytes_remaining = self.sample_length;
            } else if self.irq_enabled {
                self.irq_flag = true;
            }
        }
    }

    pub(crate) fn active(&self) -> bool {
        self.bytes_remaining > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_and_length_formulas() {
        let mut dmc = Dmc::default();
        dmc.write(2, 0x01);
        assert_eq!(dmc.sample_address, 0xC040);
        dmc.write(2, 0xFF);
        assert_eq!(dmc.sample_address, 0xFFC0);
        dmc.write(3, 0x00);
        assert_eq!(dmc.sample_length, 1);
        dmc.write(3, 0xFF);
        assert_eq!(dmc.sample_length, 4081);
    }

    #[test]
    fn enable_requests_first_byte() {
        let mut dmc = Dmc::default();
        dmc.write(3, 0x01);
        dmc.set_enabled(true);
        assert_eq!(dmc.dma_address(), Some(0xC000));
        dmc.receive_dma_byte(0x55);
        assert_eq!(dmc.dma_address(), None);
        assert_eq!(dmc.bytes_remaining, 16);
        assert_eq!(dmc.current_address, 0xC001);
    }

    #[test]
    fn disable_cancels_pending_fetch() {
        let mut dmc = Dmc::default();
        dmc.set_enabled(true);
        dmc.set_enabled(false);
        assert_eq!(dmc.dma_address(), None);
        dmc.receive_dma_byte(0x00);
        assert_eq!(dmc.bytes_remaining, 0);
    }

    #[test]
    fn address_wraps_to_8000() {
        let mut dmc = Dmc::default();
        dmc.write(3, 0x01);
        dmc.set_enabled(true);
        dmc.current_address = 0xFFFF;
        dmc.receive_dma_byte(0x00);
        assert_eq!(dmc.current_address, 0x8000);
    }

    #[test]
    fn loop_restarts_and_irq_only_without_loop() {
        let mut dmc = Dmc::default();
        dmc.write(0, 0x40);
        dmc.set_enabled(true);
        dmc.receive_dma_byte(0xAA);
        assert_eq!(dmc.bytes_remaining, 1);
        assert_eq!(dmc.current_address, 0xC000);

        let mut dmc = Dmc::default();
        dmc.write(0, 0x80);
        dmc.set_enabled(true);
        dmc.receive_dma_byte(0xAA);
        assert!(dmc.irq_flag);
        assert!(!dmc.active());
    }

    #[test]
    fn delta_counter_clamps() {
        let mut dmc = Dmc::default();
        dmc.write(1, 126);
        dmc.silence = false;
        dmc.shift_register = 0xFF;
        dmc.clock_output();
        assert_eq!(dmc.output_level, 126, "126 + 2 would pass 127");

        dmc.write(1, 1);
        dmc.shift_register = 0x00;
        dmc.clock_output();
        assert_eq!(dmc.output_level, 1);
    }
}
