//! Standard NES joypad.
//!
//! A 4021 shift register behind $4016/$4017. While strobe (bit 0 of a
//! $4016 write) is high the register keeps reloading, so reads return the
//! A button. Once strobe drops, each read shifts out the next button; after
//! eight reads the line floats high and reads return 1.

use serde::{Deserialize, Serialize};

/// Button masks for [`Controller::set_buttons`], in shift order.
pub mod button {
    pub const A: u8 = 0x01;
    pub const B: u8 = 0x02;
    pub const SELECT: u8 = 0x04;
    pub const START: u8 = 0x08;
    pub const UP: u8 = 0x10;
    pub const DOWN: u8 = 0x20;
    pub const LEFT: u8 = 0x40;
    pub const RIGHT: u8 = 0x80;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    buttons: u8,
    /// Next bit to shift out, 8 once exhausted.
    index: u8,
    strobe: bool,
}

impl Controller {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held buttons (mask of [`button`] bits).
    pub fn set_buttons(&mut self, buttons: u8) {
        self.buttons = buttons;
    }

    #[must_use]
    pub fn buttons(&self) -> u8 {
        self.buttons
    }

    /// Serial read from $4016/$4017.
    pub fn read(&mut self) -> u8 {
        if self.strobe {
            return self.buttons & 1;
        }
        let bit = if self.index < 8 {
            (self.buttons >> self.index) & 1
        } else {
            1
        };
        self.index = self.index.saturating_add(1).min(8);
        bit
    }

    /// $4016 write; both pads see the strobe line.
    pub fn write(&mut self, value: u8) {
        self.strobe = value & 1 != 0;
        if self.strobe {
            self.index = 0;
        }
    }
}
