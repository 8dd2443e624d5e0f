//! 6502 register file.

use serde::{Deserialize, Serialize};

use crate::flags::Status;

/// Programmer-visible registers.
///
/// The 2A03 core has the stock 6502 set:
/// - A: 8-bit accumulator, the only register the ALU writes
/// - X, Y: 8-bit index registers
/// - S: 8-bit stack pointer into page one ($0100-$01FF)
/// - PC: 16-bit program counter
/// - P: 8-bit processor status
///
/// The stack pointer is stored as its low byte; the effective stack address
/// is always `$0100 | s`, so it can never leave page one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// Accumulator. Source and destination of ADC, SBC and the logic ops.
    pub a: u8,
    /// X index register. Also the operand of TXS/TSX.
    pub x: u8,
    /// Y index register. Used by the `(zp),Y` indirect mode.
    pub y: u8,
    /// Stack pointer: the next free slot, low byte of the page-one address.
    pub s: u8,
    /// Program counter. Loaded from $FFFC on reset.
    pub pc: u16,
    /// Processor status flags.
    pub p: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    /// Power-on register state.
    ///
    /// - A, X, Y start at 0
    /// - S is $FD, as left by the three dummy pushes of reset
    /// - PC is 0 until the reset vector is fetched
    /// - P is $24: I and U set
    #[must_use]
    pub const fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            s: 0xFD,
            pc: 0,
            p: Status::power_on(),
        }
    }

    /// Address to write for a push; S moves down afterwards.
    pub fn push(&mut self) -> u16 {
        let addr = self.stack_addr();
        self.s = self.s.wrapping_sub(1);
        addr
    }

    /// Address to read for a pull; S moves up first.
    pub fn pop(&mut self) -> u16 {
        self.s = self.s.wrapping_add(1);
        self.stack_addr()
    }

    /// Current stack address without modifying S.
    #[must_use]
    pub const fn stack_addr(&self) -> u16 {
        0x0100 | (self.s as u16)
    }
}
