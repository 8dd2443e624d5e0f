//! 6502 processor status register (P).

use serde::{Deserialize, Serialize};

/// Carry. Set by unsigned overflow from ADC and shifts, cleared by borrow
/// in SBC and CMP.
pub const C: u8 = 0x01;

/// Zero. Set when the last result byte was 0.
pub const Z: u8 = 0x02;

/// Interrupt disable. While set, IRQ requests are ignored.
pub const I: u8 = 0x04;

/// Decimal mode. Stored and pushed, but the 2A03 has no BCD adder.
pub const D: u8 = 0x08;

/// Break. Only exists in copies of P pushed to the stack.
pub const B: u8 = 0x10;

/// Unused bit, always reads back as 1.
pub const U: u8 = 0x20;

/// Overflow. Signed overflow from ADC/SBC, or bit 6 of the operand for BIT.
pub const V: u8 = 0x40;

/// Negative. Bit 7 of the last result byte.
pub const N: u8 = 0x80;

/// Processor status register.
///
/// Bit layout, high to low: `N V U B D I Z C`. Only six bits are real
/// latches. B only appears in copies pushed to the stack, and U is set
/// at power-on and on every pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status(pub u8);

impl Status {
    /// Value of P after power-on: I and U set.
    #[must_use]
    pub const fn power_on() -> Self {
        Self(I | U)
    }

    /// Status restored by PLP and RTI: B dropped, U forced.
    #[must_use]
    pub const fn from_stack(value: u8) -> Self {
        Self((value & !B) | U)
    }

    /// Copy pushed by PHP, BRK, and interrupt entry. B and U are both set.
    #[must_use]
    pub const fn to_stack(self) -> u8 {
        self.0 | B | U
    }

    /// True if any bit of `flag` is set.
    #[must_use]
    pub const fn is_set(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    /// Set `flag`.
    pub fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Clear `flag`.
    pub fn clear(&mut self, flag: u8) {
        self.0 &= !flag;
    }

    /// Set or clear a flag based on condition.
    pub fn set_if(&mut self, flag: u8, condition: bool) {
        if condition {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }

    /// Update N and Z from a result byte.
    pub fn update_nz(&mut self, value: u8) {
        self.set_if(N, value & 0x80 != 0);
        self.set_if(Z, value == 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_copies_force_break_and_unused() {
        let p = Status(C | N);
        assert_eq!(p.to_stack(), C | N | B | U);
        assert_eq!(Status::from_stack(0xFF).0, 0xFF & !B);
        assert_eq!(Status::from_stack(0x00).0, U);
    }

    #[test]
    fn update_nz_tracks_sign_and_zero() {
        let mut p = Status::power_on();
        p.update_nz(0);
        assert!(p.is_set(Z) && !p.is_set(N));
        p.update_nz(0x80);
        assert!(!p.is_set(Z) && p.is_set(N));
        assert!(p.is_set(I), "I is untouched");
    }
}
