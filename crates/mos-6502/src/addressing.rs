//! Operand address resolution.
//!
//! Resolution happens once per instruction, before PC moves past the
//! operand bytes. The result lives in a [`CycleContext`] that the
//! instruction handlers consume and that is dropped at the end of the step.

use emu_core::Bus;

use crate::Mos6502;
use crate::opcodes::{Mode, Opcode};

/// Per-instruction scratch state.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CycleContext {
    /// Effective address. Unused for implied and accumulator modes.
    pub address: u16,
    /// Address of the following instruction.
    pub next_pc: u16,
    pub mode: Mode,
    /// Indexing moved the address into a different page.
    pub page_crossed: bool,
}

/// True when two addresses sit in different 256-byte pages.
#[must_use]
pub(crate) const fn pages_differ(a: u16, b: u16) -> bool {
    a & 0xFF00 != b & 0xFF00
}

/// Word read whose high byte wraps inside the page of `addr`.
///
/// This is the NMOS `JMP ($xxFF)` bug, and the same wrap keeps zero-page
/// pointers inside page zero.
pub(crate) fn read_word_bug(bus: &mut impl Bus, addr: u16) -> u16 {
    let hi_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
    let lo = bus.read(addr);
    let hi = bus.read(hi_addr);
    u16::from_le_bytes([lo, hi])
}

impl Mos6502 {
    /// Resolve the operand of the instruction at PC.
    pub(crate) fn resolve(&self, bus: &mut impl Bus, entry: &Opcode) -> CycleContext {
        let pc = self.regs.pc;
        let mode = entry.mode;
        let operand = pc.wrapping_add(1);
        let mut page_crossed = false;

        let address = match mode {
            Mode::Implied | Mode::Accumulator => 0,
            Mode::Immediate => operand,
            Mode::ZeroPage => u16::from(bus.read(operand)),
            Mode::ZeroPageX => u16::from(bus.read(operand).wrapping_add(self.regs.x)),
            Mode::ZeroPageY => u16::from(bus.read(operand).wrapping_add(self.regs.y)),
            Mode::Absolute => bus.read_word(operand),
            Mode::AbsoluteX => {
                let base = bus.read_word(operand);
                let addr = base.wrapping_add(u16::from(self.regs.x));
                page_crossed = pages_differ(base, addr);
                addr
            }
            Mode::AbsoluteY => {
                let base = bus.read_word(operand);
                let addr = base.wrapping_add(u16::from(self.regs.y));
                page_crossed = pages_differ(base, addr);
                addr
            }
            Mode::Indirect => {
                let pointer = bus.read_word(operand);
                read_word_bug(bus, pointer)
            }
            Mode::IndexedIndirect => {
                let pointer = bus.read(operand).wrapping_add(self.regs.x);
                read_word_bug(bus, u16::from(pointer))
            }
            Mode::IndirectIndexed => {
                let pointer = bus.read(operand);
                let base = read_word_bug(bus, u16::from(pointer));
                let addr = base.wrapping_add(u16::from(self.regs.y));
                page_crossed = pages_differ(base, addr);
                addr
            }
            Mode::Relative => {
                let offset = bus.read(operand) as i8;
                pc.wrapping_add(2).wrapping_add_signed(i16::from(offset))
            }
        };

        CycleContext {
            address,
            next_pc: pc.wrapping_add(entry.size()),
            mode,
            page_crossed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::OPCODES;
    use emu_core::FlatBus;

    fn cpu_at(pc: u16) -> Mos6502 {
        let mut cpu = Mos6502::new();
        cpu.regs.pc = pc;
        cpu
    }

    #[test]
    fn indirect_wraps_within_page() {
        let mut bus = FlatBus::new();
        bus.load(0x0200, &[0x6C, 0xFF, 0x30]);
        bus.load(0x30FF, &[0x80]);
        bus.load(0x3000, &[0x12]);
        bus.load(0x3100, &[0x99]);
        let ctx = cpu_at(0x0200).resolve(&mut bus, &OPCODES[0x6C]);
        assert_eq!(ctx.address, 0x1280, "high byte must come from $3000, not $3100");
    }

    #[test]
    fn zero_page_x_wraps() {
        let mut bus = FlatBus::new();
        bus.load(0x0200, &[0xB5, 0xF0]);
        let mut cpu = cpu_at(0x0200);
        cpu.regs.x = 0x20;
        assert_eq!(cpu.resolve(&mut bus, &OPCODES[0xB5]).address, 0x0010);
    }

    #[test]
    fn indexed_indirect_pointer_wraps_in_zero_page() {
        let mut bus = FlatBus::new();
        bus.load(0x0200, &[0xA1, 0xFE]);
        bus.load(0x00FF, &[0x34]);
        bus.load(0x0000, &[0x12]);
        let mut cpu = cpu_at(0x0200);
        cpu.regs.x = 0x01;
        assert_eq!(cpu.resolve(&mut bus, &OPCODES[0xA1]).address, 0x1234);
    }

    #[test]
    fn indirect_indexed_reports_page_cross() {
        let mut bus = FlatBus::new();
        bus.load(0x0200, &[0xB1, 0x10]);
        bus.load(0x0010, &[0xF0, 0x40]);
        let mut cpu = cpu_at(0x0200);
        cpu.regs.y = 0x20;
        let ctx = cpu.resolve(&mut bus, &OPCODES[0xB1]);
        assert_eq!(ctx.address, 0x4110);
        assert!(ctx.page_crossed);
    }

    #[test]
    fn relative_targets_are_signed_from_next_instruction() {
        let mut bus = FlatBus::new();
        bus.load(0x0200, &[0xD0, 0xFC]);
        let ctx = cpu_at(0x0200).resolve(&mut bus, &OPCODES[0xD0]);
        assert_eq!(ctx.address, 0x01FE);
        assert_eq!(ctx.next_pc, 0x0202);
    }
}
