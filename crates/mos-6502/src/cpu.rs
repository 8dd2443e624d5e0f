//! Instruction-stepped 2A03 CPU.
//!
//! `step()` runs one whole instruction (or burns one stall cycle) and
//! returns the CPU cycles it took. Interrupt requests are latched by
//! [`Mos6502::request_interrupt`] and only looked at when the next step
//! begins.

use emu_core::{Bus, Observable, Value};
use serde::{Deserialize, Serialize};

use crate::addressing::{CycleContext, pages_differ};
use crate::flags::{B, C, D, I, N, Status, U, V, Z};
use crate::opcodes::{Instruction, Mode, OPCODES};
use crate::registers::Registers;

/// NMI vector.
pub const NMI_VECTOR: u16 = 0xFFFA;
/// Reset vector.
pub const RESET_VECTOR: u16 = 0xFFFC;
/// IRQ and BRK vector.
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles taken to enter an interrupt handler.
const INTERRUPT_CYCLES: u64 = 7;

/// Pending interrupt line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interrupt {
    #[default]
    None,
    Reset,
    Nmi,
    Irq,
}

/// Saved CPU state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub regs: Registers,
    pub cycles: u64,
    pub stall: u32,
    pub pending: Interrupt,
}

/// Ricoh 2A03 CPU core.
pub struct Mos6502 {
    pub regs: Registers,
    /// Total cycles since power-on.
    cycles: u64,
    /// Cycles the CPU must sit out (OAM DMA, DMC fetch).
    stall: u32,
    pending: Interrupt,
}

impl Default for Mos6502 {
    fn default() -> Self {
        Self::new()
    }
}

impl Mos6502 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            cycles: 0,
            stall: 0,
            pending: Interrupt::None,
        }
    }

    /// Power-on reset: registers to their initial values, PC from $FFFC.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.regs = Registers::new();
        self.regs.pc = bus.read_word(RESET_VECTOR);
        self.stall = 0;
        self.pending = Interrupt::None;
        log::info!("CPU reset, PC=${:04X}", self.regs.pc);
    }

    /// Total CPU cycles executed.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Remaining stall cycles.
    #[must_use]
    pub fn stall(&self) -> u32 {
        self.stall
    }

    /// Suspend instruction execution for `cycles` cycles.
    pub fn add_stall(&mut self, cycles: u32) {
        self.stall = self.stall.saturating_add(cycles);
    }

    /// Interrupt waiting to be serviced.
    #[must_use]
    pub fn pending_interrupt(&self) -> Interrupt {
        self.pending
    }

    /// Latch an interrupt for the next step.
    ///
    /// IRQ is dropped while I is set. NMI and reset are never masked, and a
    /// lower priority request never replaces a higher one.
    pub fn request_interrupt(&mut self, kind: Interrupt) {
        match kind {
            Interrupt::None => {}
            Interrupt::Irq => {
                if !self.regs.p.is_set(I) && self.pending == Interrupt::None {
                    self.pending = Interrupt::Irq;
                }
            }
            Interrupt::Nmi => {
                if self.pending != Interrupt::Reset {
                    self.pending = Interrupt::Nmi;
                }
            }
            Interrupt::Reset => self.pending = Interrupt::Reset,
        }
    }

    /// Execute one instruction, or one stall cycle. Returns cycles consumed.
    pub fn step(&mut self, bus: &mut impl Bus) -> u32 {
        if self.stall > 0 {
            self.stall -= 1;
            self.cycles += 1;
            return 1;
        }

        let start = self.cycles;

        match std::mem::take(&mut self.pending) {
            Interrupt::None => {}
            Interrupt::Reset => self.service_reset(bus),
            Interrupt::Nmi => self.service_interrupt(bus, NMI_VECTOR),
            Interrupt::Irq => {
                if !self.regs.p.is_set(I) {
                    self.service_interrupt(bus, IRQ_VECTOR);
                }
            }
        }

        let opcode = bus.read(self.regs.pc);
        let entry = &OPCODES[opcode as usize];
        let ctx = self.resolve(bus, entry);

        self.regs.pc = ctx.next_pc;
        self.cycles += u64::from(entry.cycles);
        if ctx.page_crossed {
            self.cycles += u64::from(entry.page_cycles);
        }

        if entry.instruction.is_undocumented() {
            if entry.instruction == Instruction::Kil {
                log::debug!("jam opcode ${opcode:02X} at ${:04X} ignored", self.regs.pc);
            }
        } else {
            self.execute(bus, entry.instruction, &ctx);
        }

        (self.cycles - start) as u32
    }

    fn service_interrupt(&mut self, bus: &mut impl Bus, vector: u16) {
        self.push_word(bus, self.regs.pc);
        self.push(bus, self.regs.p.to_stack());
        self.regs.p.set(I);
        self.regs.pc = bus.read_word(vector);
        self.cycles += INTERRUPT_CYCLES;
    }

    fn service_reset(&mut self, bus: &mut impl Bus) {
        self.regs.s = self.regs.s.wrapping_sub(3);
        self.regs.p.set(I);
        self.regs.pc = bus.read_word(RESET_VECTOR);
        self.cycles += INTERRUPT_CYCLES;
        log::info!("CPU soft reset, PC=${:04X}", self.regs.pc);
    }

    // -----------------------------------------------------------------------
    // Stack
    // -----------------------------------------------------------------------

    fn push(&mut self, bus: &mut impl Bus, value: u8) {
        let addr = self.regs.push();
        bus.write(addr, value);
    }

    fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        let addr = self.regs.pop();
        bus.read(addr)
    }

    fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.push(bus, hi);
        self.push(bus, lo);
    }

    fn pull_word(&mut self, bus: &mut impl Bus) -> u16 {
        let lo = self.pull(bus);
        let hi = self.pull(bus);
        u16::from_le_bytes([lo, hi])
    }

    // -----------------------------------------------------------------------
    // ALU
    // -----------------------------------------------------------------------

    fn adc(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = u16::from(self.regs.p.is_set(C));
        let sum = u16::from(a) + u16::from(value) + carry;
        let result = sum as u8;
        self.regs.p.set_if(C, sum > 0xFF);
        self.regs
            .p
            .set_if(V, (a ^ value) & 0x80 == 0 && (a ^ result) & 0x80 != 0);
        self.regs.p.update_nz(result);
        self.regs.a = result;
    }

    fn sbc(&mut self, value: u8) {
        let a = self.regs.a;
        let borrow = i16::from(!self.regs.p.is_set(C));
        let diff = i16::from(a) - i16::from(value) - borrow;
        let result = diff as u8;
        self.regs.p.set_if(C, diff >= 0);
        self.regs
            .p
            .set_if(V, (a ^ value) & 0x80 != 0 && (a ^ result) & 0x80 != 0);
        self.regs.p.update_nz(result);
        self.regs.a = result;
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.regs.p.update_nz(register.wrapping_sub(value));
        self.regs.p.set_if(C, register >= value);
    }

    /// Apply a shift or rotate to A or memory, depending on the mode.
    fn modify(
        &mut self,
        bus: &mut impl Bus,
        ctx: &CycleContext,
        f: impl FnOnce(&mut Status, u8) -> u8,
    ) {
        if ctx.mode == Mode::Accumulator {
            self.regs.a = f(&mut self.regs.p, self.regs.a);
        } else {
            let value = bus.read(ctx.address);
            let result = f(&mut self.regs.p, value);
            bus.write(ctx.address, result);
        }
    }

    fn branch(&mut self, ctx: &CycleContext, taken: bool) {
        if taken {
            self.regs.pc = ctx.address;
            self.cycles += 1;
            if pages_differ(ctx.next_pc, ctx.address) {
                self.cycles += 1;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    fn execute(&mut self, bus: &mut impl Bus, instruction: Instruction, ctx: &CycleContext) {
        let addr = ctx.address;
        match instruction {
            // Loads and stores
            Instruction::Lda => {
                self.regs.a = bus.read(addr);
                self.regs.p.update_nz(self.regs.a);
            }
            Instruction::Ldx => {
                self.regs.x = bus.read(addr);
                self.regs.p.update_nz(self.regs.x);
            }
            Instruction::Ldy => {
                self.regs.y = bus.read(addr);
                self.regs.p.update_nz(self.regs.y);
            }
            Instruction::Sta => bus.write(addr, self.regs.a),
            Instruction::Stx => bus.write(addr, self.regs.x),
            Instruction::Sty => bus.write(addr, self.regs.y),

            // Transfers
            Instruction::Tax => {
                self.regs.x = self.regs.a;
                self.regs.p.update_nz(self.regs.x);
            }
            Instruction::Tay => {
                self.regs.y = self.regs.a;
                self.regs.p.update_nz(self.regs.y);
            }
            Instruction::Txa => {
                self.regs.a = self.regs.x;
                self.regs.p.update_nz(self.regs.a);
            }
            Instruction::Tya => {
                self.regs.a = self.regs.y;
                self.regs.p.update_nz(self.regs.a);
            }
            Instruction::Tsx => {
                self.regs.x = self.regs.s;
                self.regs.p.update_nz(self.regs.x);
            }
            Instruction::Txs => self.regs.s = self.regs.x,

            // Stack
            Instruction::Pha => self.push(bus, self.regs.a),
            Instruction::Php => self.push(bus, self.regs.p.to_stack()),
            Instruction::Pla => {
                self.regs.a = self.pull(bus);
                self.regs.p.update_nz(self.regs.a);
            }
            Instruction::Plp => {
                let value = self.pull(bus);
                self.regs.p = Status::from_stack(value);
            }

            // Arithmetic and logic
            Instruction::Adc => {
                let value = bus.read(addr);
                self.adc(value);
            }
            Instruction::Sbc => {
                let value = bus.read(addr);
                self.sbc(value);
            }
            Instruction::And => {
                self.regs.a &= bus.read(addr);
                self.regs.p.update_nz(self.regs.a);
            }
            Instruction::Ora => {
                self.regs.a |= bus.read(addr);
                self.regs.p.update_nz(self.regs.a);
            }
            Instruction::Eor => {
                self.regs.a ^= bus.read(addr);
                self.regs.p.update_nz(self.regs.a);
            }
            Instruction::Bit => {
                let value = bus.read(addr);
                self.regs.p.set_if(V, value & 0x40 != 0);
                self.regs.p.set_if(N, value & 0x80 != 0);
                self.regs.p.set_if(Z, value & self.regs.a == 0);
            }
            Instruction::Cmp => {
                let value = bus.read(addr);
                self.compare(self.regs.a, value);
            }
            Instruction::Cpx => {
                let value = bus.read(addr);
                self.compare(self.regs.x, value);
            }
            Instruction::Cpy => {
                let value = bus.read(addr);
                self.compare(self.regs.y, value);
            }

            // Increments and decrements
            Instruction::Inc => {
                let value = bus.read(addr).wrapping_add(1);
                bus.write(addr, value);
                self.regs.p.update_nz(value);
            }
            Instruction::Dec => {
                let value = bus.read(addr).wrapping_sub(1);
                bus.write(addr, value);
                self.regs.p.update_nz(value);
            }
            Instruction::Inx => {
                self.regs.x = self.regs.x.wrapping_add(1);
                self.regs.p.update_nz(self.regs.x);
            }
            Instruction::Iny => {
                self.regs.y = self.regs.y.wrapping_add(1);
                self.regs.p.update_nz(self.regs.y);
            }
            Instruction::Dex => {
                self.regs.x = self.regs.x.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.x);
            }
            Instruction::Dey => {
                self.regs.y = self.regs.y.wrapping_sub(1);
                self.regs.p.update_nz(self.regs.y);
            }

            // Shifts and rotates
            Instruction::Asl => self.modify(bus, ctx, |p, v| {
                p.set_if(C, v & 0x80 != 0);
                let r = v << 1;
                p.update_nz(r);
                r
            }),
            Instruction::Lsr => self.modify(bus, ctx, |p, v| {
                p.set_if(C, v & 0x01 != 0);
                let r = v >> 1;
                p.update_nz(r);
                r
            }),
            Instruction::Rol => self.modify(bus, ctx, |p, v| {
                let carry_in = u8::from(p.is_set(C));
                p.set_if(C, v & 0x80 != 0);
                let r = (v << 1) | carry_in;
                p.update_nz(r);
                r
            }),
            Instruction::Ror => self.modify(bus, ctx, |p, v| {
                let carry_in = u8::from(p.is_set(C)) << 7;
                p.set_if(C, v & 0x01 != 0);
                let r = (v >> 1) | carry_in;
                p.update_nz(r);
                r
            }),

            // Jumps and returns
            Instruction::Jmp => self.regs.pc = addr,
            Instruction::Jsr => {
                self.push_word(bus, self.regs.pc.wrapping_sub(1));
                self.regs.pc = addr;
            }
            Instruction::Rts => {
                self.regs.pc = self.pull_word(bus).wrapping_add(1);
            }
            Instruction::Rti => {
                let value = self.pull(bus);
                self.regs.p = Status::from_stack(value);
                self.regs.pc = self.pull_word(bus);
            }
            Instruction::Brk => {
                self.push_word(bus, self.regs.pc);
                self.push(bus, self.regs.p.to_stack());
                self.regs.p.set(I);
                self.regs.pc = bus.read_word(IRQ_VECTOR);
            }

            // Branches
            Instruction::Bcc => self.branch(ctx, !self.regs.p.is_set(C)),
            Instruction::Bcs => self.branch(ctx, self.regs.p.is_set(C)),
            Instruction::Bne => self.branch(ctx, !self.regs.p.is_set(Z)),
            Instruction::Beq => self.branch(ctx, self.regs.p.is_set(Z)),
            Instruction::Bpl => self.branch(ctx, !self.regs.p.is_set(N)),
            Instruction::Bmi => self.branch(ctx, self.regs.p.is_set(N)),
            Instruction::Bvc => self.branch(ctx, !self.regs.p.is_set(V)),
            Instruction::Bvs => self.branch(ctx, self.regs.p.is_set(V)),

            // Flags
            Instruction::Clc => self.regs.p.clear(C),
            Instruction::Sec => self.regs.p.set(C),
            Instruction::Cli => self.regs.p.clear(I),
            Instruction::Sei => self.regs.p.set(I),
            Instruction::Cld => self.regs.p.clear(D),
            Instruction::Sed => self.regs.p.set(D),
            Instruction::Clv => self.regs.p.clear(V),

            Instruction::Nop => {}

            // Filtered out by `step`.
            Instruction::Ahx
            | Instruction::Alr
            | Instruction::Anc
            | Instruction::Arr
            | Instruction::Axs
            | Instruction::Dcp
            | Instruction::Isc
            | Instruction::Kil
            | Instruction::Las
            | Instruction::Lax
            | Instruction::Rla
            | Instruction::Rra
            | Instruction::Sax
            | Instruction::Shx
            | Instruction::Shy
            | Instruction::Slo
            | Instruction::Sre
            | Instruction::Tas
            | Instruction::Xaa => {}
        }
    }

    // -----------------------------------------------------------------------
    // Save state
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn save(&self) -> CpuState {
        CpuState {
            regs: self.regs,
            cycles: self.cycles,
            stall: self.stall,
            pending: self.pending,
        }
    }

    pub fn load(&mut self, state: &CpuState) {
        self.regs = state.regs;
        self.regs.p.set(U);
        self.regs.p.clear(B);
        self.cycles = state.cycles;
        self.stall = state.stall;
        self.pending = state.pending;
    }
}

impl Observable for Mos6502 {
    fn query(&self, path: &str) -> Option<Value> {
        let p = self.regs.p;
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "sp" => Some(self.regs.stack_addr().into()),
            "p" => Some(p.0.into()),
            "flags.c" => Some(p.is_set(C).into()),
            "flags.z" => Some(p.is_set(Z).into()),
            "flags.i" => Some(p.is_set(I).into()),
            "flags.d" => Some(p.is_set(D).into()),
            "flags.v" => Some(p.is_set(V).into()),
            "flags.n" => Some(p.is_set(N).into()),
            "cycles" => Some(self.cycles.into()),
            "stall" => Some(self.stall.into()),
            "pending" => Some(
                match self.pending {
                    Interrupt::None => "none",
                    Interrupt::Reset => "reset",
                    Interrupt::Nmi => "nmi",
                    Interrupt::Irq => "irq",
                }
                .into(),
            ),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "x", "y", "sp", "p", "flags.c", "flags.z", "flags.i", "flags.d",
            "flags.v", "flags.n", "cycles", "stall", "pending",
        ]
    }
}
