//! Ricoh 2A03 CPU core: an NMOS 6502 with decimal mode removed.
//!
//! The core executes one instruction per [`Mos6502::step`] and reports the
//! cycles it consumed, page-crossing and branch penalties included. The
//! caller drives the rest of the machine from that count.
//!
//! Undocumented opcodes decode to their real length and cycle cost but have
//! no effect.

mod addressing;
mod cpu;
pub mod flags;
pub mod opcodes;
mod registers;

pub use cpu::{CpuState, IRQ_VECTOR, Interrupt, Mos6502, NMI_VECTOR, RESET_VECTOR};
pub use flags::Status;
pub use registers::Registers;
