//! NES emulator.
//!
//! Wires the chip crates together: a [`NesBus`] owns RAM, the 2C02 PPU, the
//! 2A03 APU, the cartridge mapper and both joypads, and [`Nes`] steps the
//! 6502 core against it. The CPU runs at 1,789,773 Hz and the PPU three
//! times faster (NTSC).

mod bus;
pub mod capture;
mod config;
mod controller;
mod error;
mod nes;

pub use bus::{BusState, NesBus};
pub use config::{DEFAULT_SAMPLE_RATE, NesConfig};
pub use controller::{Controller, button};
pub use error::NesError;
pub use nes::{Nes, NesState};
pub use nes_cartridge::{Cartridge, Mirroring};
