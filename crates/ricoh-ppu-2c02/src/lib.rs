//! Ricoh 2C02 picture processing unit.
//!
//! The PPU advances one dot per [`Ppu::tick`] over a 341 x 262 frame and
//! writes one ARGB pixel per visible dot. Pattern tables live on the
//! cartridge and are reached through [`ChrBus`]; nametables, palette RAM,
//! and OAM live here.

mod chr;
mod palette;
mod ppu;

pub use chr::{ChrBus, Mirroring};
pub use palette::PALETTE;
pub use ppu::{FB_HEIGHT, FB_WIDTH, Ppu, PpuState};
