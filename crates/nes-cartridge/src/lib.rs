//! NES cartridge: iNES loading and bank-switching hardware.
//!
//! A [`Cartridge`] holds the raw PRG/CHR/SRAM bytes. A [`Mapper`] wraps one
//! and decodes CPU ($6000-$FFFF) and PPU ($0000-$1FFF) accesses through the
//! board's banking logic. Three boards are supported: NROM (0), MMC1 (1)
//! and MMC3 (4).

mod cartridge;
mod error;
mod mapper;
mod mmc1;
mod mmc3;
mod nrom;

pub use cartridge::{CHR_RAM_SIZE, Cartridge, CartridgeState, SRAM_SIZE};
pub use error::CartridgeError;
pub use mapper::{Mapper, MapperState};
pub use mmc1::{Mmc1, Mmc1State};
pub use mmc3::{Mmc3, Mmc3State};
pub use nrom::{Nrom, NromState};
pub use ricoh_ppu_2c02::Mirroring;
