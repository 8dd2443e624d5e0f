//! Raw cartridge memory and the iNES container format.

use ricoh_ppu_2c02::Mirroring;
use serde::{Deserialize, Serialize};

use crate::CartridgeError;

/// Battery-backed work RAM at CPU $6000-$7FFF.
pub const SRAM_SIZE: usize = 0x2000;
/// CHR-RAM fitted when the image carries no CHR ROM.
pub const CHR_RAM_SIZE: usize = 0x2000;

const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;
const PRG_UNIT: usize = 0x4000;
const CHR_UNIT: usize = 0x2000;

/// PRG ROM, CHR ROM/RAM and SRAM plus the header fields that matter.
#[derive(Debug, Clone)]
pub struct Cartridge {
    prg: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    sram: Vec<u8>,
    mapper_id: u8,
    mirroring: Mirroring,
    battery: bool,
}

/// The writable parts of a cartridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartridgeState {
    pub sram: Vec<u8>,
    /// `None` when CHR is ROM.
    pub chr_ram: Option<Vec<u8>>,
}

impl Cartridge {
    /// Build a cartridge from already-split PRG and CHR data.
    ///
    /// Empty `chr` fits 8 KB of CHR-RAM. PRG and CHR sizes that are not a
    /// whole number of 16 KB / 8 KB units are filled out by repeating the
    /// data, the way a smaller ROM chip is mirrored on a board.
    ///
    /// # Errors
    ///
    /// [`CartridgeError::EmptyPrg`] for empty PRG, and
    /// [`CartridgeError::UnsupportedMapper`] for anything but 0, 1 and 4.
    pub fn new(
        prg: Vec<u8>,
        chr: Vec<u8>,
        mapper_id: u8,
        mirroring: Mirroring,
        battery: bool,
    ) -> Result<Self, CartridgeError> {
        if prg.is_empty() {
            return Err(CartridgeError::EmptyPrg);
        }
        if !matches!(mapper_id, 0 | 1 | 4) {
            return Err(CartridgeError::UnsupportedMapper(mapper_id));
        }

        let chr_is_ram = chr.is_empty();
        let chr = if chr_is_ram {
            vec![0; CHR_RAM_SIZE]
        } else {
            fill_to_unit(chr, CHR_UNIT)
        };
        let prg = fill_to_unit(prg, PRG_UNIT);

        log::info!(
            "cartridge: mapper {mapper_id}, PRG {} KB, CHR {} KB {}, {mirroring:?}{}",
            prg.len() / 1024,
            chr.len() / 1024,
            if chr_is_ram { "RAM" } else { "ROM" },
            if battery { ", battery" } else { "" }
        );

        Ok(Self {
            prg,
            chr,
            chr_is_ram,
            sram: vec![0; SRAM_SIZE],
            mapper_id,
            mirroring,
            battery,
        })
    }

    /// Parse an iNES image.
    ///
    /// # Errors
    ///
    /// Wrong magic, a file shorter than its header claims, or an
    /// unsupported mapper number.
    pub fn from_ines(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_SIZE {
            return Err(CartridgeError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        if &data[0..4] != b"NES\x1a" {
            return Err(CartridgeError::BadMagic);
        }

        let prg_size = usize::from(data[4]) * PRG_UNIT;
        let chr_size = usize::from(data[5]) * CHR_UNIT;
        let flags6 = data[6];
        let flags7 = data[7];

        let mapper_id = (flags7 & 0xF0) | (flags6 >> 4);
        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };
        let battery = flags6 & 0x02 != 0;

        let prg_start = if flags6 & 0x04 != 0 {
            HEADER_SIZE + TRAINER_SIZE
        } else {
            HEADER_SIZE
        };
        let chr_start = prg_start + prg_size;
        let end = chr_start + chr_size;
        if data.len() < end {
            return Err(CartridgeError::Truncated {
                expected: end,
                actual: data.len(),
            });
        }

        Self::new(
            data[prg_start..chr_start].to_vec(),
            data[chr_start..end].to_vec(),
            mapper_id,
            mirroring,
            battery,
        )
    }

    #[must_use]
    pub fn prg(&self) -> &[u8] {
        &self.prg
    }

    #[must_use]
    pub fn chr(&self) -> &[u8] {
        &self.chr
    }

    #[must_use]
    pub fn chr_is_ram(&self) -> bool {
        self.chr_is_ram
    }

    #[must_use]
    pub fn mapper_id(&self) -> u8 {
        self.mapper_id
    }

    /// Mirroring wired on the board (header bits).
    #[must_use]
    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    #[must_use]
    pub fn has_battery(&self) -> bool {
        self.battery
    }

    #[must_use]
    pub fn sram(&self) -> &[u8] {
        &self.sram
    }

    /// Overwrite SRAM from a battery save. Extra bytes are ignored, missing
    /// bytes leave the tail untouched.
    pub fn set_sram(&mut self, data: &[u8]) {
        let len = data.len().min(SRAM_SIZE);
        self.sram[..len].copy_from_slice(&data[..len]);
    }

    // -----------------------------------------------------------------------
    // Mapper plumbing
    // -----------------------------------------------------------------------

    /// Byte offset of bank `index` of `size` bytes. Negative indices count
    /// from the last bank; every index wraps to the banks actually present.
    pub(crate) fn prg_bank_offset(&self, index: isize, size: usize) -> usize {
        bank_offset(self.prg.len(), index, size)
    }

    pub(crate) fn chr_bank_offset(&self, index: isize, size: usize) -> usize {
        bank_offset(self.chr.len(), index, size)
    }

    pub(crate) fn read_prg(&self, offset: usize) -> u8 {
        self.prg[offset % self.prg.len()]
    }

    pub(crate) fn read_chr(&self, offset: usize) -> u8 {
        self.chr[offset % self.chr.len()]
    }

    /// Ignored for CHR ROM.
    pub(crate) fn write_chr(&mut self, offset: usize, value: u8) {
        if self.chr_is_ram {
            let len = self.chr.len();
            self.chr[offset % len] = value;
        }
    }

    pub(crate) fn read_sram(&self, addr: u16) -> u8 {
        self.sram[usize::from(addr) % SRAM_SIZE]
    }

    pub(crate) fn write_sram(&mut self, addr: u16, value: u8) {
        self.sram[usize::from(addr) % SRAM_SIZE] = value;
    }

    pub(crate) fn save_memory(&self) -> CartridgeState {
        CartridgeState {
            sram: self.sram.clone(),
            chr_ram: self.chr_is_ram.then(|| self.chr.clone()),
        }
    }

    pub(crate) fn load_memory(&mut self, state: &CartridgeState) -> Result<(), CartridgeError> {
        if state.sram.len() != SRAM_SIZE {
            return Err(CartridgeError::StateMismatch);
        }
        match (&state.chr_ram, self.chr_is_ram) {
            (Some(chr), true) if chr.len() == self.chr.len() => {
                self.chr.copy_from_slice(chr);
            }
            (None, false) => {}
            _ => return Err(CartridgeError::StateMismatch),
        }
        self.sram.copy_from_slice(&state.sram);
        Ok(())
    }
}

fn bank_offset(len: usize, index: isize, size: usize) -> usize {
    let banks = (len / size).max(1) as isize;
    index.rem_euclid(banks) as usize * size
}

fn fill_to_unit(mut data: Vec<u8>, unit: usize) -> Vec<u8> {
    let target = data.len().next_multiple_of(unit);
    let original = data.len();
    while data.len() < target {
        let take = (target - data.len()).min(original);
        data.extend_from_within(..take);
    }
    data
}
