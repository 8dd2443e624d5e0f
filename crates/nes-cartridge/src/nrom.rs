use serde::{Deserialize, Serialize};

use crate::{Cartridge, CartridgeError, CartridgeState};

/// NROM (mapper 0): no bank switching.
///
/// - PRG: 16K mirrored at $8000-$FFFF, or 32K
/// - CHR: 8K ROM, or RAM when the image has none
/// - SRAM at $6000-$7FFF (Family BASIC boards)
#[derive(Debug, Clone)]
pub struct Nrom {
    pub(crate) cart: Cartridge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NromState {
    pub cartridge: CartridgeState,
}

impl Nrom {
    #[must_use]
    pub fn new(cart: Cartridge) -> Self {
        Self { cart }
    }

    pub(crate) fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.cart.read_sram(addr - 0x6000),
            0x8000..=0xFFFF => self.cart.read_prg(usize::from(addr - 0x8000)),
            _ => 0,
        }
    }

    pub(crate) fn cpu_write(&mut self, addr: u16, value: u8) {
        if (0x6000..=0x7FFF).contains(&addr) {
            self.cart.write_sram(addr - 0x6000, value);
        }
    }

    pub(crate) fn chr_read(&self, addr: u16) -> u8 {
        self.cart.read_chr(usize::from(addr & 0x1FFF))
    }

    pub(crate) fn chr_write(&mut self, addr: u16, value: u8) {
        self.cart.write_chr(usize::from(addr & 0x1FFF), value);
    }

    pub(crate) fn save(&self) -> NromState {
        NromState {
            cartridge: self.cart.save_memory(),
        }
    }

    pub(crate) fn load(&mut self, state: &NromState) -> Result<(), CartridgeError> {
        self.cart.load_memory(&state.cartridge)
    }
}
