//! Cartridge side of the PPU address space.

use serde::{Deserialize, Serialize};

/// Nametable arrangement selected by the cartridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mirroring {
    #[default]
    Horizontal,
    Vertical,
    SingleScreenLower,
    SingleScreenUpper,
    FourScreen,
}

impl Mirroring {
    /// Physical 1 KB nametable backing each of the four logical nametables.
    #[must_use]
    pub const fn tables(self) -> [u16; 4] {
        match self {
            Self::Horizontal => [0, 0, 1, 1],
            Self::Vertical => [0, 1, 0, 1],
            Self::SingleScreenLower => [0, 0, 0, 0],
            Self::SingleScreenUpper => [1, 1, 1, 1],
            Self::FourScreen => [0, 1, 2, 3],
        }
    }

    /// Offset into nametable RAM for a PPU address in $2000-$3EFF.
    #[must_use]
    pub const fn nametable_offset(self, addr: u16) -> usize {
        let addr = (addr - 0x2000) & 0x0FFF;
        let table = (addr / 0x0400) as usize;
        let offset = addr & 0x03FF;
        (self.tables()[table] * 0x0400 + offset) as usize
    }
}

/// Pattern-table access ($0000-$1FFF) plus the current mirroring mode.
pub trait ChrBus {
    fn chr_read(&mut self, addr: u16) -> u8;
    fn chr_write(&mut self, addr: u16, value: u8);
    fn mirroring(&self) -> Mirroring;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_pairs_top_and_bottom() {
        let m = Mirroring::Horizontal;
        assert_eq!(m.nametable_offset(0x2000), 0);
        assert_eq!(m.nametable_offset(0x2400), 0);
        assert_eq!(m.nametable_offset(0x2800), 0x0400);
        assert_eq!(m.nametable_offset(0x2C00), 0x0400);
    }

    #[test]
    fn vertical_pairs_left_and_right() {
        let m = Mirroring::Vertical;
        assert_eq!(m.nametable_offset(0x2000), 0);
        assert_eq!(m.nametable_offset(0x2800), 0);
        assert_eq!(m.nametable_offset(0x2400), 0x0400);
        assert_eq!(m.nametable_offset(0x2C05), 0x0405);
    }

    #[test]
    fn mirrors_above_3000_and_four_screen() {
        assert_eq!(Mirroring::Vertical.nametable_offset(0x3400), 0x0400);
        assert_eq!(Mirroring::FourScreen.nametable_offset(0x2C10), 0x0C10);
        assert_eq!(Mirroring::SingleScreenUpper.nametable_offset(0x2000), 0x0400);
    }
}
