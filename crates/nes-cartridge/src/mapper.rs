//! The closed set of supported boards.

use emu_core::{Observable, Value};
use ricoh_ppu_2c02::{ChrBus, Mirroring};
use serde::{Deserialize, Serialize};

use crate::{Cartridge, CartridgeError, Mmc1, Mmc1State, Mmc3, Mmc3State, Nrom, NromState};

/// A cartridge wired to its banking hardware.
#[derive(Debug, Clone)]
pub enum Mapper {
    Nrom(Nrom),
    Mmc1(Mmc1),
    Mmc3(Mmc3),
}

/// Saved mapper registers and cartridge RAM, one variant per board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapperState {
    Nrom(NromState),
    Mmc1(Mmc1State),
    Mmc3(Mmc3State),
}

impl Mapper {
    /// Wrap a cartridge in the board its header names.
    ///
    /// # Errors
    ///
    /// [`CartridgeError::UnsupportedMapper`] for anything but 0, 1 and 4.
    pub fn new(cart: Cartridge) -> Result<Self, CartridgeError> {
        match cart.mapper_id() {
            0 => Ok(Self::Nrom(Nrom::new(cart))),
            1 => Ok(Self::Mmc1(Mmc1::new(cart))),
            4 => Ok(Self::Mmc3(Mmc3::new(cart))),
            n => Err(CartridgeError::UnsupportedMapper(n)),
        }
    }

    /// Parse an iNES image and build its mapper.
    ///
    /// # Errors
    ///
    /// See [`Cartridge::from_ines`].
    pub fn from_ines(data: &[u8]) -> Result<Self, CartridgeError> {
        Self::new(Cartridge::from_ines(data)?)
    }

    #[must_use]
    pub fn cartridge(&self) -> &Cartridge {
        match self {
            Self::Nrom(m) => &m.cart,
            Self::Mmc1(m) => &m.cart,
            Self::Mmc3(m) => &m.cart,
        }
    }

    fn cartridge_mut(&mut self) -> &mut Cartridge {
        match self {
            Self::Nrom(m) => &mut m.cart,
            Self::Mmc1(m) => &mut m.cart,
            Self::Mmc3(m) => &mut m.cart,
        }
    }

    #[must_use]
    pub fn id(&self) -> u8 {
        match self {
            Self::Nrom(_) => 0,
            Self::Mmc1(_) => 1,
            Self::Mmc3(_) => 4,
        }
    }

    /// CPU read from $4020-$FFFF. Unmapped addresses read 0.
    #[must_use]
    pub fn cpu_read(&self, addr: u16) -> u8 {
        match self {
            Self::Nrom(m) => m.cpu_read(addr),
            Self::Mmc1(m) => m.cpu_read(addr),
            Self::Mmc3(m) => m.cpu_read(addr),
        }
    }

    /// CPU write to $4020-$FFFF: SRAM or mapper registers.
    pub fn cpu_write(&mut self, addr: u16, value: u8) {
        match self {
            Self::Nrom(m) => m.cpu_write(addr, value),
            Self::Mmc1(m) => m.cpu_write(addr, value),
            Self::Mmc3(m) => m.cpu_write(addr, value),
        }
    }

    /// Advance one PPU dot. Only MMC3 reacts (scanline counter).
    pub fn step(&mut self, scanline: u16, dot: u16, rendering: bool) {
        if let Self::Mmc3(m) = self {
            m.step(scanline, dot, rendering);
        }
    }

    /// Level of the cartridge IRQ line.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        match self {
            Self::Mmc3(m) => m.irq_pending(),
            Self::Nrom(_) | Self::Mmc1(_) => false,
        }
    }

    #[must_use]
    pub fn sram(&self) -> &[u8] {
        self.cartridge().sram()
    }

    pub fn set_sram(&mut self, data: &[u8]) {
        self.cartridge_mut().set_sram(data);
    }

    #[must_use]
    pub fn save(&self) -> MapperState {
        match self {
            Self::Nrom(m) => MapperState::Nrom(m.save()),
            Self::Mmc1(m) => MapperState::Mmc1(m.save()),
            Self::Mmc3(m) => MapperState::Mmc3(m.save()),
        }
    }

    /// Replace all mapper state.
    ///
    /// # Errors
    ///
    /// [`CartridgeError::StateMismatch`] if the state belongs to another
    /// board or another cartridge layout. Nothing is changed on error.
    pub fn load(&mut self, state: &MapperState) -> Result<(), CartridgeError> {
        match (self, state) {
            (Self::Nrom(m), MapperState::Nrom(s)) => m.load(s),
            (Self::Mmc1(m), MapperState::Mmc1(s)) => m.load(s),
            (Self::Mmc3(m), MapperState::Mmc3(s)) => m.load(s),
            _ => Err(CartridgeError::StateMismatch),
        }
    }
}

impl ChrBus for Mapper {
    fn chr_read(&mut self, addr: u16) -> u8 {
        match self {
            Self::Nrom(m) => m.chr_read(addr),
            Self::Mmc1(m) => m.chr_read(addr),
            Self::Mmc3(m) => m.chr_read(addr),
        }
    }

    fn chr_write(&mut self, addr: u16, value: u8) {
        match self {
            Self::Nrom(m) => m.chr_write(addr, value),
            Self::Mmc1(m) => m.chr_write(addr, value),
            Self::Mmc3(m) => m.chr_write(addr, value),
        }
    }

    fn mirroring(&self) -> Mirroring {
        match self {
            Self::Nrom(m) => m.cart.mirroring(),
            Self::Mmc1(m) => m.mirroring(),
            Self::Mmc3(m) => m.mirroring(),
        }
    }
}

fn mirroring_name(mirroring: Mirroring) -> &'static str {
    match mirroring {
        Mirroring::Horizontal => "horizontal",
        Mirroring::Vertical => "vertical",
        Mirroring::SingleScreenLower => "single-lower",
        Mirroring::SingleScreenUpper => "single-upper",
        Mirroring::FourScreen => "four-screen",
    }
}

impl Observable for Mapper {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "id" => return Some(self.id().into()),
            "mirroring" => return Some(mirroring_name(ChrBus::mirroring(self)).into()),
            "irq" => return Some(self.irq_pending().into()),
            _ => {}
        }

        match self {
            Self::Nrom(_) => None,
            Self::Mmc1(m) => {
                let (shift, control, chr_0, chr_1, prg) = m.registers();
                match path {
                    "shift" => Some(shift.into()),
                    "control" => Some(control.into()),
                    "chr_bank_0" => Some(chr_0.into()),
                    "chr_bank_1" => Some(chr_1.into()),
                    "prg_bank" => Some(prg.into()),
                    _ => None,
                }
            }
            Self::Mmc3(m) => match path {
                "bank_select" => Some(m.bank_select().into()),
                "irq.counter" => Some(m.irq_counter().into()),
                "irq.reload" => Some(m.irq_reload().into()),
                "irq.enabled" => Some(m.irq_enabled().into()),
                _ => {
                    let index = path.strip_prefix('r')?.parse::<usize>().ok()?;
                    (index < 8).then(|| m.bank_register(index).into())
                }
            },
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        match self {
            Self::Nrom(_) => &["id", "mirroring", "irq"],
            Self::Mmc1(_) => &[
                "id",
                "mirroring",
                "irq",
                "shift",
                "control",
                "chr_bank_0",
                "chr_bank_1",
                "prg_bank",
            ],
            Self::Mmc3(_) => &[
                "id",
                "mirroring",
                "irq",
                "bank_select",
                "r0",
                "r1",
                "r2",
                "r3",
                "r4",
                "r5",
                "r6",
                "r7",
                "irq.counter",
                "irq.reload",
                "irq.enabled",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart(mapper_id: u8) -> Cartridge {
        Cartridge::new(vec![0; 0x8000], Vec::new(), mapper_id, Mirroring::Vertical, true)
            .expect("cart")
    }

    #[test]
    fn picks_board_from_header() {
        assert!(matches!(Mapper::new(cart(0)), Ok(Mapper::Nrom(_))));
        assert!(matches!(Mapper::new(cart(1)), Ok(Mapper::Mmc1(_))));
        assert!(matches!(Mapper::new(cart(4)), Ok(Mapper::Mmc3(_))));
    }

    #[test]
    fn load_rejects_other_board() {
        let nrom = Mapper::new(cart(0)).expect("mapper");
        let mut mmc3 = Mapper::new(cart(4)).expect("mapper");
        assert_eq!(mmc3.load(&nrom.save()), Err(CartridgeError::StateMismatch));
    }

    #[test]
    fn state_survives_json() {
        let mut m = Mapper::new(cart(4)).expect("mapper");
        m.cpu_write(0x8000, 0x46);
        m.cpu_write(0x8001, 2);
        m.cpu_write(0xC000, 7);
        m.cpu_write(0x6001, 0xAB);
        m.chr_write(0x0042, 0x55);

        let json = serde_json::to_string(&m.save()).expect("serialize");
        let state: MapperState = serde_json::from_str(&json).expect("deserialize");

        let mut other = Mapper::new(cart(4)).expect("mapper");
        other.load(&state).expect("load");
        assert_eq!(other.save(), m.save());
        assert_eq!(other.cpu_read(0x6001), 0xAB);
        assert_eq!(other.chr_read(0x0042), 0x55);
        assert_eq!(other.query("bank_select"), Some(Value::U8(0x46)));
        assert_eq!(other.query("r6"), Some(Value::U8(2)));
    }

    #[test]
    fn sram_accessors() {
        let mut m = Mapper::new(cart(1)).expect("mapper");
        m.set_sram(&[1, 2, 3]);
        assert_eq!(&m.sram()[..3], &[1, 2, 3]);
        assert_eq!(m.cpu_read(0x6002), 3);
    }

    #[test]
    fn query_common_paths() {
        let m = Mapper::new(cart(0)).expect("mapper");
        assert_eq!(m.query("id"), Some(Value::U8(0)));
        assert_eq!(m.query("mirroring"), Some(Value::Str("vertical")));
        assert_eq!(m.query("r0"), None);
    }
}
