use ricoh_ppu_2c02::Mirroring;
use serde::{Deserialize, Serialize};

use crate::{Cartridge, CartridgeError, CartridgeState};

const PRG_BANK: usize = 0x2000;
const CHR_BANK: usize = 0x0400;

/// MMC3 (mapper 4, TxROM).
///
/// - PRG: 4 x 8K windows with two switchable modes
/// - CHR: 8 x 1K windows (mixed 2K/1K granularity) with two modes
/// - PRG RAM: 8K at $6000-$7FFF
/// - Mirroring: switchable H/V
/// - Scanline counter clocked at dot 280 of each rendered line
#[derive(Debug, Clone)]
pub struct Mmc3 {
    pub(crate) cart: Cartridge,
    /// Bank select ($8000) bits 0-2: target register.
    register: u8,
    /// R0-R7, written via $8001.
    registers: [u8; 8],
    prg_mode: u8,
    chr_mode: u8,
    prg_offsets: [usize; 4],
    chr_offsets: [usize; 8],
    mirroring: Mirroring,
    irq_reload: u8,
    irq_counter: u8,
    irq_enabled: bool,
    irq_pending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mmc3State {
    pub cartridge: CartridgeState,
    pub register: u8,
    pub registers: [u8; 8],
    pub prg_mode: u8,
    pub chr_mode: u8,
    pub prg_offsets: [usize; 4],
    pub chr_offsets: [usize; 8],
    pub mirroring: Mirroring,
    pub irq_reload: u8,
    pub irq_counter: u8,
    pub irq_enabled: bool,
    pub irq_pending: bool,
}

impl Mmc3 {
    #[must_use]
    pub fn new(cart: Cartridge) -> Self {
        let mirroring = cart.mirroring();
        let mut mmc3 = Self {
            cart,
            register: 0,
            registers: [0; 8],
            prg_mode: 0,
            chr_mode: 0,
            prg_offsets: [0; 4],
            chr_offsets: [0; 8],
            mirroring,
            irq_reload: 0,
            irq_counter: 0,
            irq_enabled: false,
            irq_pending: false,
        };
        mmc3.prg_offsets = [
            mmc3.cart.prg_bank_offset(0, PRG_BANK),
            mmc3.cart.prg_bank_offset(1, PRG_BANK),
            mmc3.cart.prg_bank_offset(-2, PRG_BANK),
            mmc3.cart.prg_bank_offset(-1, PRG_BANK),
        ];
        mmc3
    }

    pub(crate) fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    pub(crate) fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    /// Called once per PPU dot. The counter is clocked at dot 280 of the
    /// visible and pre-render lines while rendering is on.
    pub(crate) fn step(&mut self, scanline: u16, dot: u16, rendering: bool) {
        if dot != 280 || !rendering {
            return;
        }
        if (240..261).contains(&scanline) {
            return;
        }
        self.clock_scanline();
    }

    fn clock_scanline(&mut self) {
        if self.irq_counter == 0 {
            self.irq_counter = self.irq_reload;
        } else {
            self.irq_counter -= 1;
            if self.irq_counter == 0 && self.irq_enabled {
                self.irq_pending = true;
            }
        }
    }

    pub(crate) fn cpu_read(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.cart.read_sram(addr - 0x6000),
            0x8000..=0xFFFF => {
                let addr = usize::from(addr - 0x8000);
                let slot = addr / PRG_BANK;
                self.cart.read_prg(self.prg_offsets[slot] + addr % PRG_BANK)
            }
            _ => 0,
        }
    }

    pub(crate) fn cpu_write(&mut self, addr: u16, value: u8) {
        match addr {
            0x6000..=0x7FFF => self.cart.write_sram(addr - 0x6000, value),
            0x8000..=0xFFFF => self.write_register(addr, value),
            _ => {}
        }
    }

    fn write_register(&mut self, addr: u16, value: u8) {
        let even = addr & 1 == 0;
        match (addr, even) {
            (0x8000..=0x9FFF, true) => self.write_bank_select(value),
            (0x8000..=0x9FFF, false) => {
                self.registers[usize::from(self.register)] = value;
                self.update_offsets();
            }
            (0xA000..=0xBFFF, true) => {
                // Four-screen boards ignore the mirroring register
                if self.cart.mirroring() != Mirroring::FourScreen {
                    self.mirroring = if value & 1 == 0 {
                        Mirroring::Vertical
                    } else {
                        Mirroring::Horizontal
                    };
                }
            }
            // PRG RAM protect: SRAM stays enabled and writable
            (0xA000..=0xBFFF, false) => {}
            (0xC000..=0xDFFF, true) => self.irq_reload = value,
            (0xC000..=0xDFFF, false) => self.irq_counter = 0,
            (_, true) => {
                self.irq_enabled = false;
                self.irq_pending = false;
            }
            (_, false) => self.irq_enabled = true,
        }
    }

    fn write_bank_select(&mut self, value: u8) {
        let prg_mode = (value >> 6) & 1;
        let chr_mode = (value >> 7) & 1;
        if prg_mode != self.prg_mode || chr_mode != self.chr_mode {
            log::debug!("MMC3 bank select {value:02X}: PRG mode {prg_mode}, CHR mode {chr_mode}");
        }
        self.prg_mode = prg_mode;
        self.chr_mode = chr_mode;
        self.register = value & 0x07;
        self.update_offsets();
    }

    fn update_offsets(&mut self) {
        let r = self.registers.map(isize::from);
        let prg = |index| self.cart.prg_bank_offset(index, PRG_BANK);
        self.prg_offsets = if self.prg_mode == 0 {
            [prg(r[6]), prg(r[7]), prg(-2), prg(-1)]
        } else {
            [prg(-2), prg(r[7]), prg(r[6]), prg(-1)]
        };

        let chr = |index| self.cart.chr_bank_offset(index, CHR_BANK);
        self.chr_offsets = if self.chr_mode == 0 {
            [
                chr(r[0] & 0xFE),
                chr(r[0] | 0x01),
                chr(r[1] & 0xFE),
                chr(r[1] | 0x01),
                chr(r[2]),
                chr(r[3]),
                chr(r[4]),
                chr(r[5]),
            ]
        } else {
            [
                chr(r[2]),
                chr(r[3]),
                chr(r[4]),
                chr(r[5]),
                chr(r[0] & 0xFE),
                chr(r[0] | 0x01),
                chr(r[1] & 0xFE),
                chr(r[1] | 0x01),
            ]
        };
    }

    fn chr_offset(&self, addr: u16) -> usize {
        let addr = usize::from(addr & 0x1FFF);
        self.chr_offsets[addr / CHR_BANK] + addr % CHR_BANK
    }

    pub(crate) fn chr_read(&self, addr: u16) -> u8 {
        self.cart.read_chr(self.chr_offset(addr))
    }

    pub(crate) fn chr_write(&mut self, addr: u16, value: u8) {
        let offset = self.chr_offset(addr);
        self.cart.write_chr(offset, value);
    }

    pub(crate) fn bank_select(&self) -> u8 {
        (self.chr_mode << 7) | (self.prg_mode << 6) | self.register
    }

    pub(crate) fn bank_register(&self, index: usize) -> u8 {
        self.registers[index & 7]
    }

    pub(crate) fn irq_counter(&self) -> u8 {
        self.irq_counter
    }

    pub(crate) fn irq_reload(&self) -> u8 {
        self.irq_reload
    }

    pub(crate) fn irq_enabled(&self) -> bool {
        self.irq_enabled
    }

    pub(crate) fn save(&self) -> Mmc3State {
        Mmc3State {
            cartridge: self.cart.save_memory(),
            register: self.register,
            registers: self.registers,
            prg_mode: self.prg_mode,
            chr_mode: self.chr_mode,
            prg_offsets: self.prg_offsets,
            chr_offsets: self.chr_offsets,
            mirroring: self.mirroring,
            irq_reload: self.irq_reload,
            irq_counter: self.irq_counter,
            irq_enabled: self.irq_enabled,
            irq_pending: self.irq_pending,
        }
    }

    pub(crate) fn load(&mut self, state: &Mmc3State) -> Result<(), CartridgeError> {
        let fits = |offsets: &[usize], len: usize| offsets.iter().all(|&o| o < len);
        if !fits(&state.prg_offsets, self.cart.prg().len())
            || !fits(&state.chr_offsets, self.cart.chr().len())
        {
            return Err(CartridgeError::StateMismatch);
        }
        self.cart.load_memory(&state.cartridge)?;
        self.register = state.register & 0x07;
        self.registers = state.registers;
        self.prg_mode = state.prg_mode & 1;
        self.chr_mode = state.chr_mode & 1;
        self.prg_offsets = state.prg_offsets;
        self.chr_offsets = state.chr_offsets;
        self.mirroring = state.mirroring;
        self.irq_reload = state.irq_reload;
        self.irq_counter = state.irq_counter;
        self.irq_enabled = state.irq_enabled;
        self.irq_pending = state.irq_pending;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8K PRG banks filled with their index, 1K CHR pages likewise.
    fn make_mmc3(prg_banks: usize, chr_pages: usize) -> Mmc3 {
        let prg = (0..prg_banks * PRG_BANK).map(|i| (i / PRG_BANK) as u8).collect();
        let chr = (0..chr_pages * CHR_BANK).map(|i| (i / CHR_BANK) as u8).collect();
        Mmc3::new(Cartridge::new(prg, chr, 4, Mirroring::Vertical, false).expect("cart"))
    }

    fn rendered_line(m: &mut Mmc3, scanline: u16) {
        for dot in 0..341 {
            m.step(scanline, dot, true);
        }
    }

    #[test]
    fn power_on_layout() {
        let m = make_mmc3(16, 8);
        assert_eq!(m.cpu_read(0x8000), 0);
        assert_eq!(m.cpu_read(0xA000), 1);
        assert_eq!(m.cpu_read(0xC000), 14);
        assert_eq!(m.cpu_read(0xE000), 15);
    }

    #[test]
    fn prg_mode_0() {
        let mut m = make_mmc3(32, 8);
        m.cpu_write(0x8000, 6);
        m.cpu_write(0x8001, 5);
        m.cpu_write(0x8000, 7);
        m.cpu_write(0x8001, 9);
        assert_eq!(m.cpu_read(0x8000), 5);
        assert_eq!(m.cpu_read(0xA000), 9);
        assert_eq!(m.cpu_read(0xC000), 30);
        assert_eq!(m.cpu_read(0xFFFF), 31);
    }

    #[test]
    fn prg_mode_1_swaps_8000_and_c000() {
        let mut m = make_mmc3(32, 8);
        m.cpu_write(0x8000, 6);
        m.cpu_write(0x8001, 5);
        m.cpu_write(0x8000, 0x46);
        assert_eq!(m.cpu_read(0x8000), 30);
        assert_eq!(m.cpu_read(0xC000), 5);
        assert_eq!(m.cpu_read(0xE000), 31);
    }

    #[test]
    fn chr_modes() {
        let mut m = make_mmc3(4, 64);
        for (reg, bank) in [(0u8, 9u8), (1, 20), (2, 40), (3, 41), (4, 42), (5, 43)] {
            m.cpu_write(0x8000, reg);
            m.cpu_write(0x8001, bank);
        }
        // 2K banks ignore bit 0
        assert_eq!(m.chr_read(0x0000), 8);
        assert_eq!(m.chr_read(0x0400), 9);
        assert_eq!(m.chr_read(0x0800), 20);
        assert_eq!(m.chr_read(0x0C00), 21);
        assert_eq!(m.chr_read(0x1000), 40);
        assert_eq!(m.chr_read(0x1C00), 43);

        m.cpu_write(0x8000, 0x80);
        assert_eq!(m.chr_read(0x0000), 40);
        assert_eq!(m.chr_read(0x0C00), 43);
        assert_eq!(m.chr_read(0x1000), 8);
        assert_eq!(m.chr_read(0x1C00), 21);
    }

    #[test]
    fn bank_numbers_wrap_to_rom_size() {
        let mut m = make_mmc3(8, 8);
        m.cpu_write(0x8000, 6);
        m.cpu_write(0x8001, 0x3D);
        assert_eq!(m.cpu_read(0x8000), 5);
        m.cpu_write(0x8000, 2);
        m.cpu_write(0x8001, 0xFF);
        assert_eq!(m.chr_read(0x1000), 7);
    }

    #[test]
    fn mirroring_register() {
        let mut m = make_mmc3(4, 8);
        m.cpu_write(0xA000, 1);
        assert_eq!(m.mirroring(), Mirroring::Horizontal);
        m.cpu_write(0xA000, 0);
        assert_eq!(m.mirroring(), Mirroring::Vertical);
    }

    #[test]
    fn irq_reload_4_fires_after_four_scanlines() {
        let mut m = make_mmc3(4, 8);
        m.cpu_write(0xC000, 4);
        m.cpu_write(0xC001, 0);
        m.cpu_write(0xE001, 0);

        // First clock loads the latch
        rendered_line(&mut m, 0);
        assert_eq!(m.irq_counter(), 4);

        for line in 1..4 {
            rendered_line(&mut m, line);
            assert!(!m.irq_pending(), "early IRQ on line {line}");
        }
        rendered_line(&mut m, 4);
        assert_eq!(m.irq_counter(), 0);
        assert!(m.irq_pending());

        m.cpu_write(0xE000, 0);
        assert!(!m.irq_pending());
        assert!(!m.irq_enabled());
    }

    #[test]
    fn irq_disabled_at_underflow_stays_quiet() {
        let mut m = make_mmc3(4, 8);
        m.cpu_write(0xC000, 4);
        m.cpu_write(0xC001, 0);
        for line in 0..5 {
            rendered_line(&mut m, line);
        }
        assert_eq!(m.irq_counter(), 0);
        assert!(!m.irq_pending());
    }

    #[test]
    fn counter_ignores_vblank_and_disabled_rendering() {
        let mut m = make_mmc3(4, 8);
        m.cpu_write(0xC000, 10);
        m.cpu_write(0xC001, 0);
        rendered_line(&mut m, 261);
        assert_eq!(m.irq_counter(), 10);
        for line in 240..261 {
            rendered_line(&mut m, line);
        }
        for dot in 0..341 {
            m.step(5, dot, false);
        }
        assert_eq!(m.irq_counter(), 10);
    }
}
