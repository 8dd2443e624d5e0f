use ricoh_ppu_2c02::Mirroring;
use serde::{Deserialize, Serialize};

use crate::{Cartridge, CartridgeError, CartridgeState};

const PRG_BANK: usize = 0x4000;
const CHR_BANK: usize = 0x1000;
/// Empty shift register: a single marker bit that reaches bit 0 on the
/// fifth write.
const SHIFT_RESET: u8 = 0x10;

/// MMC1 (mapper 1, SxROM): serial shift register bank switching.
///
/// - 5-bit shift register loaded one bit at a time via writes to $8000-$FFFF
/// - After 5 writes, value dispatched to internal register based on address
/// - Writing with bit 7 set resets shift register and sets PRG mode 3
/// - PRG: 16K or 32K banking modes
/// - CHR: 4K or 8K banking modes
/// - PRG RAM: 8K at $6000-$7FFF
#[derive(Debug, Clone)]
pub struct Mmc1 {
    pub(crate) cart: Cartridge,
    shift_register: u8,
    control: u8,
    chr_bank_0: u8,
    chr_bank_1: u8,
    prg_bank: u8,
    prg_offsets: [usize; 2],
    chr_offsets: [usize; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mmc1State {
    pub cartridge: CartridgeState,
    pub shift_register: u8,
    pub control: u8,
    pub chr_bank_0: u8,
    pub chr_bank_1: u8,
    pub prg_bank: u8,
    pub prg_offsets: [usize; 2],
    pub chr_offsets: [usize; 2],
}

impl Mmc1 {
    #[must_use]
    pub fn new(cart: Cartridge) -> Self {
        let mut mmc1 = Self {
            cart,
            shift_register: SHIFT_RESET,
            // PRG mode 3 (fix last bank) on power-up
            control: 0x0C,
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
            prg_offsets: [0; 2],
            chr_offsets: [0; 2],
        };
        mmc1.update_offsets();
        mmc1
    }

    fn prg_mode(&self) -> u8 {
        (self.control >> 2) & 0x03
    }

    fn chr_mode(&self) -> u8 {
        (self.control >> 4) & 0x01
    }

    pub(crate) fn mirroring(&self) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
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
            0x8000..=0xFFFF => self.load_register(addr, value),
            _ => {}
        }
    }

    fn load_register(&mut self, addr: u16, value: u8) {
        if value & 0x80 != 0 {
            self.shift_register = SHIFT_RESET;
            self.write_control(self.control | 0x0C);
            return;
        }

        let complete = self.shift_register & 1 == 1;
        self.shift_register >>= 1;
        self.shift_register |= (value & 1) << 4;
        if complete {
            let data = self.shift_register;
            match (addr >> 13) & 0x03 {
                0 => self.write_control(data),
                1 => self.chr_bank_0 = data,
                2 => self.chr_bank_1 = data,
                _ => self.prg_bank = data & 0x0F,
            }
            self.shift_register = SHIFT_RESET;
            self.update_offsets();
        }
    }

    fn write_control(&mut self, value: u8) {
        let previous = self.control;
        self.control = value & 0x1F;
        if previous != self.control {
            log::debug!(
                "MMC1 control {:02X}: PRG mode {}, CHR mode {}, {:?}",
                self.control,
                self.prg_mode(),
                self.chr_mode(),
                self.mirroring()
            );
        }
        self.update_offsets();
    }

    // PRG ROM bank mode (0, 1: switch 32 KB at $8000, ignoring low bit of bank number;
    //                    2: fix first bank at $8000 and switch 16 KB bank at $C000;
    //                    3: fix last bank at $C000 and switch 16 KB bank at $8000)
    // CHR ROM bank mode (0: switch 8 KB at a time; 1: switch two separate 4 KB banks)
    fn update_offsets(&mut self) {
        let prg_bank = isize::from(self.prg_bank);
        self.prg_offsets = match self.prg_mode() {
            0 | 1 => [
                self.cart.prg_bank_offset(prg_bank & 0x0E, PRG_BANK),
                self.cart.prg_bank_offset(prg_bank | 0x01, PRG_BANK),
            ],
            2 => [0, self.cart.prg_bank_offset(prg_bank, PRG_BANK)],
            _ => [
                self.cart.prg_bank_offset(prg_bank, PRG_BANK),
                self.cart.prg_bank_offset(-1, PRG_BANK),
            ],
        };

        let chr_0 = isize::from(self.chr_bank_0);
        let chr_1 = isize::from(self.chr_bank_1);
        self.chr_offsets = if self.chr_mode() == 0 {
            [
                self.cart.chr_bank_offset(chr_0 & 0x1E, CHR_BANK),
                self.cart.chr_bank_offset(chr_0 | 0x01, CHR_BANK),
            ]
        } else {
            [
                self.cart.chr_bank_offset(chr_0, CHR_BANK),
                self.cart.chr_bank_offset(chr_1, CHR_BANK),
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

    pub(crate) fn registers(&self) -> (u8, u8, u8, u8, u8) {
        (
            self.shift_register,
            self.control,
            self.chr_bank_0,
            self.chr_bank_1,
            self.prg_bank,
        )
    }

    pub(crate) fn save(&self) -> Mmc1State {
        Mmc1State {
            cartridge: self.cart.save_memory(),
            shift_register: self.shift_register,
            control: self.control,
            chr_bank_0: self.chr_bank_0,
            chr_bank_1: self.chr_bank_1,
            prg_bank: self.prg_bank,
            prg_offsets: self.prg_offsets,
            chr_offsets: self.chr_offsets,
        }
    }

    pub(crate) fn load(&mut self, state: &Mmc1State) -> Result<(), CartridgeError> {
        let fits = |offsets: &[usize], len: usize| offsets.iter().all(|&o| o < len);
        if !fits(&state.prg_offsets, self.cart.prg().len())
            || !fits(&state.chr_offsets, self.cart.chr().len())
        {
            return Err(CartridgeError::StateMismatch);
        }
        self.cart.load_memory(&state.cartridge)?;
        self.shift_register = state.shift_register;
        self.control = state.control & 0x1F;
        self.chr_bank_0 = state.chr_bank_0;
        self.chr_bank_1 = state.chr_bank_1;
        self.prg_bank = state.prg_bank;
        self.prg_offsets = state.prg_offsets;
        self.chr_offsets = state.chr_offsets;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16K PRG banks filled with their index, 4K CHR banks likewise.
    fn make_mmc1(prg_banks: usize, chr_banks: usize) -> Mmc1 {
        let prg = (0..prg_banks * PRG_BANK).map(|i| (i / PRG_BANK) as u8).collect();
        let chr = (0..chr_banks * CHR_BANK).map(|i| (i / CHR_BANK) as u8).collect();
        Mmc1::new(Cartridge::new(prg, chr, 1, Mirroring::Horizontal, false).expect("cart"))
    }

    /// Five serial writes, LSB first.
    fn write_serial(m: &mut Mmc1, addr: u16, value: u8) {
        for bit in 0..5 {
            m.cpu_write(addr, (value >> bit) & 1);
        }
    }

    #[test]
    fn power_on_fixes_last_bank_high() {
        let m = make_mmc1(8, 4);
        assert_eq!(m.cpu_read(0x8000), 0);
        assert_eq!(m.cpu_read(0xC000), 7);
    }

    #[test]
    fn register_commits_on_fifth_write_only() {
        let mut m = make_mmc1(8, 4);
        for _ in 0..4 {
            m.cpu_write(0xE000, 1);
            assert_eq!(m.cpu_read(0x8000), 0);
        }
        m.cpu_write(0xE000, 0);
        assert_eq!(m.cpu_read(0x8000), 0x0F & 7);
    }

    #[test]
    fn reset_bit_clears_shift_and_sets_mode_3() {
        let mut m = make_mmc1(8, 4);
        write_serial(&mut m, 0x8000, 0x08); // PRG mode 2
        assert_eq!(m.cpu_read(0x8000), 0);
        m.cpu_write(0x8000, 1);
        m.cpu_write(0x8000, 0x80);
        assert_eq!(m.registers().0, SHIFT_RESET);
        assert_eq!(m.prg_mode(), 3);
        assert_eq!(m.cpu_read(0xC000), 7);
    }

    #[test]
    fn prg_modes() {
        let mut m = make_mmc1(8, 4);
        write_serial(&mut m, 0xE000, 5);
        assert_eq!(m.cpu_read(0x8000), 5);
        assert_eq!(m.cpu_read(0xC000), 7);

        write_serial(&mut m, 0x8000, 0x08); // fix first
        assert_eq!(m.cpu_read(0x8000), 0);
        assert_eq!(m.cpu_read(0xC000), 5);

        write_serial(&mut m, 0x8000, 0x00); // 32K, low bit ignored
        assert_eq!(m.cpu_read(0x8000), 4);
        assert_eq!(m.cpu_read(0xC000), 5);
    }

    #[test]
    fn chr_modes() {
        let mut m = make_mmc1(2, 8);
        write_serial(&mut m, 0xA000, 3);
        write_serial(&mut m, 0xC000, 6);
        // 8K mode: bank 3 & !1 = 2, then 3
        assert_eq!(m.chr_read(0x0000), 2);
        assert_eq!(m.chr_read(0x1000), 3);

        write_serial(&mut m, 0x8000, 0x1C);
        assert_eq!(m.chr_read(0x0000), 3);
        assert_eq!(m.chr_read(0x1000), 6);
    }

    #[test]
    fn bank_numbers_wrap_to_rom_size() {
        let mut m = make_mmc1(4, 2);
        write_serial(&mut m, 0xE000, 9);
        assert_eq!(m.cpu_read(0x8000), 1);
        write_serial(&mut m, 0x8000, 0x1C);
        write_serial(&mut m, 0xA000, 5);
        assert_eq!(m.chr_read(0x0000), 1);
    }

    #[test]
    fn control_selects_mirroring() {
        let mut m = make_mmc1(2, 2);
        assert_eq!(m.mirroring(), Mirroring::SingleScreenLower);
        write_serial(&mut m, 0x8000, 0x0E);
        assert_eq!(m.mirroring(), Mirroring::Vertical);
        write_serial(&mut m, 0x8000, 0x0F);
        assert_eq!(m.mirroring(), Mirroring::Horizontal);
        write_serial(&mut m, 0x8000, 0x0D);
        assert_eq!(m.mirroring(), Mirroring::SingleScreenUpper);
    }

    #[test]
    fn prg_ram_read_write() {
        let mut m = make_mmc1(2, 2);
        m.cpu_write(0x7FFF, 0x99);
        assert_eq!(m.cpu_read(0x7FFF), 0x99);
    }
}
