//! CPU-visible memory bus.

/// CPU address space.
///
/// The bus owns address decoding. A read may have side effects (PPU status
/// reads clear VBlank, controller reads shift), so both operations take
/// `&mut self`.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Read a little-endian word from two consecutive addresses.
    fn read_word(&mut self, address: u16) -> u16 {
        let lo = self.read(address);
        let hi = self.read(address.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }
}

/// 64 KB of flat RAM with no side effects.
///
/// Used to run CPU code in isolation.
pub struct FlatBus {
    memory: Vec<u8>,
}

impl FlatBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            memory: vec![0; 0x1_0000],
        }
    }

    /// Copy `bytes` into memory starting at `address`, wrapping at $FFFF.
    pub fn load(&mut self, address: u16, bytes: &[u8]) {
        let mut addr = address;
        for &b in bytes {
            self.memory[addr as usize] = b;
            addr = addr.wrapping_add(1);
        }
    }

    /// Peek without going through the [`Bus`] trait.
    #[must_use]
    pub fn peek(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }
}

impl Default for FlatBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for FlatBus {
    fn read(&mut self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.memory[address as usize] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_word_is_little_endian() {
        let mut bus = FlatBus::new();
        bus.load(0x1234, &[0xCD, 0xAB]);
        assert_eq!(bus.read_word(0x1234), 0xABCD);
    }

    #[test]
    fn load_wraps_at_top_of_memory() {
        let mut bus = FlatBus::new();
        bus.load(0xFFFF, &[0x11, 0x22]);
        assert_eq!(bus.peek(0xFFFF), 0x11);
        assert_eq!(bus.peek(0x0000), 0x22);
    }
}
