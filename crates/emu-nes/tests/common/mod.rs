//! Tiny 6502 assembler and iNES builders for the integration tests.

#![allow(dead_code)]

/// Straight-line code emitter with absolute branch targets.
pub struct Asm {
    origin: u16,
    pub code: Vec<u8>,
}

impl Asm {
    pub fn new(origin: u16) -> Self {
        Self {
            origin,
            code: Vec::new(),
        }
    }

    /// Address of the next emitted byte.
    pub fn here(&self) -> u16 {
        self.origin + self.code.len() as u16
    }

    pub fn op(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    pub fn lda(&mut self, value: u8) -> &mut Self {
        self.op(&[0xA9, value])
    }

    pub fn ldx(&mut self, value: u8) -> &mut Self {
        self.op(&[0xA2, value])
    }

    pub fn sta(&mut self, addr: u16) -> &mut Self {
        let [lo, hi] = addr.to_le_bytes();
        self.op(&[0x8D, lo, hi])
    }

    pub fn lda_abs(&mut self, addr: u16) -> &mut Self {
        let [lo, hi] = addr.to_le_bytes();
        self.op(&[0xAD, lo, hi])
    }

    pub fn inc_zp(&mut self, addr: u8) -> &mut Self {
        self.op(&[0xE6, addr])
    }

    pub fn jmp(&mut self, target: u16) -> &mut Self {
        let [lo, hi] = target.to_le_bytes();
        self.op(&[0x4C, lo, hi])
    }

    /// Relative branch `opcode` to an absolute target.
    pub fn branch(&mut self, opcode: u8, target: u16) -> &mut Self {
        let next = i32::from(self.here()) + 2;
        let offset = i32::from(target) - next;
        assert!((-128..=127).contains(&offset), "branch out of range");
        self.op(&[opcode, offset as i8 as u8])
    }

    /// Spin until VBlank: `LDA $2002; BPL *-3`.
    pub fn wait_vblank(&mut self) -> &mut Self {
        let top = self.here();
        self.lda_abs(0x2002).branch(0x10, top)
    }
}

/// iNES image with CHR-RAM. `banks` holds (PRG offset, bytes) pairs.
pub fn ines(mapper: u8, prg_16k: u8, flags6_low: u8, banks: &[(usize, &[u8])]) -> Vec<u8> {
    let prg_size = usize::from(prg_16k) * 0x4000;
    let mut prg = vec![0xEA; prg_size];
    for &(offset, bytes) in banks {
        prg[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    let mut rom = vec![0u8; 16];
    rom[0..4].copy_from_slice(b"NES\x1a");
    rom[4] = prg_16k;
    rom[5] = 0;
    rom[6] = (mapper << 4) | flags6_low;
    rom[7] = mapper & 0xF0;
    rom.extend(prg);
    rom
}

/// 32K NROM: `code` at $8000, reset to $8000, NMI and IRQ where given.
pub fn nrom(code: &[u8], nmi: u16, irq: u16) -> Vec<u8> {
    nrom_with_flags(code, nmi, irq, 0)
}

pub fn nrom_with_flags(code: &[u8], nmi: u16, irq: u16, flags6_low: u8) -> Vec<u8> {
    let [nmi_lo, nmi_hi] = nmi.to_le_bytes();
    let [irq_lo, irq_hi] = irq.to_le_bytes();
    let vectors = [nmi_lo, nmi_hi, 0x00, 0x80, irq_lo, irq_hi];
    ines(0, 2, flags6_low, &[(0, code), (0x7FFA, &vectors)])
}
