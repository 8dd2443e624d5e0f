//! Frame-level rendering through the register interface.

use ricoh_ppu_2c02::{ChrBus, FB_WIDTH, Mirroring, PALETTE, Ppu};

/// CHR RAM where tile 0 is solid colour 1 and tile 1 is solid colour 3.
struct SolidTiles {
    data: Vec<u8>,
}

impl SolidTiles {
    fn new() -> Self {
        let mut data = vec![0; 0x2000];
        data[0x00..0x08].fill(0xFF);
        data[0x10..0x20].fill(0xFF);
        Self { data }
    }
}

impl ChrBus for SolidTiles {
    fn chr_read(&mut self, addr: u16) -> u8 {
        self.data[addr as usize & 0x1FFF]
    }
    fn chr_write(&mut self, addr: u16, value: u8) {
        self.data[addr as usize & 0x1FFF] = value;
    }
    fn mirroring(&self) -> Mirroring {
        Mirroring::Horizontal
    }
}

fn write_vram(ppu: &mut Ppu, chr: &mut SolidTiles, addr: u16, bytes: &[u8]) {
    ppu.cpu_write(0x2006, (addr >> 8) as u8, chr);
    ppu.cpu_write(0x2006, addr as u8, chr);
    for &b in bytes {
        ppu.cpu_write(0x2007, b, chr);
    }
}

/// Tick until the PPU reaches scanline `line`, dot 0 of the next frame.
fn run_to_line(ppu: &mut Ppu, chr: &mut SolidTiles, line: u16) {
    let frame = ppu.frame();
    while ppu.frame() == frame {
        ppu.tick(chr);
    }
    while ppu.scanline() < line {
        ppu.tick(chr);
    }
}

#[test]
fn background_tile_fills_the_screen() {
    let mut chr = SolidTiles::new();
    let mut ppu = Ppu::new();
    write_vram(&mut ppu, &mut chr, 0x3F00, &[0x0F, 0x30]);
    ppu.cpu_write(0x2001, 0x0A, &mut chr);

    run_to_line(&mut ppu, &mut chr, 240);

    let fb = ppu.framebuffer();
    assert_eq!(fb[0], PALETTE[0x30]);
    assert_eq!(fb[120 * FB_WIDTH as usize + 100], PALETTE[0x30]);
    assert_eq!(fb[239 * FB_WIDTH as usize + 255], PALETTE[0x30]);
}

#[test]
fn left_column_clipping_shows_backdrop() {
    let mut chr = SolidTiles::new();
    let mut ppu = Ppu::new();
    write_vram(&mut ppu, &mut chr, 0x3F00, &[0x0F, 0x30]);
    ppu.cpu_write(0x2001, 0x08, &mut chr);

    run_to_line(&mut ppu, &mut chr, 240);

    let fb = ppu.framebuffer();
    assert_eq!(fb[50 * FB_WIDTH as usize + 7], PALETTE[0x0F]);
    assert_eq!(fb[50 * FB_WIDTH as usize + 8], PALETTE[0x30]);
}

#[test]
fn sprite_zero_hit_over_opaque_background() {
    let mut chr = SolidTiles::new();
    let mut ppu = Ppu::new();
    write_vram(&mut ppu, &mut chr, 0x3F00, &[0x0F, 0x30]);
    write_vram(&mut ppu, &mut chr, 0x3F11, &[0x16]);
    ppu.cpu_write(0x2003, 0x00, &mut chr);
    for b in [10, 0, 0, 20] {
        ppu.cpu_write(0x2004, b, &mut chr);
    }
    ppu.cpu_write(0x2001, 0x1E, &mut chr);

    run_to_line(&mut ppu, &mut chr, 5);
    assert_eq!(ppu.cpu_read(0x2002, &mut chr) & 0x40, 0);

    run_to_line_in_frame(&mut ppu, &mut chr, 30);
    assert_ne!(ppu.cpu_read(0x2002, &mut chr) & 0x40, 0);
    assert_eq!(ppu.framebuffer()[12 * FB_WIDTH as usize + 24], PALETTE[0x16]);
}

#[test]
fn background_priority_sprite_stays_behind() {
    let mut chr = SolidTiles::new();
    let mut ppu = Ppu::new();
    write_vram(&mut ppu, &mut chr, 0x3F00, &[0x0F, 0x30]);
    write_vram(&mut ppu, &mut chr, 0x3F11, &[0x16]);
    ppu.cpu_write(0x2003, 0x00, &mut chr);
    for b in [10, 0, 0x20, 20] {
        ppu.cpu_write(0x2004, b, &mut chr);
    }
    ppu.cpu_write(0x2001, 0x1E, &mut chr);

    run_to_line(&mut ppu, &mut chr, 30);
    assert_eq!(ppu.framebuffer()[12 * FB_WIDTH as usize + 24], PALETTE[0x30]);
    assert_ne!(ppu.cpu_read(0x2002, &mut chr) & 0x40, 0, "hit still counts");
}

fn run_to_line_in_frame(ppu: &mut Ppu, chr: &mut SolidTiles, line: u16) {
    while ppu.scanline() < line {
        ppu.tick(chr);
    }
}
