//! NES PPU (2C02) emulation.
//!
//! Dot-based rendering. One `tick()` = one PPU dot, three per CPU cycle.
//! Each frame is 341 dots x 262 scanlines.
//!
//! ## Scanline layout
//! - 0-239: visible scanlines (render pixels)
//! - 240: post-render (idle)
//! - 241-260: `VBlank`
//! - 261: pre-render
//!
//! Background tiles are fetched into a 64-bit shift register holding one
//! 4-bit nibble per pixel (2 attribute bits above 2 pattern bits). The
//! upper 32 bits are the tile on screen, the lower 32 the tile after it.

#![allow(clippy::manual_range_contains)]

use emu_core::{Observable, Value};
use serde::{Deserialize, Serialize};

use crate::chr::ChrBus;
use crate::palette::PALETTE;

/// Framebuffer dimensions.
pub const FB_WIDTH: u32 = 256;
pub const FB_HEIGHT: u32 = 240;

const PRE_RENDER: u16 = 261;
const VBLANK_START: u16 = 241;

/// PPU dots between the NMI line rising and the CPU seeing it.
const NMI_DELAY: u8 = 15;

/// PPU 2C02.
pub struct Ppu {
    // VRAM
    nametable_ram: Vec<u8>,
    palette_ram: [u8; 32],
    oam: Vec<u8>,

    // Registers
    ctrl: u8,
    mask: u8,
    oam_addr: u8,
    /// Last value written to any register; leaks into $2002 bits 0-4.
    register: u8,
    sprite_zero_hit: bool,
    sprite_overflow: bool,

    // Loopy scroll/address registers
    v: u16,
    t: u16,
    fine_x: u8,
    w: bool,

    // Data read buffer ($2007)
    read_buffer: u8,

    // Rendering position
    scanline: u16,
    dot: u16,
    frame: u64,
    frame_odd: bool,

    // Background pipeline
    nametable_byte: u8,
    attribute_byte: u8,
    pattern_lo: u8,
    pattern_hi: u8,
    tile_data: u64,

    // Sprites selected for the current scanline
    sprite_count: u8,
    sprite_patterns: [u32; 8],
    sprite_positions: [u8; 8],
    sprite_behind: [bool; 8],
    sprite_indexes: [u8; 8],

    // NMI
    nmi_occurred: bool,
    nmi_output: bool,
    nmi_previous: bool,
    nmi_delay: u8,
    nmi_pending: bool,

    // Output
    framebuffer: Vec<u32>,
}

/// Saved PPU state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PpuState {
    pub nametable_ram: Vec<u8>,
    pub palette_ram: Vec<u8>,
    pub oam: Vec<u8>,
    pub ctrl: u8,
    pub mask: u8,
    pub oam_addr: u8,
    pub register: u8,
    pub sprite_zero_hit: bool,
    pub sprite_overflow: bool,
    pub v: u16,
    pub t: u16,
    pub fine_x: u8,
    pub w: bool,
    pub read_buffer: u8,
    pub scanline: u16,
    pub dot: u16,
    pub frame: u64,
    pub frame_odd: bool,
    pub nametable_byte: u8,
    pub attribute_byte: u8,
    pub pattern_lo: u8,
    pub pattern_hi: u8,
    pub tile_data: u64,
    pub sprite_count: u8,
    pub sprite_patterns: [u32; 8],
    pub sprite_positions: [u8; 8],
    pub sprite_behind: [bool; 8],
    pub sprite_indexes: [u8; 8],
    pub nmi_occurred: bool,
    pub nmi_output: bool,
    pub nmi_previous: bool,
    pub nmi_delay: u8,
    pub nmi_pending: bool,
    pub framebuffer: Vec<u32>,
}

impl Ppu {
    #[must_use]
    pub fn new() -> Self {
        let mut ppu = Self {
            nametable_ram: vec![0; 4096],
            palette_ram: [0; 32],
            oam: vec![0; 256],

            ctrl: 0,
            mask: 0,
            oam_addr: 0,
            register: 0,
            sprite_zero_hit: false,
            sprite_overflow: false,

            v: 0,
            t: 0,
            fine_x: 0,
            w: false,

            read_buffer: 0,

            scanline: 0,
            dot: 0,
            frame: 0,
            frame_odd: false,

            nametable_byte: 0,
            attribute_byte: 0,
            pattern_lo: 0,
            pattern_hi: 0,
            tile_data: 0,

            sprite_count: 0,
            sprite_patterns: [0; 8],
            sprite_positions: [0; 8],
            sprite_behind: [false; 8],
            sprite_indexes: [0; 8],

            nmi_occurred: false,
            nmi_output: false,
            nmi_previous: false,
            nmi_delay: 0,
            nmi_pending: false,

            framebuffer: vec![0; (FB_WIDTH * FB_HEIGHT) as usize],
        };
        ppu.reset();
        ppu
    }

    /// Reset: position to the end of post-render, control registers cleared.
    pub fn reset(&mut self) {
        self.dot = 340;
        self.scanline = 240;
        self.frame = 0;
        self.write_ctrl(0);
        self.mask = 0;
        self.oam_addr = 0;
    }

    /// One PPU dot.
    pub fn tick(&mut self, chr: &mut dyn ChrBus) {
        self.advance();

        let rendering = self.rendering_enabled();
        let pre_line = self.scanline == PRE_RENDER;
        let visible_line = self.scanline < 240;
        let render_line = pre_line || visible_line;
        let visible_dot = self.dot >= 1 && self.dot <= 256;
        let prefetch_dot = self.dot >= 321 && self.dot <= 336;
        let fetch_dot = visible_dot || prefetch_dot;

        if rendering {
            if visible_line && visible_dot {
                self.render_pixel();
            }

            if render_line && fetch_dot {
                self.tile_data <<= 4;
                match self.dot % 8 {
                    1 => self.fetch_nametable_byte(chr),
                    3 => self.fetch_attribute_byte(chr),
                    5 => self.pattern_lo = self.ppu_read(self.pattern_addr(), chr),
                    7 => self.pattern_hi = self.ppu_read(self.pattern_addr() + 8, chr),
                    0 => self.store_tile_data(),
                    _ => {}
                }
            }

            // Copy vertical bits from t to v during dots 280-304
            if pre_line && self.dot >= 280 && self.dot <= 304 {
                self.copy_vertical();
            }

            if render_line {
                if fetch_dot && self.dot % 8 == 0 {
                    self.increment_x();
                }
                if self.dot == 256 {
                    self.increment_y();
                }
                if self.dot == 257 {
                    self.copy_horizontal();
                }
            }

            if self.dot == 257 {
                if visible_line {
                    self.evaluate_sprites(chr);
                } else {
                    self.sprite_count = 0;
                }
            }
        } else if visible_line && visible_dot {
            // Rendering disabled: output background colour
            let x = (self.dot - 1) as usize;
            let y = self.scanline as usize;
            let colour = self.apply_mask_effects(self.palette_ram[0] & 0x3F);
            self.framebuffer[y * FB_WIDTH as usize + x] = colour;
        }

        if self.scanline == VBLANK_START && self.dot == 1 {
            self.nmi_occurred = true;
            self.nmi_change();
        }
        if pre_line && self.dot == 1 {
            self.nmi_occurred = false;
            self.nmi_change();
            self.sprite_zero_hit = false;
            self.sprite_overflow = false;
        }
    }

    /// Run the NMI delay line and move to the next dot.
    fn advance(&mut self) {
        if self.nmi_delay > 0 {
            self.nmi_delay -= 1;
            if self.nmi_delay == 0 && self.nmi_output && self.nmi_occurred {
                self.nmi_pending = true;
            }
        }

        // Odd frame skip: the pre-render line is one dot short
        if self.rendering_enabled()
            && self.frame_odd
            && self.scanline == PRE_RENDER
            && self.dot == 339
        {
            self.dot = 0;
            self.scanline = 0;
            self.next_frame();
            return;
        }

        self.dot += 1;
        if self.dot > 340 {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline > PRE_RENDER {
                self.scanline = 0;
                self.next_frame();
            }
        }
    }

    fn next_frame(&mut self) {
        self.frame += 1;
        self.frame_odd = !self.frame_odd;
    }

    fn nmi_change(&mut self) {
        let nmi = self.nmi_output && self.nmi_occurred;
        if nmi && !self.nmi_previous {
            self.nmi_delay = NMI_DELAY;
        }
        self.nmi_previous = nmi;
    }

    // === Background ===

    fn fetch_nametable_byte(&mut self, chr: &mut dyn ChrBus) {
        let addr = 0x2000 | (self.v & 0x0FFF);
        self.nametable_byte = self.ppu_read(addr, chr);
    }

    fn fetch_attribute_byte(&mut self, chr: &mut dyn ChrBus) {
        let v = self.v;
        let addr = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
        // Select the 2-bit palette for this quadrant
        let shift = ((v >> 4) & 0x04) | (v & 0x02);
        self.attribute_byte = ((self.ppu_read(addr, chr) >> shift) & 0x03) << 2;
    }

    fn pattern_addr(&self) -> u16 {
        let table = if self.ctrl & 0x10 != 0 { 0x1000 } else { 0 };
        let fine_y = (self.v >> 12) & 0x07;
        table + u16::from(self.nametable_byte) * 16 + fine_y
    }

    /// Merge the latched tile into the low half of the shift register.
    fn store_tile_data(&mut self) {
        let mut lo = self.pattern_lo;
        let mut hi = self.pattern_hi;
        let mut data = 0u32;
        for _ in 0..8 {
            let p1 = (lo & 0x80) >> 7;
            let p2 = (hi & 0x80) >> 6;
            lo <<= 1;
            hi <<= 1;
            data = (data << 4) | u32::from(self.attribute_byte | p1 | p2);
        }
        self.tile_data |= u64::from(data);
    }

    fn background_pixel(&self) -> u8 {
        if self.mask & 0x08 == 0 {
            return 0;
        }
        let data = (self.tile_data >> 32) as u32 >> ((7 - u32::from(self.fine_x)) * 4);
        (data & 0x0F) as u8
    }

    // === Sprites ===

    fn sprite_pixel(&self) -> (usize, u8) {
        if self.mask & 0x10 == 0 {
            return (0, 0);
        }
        let x = i32::from(self.dot) - 1;
        for i in 0..self.sprite_count as usize {
            let offset = x - i32::from(self.sprite_positions[i]);
            if offset < 0 || offset > 7 {
                continue;
            }
            let shift = (7 - offset) * 4;
            let colour = ((self.sprite_patterns[i] >> shift) & 0x0F) as u8;
            if colour % 4 == 0 {
                continue;
            }
            return (i, colour);
        }
        (0, 0)
    }

    fn sprite_height(&self) -> u16 {
        if self.ctrl & 0x20 != 0 { 16 } else { 8 }
    }

    fn evaluate_sprites(&mut self, chr: &mut dyn ChrBus) {
        let height = self.sprite_height();
        let mut count = 0usize;

        for i in 0..64 {
            let y = u16::from(self.oam[i * 4]);
            let attribs = self.oam[i * 4 + 2];
            let x = self.oam[i * 4 + 3];
            let row = self.scanline.wrapping_sub(y);
            if row >= height {
                continue;
            }
            if count < 8 {
                self.sprite_patterns[count] = self.fetch_sprite_pattern(i, row, chr);
                self.sprite_positions[count] = x;
                self.sprite_behind[count] = attribs & 0x20 != 0;
                self.sprite_indexes[count] = i as u8;
            }
            count += 1;
        }

        if count > 8 {
            count = 8;
            self.sprite_overflow = true;
        }
        self.sprite_count = count as u8;
    }

    /// Fetch one row of sprite `index` as eight packed 4-bit pixels.
    fn fetch_sprite_pattern(&mut self, index: usize, row: u16, chr: &mut dyn ChrBus) -> u32 {
        let mut tile = self.oam[index * 4 + 1];
        let attribs = self.oam[index * 4 + 2];
        let flip_v = attribs & 0x80 != 0;

        let addr = if self.sprite_height() == 8 {
            let row = if flip_v { 7 - row } else { row };
            let table = if self.ctrl & 0x08 != 0 { 0x1000u16 } else { 0 };
            table + u16::from(tile) * 16 + row
        } else {
            // 8x16 sprites: bit 0 of tile = pattern table, bits 1-7 = tile
            let mut row = if flip_v { 15 - row } else { row };
            let table = u16::from(tile & 1) * 0x1000;
            tile &= 0xFE;
            if row > 7 {
                tile += 1;
                row -= 8;
            }
            table + u16::from(tile) * 16 + row
        };

        let palette = (attribs & 0x03) << 2;
        let mut lo = self.ppu_read(addr, chr);
        let mut hi = self.ppu_read(addr + 8, chr);
        if attribs & 0x40 != 0 {
            lo = lo.reverse_bits();
            hi = hi.reverse_bits();
        }

        let mut data = 0u32;
        for _ in 0..8 {
            let p1 = (lo & 0x80) >> 7;
            let p2 = (hi & 0x80) >> 6;
            lo <<= 1;
            hi <<= 1;
            data = (data << 4) | u32::from(palette | p1 | p2);
        }
        data
    }

    // === Compositing ===

    fn render_pixel(&mut self) {
        let x = (self.dot - 1) as usize;
        let y = self.scanline as usize;

        let mut background = self.background_pixel();
        let (i, mut sprite) = self.sprite_pixel();

        // Left 8 pixels clipping
        if x < 8 && self.mask & 0x02 == 0 {
            background = 0;
        }
        if x < 8 && self.mask & 0x04 == 0 {
            sprite = 0;
        }

        let bg_opaque = background % 4 != 0;
        let sp_opaque = sprite % 4 != 0;
        let colour = match (bg_opaque, sp_opaque) {
            (false, false) => 0,
            (false, true) => sprite | 0x10,
            (true, false) => background,
            (true, true) => {
                if self.sprite_indexes[i] == 0 && x < 255 {
                    self.sprite_zero_hit = true;
                }
                if self.sprite_behind[i] {
                    background
                } else {
                    sprite | 0x10
                }
            }
        };

        let palette_index = self.palette_ram[palette_index(u16::from(colour))] & 0x3F;
        self.framebuffer[y * FB_WIDTH as usize + x] = self.apply_mask_effects(palette_index);
    }

    /// Apply PPUMASK greyscale (bit 0) and emphasis (bits 5-7) to an ARGB colour.
    ///
    /// Greyscale forces the palette index to column 0 (AND with $30) before
    /// lookup. Emphasis attenuates the other two channels by 13/16 per set
    /// bit.
    fn apply_mask_effects(&self, palette_index: u8) -> u32 {
        let idx = if self.mask & 0x01 != 0 {
            palette_index & 0x30
        } else {
            palette_index
        };

        let argb = PALETTE[idx as usize];
        let emphasis = self.mask >> 5;
        if emphasis == 0 {
            return argb;
        }

        let mut r = (argb >> 16) & 0xFF;
        let mut g = (argb >> 8) & 0xFF;
        let mut b = argb & 0xFF;

        // bit 0 = red, bit 1 = green, bit 2 = blue
        if emphasis & 0x01 != 0 {
            g = g * 13 / 16;
            b = b * 13 / 16;
        }
        if emphasis & 0x02 != 0 {
            r = r * 13 / 16;
            b = b * 13 / 16;
        }
        if emphasis & 0x04 != 0 {
            r = r * 13 / 16;
            g = g * 13 / 16;
        }

        0xFF00_0000 | (r << 16) | (g << 8) | b
    }

    // === Scrolling ===

    fn increment_x(&mut self) {
        if self.v & 0x001F == 31 {
            self.v &= !0x001F;
            self.v ^= 0x0400; // Switch horizontal nametable
        } else {
            self.v += 1;
        }
    }

    fn increment_y(&mut self) {
        if (self.v & 0x7000) != 0x7000 {
            self.v += 0x1000; // Increment fine Y
        } else {
            self.v &= !0x7000; // Fine Y = 0
            let mut coarse_y = (self.v & 0x03E0) >> 5;
            if coarse_y == 29 {
                coarse_y = 0;
                self.v ^= 0x0800; // Switch vertical nametable
            } else if coarse_y == 31 {
                coarse_y = 0; // No nametable switch
            } else {
                coarse_y += 1;
            }
            self.v = (self.v & !0x03E0) | (coarse_y << 5);
        }
    }

    fn copy_horizontal(&mut self) {
        // v: ....A .....EDCBA = t: ....A .....EDCBA
        self.v = (self.v & !0x041F) | (self.t & 0x041F);
    }

    fn copy_vertical(&mut self) {
        // v: GHIA.BC DEF..... = t: GHIA.BC DEF.....
        self.v = (self.v & !0x7BE0) | (self.t & 0x7BE0);
    }

    // === Register access (CPU side) ===

    /// CPU read from PPU register ($2000-$2007 mirrored).
    pub fn cpu_read(&mut self, reg: u16, chr: &mut dyn ChrBus) -> u8 {
        match reg & 0x07 {
            // $2002 - PPUSTATUS
            2 => {
                let result = self.status();
                self.nmi_occurred = false;
                self.nmi_change();
                self.w = false;
                result
            }
            // $2004 - OAMDATA
            4 => self.oam[self.oam_addr as usize],
            // $2007 - PPUDATA
            7 => {
                let addr = self.v & 0x3FFF;
                let value = self.ppu_read(addr, chr);
                let result = if addr < 0x3F00 {
                    std::mem::replace(&mut self.read_buffer, value)
                } else {
                    // Palette reads are not buffered; the buffer gets the
                    // nametable byte underneath
                    self.read_buffer = self.ppu_read(addr - 0x1000, chr);
                    value
                };
                self.increment_v();
                result
            }
            _ => 0, // Write-only registers
        }
    }

    /// CPU write to PPU register ($2000-$2007 mirrored).
    pub fn cpu_write(&mut self, reg: u16, val: u8, chr: &mut dyn ChrBus) {
        self.register = val;
        match reg & 0x07 {
            // $2000 - PPUCTRL
            0 => self.write_ctrl(val),
            // $2001 - PPUMASK
            1 => self.mask = val,
            // $2003 - OAMADDR
            3 => self.oam_addr = val,
            // $2004 - OAMDATA
            4 => {
                self.oam[self.oam_addr as usize] = val;
                self.oam_addr = self.oam_addr.wrapping_add(1);
            }
            // $2005 - PPUSCROLL
            5 => {
                if self.w {
                    self.t = (self.t & 0x8FFF) | (u16::from(val & 0x07) << 12);
                    self.t = (self.t & 0xFC1F) | (u16::from(val & 0xF8) << 2);
                } else {
                    self.t = (self.t & 0xFFE0) | (u16::from(val) >> 3);
                    self.fine_x = val & 0x07;
                }
                self.w = !self.w;
            }
            // $2006 - PPUADDR
            6 => {
                if self.w {
                    self.t = (self.t & 0xFF00) | u16::from(val);
                    self.v = self.t;
                } else {
                    self.t = (self.t & 0x80FF) | (u16::from(val & 0x3F) << 8);
                }
                self.w = !self.w;
            }
            // $2007 - PPUDATA
            7 => {
                self.ppu_write(self.v & 0x3FFF, val, chr);
                self.increment_v();
            }
            _ => {}
        }
    }

    fn write_ctrl(&mut self, val: u8) {
        self.ctrl = val;
        self.nmi_output = val & 0x80 != 0;
        self.nmi_change();
        // Nametable select bits go to t bits 10-11
        self.t = (self.t & 0xF3FF) | (u16::from(val & 0x03) << 10);
    }

    fn increment_v(&mut self) {
        let step = if self.ctrl & 0x04 != 0 { 32 } else { 1 };
        self.v = self.v.wrapping_add(step) & 0x7FFF;
    }

    fn status(&self) -> u8 {
        let mut result = self.register & 0x1F;
        if self.sprite_overflow {
            result |= 0x20;
        }
        if self.sprite_zero_hit {
            result |= 0x40;
        }
        if self.nmi_occurred {
            result |= 0x80;
        }
        result
    }

    // === PPU memory access ===

    fn ppu_read(&self, addr: u16, chr: &mut dyn ChrBus) -> u8 {
        match addr & 0x3FFF {
            a @ 0x0000..=0x1FFF => chr.chr_read(a),
            a @ 0x2000..=0x3EFF => self.nametable_ram[chr.mirroring().nametable_offset(a)],
            a => self.palette_ram[palette_index(a)],
        }
    }

    fn ppu_write(&mut self, addr: u16, val: u8, chr: &mut dyn ChrBus) {
        match addr & 0x3FFF {
            a @ 0x0000..=0x1FFF => chr.chr_write(a, val),
            a @ 0x2000..=0x3EFF => {
                let offset = chr.mirroring().nametable_offset(a);
                self.nametable_ram[offset] = val;
            }
            a => self.palette_ram[palette_index(a)] = val,
        }
    }

    // === Helpers ===

    /// Background or sprites enabled in PPUMASK.
    #[must_use]
    pub fn rendering_enabled(&self) -> bool {
        self.mask & 0x18 != 0
    }

    /// Take the pending NMI flag (used by the NES tick loop to signal CPU).
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_pending)
    }

    /// Write OAM data (for DMA).
    pub fn write_oam(&mut self, offset: u8, value: u8) {
        self.oam[offset as usize] = value;
    }

    /// Read OAM data (for observation).
    #[must_use]
    pub fn read_oam(&self, offset: u8) -> u8 {
        self.oam[offset as usize]
    }

    /// OAM address register.
    #[must_use]
    pub fn oam_addr(&self) -> u8 {
        self.oam_addr
    }

    /// Reference to the framebuffer (ARGB32, 256x240).
    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    /// Current scanline.
    #[must_use]
    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    /// Current dot.
    #[must_use]
    pub fn dot(&self) -> u16 {
        self.dot
    }

    /// Frames completed since reset.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    // === Save state ===

    #[must_use]
    pub fn save(&self) -> PpuState {
        PpuState {
            nametable_ram: self.nametable_ram.clone(),
            palette_ram: self.palette_ram.to_vec(),
            oam: self.oam.clone(),
            ctrl: self.ctrl,
            mask: self.mask,
            oam_addr: self.oam_addr,
            register: self.register,
            sprite_zero_hit: self.sprite_zero_hit,
            sprite_overflow: self.sprite_overflow,
            v: self.v,
            t: self.t,
            fine_x: self.fine_x,
            w: self.w,
            read_buffer: self.read_buffer,
            scanline: self.scanline,
            dot: self.dot,
            frame: self.frame,
            frame_odd: self.frame_odd,
            nametable_byte: self.nametable_byte,
            attribute_byte: self.attribute_byte,
            pattern_lo: self.pattern_lo,
            pattern_hi: self.pattern_hi,
            tile_data: self.tile_data,
            sprite_count: self.sprite_count,
            sprite_patterns: self.sprite_patterns,
            sprite_positions: self.sprite_positions,
            sprite_behind: self.sprite_behind,
            sprite_indexes: self.sprite_indexes,
            nmi_occurred: self.nmi_occurred,
            nmi_output: self.nmi_output,
            nmi_previous: self.nmi_previous,
            nmi_delay: self.nmi_delay,
            nmi_pending: self.nmi_pending,
            framebuffer: self.framebuffer.clone(),
        }
    }

    /// Replace the whole PPU state. Short memory vectors are zero-filled.
    pub fn load(&mut self, state: &PpuState) {
        copy_padded(&mut self.nametable_ram, &state.nametable_ram);
        copy_padded(&mut self.palette_ram, &state.palette_ram);
        copy_padded(&mut self.oam, &state.oam);
        copy_padded(&mut self.framebuffer, &state.framebuffer);
        self.ctrl = state.ctrl;
        self.mask = state.mask;
        self.oam_addr = state.oam_addr;
        self.register = state.register;
        self.sprite_zero_hit = state.sprite_zero_hit;
        self.sprite_overflow = state.sprite_overflow;
        self.v = state.v & 0x7FFF;
        self.t = state.t & 0x7FFF;
        self.fine_x = state.fine_x & 0x07;
        self.w = state.w;
        self.read_buffer = state.read_buffer;
        self.scanline = state.scanline.min(PRE_RENDER);
        self.dot = state.dot.min(340);
        self.frame = state.frame;
        self.frame_odd = state.frame_odd;
        self.nametable_byte = state.nametable_byte;
        self.attribute_byte = state.attribute_byte;
        self.pattern_lo = state.pattern_lo;
        self.pattern_hi = state.pattern_hi;
        self.tile_data = state.tile_data;
        self.sprite_count = state.sprite_count.min(8);
        self.sprite_patterns = state.sprite_patterns;
        self.sprite_positions = state.sprite_positions;
        self.sprite_behind = state.sprite_behind;
        self.sprite_indexes = state.sprite_indexes;
        self.nmi_occurred = state.nmi_occurred;
        self.nmi_output = state.nmi_output;
        self.nmi_previous = state.nmi_previous;
        self.nmi_delay = state.nmi_delay;
        self.nmi_pending = state.nmi_pending;
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

/// Palette RAM index; $3F10/$3F14/$3F18/$3F1C alias $3F00/$3F04/$3F08/$3F0C.
fn palette_index(addr: u16) -> usize {
    let mut a = addr & 0x1F;
    if a >= 0x10 && a % 4 == 0 {
        a -= 0x10;
    }
    a as usize
}

fn copy_padded<T: Copy + Default>(dst: &mut [T], src: &[T]) {
    for (i, slot) in dst.iter_mut().enumerate() {
        *slot = src.get(i).copied().unwrap_or_default();
    }
}

impl Observable for Ppu {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "scanline" => Some(self.scanline.into()),
            "dot" => Some(self.dot.into()),
            "frame" => Some(self.frame.into()),
            "ctrl" => Some(self.ctrl.into()),
            "mask" => Some(self.mask.into()),
            "status" => Some(self.status().into()),
            "oam_addr" => Some(self.oam_addr.into()),
            "v" => Some(self.v.into()),
            "t" => Some(self.t.into()),
            "fine_x" => Some(self.fine_x.into()),
            "w" => Some(self.w.into()),
            "sprite_count" => Some(self.sprite_count.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "scanline",
            "dot",
            "frame",
            "ctrl",
            "mask",
            "status",
            "oam_addr",
            "v",
            "t",
            "fine_x",
            "w",
            "sprite_count",
        ]
    }
}
