//! Top-level NES system.
//!
//! The CPU is stepped one instruction at a time; the rest of the machine
//! catches up afterwards. For every CPU cycle the instruction took, the APU
//! ticks once and the PPU three times (NTSC 3:1 ratio), with a mapper step
//! after each PPU dot.
//!
//! One frame = 341 PPU dots × 262 scanlines = 89,342 PPU cycles.

use emu_core::{Bus, Observable, Value};
use mos_6502::{CpuState, Interrupt, Mos6502};
use nes_cartridge::{Cartridge, Mapper, MapperState};
use ricoh_apu_2a03::ApuState;
use ricoh_ppu_2c02::{FB_HEIGHT, FB_WIDTH, PpuState};
use serde::{Deserialize, Serialize};

use crate::bus::{BusState, NesBus};
use crate::config::NesConfig;
use crate::error::NesError;

/// OAM DMA halts the CPU for 513 cycles, one more on an odd cycle.
const OAM_DMA_CYCLES: u32 = 513;
/// CPU cycles stolen by one DMC sample fetch.
const DMC_DMA_CYCLES: u32 = 4;

/// Whole-machine snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NesState {
    pub cpu: CpuState,
    pub ppu: PpuState,
    pub apu: ApuState,
    pub mapper: MapperState,
    pub bus: BusState,
}

/// NES system.
pub struct Nes {
    cpu: Mos6502,
    bus: NesBus,
}

impl Nes {
    /// Create a new NES from the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM data is invalid.
    pub fn new(config: &NesConfig) -> Result<Self, NesError> {
        let mapper = Mapper::from_ines(&config.rom_data)?;
        Ok(Self::with_mapper(mapper, config.sample_rate))
    }

    /// Create a NES around an already-built cartridge.
    ///
    /// # Errors
    ///
    /// Returns an error if the cartridge's mapper is unsupported.
    pub fn from_cartridge(cart: Cartridge, sample_rate: u32) -> Result<Self, NesError> {
        Ok(Self::with_mapper(Mapper::new(cart)?, sample_rate))
    }

    fn with_mapper(mapper: Mapper, sample_rate: u32) -> Self {
        let mut bus = NesBus::new(mapper, sample_rate);
        let mut cpu = Mos6502::new();
        cpu.reset(&mut bus);
        Self { cpu, bus }
    }

    /// Press the reset button. The CPU takes the reset vector on its next
    /// step; the PPU restarts at the end of post-render.
    pub fn reset(&mut self) {
        log::info!("reset");
        self.cpu.request_interrupt(Interrupt::Reset);
        self.bus.ppu.reset();
        self.bus.apu.write(0x4015, 0x00);
    }

    /// One CPU step, then the matching APU, PPU and mapper cycles.
    ///
    /// Returns the CPU cycles consumed.
    pub fn run(&mut self) -> u32 {
        let cycles = self.cpu.step(&mut self.bus);
        self.run_oam_dma();

        for _ in 0..cycles {
            self.bus.apu.tick();
            self.run_dmc_dma();
        }

        for _ in 0..cycles * 3 {
            self.bus.ppu.tick(&mut self.bus.mapper);
            let ppu = &self.bus.ppu;
            self.bus
                .mapper
                .step(ppu.scanline(), ppu.dot(), ppu.rendering_enabled());
            if self.bus.ppu.take_nmi() {
                self.cpu.request_interrupt(Interrupt::Nmi);
            }
        }

        // IRQ lines are level-sensitive: re-assert while either source holds
        if self.bus.apu.irq_pending() || self.bus.mapper.irq_pending() {
            self.cpu.request_interrupt(Interrupt::Irq);
        }

        cycles
    }

    /// Run until the PPU finishes the current frame.
    ///
    /// Returns the CPU cycles executed.
    pub fn run_frame(&mut self) -> u64 {
        let frame = self.bus.ppu.frame();
        let mut cycles = 0u64;
        while self.bus.ppu.frame() == frame {
            cycles += u64::from(self.run());
        }
        cycles
    }

    /// Copy the page latched by a $4014 write into OAM and stall the CPU.
    fn run_oam_dma(&mut self) {
        let Some(page) = self.bus.oam_dma_page.take() else {
            return;
        };
        let base = u16::from(page) << 8;
        let oam_addr = self.bus.ppu.oam_addr();
        for i in 0..=255u8 {
            let value = self.bus.read(base | u16::from(i));
            self.bus.ppu.write_oam(oam_addr.wrapping_add(i), value);
        }

        let stall = OAM_DMA_CYCLES + u32::from(self.cpu.cycles() % 2 == 1);
        self.cpu.add_stall(stall);
        log::trace!("OAM DMA from ${base:04X}, CPU stalled {stall} cycles");
    }

    /// Serve a pending DMC sample fetch.
    fn run_dmc_dma(&mut self) {
        let Some(addr) = self.bus.apu.dmc_dma_address() else {
            return;
        };
        let byte = self.bus.read(addr);
        self.bus.apu.receive_dma_byte(byte);
        self.cpu.add_stall(DMC_DMA_CYCLES);
        log::trace!("DMC DMA ${addr:04X} = ${byte:02X}");
    }

    /// Reference to the framebuffer (ARGB32, 256x240).
    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        self.bus.ppu.framebuffer()
    }

    #[must_use]
    pub fn framebuffer_width(&self) -> u32 {
        FB_WIDTH
    }

    #[must_use]
    pub fn framebuffer_height(&self) -> u32 {
        FB_HEIGHT
    }

    /// Take the audio samples produced so far (mono, filtered).
    pub fn take_audio(&mut self) -> Vec<f32> {
        self.bus.apu.take_buffer()
    }

    #[must_use]
    pub fn audio_len(&self) -> usize {
        self.bus.apu.buffer_len()
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.bus.apu.sample_rate()
    }

    /// Set the held buttons on controller `port` (0 or 1).
    pub fn set_buttons(&mut self, port: usize, buttons: u8) {
        match port {
            0 => self.bus.controller1.set_buttons(buttons),
            1 => self.bus.controller2.set_buttons(buttons),
            _ => log::warn!("no controller port {port}"),
        }
    }

    /// Battery-backed SRAM, if the cartridge has a battery.
    #[must_use]
    pub fn sram(&self) -> Option<&[u8]> {
        self.bus
            .mapper
            .cartridge()
            .has_battery()
            .then(|| self.bus.mapper.sram())
    }

    /// Restore SRAM from a battery save.
    pub fn set_sram(&mut self, data: &[u8]) {
        self.bus.mapper.set_sram(data);
    }

    /// Frames completed since power-on or reset.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.bus.ppu.frame()
    }

    #[must_use]
    pub fn cpu(&self) -> &Mos6502 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Mos6502 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }

    // -----------------------------------------------------------------------
    // Save state
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn save(&self) -> NesState {
        NesState {
            cpu: self.cpu.save(),
            ppu: self.bus.ppu.save(),
            apu: self.bus.apu.save(),
            mapper: self.bus.mapper.save(),
            bus: self.bus.save(),
        }
    }

    /// Replace the whole machine state.
    ///
    /// # Errors
    ///
    /// Fails without changing anything if the mapper state belongs to a
    /// different board or cartridge layout.
    pub fn load(&mut self, state: &NesState) -> Result<(), NesError> {
        self.bus.mapper.load(&state.mapper)?;
        self.cpu.load(&state.cpu);
        self.bus.ppu.load(&state.ppu);
        self.bus.apu.load(&state.apu);
        self.bus.load(&state.bus);
        Ok(())
    }
}

impl Observable for Nes {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("ppu.") {
            self.bus.ppu.query(rest)
        } else if let Some(rest) = path.strip_prefix("apu.") {
            self.bus.apu.query(rest)
        } else if let Some(rest) = path.strip_prefix("mapper.") {
            self.bus.mapper.query(rest)
        } else if let Some(rest) = path.strip_prefix("memory.") {
            let addr = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix('$'))
            {
                u16::from_str_radix(hex, 16).ok()
            } else {
                rest.parse().ok()
            };
            addr.map(|a| Value::U8(self.bus.peek_ram(a)))
        } else {
            match path {
                "frame_count" => Some(self.frame_count().into()),
                "controller1" => Some(self.bus.controller1.buttons().into()),
                "controller2" => Some(self.bus.controller2.buttons().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "cpu.<6502_paths>",
            "ppu.<2c02_paths>",
            "apu.<2a03_paths>",
            "mapper.<board_paths>",
            "memory.<address>",
            "frame_count",
            "controller1",
            "controller2",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nes_cartridge::Mirroring;

    /// 32K NROM: `program` at $8000, every vector pointing at it.
    fn make_nes(program: &[u8]) -> Nes {
        let mut prg = vec![0xEA; 32768];
        prg[..program.len()].copy_from_slice(program);
        for vector in [0x7FFA, 0x7FFC, 0x7FFE] {
            prg[vector] = 0x00;
            prg[vector + 1] = 0x80;
        }
        let cart = Cartridge::new(prg, Vec::new(), 0, Mirroring::Horizontal, false)
            .expect("cartridge");
        Nes::from_cartridge(cart, 48_000).expect("nes")
    }

    #[test]
    fn powers_on_at_reset_vector() {
        let nes = make_nes(&[]);
        assert_eq!(nes.query("cpu.pc"), Some(Value::U16(0x8000)));
    }

    #[test]
    fn ppu_runs_three_dots_per_cpu_cycle() {
        let mut nes = make_nes(&[]);
        let before = u32::from(nes.bus().ppu.dot()) + u32::from(nes.bus().ppu.scanline()) * 341;
        let cycles = nes.run();
        assert_eq!(cycles, 2);
        let after = u32::from(nes.bus().ppu.dot()) + u32::from(nes.bus().ppu.scanline()) * 341;
        // Starts at 240/340, wraps into line 241
        assert_eq!((after + 262 * 341 - before) % (262 * 341), 6);
    }

    #[test]
    fn adc_immediate_scenario() {
        // CLC; LDA #$FE; ADC #$03
        let mut nes = make_nes(&[0x18, 0xA9, 0xFE, 0x69, 0x03]);
        nes.run();
        nes.run();
        assert_eq!(nes.run(), 2);
        let regs = nes.cpu().regs;
        assert_eq!(regs.a, 0x01);
        assert_eq!(nes.query("cpu.flags.c"), Some(Value::Bool(true)));
        assert_eq!(nes.query("cpu.flags.v"), Some(Value::Bool(false)));
        assert_eq!(nes.query("cpu.flags.z"), Some(Value::Bool(false)));
        assert_eq!(nes.query("cpu.flags.n"), Some(Value::Bool(false)));
    }

    #[test]
    fn run_frame_covers_one_frame() {
        let mut nes = make_nes(&[]);
        nes.run_frame();
        let cycles = nes.run_frame();
        // 89342 dots / 3, give or take the instruction that crosses the edge
        assert!((29_770..=29_790).contains(&cycles), "{cycles}");
        assert_eq!(nes.frame_count(), 2);
    }

    #[test]
    fn reset_reloads_pc() {
        // NOP; JMP $9000
        let mut nes = make_nes(&[0xEA, 0x4C, 0x00, 0x90]);
        nes.run();
        nes.run();
        assert_eq!(nes.cpu().regs.pc, 0x9000);
        let sp = nes.cpu().regs.s;
        nes.reset();
        nes.run();
        // Reset handler is entered and its first NOP executed
        assert_eq!(nes.cpu().regs.pc, 0x8001);
        assert_eq!(nes.cpu().regs.s, sp.wrapping_sub(3));
    }

    #[test]
    fn sram_only_with_battery() {
        let nes = make_nes(&[]);
        assert!(nes.sram().is_none());
    }

    #[test]
    fn memory_query() {
        let mut nes = make_nes(&[]);
        nes.bus_mut().ram[0x10] = 0xAB;
        assert_eq!(nes.query("memory.0x0010"), Some(Value::U8(0xAB)));
        assert_eq!(nes.query("memory.$0810"), Some(Value::U8(0xAB)));
        assert_eq!(nes.query("memory.16"), Some(Value::U8(0xAB)));
    }
}
