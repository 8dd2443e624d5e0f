//! NES bus: CPU address routing.
//!
//! Implements `emu_core::Bus` for the NES. Routes CPU addresses to
//! internal RAM, PPU registers, APU, controllers, and cartridge.

use emu_core::Bus;
use nes_cartridge::Mapper;
use ricoh_apu_2a03::Apu;
use ricoh_ppu_2c02::Ppu;
use serde::{Deserialize, Serialize};

use crate::controller::Controller;

/// Saved RAM and controller state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusState {
    pub ram: Vec<u8>,
    pub controller1: Controller,
    pub controller2: Controller,
}

/// The NES bus, implementing `emu_core::Bus`.
pub struct NesBus {
    /// 2K internal RAM ($0000-$07FF, mirrored to $1FFF).
    pub ram: [u8; 2048],
    pub ppu: Ppu,
    pub apu: Apu,
    pub mapper: Mapper,
    /// Controller 1 ($4016).
    pub controller1: Controller,
    /// Controller 2 ($4017 reads).
    pub controller2: Controller,
    /// Page written to $4014, waiting for the driver to run the DMA.
    pub oam_dma_page: Option<u8>,
}

impl NesBus {
    #[must_use]
    pub fn new(mapper: Mapper, sample_rate: u32) -> Self {
        Self {
            ram: [0; 2048],
            ppu: Ppu::new(),
            apu: Apu::new(sample_rate),
            mapper,
            controller1: Controller::new(),
            controller2: Controller::new(),
            oam_dma_page: None,
        }
    }

    /// Peek a byte from RAM without side effects.
    #[must_use]
    pub fn peek_ram(&self, addr: u16) -> u8 {
        self.ram[usize::from(addr & 0x07FF)]
    }

    #[must_use]
    pub fn save(&self) -> BusState {
        BusState {
            ram: self.ram.to_vec(),
            controller1: self.controller1.clone(),
            controller2: self.controller2.clone(),
        }
    }

    /// Replace RAM and controller state. A short RAM image is zero-filled.
    pub fn load(&mut self, state: &BusState) {
        let len = state.ram.len().min(self.ram.len());
        self.ram = [0; 2048];
        self.ram[..len].copy_from_slice(&state.ram[..len]);
        self.controller1 = state.controller1.clone();
        self.controller2 = state.controller2.clone();
        self.oam_dma_page = None;
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr & 0x07FF)],
            0x2000..=0x3FFF => self.ppu.cpu_read(addr & 0x0007, &mut self.mapper),
            0x4015 => self.apu.read(addr),
            0x4016 => self.controller1.read(),
            0x4017 => self.controller2.read(),
            // Write-only APU/DMA registers and the disabled test range
            0x4000..=0x401F => 0,
            0x4020..=0xFFFF => self.mapper.cpu_read(addr),
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[usize::from(addr & 0x07FF)] = value,
            0x2000..=0x3FFF => self.ppu.cpu_write(addr & 0x0007, value, &mut self.mapper),
            0x4014 => self.oam_dma_page = Some(value),
            0x4016 => {
                self.controller1.write(value);
                self.controller2.write(value);
            }
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, value),
            0x4018..=0x401F => {}
            0x4020..=0xFFFF => self.mapper.cpu_write(addr, value),
        }
    }
}
