//! NES APU (Audio Processing Unit).
//!
//! The APU is ticked once per CPU cycle (~1.789 MHz NTSC). Pulse and
//! noise timers decrement every other CPU cycle. The triangle and DMC
//! timers decrement every CPU cycle. The frame counter divides CPU cycles
//! into quarter-frame and half-frame events for envelope, length counter,
//! linear counter, and sweep updates.

#![allow(clippy::cast_precision_loss)]

use emu_core::{Observable, Value};
use serde::{Deserialize, Serialize};

use crate::CPU_HZ;
use crate::channels::{Noise, Pulse, Triangle};
use crate::dmc::Dmc;
use crate::mixer::{FilterChain, mix};
use crate::tables::{FIVE_STEP_SEQUENCE, FOUR_STEP_SEQUENCE};

/// Frame counter mode, bit 7 of $4017.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameMode {
    /// 4 steps, frame IRQ on the last.
    #[default]
    FourStep,
    /// 5 steps, no IRQ.
    FiveStep,
}

/// Saved APU state. Samples waiting in the output buffer are not included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApuState {
    pub pulse1: Pulse,
    pub pulse2: Pulse,
    pub triangle: Triangle,
    pub noise: Noise,
    pub dmc: Dmc,
    pub frame_mode: FrameMode,
    pub frame_counter: u16,
    pub frame_step: u8,
    pub frame_irq_inhibit: bool,
    pub frame_irq_flag: bool,
    pub odd_cycle: bool,
    pub accumulator: f32,
    pub sample_count: u32,
    pub sample_clock: f32,
    pub filters: FilterChain,
}

/// NES APU.
pub struct Apu {
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,

    // Frame counter
    frame_mode: FrameMode,
    frame_counter: u16,
    frame_step: u8,
    frame_irq_inhibit: bool,
    frame_irq_flag: bool,

    /// Pulse and noise timers tick on odd CPU cycles.
    odd_cycle: bool,

    // Downsampling
    sample_rate: u32,
    cycles_per_sample: f32,
    accumulator: f32,
    sample_count: u32,
    sample_clock: f32,
    filters: FilterChain,
    buffer: Vec<f32>,
}

impl Apu {
    /// APU producing `sample_rate` samples per second of emulated time.
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1);
        Self {
            pulse1: Pulse::new(false),
            pulse2: Pulse::new(true),
            triangle: Triangle::default(),
            noise: Noise::default(),
            dmc: Dmc::default(),
            frame_mode: FrameMode::FourStep,
            frame_counter: 0,
            frame_step: 0,
            frame_irq_inhibit: false,
            frame_irq_flag: false,
            odd_cycle: false,
            sample_rate,
            cycles_per_sample: CPU_HZ as f32 / sample_rate as f32,
            accumulator: 0.0,
            sample_count: 0,
            sample_clock: 0.0,
            filters: FilterChain::new(sample_rate),
            buffer: Vec::with_capacity(sample_rate as usize / 50 + 1),
        }
    }

    /// Output sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn frame_mode(&self) -> FrameMode {
        self.frame_mode
    }

    /// Read an APU register ($4015 is the only readable APU register).
    pub fn read(&mut self, addr: u16) -> u8 {
        if addr != 0x4015 {
            return 0;
        }
        let status = self.status();
        // Reading $4015 clears the frame IRQ flag
        self.frame_irq_flag = false;
        status
    }

    fn status(&self) -> u8 {
        let mut status = 0u8;
        if self.pulse1.length.active() {
            status |= 0x01;
        }
        if self.pulse2.length.active() {
            status |= 0x02;
        }
        if self.triangle.length.active() {
            status |= 0x04;
        }
        if self.noise.length.active() {
            status |= 0x08;
        }
        if self.dmc.active() {
            status |= 0x10;
        }
        if self.frame_irq_flag {
            status |= 0x40;
        }
        if self.dmc.irq_flag {
            status |= 0x80;
        }
        status
    }

    /// Write an APU register ($4000-$4013, $4015, $4017).
    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x4000..=0x4003 => self.pulse1.write(addr & 3, value),
            0x4004..=0x4007 => self.pulse2.write(addr & 3, value),
            0x4008..=0x400B => self.triangle.write(addr & 3, value),
            0x400C..=0x400F => self.noise.write(addr & 3, value),
            0x4010..=0x4013 => self.dmc.write(addr & 3, value),

            // $4015 - channel enables
            0x4015 => {
                self.pulse1.length.set_enabled(value & 0x01 != 0);
                self.pulse2.length.set_enabled(value & 0x02 != 0);
                self.triangle.length.set_enabled(value & 0x04 != 0);
                self.noise.length.set_enabled(value & 0x08 != 0);
                self.dmc.set_enabled(value & 0x10 != 0);
            }

            // $4017 - frame counter
            0x4017 => {
                self.frame_mode = if value & 0x80 != 0 {
                    FrameMode::FiveStep
                } else {
                    FrameMode::FourStep
                };
                self.frame_irq_inhibit = value & 0x40 != 0;
                if self.frame_irq_inhibit {
                    self.frame_irq_flag = false;
                }
                self.frame_counter = 0;
                self.frame_step = 0;
                log::debug!(
                    "frame counter {:?}, IRQ {}",
                    self.frame_mode,
                    if self.frame_irq_inhibit { "inhibited" } else { "enabled" }
                );
                // 5-step mode clocks every unit immediately
                if self.frame_mode == FrameMode::FiveStep {
                    self.clock_quarter_frame();
                    self.clock_half_frame();
                }
            }

            _ => {}
        }
    }

    /// Tick the APU one CPU cycle.
    pub fn tick(&mut self) {
        self.triangle.clock_timer();

        if self.odd_cycle {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
            self.noise.clock_timer();
        }
        self.odd_cycle = !self.odd_cycle;

        self.dmc.tick();
        self.clock_frame_counter();

        self.accumulator += self.output();
        self.sample_count += 1;
        self.sample_clock += 1.0;

        if self.sample_clock >= self.cycles_per_sample {
            self.sample_clock -= self.cycles_per_sample;
            let average = self.accumulator / self.sample_count as f32;
            let filtered = self.filters.step(average);
            self.buffer.push(filtered);
            self.accumulator = 0.0;
            self.sample_count = 0;
        }
    }

    fn clock_frame_counter(&mut self) {
        self.frame_counter += 1;

        match self.frame_mode {
            FrameMode::FourStep => {
                if self.frame_counter < FOUR_STEP_SEQUENCE[self.frame_step as usize] {
                    return;
                }
                match self.frame_step {
                    0 | 2 => self.clock_quarter_frame(),
                    1 => {
                        self.clock_quarter_frame();
                        self.clock_half_frame();
                    }
                    _ => {
                        self.clock_quarter_frame();
                        self.clock_half_frame();
                        if !self.frame_irq_inhibit {
                            self.frame_irq_flag = true;
                        }
                        self.frame_counter = 0;
                    }
                }
                self.frame_step = (self.frame_step + 1) % 4;
            }
            FrameMode::FiveStep => {
                if self.frame_counter < FIVE_STEP_SEQUENCE[self.frame_step as usize] {
                    return;
                }
                match self.frame_step {
                    0 | 2 => self.clock_quarter_frame(),
                    1 => {
                        self.clock_quarter_frame();
                        self.clock_half_frame();
                    }
                    3 => {}
                    _ => {
                        self.clock_quarter_frame();
                        self.clock_half_frame();
                        self.frame_counter = 0;
                    }
                }
                self.frame_step = (self.frame_step + 1) % 5;
            }
        }
    }

    /// Quarter-frame: clock envelopes and triangle linear counter.
    fn clock_quarter_frame(&mut self) {
        self.pulse1.envelope.clock();
        self.pulse2.envelope.clock();
        self.noise.envelope.clock();
        self.triangle.clock_linear_counter();
    }

    /// Half-frame: clock length counters and sweep units.
    fn clock_half_frame(&mut self) {
        self.pulse1.length.clock();
        self.pulse2.length.clock();
        self.triangle.length.clock();
        self.noise.length.clock();
        self.pulse1.clock_sweep();
        self.pulse2.clock_sweep();
    }

    /// Unfiltered mixer output for the current cycle.
    #[must_use]
    pub fn output(&self) -> f32 {
        mix(
            self.pulse1.output(),
            self.pulse2.output(),
            self.triangle.output(),
            self.noise.output(),
            self.dmc.output_level,
        )
    }

    /// Frame counter IRQ line. The DMC IRQ flag is only reported in $4015.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.frame_irq_flag
    }

    /// Address the DMC wants read, if a sample fetch is pending.
    #[must_use]
    pub fn dmc_dma_address(&self) -> Option<u16> {
        self.dmc.dma_address()
    }

    /// Hand the DMC the byte read from [`Apu::dmc_dma_address`].
    pub fn receive_dma_byte(&mut self, byte: u8) {
        self.dmc.receive_dma_byte(byte);
    }

    /// Take the audio output buffer (drains it).
    pub fn take_buffer(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.buffer)
    }

    /// Number of audio samples pending in the buffer.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    // -----------------------------------------------------------------------
    // Save state
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn save(&self) -> ApuState {
        ApuState {
            pulse1: self.pulse1.clone(),
            pulse2: self.pulse2.clone(),
            triangle: self.triangle.clone(),
            noise: self.noise.clone(),
            dmc: self.dmc.clone(),
            frame_mode: self.frame_mode,
            frame_counter: self.frame_counter,
            frame_step: self.frame_step,
            frame_irq_inhibit: self.frame_irq_inhibit,
            frame_irq_flag: self.frame_irq_flag,
            odd_cycle: self.odd_cycle,
            accumulator: self.accumulator,
            sample_count: self.sample_count,
            sample_clock: self.sample_clock,
            filters: self.filters.clone(),
        }
    }

    /// Replace the whole APU state. The output buffer is cleared.
    ///
    /// Fields are masked to their hardware widths so a hand-edited state
    /// cannot index past the sequencer and mixer tables.
    pub fn load(&mut self, state: &ApuState) {
        self.pulse1.load(&state.pulse1);
        self.pulse2.load(&state.pulse2);
        self.triangle.load(&state.triangle);
        self.noise.load(&state.noise);
        self.dmc.load(&state.dmc);
        self.frame_mode = state.frame_mode;
        let sequence = match state.frame_mode {
            FrameMode::FourStep => &FOUR_STEP_SEQUENCE[..],
            FrameMode::FiveStep => &FIVE_STEP_SEQUENCE[..],
        };
        self.frame_step = state.frame_step % sequence.len() as u8;
        self.frame_counter = state
            .frame_counter
            .min(sequence[usize::from(self.frame_step)]);
        self.frame_irq_inhibit = state.frame_irq_inhibit;
        self.frame_irq_flag = state.frame_irq_flag;
        self.odd_cycle = state.odd_cycle;
        self.accumulator = finite_or_zero(state.accumulator);
        self.sample_count = state.sample_count.min(self.cycles_per_sample.ceil() as u32);
        self.sample_clock = finite_or_zero(state.sample_clock).clamp(0.0, self.cycles_per_sample);
        self.filters = state.filters.clone();
        self.buffer.clear();
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new(48_000)
    }
}

impl Observable for Apu {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pulse1.period" => Some(self.pulse1.timer_period.into()),
            "pulse1.length" => Some(self.pulse1.length.counter.into()),
            "pulse1.envelope" => Some(self.pulse1.envelope.output().into()),
            "pulse1.duty" => Some(self.pulse1.duty.into()),
            "pulse2.period" => Some(self.pulse2.timer_period.into()),
            "pulse2.length" => Some(self.pulse2.length.counter.into()),
            "pulse2.envelope" => Some(self.pulse2.envelope.output().into()),
            "pulse2.duty" => Some(self.pulse2.duty.into()),
            "triangle.period" => Some(self.triangle.timer_period.into()),
            "triangle.length" => Some(self.triangle.length.counter.into()),
            "triangle.linear" => Some(self.triangle.linear_counter.into()),
            "noise.period" => Some(self.noise.timer_period.into()),
            "noise.length" => Some(self.noise.length.counter.into()),
            "noise.envelope" => Some(self.noise.envelope.output().into()),
            "dmc.level" => Some(self.dmc.output_level.into()),
            "dmc.address" => Some(self.dmc.current_address.into()),
            "dmc.remaining" => Some(self.dmc.bytes_remaining.into()),
            "frame_counter.mode" => Some(
                match self.frame_mode {
                    FrameMode::FourStep => "4-step",
                    FrameMode::FiveStep => "5-step",
                }
                .into(),
            ),
            "frame_counter.step" => Some(self.frame_step.into()),
            "status" => Some(self.status().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pulse1.period",
            "pulse1.length",
            "pulse1.envelope",
            "pulse1.duty",
            "pulse2.period",
            "pulse2.length",
            "pulse2.envelope",
            "pulse2.duty",
            "triangle.period",
            "triangle.length",
            "triangle.linear",
            "noise.period",
            "noise.length",
            "noise.envelope",
            "dmc.level",
            "dmc.address",
            "dmc.remaining",
            "frame_counter.mode",
            "frame_counter.step",
            "status",
        ]
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_by_default() {
        let mut apu = Apu::default();
        for _ in 0..10_000 {
            apu.tick();
        }
        let buf = apu.take_buffer();
        assert!(!buf.is_empty());
        for &s in &buf {
            assert!(s.abs() < 1e-6, "silent APU produced {s}");
        }
    }

    #[test]
    fn sample_rate_is_honoured() {
        let mut apu = Apu::new(44_100);
        for _ in 0..CPU_HZ {
            apu.tick();
        }
        let n = apu.buffer_len();
        assert!((44_099..=44_101).contains(&n), "got {n} samples");
    }

    #[test]
    fn pulse_produces_audio() {
        let mut apu = Apu::default();
        apu.write(0x4015, 0x01);
        apu.write(0x4000, 0xBF); // duty 50%, constant volume 15
        apu.write(0x4002, 0xFD);
        apu.write(0x4003, 0x08); // length index 1

        for _ in 0..10_000 {
            apu.tick();
        }

        let buf = apu.take_buffer();
        let min = buf.iter().copied().fold(f32::INFINITY, f32::min);
        let max = buf.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(max - min > 0.01, "min={min} max={max}");
    }

    #[test]
    fn status_register_reflects_length() {
        let mut apu = Apu::default();
        apu.write(0x4015, 0x05);
        apu.write(0x4003, 0x08);
        apu.write(0x4008, 0xFF);
        apu.write(0x400B, 0x08);

        let status = apu.read(0x4015);
        assert_eq!(status & 0x0F, 0x05);
    }

    #[test]
    fn disable_channel_clears_length() {
        let mut apu = Apu::default();
        apu.write(0x4015, 0x01);
        apu.write(0x4003, 0x08);
        assert_ne!(apu.read(0x4015) & 0x01, 0);
        apu.write(0x4015, 0x00);
        assert_eq!(apu.read(0x4015) & 0x01, 0);
    }

    #[test]
    fn frame_irq_in_four_step_mode() {
        let mut apu = Apu::default();
        apu.write(0x4017, 0x00);
        for _ in 0..29_828 {
            apu.tick();
        }
        assert!(!apu.irq_pending());
        apu.tick();
        assert!(apu.irq_pending());

        assert_ne!(apu.read(0x4015) & 0x40, 0);
        assert!(!apu.irq_pending(), "reading $4015 acknowledges");
    }

    #[test]
    fn inhibit_blocks_and_clears_frame_irq() {
        let mut apu = Apu::default();
        for _ in 0..29_829 {
            apu.tick();
        }
        assert!(apu.irq_pending());
        apu.write(0x4017, 0x40);
        assert!(!apu.irq_pending());
        for _ in 0..40_000 {
            apu.tick();
        }
        assert!(!apu.irq_pending());
    }

    #[test]
    fn no_irq_in_five_step_mode() {
        let mut apu = Apu::default();
        apu.write(0x4017, 0x80);
        for _ in 0..80_000 {
            apu.tick();
        }
        assert!(!apu.irq_pending());
    }

    #[test]
    fn dmc_irq_flag_is_not_an_irq_line() {
        let mut apu = Apu::default();
        apu.write(0x4017, 0x40);
        apu.write(0x4010, 0x80);
        apu.write(0x4015, 0x10);
        let addr = apu.dmc_dma_address();
        assert_eq!(addr, Some(0xC000));
        apu.receive_dma_byte(0x00);
        assert!(!apu.irq_pending());
        assert_ne!(apu.read(0x4015) & 0x80, 0);
    }

    #[test]
    fn save_load_round_trip_reproduces_audio() {
        let mut apu = Apu::default();
        apu.write(0x4015, 0x0F);
        apu.write(0x4000, 0x9F);
        apu.write(0x4002, 0x40);
        apu.write(0x4003, 0x08);
        apu.write(0x400C, 0x3F);
        apu.write(0x400E, 0x03);
        apu.write(0x400F, 0x08);
        for _ in 0..5_000 {
            apu.tick();
        }
        apu.take_buffer();

        let state = apu.save();
        let json = serde_json::to_string(&state).expect("serialize");
        let restored: ApuState = serde_json::from_str(&json).expect("deserialize");
        let mut other = Apu::default();
        other.load(&restored);

        for _ in 0..20_000 {
            apu.tick();
            other.tick();
        }
        assert_eq!(apu.take_buffer(), other.take_buffer());
    }

    #[test]
    fn query_reports_channels() {
        let mut apu = Apu::default();
        apu.write(0x4002, 0x34);
        apu.write(0x4003, 0x02);
        assert_eq!(apu.query("pulse1.period"), Some(Value::U16(0x234)));
        assert_eq!(apu.query("frame_counter.mode"), Some(Value::Str("4-step")));
    }

    #[test]
    fn load_masks_out_of_range_fields() {
        let mut apu = Apu::default();
        apu.write(0x4015, 0x1F);
        apu.write(0x4000, 0xBF);
        apu.write(0x4003, 0x08);
        apu.write(0x4008, 0xFF);
        apu.write(0x400B, 0x08);

        let mut json = serde_json::to_value(apu.save()).expect("serialize");
        json["pulse1"]["duty"] = 9.into();
        json["pulse1"]["duty_pos"] = 200.into();
        json["pulse2"]["envelope"]["volume"] = 255.into();
        json["pulse2"]["envelope"]["constant_volume"] = true.into();
        json["pulse2"]["sweep"]["shift"] = 40.into();
        json["triangle"]["sequence_pos"] = 77.into();
        json["noise"]["shift_register"] = 0.into();
        json["dmc"]["bits_remaining"] = 0.into();
        json["dmc"]["output_level"] = 255.into();
        json["frame_counter"] = 65_535.into();
        json["frame_step"] = 9.into();
        let state: ApuState = serde_json::from_value(json).expect("deserialize");

        let mut other = Apu::default();
        other.load(&state);
        assert_eq!(other.query("pulse1.duty"), Some(Value::U8(1)));
        assert_eq!(other.query("pulse2.envelope"), Some(Value::U8(15)));
        assert_eq!(other.query("dmc.level"), Some(Value::U8(0x7F)));
        assert_eq!(other.query("frame_counter.step"), Some(Value::U8(1)));

        for _ in 0..60_000 {
            other.tick();
        }
        assert!(other.take_buffer().iter().all(|s| s.is_finite()));
    }

    #[test]
    fn load_keeps_valid_state_unchanged() {
        let mut apu = Apu::default();
        apu.write(0x4015, 0x1F);
        apu.write(0x4001, 0x8A);
        apu.write(0x4002, 0x80);
        apu.write(0x4003, 0x09);
        apu.write(0x400E, 0x84);
        apu.write(0x400F, 0x08);
        for _ in 0..12_345 {
            apu.tick();
        }
        let state = apu.save();
        let mut other = Apu::default();
        other.load(&state);
        assert_eq!(other.save(), state);
    }
}
