//! Non-linear mixer tables and the output filter chain.

use std::f32::consts::PI;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Pulse mix indexed by `pulse1 + pulse2`.
pub(crate) static PULSE_TABLE: LazyLock<[f32; 31]> = LazyLock::new(|| {
    let mut table = [0.0; 31];
    for (i, slot) in table.iter_mut().enumerate().skip(1) {
        *slot = 95.52 / (8128.0 / i as f32 + 100.0);
    }
    table
});

/// Triangle/noise/DMC mix indexed by `3 * triangle + 2 * noise + dmc`.
pub(crate) static TND_TABLE: LazyLock<[f32; 203]> = LazyLock::new(|| {
    let mut table = [0.0; 203];
    for (i, slot) in table.iter_mut().enumerate().skip(1) {
        *slot = 163.67 / (24329.0 / i as f32 + 100.0);
    }
    table
});

/// Combine raw channel levels into one sample.
pub(crate) fn mix(pulse1: u8, pulse2: u8, triangle: u8, noise: u8, dmc: u8) -> f32 {
    let pulse = PULSE_TABLE[usize::from(pulse1) + usize::from(pulse2)];
    let tnd = TND_TABLE[3 * usize::from(triangle) + 2 * usize::from(noise) + usize::from(dmc)];
    pulse + tnd
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// First-order IIR section: `y = b0*x + b1*x' - a1*y'`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FirstOrderFilter {
    b0: f32,
    b1: f32,
    a1: f32,
    prev_x: f32,
    prev_y: f32,
}

impl FirstOrderFilter {
    #[must_use]
    pub fn low_pass(sample_rate: f32, cutoff: f32) -> Self {
        let c = sample_rate / PI / cutoff;
        let a0i = 1.0 / (1.0 + c);
        Self {
            b0: a0i,
            b1: a0i,
            a1: (1.0 - c) * a0i,
            prev_x: 0.0,
            prev_y: 0.0,
        }
    }

    #[must_use]
    pub fn high_pass(sample_rate: f32, cutoff: f32) -> Self {
        let c = sample_rate / PI / cutoff;
        let a0i = 1.0 / (1.0 + c);
        Self {
            b0: c * a0i,
            b1: -c * a0i,
            a1: (1.0 - c) * a0i,
            prev_x: 0.0,
            prev_y: 0.0,
        }
    }

    pub fn step(&mut self, x: f32) -> f32 {
        let y = self.b0 * x + self.b1 * self.prev_x - self.a1 * self.prev_y;
        self.prev_x = x;
        self.prev_y = y;
        y
    }
}

/// High-pass 90 Hz, high-pass 440 Hz, low-pass 14 kHz, in that order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterChain {
    stages: [FirstOrderFilter; 3],
}

impl FilterChain {
    #[must_use]
    pub fn new(sample_rate: u32) -> Self {
        let sr = sample_rate as f32;
        Self {
            stages: [
                FirstOrderFilter::high_pass(sr, 90.0),
                FirstOrderFilter::high_pass(sr, 440.0),
                FirstOrderFilter::low_pass(sr, 14_000.0),
            ],
        }
    }

    pub fn step(&mut self, x: f32) -> f32 {
        self.stages.iter_mut().fold(x, |acc, f| f.step(acc))
    }
}
