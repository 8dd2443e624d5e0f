//! Ricoh 2A03 audio processing unit.
//!
//! Two pulse channels, a triangle, a noise generator, and a delta
//! modulation channel, sequenced by the frame counter and mixed through
//! the non-linear lookup tables. [`Apu::tick`] runs one CPU cycle; mixed
//! samples are averaged down to the configured output rate, filtered, and
//! collected until [`Apu::take_buffer`] drains them.
//!
//! The DMC cannot reach memory on its own. When it needs a sample byte it
//! reports the address through [`Apu::dmc_dma_address`] and waits for the
//! driver to call [`Apu::receive_dma_byte`].

mod apu;
mod channels;
mod dmc;
mod mixer;
mod tables;
mod units;

pub use apu::{Apu, ApuState, FrameMode};
pub use channels::{Noise, Pulse, Triangle};
pub use dmc::Dmc;
pub use mixer::{FilterChain, FirstOrderFilter};
pub use units::{Envelope, LengthCounter, Sweep};

/// NTSC CPU clock in Hz.
pub const CPU_HZ: u32 = 1_789_773;
