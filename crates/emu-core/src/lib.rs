//! Shared traits for the NES chip crates.
//!
//! Chips never own each other. The CPU reaches everything through a [`Bus`]
//! handed to it for the duration of a step, and every chip exposes its
//! internal state through [`Observable`] for debugging and tests.

mod bus;
mod observable;

pub use bus::{Bus, FlatBus};
pub use observable::{Observable, Value};
