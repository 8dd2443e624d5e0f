use thiserror::Error;

/// Failures while building a cartridge or restoring mapper state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartridgeError {
    #[error("invalid iNES magic (expected NES\\x1A)")]
    BadMagic,

    #[error("iNES image too short: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unsupported mapper: {0}")]
    UnsupportedMapper(u8),

    #[error("cartridge has no PRG ROM")]
    EmptyPrg,

    #[error("saved state does not match this cartridge")]
    StateMismatch,
}
