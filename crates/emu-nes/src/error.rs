use nes_cartridge::CartridgeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NesError {
    #[error("cartridge: {0}")]
    Cartridge(#[from] CartridgeError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("PNG encoding: {0}")]
    Png(#[from] png::EncodingError),

    #[error("WAV encoding: {0}")]
    Wav(#[from] hound::Error),

    #[error("save state: {0}")]
    State(#[from] serde_json::Error),
}
