//! Headless NES runner.
//!
//! Loads an iNES image, runs it for a number of frames and optionally
//! writes a screenshot, the audio produced and a JSON save state.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use emu_nes::{DEFAULT_SAMPLE_RATE, Nes, NesConfig, NesError, capture};

#[derive(Parser, Debug)]
#[command(name = "emu-nes", about = "Run an NES ROM headless")]
struct Cli {
    /// iNES ROM file (.nes)
    #[arg(long)]
    rom: PathBuf,

    /// Frames to run
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Save a PNG screenshot of the last frame
    #[arg(long)]
    screenshot: Option<PathBuf>,

    /// Save the audio as a 32-bit float WAV
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Write a JSON save state after the run
    #[arg(long)]
    state: Option<PathBuf>,

    /// Restore a JSON save state before running
    #[arg(long)]
    load_state: Option<PathBuf>,

    /// Audio sample rate in Hz
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,
}

fn run(cli: &Cli) -> Result<(), NesError> {
    let config = NesConfig {
        rom_data: fs::read(&cli.rom)?,
        sample_rate: cli.sample_rate,
    };
    let mut nes = Nes::new(&config)?;

    if let Some(path) = &cli.load_state {
        capture::load_state(&mut nes, path)?;
        log::info!("state loaded from {}", path.display());
    }

    let mut audio = Vec::new();
    let mut cycles = 0u64;
    for _ in 0..cli.frames {
        cycles += nes.run_frame();
        audio.extend(nes.take_audio());
    }
    log::info!(
        "ran {} frames, {cycles} CPU cycles, {} samples",
        cli.frames,
        audio.len()
    );

    if let Some(path) = &cli.screenshot {
        capture::save_screenshot(&nes, path)?;
        log::info!("screenshot saved to {}", path.display());
    }
    if let Some(path) = &cli.wav {
        capture::save_wav(&audio, nes.sample_rate(), path)?;
        log::info!("audio saved to {}", path.display());
    }
    if let Some(path) = &cli.state {
        capture::save_state(&nes, path)?;
        log::info!("state saved to {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        log::error!("{e}");
        process::exit(1);
    }
}
