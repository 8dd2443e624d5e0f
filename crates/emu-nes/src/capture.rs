//! Headless capture: PNG screenshots, WAV audio and JSON save states.

use std::fs;
use std::io::BufWriter;
use std::path::Path;

use crate::{Nes, NesError, NesState};

/// Save the current framebuffer as a PNG file.
///
/// The framebuffer is ARGB32 (`u32` array). This converts to RGBA bytes
/// for the PNG encoder.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_screenshot(nes: &Nes, path: &Path) -> Result<(), NesError> {
    let file = fs::File::create(path)?;
    let mut encoder = png::Encoder::new(
        BufWriter::new(file),
        nes.framebuffer_width(),
        nes.framebuffer_height(),
    );
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&argb_to_rgba(nes.framebuffer()))?;
    Ok(())
}

fn argb_to_rgba(framebuffer: &[u32]) -> Vec<u8> {
    framebuffer
        .iter()
        .flat_map(|&pixel| {
            let [_, r, g, b] = pixel.to_be_bytes();
            [r, g, b, 0xFF]
        })
        .collect()
}

/// Write mono 32-bit float samples to a WAV file.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_wav(samples: &[f32], sample_rate: u32, path: &Path) -> Result<(), NesError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Write the machine state as JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_state(nes: &Nes, path: &Path) -> Result<(), NesError> {
    let file = fs::File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), &nes.save())?;
    Ok(())
}

/// Restore a machine state written by [`save_state`].
///
/// # Errors
///
/// Returns an error if the file is unreadable, not a state, or belongs to
/// another cartridge.
pub fn load_state(nes: &mut Nes, path: &Path) -> Result<(), NesError> {
    let data = fs::read(path)?;
    let state: NesState = serde_json::from_slice(&data)?;
    nes.load(&state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argb_pixels_become_opaque_rgba() {
        let rgba = argb_to_rgba(&[0xFF12_3456, 0x0000_00FF]);
        assert_eq!(rgba, [0x12, 0x34, 0x56, 0xFF, 0x00, 0x00, 0xFF, 0xFF]);
    }
}
