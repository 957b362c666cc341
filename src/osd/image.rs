//! Conversion of a decoded bitmap into the engine's raw-overlay format:
//! 8-bit BGRA, row-major, stride = width * 4, no header.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::io::Write;

/// Writes `image` as a tightly packed BGRA byte buffer and returns its
/// dimensions for the `overlay-add` call. Fails only on I/O.
pub fn prepare_overlay_image(image: &DynamicImage, out: &mut impl Write) -> Result<(u32, u32)> {
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut buffer = Vec::with_capacity(width as usize * height as usize * 4);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        buffer.extend_from_slice(&[b, g, r, a]);
    }

    out.write_all(&buffer)
        .context("Failed to write overlay image buffer")?;
    out.flush().context("Failed to flush overlay image buffer")?;
    Ok((width, height))
}
