//! Mel spectrogram → PNG heat map.

use std::path::Path;

use anyhow::{Context, Result};
use gc_audio::Spectrogram;
use image::{Rgb, RgbImage};
use ndarray::ArrayView2;

/// Pixels per spectrogram cell, horizontally and vertically.
pub const CELL_SIZE: u32 = 4;

// Dark purple → red → pale yellow, evenly spaced.
const RAMP: [[u8; 3]; 5] = [
    [0, 0, 4],
    [81, 18, 124],
    [183, 55, 121],
    [252, 137, 97],
    [252, 253, 191],
];

/// Map `t ∈ [0, 1]` onto the colour ramp.
fn ramp(t: f32) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0) * (RAMP.len() - 1) as f32;
    let lo = (t.floor() as usize).min(RAMP.len() - 2);
    let frac = t - lo as f32;
    let (a, b) = (RAMP[lo], RAMP[lo + 1]);
    let mix = |i: usize| {
        let (from, to) = (f32::from(a[i]), f32::from(b[i]));
        (from + (to - from) * frac).round() as u8
    };
    Rgb([mix(0), mix(1), mix(2)])
}

/// Normalise to `[0, 1]` over the value range. A flat input maps to 0.
fn normalise(values: ArrayView2<'_, f32>) -> impl Fn(f32) -> f32 {
    let (min, max) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let span = max - min;
    move |v| {
        if span > 0.0 && span.is_finite() {
            (v - min) / span
        } else {
            0.0
        }
    }
}

/// Rasterise a `(bands, frames)` spectrogram. Time runs left to right and
/// the lowest mel band is drawn at the bottom.
///
/// # Errors
/// Returns an error if the image dimensions overflow `u32`.
pub fn to_image(spectrogram: &Spectrogram) -> Result<RgbImage> {
    let values = spectrogram.values();
    let (bands, frames) = values.dim();
    let width = u32::try_from(frames)
        .ok()
        .and_then(|f| f.checked_mul(CELL_SIZE))
        .context("Spectrogramme trop large")?;
    let height = u32::try_from(bands)
        .ok()
        .and_then(|b| b.checked_mul(CELL_SIZE))
        .context("Spectrogramme trop haut")?;

    let norm = normalise(values);
    Ok(RgbImage::from_fn(width, height, |x, y| {
        let frame = (x / CELL_SIZE) as usize;
        let band = bands - 1 - (y / CELL_SIZE) as usize;
        ramp(norm(values[[band, frame]]))
    }))
}

/// Render `spectrogram` to a PNG file at `path`.
///
/// # Errors
/// Returns an error if the image cannot be built or written.
pub fn write_png(spectrogram: &Spectrogram, path: &Path) -> Result<()> {
    let img = to_image(spectrogram)?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Impossible d'écrire {}", path.display()))?;
    log::info!(
        "Spectrogramme {}×{} ({}) écrit dans {}",
        img.width(),
        img.height(),
        spectrogram.scale(),
        path.display()
    );
    Ok(())
}
