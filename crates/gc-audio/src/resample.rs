use std::f64::consts::PI;

/// Zero crossings of the sinc kernel on each side of the centre tap.
const ZERO_CROSSINGS: f64 = 16.0;

/// Band-limited resampling with a Hann-windowed sinc kernel.
///
/// Output length is `ceil(len × to / from)`. When downsampling, the kernel
/// cutoff is lowered to the target Nyquist so no aliasing folds back into the
/// mel bands. Deterministic: same input, same output, no internal state.
///
/// # Example
/// ```
/// use gc_audio::resample::resample;
/// let input = vec![0.0f32; 44100];
/// let output = resample(&input, 44100, 22050);
/// assert_eq!(output.len(), 22050);
/// ```
#[must_use]
pub fn resample(samples: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || samples.is_empty() || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let out_len = (samples.len() as u64 * u64::from(to)).div_ceil(u64::from(from)) as usize;
    let step = f64::from(from) / f64::from(to);
    let cutoff = (f64::from(to) / f64::from(from)).min(1.0);
    let half_width = ZERO_CROSSINGS / cutoff;
    let last = samples.len() as i64 - 1;

    (0..out_len)
        .map(|i| {
            let t = i as f64 * step;
            let lo = ((t - half_width).ceil() as i64).max(0);
            let hi = ((t + half_width).floor() as i64).min(last);
            let mut acc = 0.0f64;
            for j in lo..=hi {
                let x = t - j as f64;
                acc += f64::from(samples[j as usize]) * kernel(x, cutoff, half_width);
            }
            acc as f32
        })
        .collect()
}

/// Windowed sinc evaluated at distance `x` (input samples) from the centre.
fn kernel(x: f64, cutoff: f64, half_width: f64) -> f64 {
    let u = x / half_width;
    if u.abs() > 1.0 {
        return 0.0;
    }
    let window = 0.5 * (1.0 + (PI * u).cos());
    let arg = PI * cutoff * x;
    let sinc = if arg.abs() < 1e-12 { 1.0 } else { arg.sin() / arg };
    cutoff * sinc * window
}
