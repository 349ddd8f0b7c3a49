use std::sync::Arc;

use gc_core::CoreError;
use ndarray::Array2;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::error::AudioError;

/// Short-time Fourier transform producing a power spectrogram.
///
/// Centered frames (the signal is zero-padded by `n_fft / 2` on each side),
/// periodic Hann window, power `|X|²` without normalisation. The plan and the
/// window are built once; buffers are allocated per call so `&self` methods
/// stay free of hidden state.
///
/// # Example
/// ```
/// use gc_audio::stft::Stft;
/// let stft = Stft::new(2048, 512).unwrap();
/// assert_eq!(stft.num_bins(), 1025);
/// assert_eq!(stft.num_frames(44100), 87);
/// ```
pub struct Stft {
    n_fft: usize,
    hop_length: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    /// Periodic Hann window coefficients.
    window: Vec<f32>,
}

impl Stft {
    /// Create a new STFT with the given window size and hop.
    ///
    /// # Errors
    /// Returns [`AudioError::Config`] if `n_fft` or `hop_length` is 0.
    pub fn new(n_fft: usize, hop_length: usize) -> Result<Self, AudioError> {
        if n_fft == 0 || hop_length == 0 {
            return Err(CoreError::Config(format!(
                "STFT invalide : n_fft={n_fft}, hop_length={hop_length}"
            ))
            .into());
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(n_fft);

        // Periodic Hann (denominator N, not N - 1)
        let window: Vec<f32> = (0..n_fft)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / n_fft as f32).cos())
            .collect();

        Ok(Self {
            n_fft,
            hop_length,
            plan,
            window,
        })
    }

    /// Frequency bins per frame (`n_fft / 2 + 1`).
    #[must_use]
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Frame count for a signal of `len` samples.
    #[must_use]
    pub fn num_frames(&self, len: usize) -> usize {
        1 + len / self.hop_length
    }

    /// FFT window size.
    #[must_use]
    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Power spectrogram of `samples`, shape `(num_bins, num_frames)`.
    ///
    /// # Errors
    /// Returns [`AudioError::Fft`] if the FFT backend rejects its buffers.
    pub fn power(&self, samples: &[f32]) -> Result<Array2<f32>, AudioError> {
        let pad = self.n_fft / 2;
        let frames = self.num_frames(samples.len());
        let mut out = Array2::<f32>::zeros((self.num_bins(), frames));

        let mut input = self.plan.make_input_vec();
        let mut spectrum: Vec<Complex<f32>> = self.plan.make_output_vec();
        let mut scratch = self.plan.make_scratch_vec();

        for frame in 0..frames {
            // Window start in the padded signal, mapped back to the original.
            let start = (frame * self.hop_length) as isize - pad as isize;
            for (i, slot) in input.iter_mut().enumerate() {
                let idx = start + i as isize;
                *slot = if idx >= 0 && (idx as usize) < samples.len() {
                    samples[idx as usize] * self.window[i]
                } else {
                    0.0
                };
            }

            self.plan
                .process_with_scratch(&mut input, &mut spectrum, &mut scratch)
                .map_err(|e| AudioError::Fft(e.to_string()))?;

            for (bin, c) in spectrum.iter().enumerate() {
                out[[bin, frame]] = c.re * c.re + c.im * c.im;
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_follows_centered_layout() {
        let stft = Stft::new(2048, 512).unwrap();
        assert_eq!(stft.num_frames(0), 1);
        assert_eq!(stft.num_frames(511), 1);
        assert_eq!(stft.num_frames(512), 2);
        assert_eq!(stft.power(&vec![0.0; 44100]).unwrap().dim(), (1025, 87));
    }

    #[test]
    fn silence_has_zero_power() {
        let stft = Stft::new(256, 64).unwrap();
        let power = stft.power(&vec![0.0; 2000]).unwrap();
        assert!(power.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let (n_fft, rate) = (1024, 8000.0f32);
        // Exactly on bin 64: 64 * 8000 / 1024 = 500 Hz
        let samples: Vec<f32> = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * 500.0 * i as f32 / rate).sin())
            .collect();
        let power = Stft::new(n_fft, 256).unwrap().power(&samples).unwrap();
        let mid = power.column(power.ncols() / 2);
        let peak = mid
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 64);
    }

    #[test]
    fn window_is_periodic_hann() {
        let stft = Stft::new(8, 2).unwrap();
        assert!(stft.window[0].abs() < f32::EPSILON);
        assert!((stft.window[4] - 1.0).abs() < 1e-6, "peak at N/2");
    }

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(matches!(Stft::new(0, 512), Err(AudioError::Config(_))));
        assert!(matches!(Stft::new(2048, 0), Err(AudioError::Config(_))));
    }
}
