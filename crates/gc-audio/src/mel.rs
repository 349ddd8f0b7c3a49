use ndarray::{Array2, ArrayView2};

// Slaney mel scale: linear below 1 kHz, logarithmic above.
const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Hz → mel (Slaney).
#[must_use]
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Mel → Hz (Slaney).
#[must_use]
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filterbank with Slaney area normalisation.
///
/// Matches the usual `librosa.filters.mel` defaults (`htk=False`,
/// `norm="slaney"`), so spectrograms line up with models trained in that
/// ecosystem.
///
/// # Example
/// ```
/// use gc_audio::mel::MelFilterbank;
/// let bank = MelFilterbank::new(22050, 2048, 128, 0.0, 11025.0);
/// assert_eq!(bank.weights().dim(), (128, 1025));
/// ```
#[derive(Clone, Debug)]
pub struct MelFilterbank {
    /// Shape `(n_mels, n_fft / 2 + 1)`.
    weights: Array2<f32>,
}

impl MelFilterbank {
    /// Build the filterbank.
    #[must_use]
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f32, fmax: f32) -> Self {
        let n_bins = n_fft / 2 + 1;
        let sr = f64::from(sample_rate);

        let fft_freqs: Vec<f64> = (0..n_bins)
            .map(|k| k as f64 * sr / n_fft as f64)
            .collect();

        // n_mels + 2 edges, evenly spaced on the mel axis
        let mel_lo = hz_to_mel(f64::from(fmin));
        let mel_hi = hz_to_mel(f64::from(fmax));
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_lo + (mel_hi - mel_lo) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let mut weights = Array2::<f32>::zeros((n_mels, n_bins));
        for m in 0..n_mels {
            let (left, centre, right) = (edges[m], edges[m + 1], edges[m + 2]);
            let enorm = 2.0 / (right - left);
            for (k, &f) in fft_freqs.iter().enumerate() {
                let lower = (f - left) / (centre - left);
                let upper = (right - f) / (right - centre);
                let w = lower.min(upper).max(0.0);
                weights[[m, k]] = (w * enorm) as f32;
            }
        }

        Self { weights }
    }

    /// Filter weights, `(n_mels, n_bins)`.
    #[must_use]
    pub fn weights(&self) -> ArrayView2<'_, f32> {
        self.weights.view()
    }

    /// Number of mel bands.
    #[must_use]
    pub fn n_mels(&self) -> usize {
        self.weights.nrows()
    }

    /// Project a `(n_bins, frames)` power spectrogram onto the mel bands.
    ///
    /// # Panics
    /// Panics if the spectrum has a different bin count than the filterbank.
    #[must_use]
    pub fn apply(&self, power: ArrayView2<'_, f32>) -> Array2<f32> {
        assert_eq!(
            power.nrows(),
            self.weights.ncols(),
            "spectrum bins do not match the filterbank"
        );
        self.weights.dot(&power)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mel_scale_round_trips_and_breaks_at_1khz() {
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-9);
        assert!((hz_to_mel(500.0) - 7.5).abs() < 1e-9);
        for hz in [0.0, 440.0, 1000.0, 4000.0, 11025.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
    }

    #[test]
    fn filters_are_non_negative_and_all_used() {
        let bank = MelFilterbank::new(22050, 2048, 128, 0.0, 11025.0);
        assert!(bank.weights().iter().all(|&w| w >= 0.0));
        // With 1025 bins, every one of the 128 bands catches at least one bin.
        for (m, row) in bank.weights().rows().into_iter().enumerate() {
            assert!(row.iter().any(|&w| w > 0.0), "band {m} is empty");
        }
    }

    #[test]
    fn tone_lands_in_matching_band() {
        let bank = MelFilterbank::new(22050, 2048, 128, 0.0, 11025.0);
        // Impulse at the bin of ~1 kHz
        let bin = (1000.0 * 2048.0 / 22050.0f64).round() as usize;
        let mut power = Array2::<f32>::zeros((1025, 1));
        power[[bin, 0]] = 1.0;
        let mel = bank.apply(power.view());
        let band = mel
            .column(0)
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let centre_hz = mel_to_hz(hz_to_mel(11025.0) * (band + 1) as f64 / 129.0);
        assert!((centre_hz - 1000.0).abs() < 60.0, "band {band} centred at {centre_hz} Hz");
    }
}
