use gc_core::{PipelineConfig, Scale};
use ndarray::{Array2, ArrayView2, s};

use crate::error::AudioError;
use crate::loader::Waveform;
use crate::mel::MelFilterbank;
use crate::stft::Stft;

/// Smallest power considered in the dB conversion.
const AMIN: f32 = 1e-10;

/// Fixed-shape mel spectrogram, `(n_mels, frames)`.
///
/// The scale and its format tag travel together; a spectrogram cannot be
/// relabelled without recomputing its values.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrogram {
    values: Array2<f32>,
    scale: Scale,
    top_db: Option<f32>,
}

impl Spectrogram {
    /// Wrap a mel power matrix.
    ///
    /// # Example
    /// ```
    /// use gc_audio::Spectrogram;
    /// use ndarray::Array2;
    /// let s = Spectrogram::from_power(Array2::from_elem((4, 3), 2.0));
    /// assert_eq!(s.shape(), (4, 3));
    /// assert_eq!(s.format_tag(), "%+2.0f");
    /// ```
    #[must_use]
    pub fn from_power(values: Array2<f32>) -> Self {
        Self {
            values,
            scale: Scale::Linear,
            top_db: None,
        }
    }

    /// Convert to log-power relative to the maximum.
    ///
    /// `10·log10(max(amin, S) / max(amin, max(S)))`, then floored at
    /// `-top_db`. Every value is ≤ 0 and the maximum is exactly 0.
    ///
    /// # Errors
    /// Returns [`AudioError::AlreadyDecibel`] if `self` is already in dB.
    ///
    /// # Example
    /// ```
    /// use gc_audio::Spectrogram;
    /// use ndarray::array;
    /// let s = Spectrogram::from_power(array![[1.0, 0.1], [0.01, 0.0]]);
    /// let db = s.to_decibel(Some(80.0)).unwrap();
    /// assert_eq!(db.values()[[0, 0]], 0.0);
    /// assert!((db.values()[[0, 1]] + 10.0).abs() < 1e-4);
    /// assert_eq!(db.values()[[1, 1]], -80.0);
    /// assert!(db.to_decibel(Some(80.0)).is_err());
    /// ```
    pub fn to_decibel(&self, top_db: Option<f32>) -> Result<Self, AudioError> {
        if self.scale == Scale::Decibel {
            return Err(AudioError::AlreadyDecibel);
        }
        Ok(Self {
            values: power_to_db(self.values.view(), top_db),
            scale: Scale::Decibel,
            top_db,
        })
    }

    /// Spectrogram values, `(n_mels, frames)`.
    #[must_use]
    pub fn values(&self) -> ArrayView2<'_, f32> {
        self.values.view()
    }

    /// Consume into the raw matrix.
    #[must_use]
    pub fn into_values(self) -> Array2<f32> {
        self.values
    }

    /// Representation of the values.
    #[must_use]
    pub fn scale(&self) -> Scale {
        self.scale
    }

    /// Display format matching the scale.
    #[must_use]
    pub fn format_tag(&self) -> &'static str {
        self.scale.format_tag()
    }

    /// Dynamic range floor used by the dB conversion, if any.
    #[must_use]
    pub fn top_db(&self) -> Option<f32> {
        self.top_db
    }

    /// `(bands, frames)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }
}

/// Log-power transform referenced to the matrix maximum.
fn power_to_db(power: ArrayView2<'_, f32>, top_db: Option<f32>) -> Array2<f32> {
    let reference = power.iter().copied().fold(0.0f32, f32::max).max(AMIN);
    let ref_db = 10.0 * reference.log10();
    let mut db = power.mapv(|p| 10.0 * p.max(AMIN).log10() - ref_db);
    if let Some(top_db) = top_db {
        let floor = db.iter().copied().fold(f32::NEG_INFINITY, f32::max) - top_db;
        db.mapv_inplace(|v| v.max(floor));
    }
    db
}

/// Waveform → fixed-shape mel spectrogram.
///
/// Pure function of (waveform, scale, configuration). The configured frame
/// count is authoritative: extra trailing frames are cropped so the attack at
/// the start of the clip is kept, missing trailing frames are zero-padded in
/// the power domain.
///
/// # Example
/// ```
/// use gc_audio::{SpectrogramExtractor, Waveform};
/// use gc_core::{PipelineConfig, Scale};
/// let config = PipelineConfig::default();
/// let extractor = SpectrogramExtractor::new(&config).unwrap();
/// let w = Waveform::new(vec![0.0; 44100], 22050);
/// let s = extractor.extract(&w, Scale::Linear).unwrap();
/// assert_eq!(s.shape(), (128, 87));
/// ```
pub struct SpectrogramExtractor {
    sample_rate: u32,
    frames: usize,
    top_db: Option<f32>,
    stft: Stft,
    filterbank: MelFilterbank,
}

impl SpectrogramExtractor {
    /// Build the STFT plan and filterbank for `config`.
    ///
    /// # Errors
    /// Returns [`AudioError::Config`] if `config` does not validate.
    pub fn new(config: &PipelineConfig) -> Result<Self, AudioError> {
        config.validate()?;
        Ok(Self {
            sample_rate: config.sample_rate,
            frames: config.frames,
            top_db: config.top_db,
            stft: Stft::new(config.n_fft, config.hop_length)?,
            filterbank: MelFilterbank::new(
                config.sample_rate,
                config.n_fft,
                config.n_mels,
                config.fmin,
                config.effective_fmax(),
            ),
        })
    }

    /// Output shape, `(n_mels, frames)`.
    #[must_use]
    pub fn output_shape(&self) -> (usize, usize) {
        (self.filterbank.n_mels(), self.frames)
    }

    /// Extract the spectrogram of `waveform` in the requested `scale`.
    ///
    /// # Errors
    /// Returns [`AudioError::SampleRateMismatch`] if the waveform is not at the
    /// configured rate, or [`AudioError::Fft`] on an FFT backend failure.
    pub fn extract(&self, waveform: &Waveform, scale: Scale) -> Result<Spectrogram, AudioError> {
        if waveform.sample_rate() != self.sample_rate {
            return Err(AudioError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: waveform.sample_rate(),
            });
        }

        let power = self.stft.power(waveform.samples())?;
        let mel = self.filterbank.apply(power.view());
        let mel = self.fit_frames(mel);

        let spectrogram = Spectrogram::from_power(mel);
        match scale {
            Scale::Linear => Ok(spectrogram),
            Scale::Decibel => spectrogram.to_decibel(self.top_db),
        }
    }

    /// Crop or zero-pad trailing frames to the configured count.
    fn fit_frames(&self, mel: Array2<f32>) -> Array2<f32> {
        let (bands, actual) = mel.dim();
        if actual == self.frames {
            return mel;
        }

        log::debug!(
            "Spectrogramme : {actual} frames → {} ({})",
            self.frames,
            if actual > self.frames { "crop" } else { "pad" }
        );

        let mut fitted = Array2::<f32>::zeros((bands, self.frames));
        let keep = actual.min(self.frames);
        fitted
            .slice_mut(s![.., ..keep])
            .assign(&mel.slice(s![.., ..keep]));
        fitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord(len: usize, rate: u32) -> Waveform {
        // G major triad: G3, B3, D4
        let samples: Vec<f32> = (0..len)
            .map(|i| {
                let t = i as f32 / rate as f32;
                [196.0f32, 246.94, 293.66]
                    .iter()
                    .map(|f| (2.0 * std::f32::consts::PI * f * t).sin() / 3.0)
                    .sum()
            })
            .collect();
        Waveform::new(samples, rate)
    }

    #[test]
    fn shape_is_fixed_despite_length_jitter() {
        let config = PipelineConfig::default();
        let extractor = SpectrogramExtractor::new(&config).unwrap();
        for len in [41895, 43000, 44099, 44100, 44101, 44700, 50000] {
            for scale in [Scale::Linear, Scale::Decibel] {
                let s = extractor.extract(&chord(len, 22050), scale).unwrap();
                assert_eq!(s.shape(), (128, 87), "len {len}, {scale}");
                assert_eq!(s.scale(), scale);
            }
        }
    }

    #[test]
    fn short_clip_is_padded_with_trailing_zero_frames() {
        let config = PipelineConfig::default();
        let extractor = SpectrogramExtractor::new(&config).unwrap();
        // 1 + 40960 / 512 = 81 real frames
        let s = extractor.extract(&chord(40960, 22050), Scale::Linear).unwrap();
        let v = s.values();
        assert!(v.slice(s![.., 81..]).iter().all(|&x| x == 0.0));
        assert!(v.slice(s![.., 1..80]).iter().any(|&x| x > 0.0));
    }

    #[test]
    fn long_clip_keeps_leading_frames() {
        let config = PipelineConfig::default();
        let extractor = SpectrogramExtractor::new(&config).unwrap();
        let full = extractor.extract(&chord(44100, 22050), Scale::Linear).unwrap();
        // Extra samples appended after the configured duration must not
        // change the first frames.
        let mut longer = chord(44100, 22050).samples().to_vec();
        longer.extend(std::iter::repeat_n(0.9f32, 8000));
        let cropped = extractor
            .extract(&Waveform::new(longer, 22050), Scale::Linear)
            .unwrap();
        let a = full.values();
        let b = cropped.values();
        for frame in 0..80 {
            for band in 0..128 {
                let (x, y) = (a[[band, frame]], b[[band, frame]]);
                assert!((x - y).abs() <= 1e-3 * x.abs().max(1.0), "frame {frame}");
            }
        }
    }

    #[test]
    fn decibel_is_derived_from_linear_and_non_positive() {
        let config = PipelineConfig::default();
        let extractor = SpectrogramExtractor::new(&config).unwrap();
        let w = chord(44100, 22050);
        let linear = extractor.extract(&w, Scale::Linear).unwrap();
        let db = extractor.extract(&w, Scale::Decibel).unwrap();

        assert!(db.values().iter().all(|&v| v <= 0.0));
        let max = db.values().iter().copied().fold(f32::NEG_INFINITY, f32::max);
        assert!(max.abs() < f32::EPSILON, "top is 0 dB");
        assert!(db.values().iter().all(|&v| v >= -80.0 - 1e-3));
        assert_eq!(db, linear.to_decibel(config.top_db).unwrap());
        assert_eq!(db.format_tag(), "%+2.0f dB");
    }

    #[test]
    fn decibel_conversion_is_monotonic() {
        let s = Spectrogram::from_power(ndarray::array![[1e-12, 1e-6, 1e-3, 1.0, 4.0]]);
        let db = s.to_decibel(None).unwrap();
        let row = db.values();
        for i in 1..5 {
            assert!(row[[0, i]] >= row[[0, i - 1]]);
        }
    }

    #[test]
    fn decibel_twice_is_rejected() {
        let s = Spectrogram::from_power(Array2::from_elem((2, 2), 1.0));
        let db = s.to_decibel(Some(80.0)).unwrap();
        assert!(matches!(
            db.to_decibel(Some(80.0)),
            Err(AudioError::AlreadyDecibel)
        ));
    }

    #[test]
    fn silence_in_decibel_is_all_zero() {
        let config = PipelineConfig::default();
        let extractor = SpectrogramExtractor::new(&config).unwrap();
        let db = extractor
            .extract(&Waveform::new(vec![0.0; 44100], 22050), Scale::Decibel)
            .unwrap();
        assert!(db.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn wrong_sample_rate_is_rejected() {
        let extractor = SpectrogramExtractor::new(&PipelineConfig::default()).unwrap();
        let err = extractor
            .extract(&Waveform::new(vec![0.0; 88200], 44100), Scale::Linear)
            .unwrap_err();
        assert!(matches!(
            err,
            AudioError::SampleRateMismatch {
                expected: 22050,
                actual: 44100
            }
        ));
    }

    #[test]
    fn extraction_is_deterministic() {
        let extractor = SpectrogramExtractor::new(&PipelineConfig::default()).unwrap();
        let w = chord(44100, 22050);
        assert_eq!(
            extractor.extract(&w, Scale::Linear).unwrap(),
            extractor.extract(&w, Scale::Linear).unwrap()
        );
    }

    #[test]
    fn invalid_config_is_an_error_not_a_panic() {
        let config = PipelineConfig {
            hop_length: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(
            SpectrogramExtractor::new(&config),
            Err(AudioError::Config(_))
        ));
    }
}
