use std::path::Path;
use std::sync::Arc;

use gc_core::PipelineConfig;

use crate::decode::decode_file;
use crate::error::AudioError;
use crate::resample::resample;

/// Immutable mono clip at the pipeline sample rate.
///
/// # Example
/// ```
/// use gc_audio::Waveform;
/// let w = Waveform::new(vec![0.0; 22050], 22050);
/// assert!((w.duration_secs() - 1.0).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl Waveform {
    /// Wrap samples that are already at `sample_rate`.
    #[must_use]
    pub fn new(samples: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Raw samples.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate (Hz).
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` when there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Reads a recording into a fixed-duration [`Waveform`].
///
/// Decode → mono → resample → truncate. Clips shorter than the configured
/// duration minus the tolerance are rejected; this layer never zero-pads.
pub struct AudioLoader {
    sample_rate: u32,
    duration_secs: f32,
    num_samples: usize,
    min_samples: usize,
}

impl AudioLoader {
    /// Build a loader from a validated configuration.
    #[must_use]
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            duration_secs: config.duration_secs,
            num_samples: config.num_samples(),
            min_samples: config.min_samples(),
        }
    }

    /// Load `path` as a pipeline waveform.
    ///
    /// # Errors
    /// - [`AudioError::ResourceNotFound`] if the file does not exist.
    /// - [`AudioError::Decode`] if it is not decodable audio.
    /// - [`AudioError::TooShort`] if it is shorter than the accepted minimum.
    ///
    /// # Example
    /// ```no_run
    /// use gc_audio::AudioLoader;
    /// use gc_core::PipelineConfig;
    /// let loader = AudioLoader::new(&PipelineConfig::default());
    /// let waveform = loader.load("recorded.wav").unwrap();
    /// assert_eq!(waveform.sample_rate(), 22050);
    /// ```
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Waveform, AudioError> {
        let path = path.as_ref();
        let decoded = decode_file(path, Some(self.duration_secs))?;

        let mut samples = resample(&decoded.samples, decoded.sample_rate, self.sample_rate);
        samples.truncate(self.num_samples);

        if samples.len() < self.min_samples {
            return Err(AudioError::TooShort {
                expected: self.min_samples,
                actual: samples.len(),
            });
        }

        if decoded.sample_rate != self.sample_rate {
            log::debug!(
                "Resampled {} Hz → {} Hz ({} samples)",
                decoded.sample_rate,
                self.sample_rate,
                samples.len()
            );
        }

        Ok(Waveform::new(samples, self.sample_rate))
    }
}
