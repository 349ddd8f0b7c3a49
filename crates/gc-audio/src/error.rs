use std::path::PathBuf;

use gc_core::CoreError;
use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// The recording does not exist. Recoverable: "please record first".
    #[error("Enregistrement introuvable : {}", path.display())]
    ResourceNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// The file exists but is not decodable audio.
    #[error("Erreur de décodage : {0}")]
    Decode(String),

    /// The decoded clip is shorter than the configured duration allows.
    #[error("Clip trop court : {actual} échantillons, {expected} attendus")]
    TooShort {
        /// Minimum accepted sample count.
        expected: usize,
        /// Decoded sample count at the pipeline rate.
        actual: usize,
    },

    /// Waveform sample rate differs from the extractor configuration.
    #[error("Fréquence d'échantillonnage {actual} Hz, {expected} Hz attendus")]
    SampleRateMismatch {
        /// Configured rate.
        expected: u32,
        /// Waveform rate.
        actual: u32,
    },

    /// Extractor built from an invalid configuration.
    #[error(transparent)]
    Config(#[from] CoreError),

    /// FFT backend rejected its buffers.
    #[error("Erreur FFT : {0}")]
    Fft(String),

    /// Decibel conversion applied to a spectrogram that is already in dB.
    #[error("Le spectrogramme est déjà en dB")]
    AlreadyDecibel,
}

impl AudioError {
    /// `true` when the failure means "no recording yet" rather than bad data.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound { .. })
    }
}
