// Audio decoding and mel-spectrogram extraction for chordrec.

pub mod decode;
pub mod error;
pub mod loader;
pub mod mel;
pub mod resample;
pub mod spectrogram;
pub mod stft;

pub use error::AudioError;
pub use loader::{AudioLoader, Waveform};
pub use spectrogram::{Spectrogram, SpectrogramExtractor};
