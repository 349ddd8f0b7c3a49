//! Bodies of the `chordrec` subcommands. Output goes to `out` so the
//! messages can be checked without a terminal.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use gc_audio::{AudioError, AudioLoader, SpectrogramExtractor};
use gc_core::{PipelineConfig, Scale};
use gc_model::{ChordClassifier, ModelError};

use crate::render;

/// Printed when there is no recording to classify.
pub const RECORD_FIRST: &str = "Please record sound first";
/// Context attached to decode failures and too-short clips.
pub const RERECORD: &str = "Recording unusable, please record again";

/// `chordrec classify`: load the model, classify `recording`, print the label.
///
/// # Errors
/// Model load and inference failures, or [`RERECORD`] when the recording
/// exists but cannot be used.
pub fn classify(
    config: &PipelineConfig,
    recording: &Path,
    top: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    let classifier = ChordClassifier::new(config)?;
    let outcome = match classifier.classify(recording, true) {
        Err(ModelError::Audio(e)) => return Err(anyhow::Error::new(e).context(RERECORD)),
        other => other
            .with_context(|| format!("Classification de {} impossible", recording.display()))?,
    };
    let Some(prediction) = outcome else {
        writeln!(out, "{RECORD_FIRST}")?;
        return Ok(());
    };

    writeln!(out, "The recorded chord is {}", prediction.label)?;
    if let Some(n) = top {
        for (name, p) in prediction.top(n, classifier.labels()) {
            writeln!(out, "  {name:<6} {:>6.2}%", p * 100.0)?;
        }
    }
    Ok(())
}

/// `chordrec spectrogram`: render the mel spectrogram of `recording` to `png`.
///
/// # Errors
/// [`RECORD_FIRST`] if the recording is missing, [`RERECORD`] if it cannot
/// be decoded, or an image write failure.
pub fn spectrogram(
    config: &PipelineConfig,
    recording: &Path,
    scale: Scale,
    png: &Path,
    out: &mut impl Write,
) -> Result<()> {
    let waveform = match AudioLoader::new(config).load(recording) {
        Ok(w) => w,
        Err(AudioError::ResourceNotFound { .. }) => anyhow::bail!(RECORD_FIRST),
        Err(e) => return Err(anyhow::Error::new(e).context(RERECORD)),
    };

    let spec = SpectrogramExtractor::new(config)?.extract(&waveform, scale)?;
    render::write_png(&spec, png)?;
    let (bands, frames) = spec.shape();
    writeln!(
        out,
        "Mel spectrogram ({bands}×{frames}, {scale}, format {}) written to {}",
        spec.format_tag(),
        png.display()
    )?;
    Ok(())
}

/// `chordrec check`: load the model and print its summary and label table.
///
/// # Errors
/// Returns the load failure if the model is missing or incompatible.
pub fn check(config: &PipelineConfig, out: &mut impl Write) -> Result<()> {
    let classifier = ChordClassifier::new(config)?;
    classifier
        .load()
        .with_context(|| format!("Modèle {}", config.model_path.display()))?;
    let model = classifier
        .model()
        .context("Modèle absent après chargement")?;

    writeln!(out, "{}", model.summary())?;
    writeln!(
        out,
        "Labels ({}) : {}",
        classifier.labels().len(),
        classifier.labels().names().collect::<Vec<_>>().join(", ")
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Workspace {
        dir: tempfile::TempDir,
        config: PipelineConfig,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = PipelineConfig {
                model_path: dir.path().join("chords.onnx"),
                recording_path: dir.path().join("recorded.wav"),
                ..PipelineConfig::default()
            };
            let onnx = gc_model::fixtures::dense_softmax(config.input_shape(), 8);
            std::fs::write(&config.model_path, onnx).unwrap();
            Self { dir, config }
        }

        fn record(&self, secs: f32) -> PathBuf {
            let spec = hound::WavSpec {
                channels: 1,
                sample_rate: 22050,
                bits_per_sample: 16,
                sample_format: hound::SampleFormat::Int,
            };
            let path = &self.config.recording_path;
            let mut writer = hound::WavWriter::create(path, spec).unwrap();
            for i in 0..(22050.0 * secs) as usize {
                let s = (2.0 * std::f32::consts::PI * 196.0 * i as f32 / 22050.0).sin() * 0.5;
                writer.write_sample((s * f32::from(i16::MAX)) as i16).unwrap();
            }
            writer.finalize().unwrap();
            path.clone()
        }
    }

    fn printed(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn classify_asks_for_a_recording_when_none_exists() {
        let ws = Workspace::new();
        let mut out = Vec::new();
        classify(&ws.config, &ws.config.recording_path, None, &mut out).unwrap();
        assert_eq!(printed(out).trim(), RECORD_FIRST);
    }

    #[test]
    fn classify_prints_the_label_and_ranking() {
        let ws = Workspace::new();
        let recording = ws.record(2.0);
        let mut out = Vec::new();
        classify(&ws.config, &recording, Some(3), &mut out).unwrap();

        let text = printed(out);
        let mut lines = text.lines();
        let first = lines.next().unwrap();
        let label = first.strip_prefix("The recorded chord is ").unwrap();
        assert!(gc_core::label::DEFAULT_CHORDS.contains(&label));
        assert_eq!(lines.count(), 3);
    }

    #[test]
    fn undecodable_recording_asks_to_record_again() {
        let ws = Workspace::new();
        std::fs::write(&ws.config.recording_path, b"RIFF....garbage").unwrap();
        let err =
            classify(&ws.config, &ws.config.recording_path, None, &mut Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), RERECORD);

        let short = ws.record(0.3);
        let err = classify(&ws.config, &short, None, &mut Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), RERECORD);
    }

    #[test]
    fn spectrogram_of_missing_recording_is_an_error() {
        let ws = Workspace::new();
        let png = ws.dir.path().join("spec.png");
        let err = spectrogram(
            &ws.config,
            &ws.config.recording_path,
            Scale::Decibel,
            &png,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), RECORD_FIRST);
        assert!(!png.exists());
    }

    #[test]
    fn spectrogram_of_corrupt_recording_asks_to_record_again() {
        let ws = Workspace::new();
        std::fs::write(&ws.config.recording_path, b"RIFF....garbage").unwrap();
        let png = ws.dir.path().join("spec.png");
        let err = spectrogram(
            &ws.config,
            &ws.config.recording_path,
            Scale::Decibel,
            &png,
            &mut Vec::new(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), RERECORD);
    }

    #[test]
    fn spectrogram_writes_the_png() {
        let ws = Workspace::new();
        let recording = ws.record(2.0);
        let png = ws.dir.path().join("spec.png");
        let mut out = Vec::new();
        spectrogram(&ws.config, &recording, Scale::Decibel, &png, &mut out).unwrap();

        assert!(printed(out).starts_with("Mel spectrogram (128×87"));
        let img = image::open(&png).unwrap();
        assert_eq!(img.width(), 87 * render::CELL_SIZE);
    }

    #[test]
    fn check_prints_model_and_labels() {
        let ws = Workspace::new();
        let mut out = Vec::new();
        check(&ws.config, &mut out).unwrap();

        let text = printed(out);
        assert!(text.contains("8 classes"));
        assert!(text.contains("Labels (8) : Am, Bb, Bdim, C, Dm, Em, F, G"));
    }

    #[test]
    fn check_fails_without_a_model() {
        let ws = Workspace::new();
        std::fs::remove_file(&ws.config.model_path).unwrap();
        assert!(check(&ws.config, &mut Vec::new()).is_err());
    }
}
