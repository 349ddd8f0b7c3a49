use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::label::{DEFAULT_CHORDS, LabelResolver};

/// Configuration complète du pipeline audio → label.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut qui reproduit
/// le modèle entraîné : 2 s à 22 050 Hz, 128 bandes mel × 87 frames.
///
/// # Example
/// ```
/// use gc_core::config::PipelineConfig;
/// let config = PipelineConfig::default();
/// assert_eq!(config.input_shape(), (128, 87));
/// assert_eq!(config.num_samples(), 44100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PipelineConfig {
    // === Audio ===
    /// Fréquence d'échantillonnage du pipeline (Hz).
    pub sample_rate: u32,
    /// Durée fixe du clip (secondes).
    pub duration_secs: f32,
    /// Tolérance sur la durée : un clip plus court que
    /// `duration_secs - length_tolerance_secs` est rejeté.
    pub length_tolerance_secs: f32,

    // === Spectrogramme ===
    /// Nombre de bandes mel.
    pub n_mels: usize,
    /// Taille de la fenêtre FFT.
    pub n_fft: usize,
    /// Pas entre deux frames (échantillons).
    pub hop_length: usize,
    /// Nombre de frames attendu par le classifieur.
    pub frames: usize,
    /// Fréquence basse du banc de filtres (Hz).
    pub fmin: f32,
    /// Fréquence haute du banc de filtres (Hz). `None` = Nyquist.
    pub fmax: Option<f32>,
    /// Plancher dB sous le maximum. `None` = pas de plancher.
    pub top_db: Option<f32>,
    /// Échelle utilisée pour l'affichage.
    pub display_scale: Scale,

    // === Modèle ===
    /// Modèle ONNX exporté, entrée `[1, n_mels, frames, 1]` (channels-last).
    pub model_path: PathBuf,
    /// Échelle du spectrogramme fourni au réseau.
    pub model_input_scale: Scale,
    /// Table de labels, dans l'ordre d'entraînement.
    pub labels: Vec<String>,

    // === Chemins ===
    /// Enregistrement produit par la capture micro.
    pub recording_path: PathBuf,
}

/// Spectrogram representation.
///
/// The display format tag is derived from the scale, so the two can never
/// disagree.
///
/// # Example
/// ```
/// use gc_core::config::Scale;
/// let scale: Scale = "decibel".parse().unwrap();
/// assert_eq!(scale, Scale::Decibel);
/// assert_eq!(scale.format_tag(), "%+2.0f dB");
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum Scale {
    /// Mel power, as produced by the filterbank.
    #[default]
    Linear,
    /// Log-power relative to the maximum (top value 0 dB).
    Decibel,
}

impl Scale {
    /// Colour-bar format tag matching this representation.
    #[must_use]
    pub fn format_tag(self) -> &'static str {
        match self {
            Self::Linear => "%+2.0f",
            Self::Decibel => "%+2.0f dB",
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => f.write_str("linear"),
            Self::Decibel => f.write_str("decibel"),
        }
    }
}

impl FromStr for Scale {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" | "mel" | "power" => Ok(Self::Linear),
            "decibel" | "db" => Ok(Self::Decibel),
            other => Err(CoreError::UnknownScale(other.to_string())),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            duration_secs: 2.0,
            length_tolerance_secs: 0.1,
            n_mels: 128,
            n_fft: 2048,
            hop_length: 512,
            frames: 87,
            fmin: 0.0,
            fmax: None,
            top_db: Some(80.0),
            display_scale: Scale::Decibel,
            model_path: PathBuf::from("models/chords.onnx"),
            model_input_scale: Scale::Linear,
            labels: DEFAULT_CHORDS.iter().map(|&s| s.to_string()).collect(),
            recording_path: PathBuf::from("recorded.wav"),
        }
    }
}

impl PipelineConfig {
    /// Number of samples in a full-length clip.
    #[must_use]
    pub fn num_samples(&self) -> usize {
        (self.duration_secs * self.sample_rate as f32).round() as usize
    }

    /// Shortest accepted clip, in samples.
    #[must_use]
    pub fn min_samples(&self) -> usize {
        ((self.duration_secs - self.length_tolerance_secs) * self.sample_rate as f32).ceil()
            as usize
    }

    /// Classifier input shape: (mel bands, frames).
    #[must_use]
    pub fn input_shape(&self) -> (usize, usize) {
        (self.n_mels, self.frames)
    }

    /// Upper filterbank edge, Nyquist unless overridden.
    #[must_use]
    pub fn effective_fmax(&self) -> f32 {
        self.fmax.unwrap_or(self.sample_rate as f32 / 2.0)
    }

    /// Build the label resolver for this configuration.
    ///
    /// # Errors
    /// Returns [`CoreError::LabelTable`] if the configured table is invalid.
    pub fn label_resolver(&self) -> Result<LabelResolver, CoreError> {
        LabelResolver::new(&self.labels)
    }

    /// Check every field once, at process start.
    ///
    /// Contrary to a render config, nothing is clamped: any value that would
    /// change the tensor shape fed to the classifier is an error.
    ///
    /// # Errors
    /// Returns [`CoreError::Config`] (or [`CoreError::LabelTable`]) describing
    /// the first invalid field.
    pub fn validate(&self) -> Result<(), CoreError> {
        fn bad(msg: impl Into<String>) -> Result<(), CoreError> {
            Err(CoreError::Config(msg.into()))
        }

        if self.sample_rate == 0 {
            return bad("sample_rate doit être > 0");
        }
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return bad("duration_secs doit être > 0");
        }
        if !(self.length_tolerance_secs >= 0.0 && self.length_tolerance_secs < self.duration_secs)
        {
            return bad("length_tolerance_secs doit être dans [0, duration_secs)");
        }
        if self.n_mels == 0 {
            return bad("n_mels doit être > 0");
        }
        if self.n_fft < 2 || self.n_fft % 2 != 0 {
            return bad(format!("n_fft doit être pair et ≥ 2 (reçu {})", self.n_fft));
        }
        if self.hop_length == 0 {
            return bad("hop_length doit être > 0");
        }
        if self.frames == 0 {
            return bad("frames doit être > 0");
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        let fmax = self.effective_fmax();
        if !(self.fmin >= 0.0 && self.fmin < fmax && fmax <= nyquist) {
            return bad(format!(
                "bande mel invalide : fmin={} fmax={fmax} (Nyquist {nyquist})",
                self.fmin
            ));
        }
        if let Some(top_db) = self.top_db {
            if !(top_db.is_finite() && top_db > 0.0) {
                return bad("top_db doit être > 0");
            }
        }
        self.label_resolver().map(|_| ())
    }
}

/// Structure TOML intermédiaire, toutes les sections optionnelles.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    audio: Option<AudioSection>,
    spectrogram: Option<SpectrogramSection>,
    model: Option<ModelSection>,
    paths: Option<PathsSection>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AudioSection {
    sample_rate: Option<u32>,
    duration_secs: Option<f32>,
    length_tolerance_secs: Option<f32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SpectrogramSection {
    n_mels: Option<usize>,
    n_fft: Option<usize>,
    hop_length: Option<usize>,
    frames: Option<usize>,
    fmin: Option<f32>,
    fmax: Option<f32>,
    top_db: Option<f32>,
    display_scale: Option<Scale>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelSection {
    path: Option<PathBuf>,
    input_scale: Option<Scale>,
    labels: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PathsSection {
    recording: Option<PathBuf>,
}

/// Parse a TOML document and merge it over the defaults, then validate.
///
/// # Errors
/// Returns an error if the TOML is malformed or the merged config is invalid.
///
/// # Example
/// ```
/// use gc_core::config::parse_config;
/// let config = parse_config("[spectrogram]\nn_mels = 64\n").unwrap();
/// assert_eq!(config.n_mels, 64);
/// assert_eq!(config.frames, 87);
/// ```
pub fn parse_config(content: &str) -> Result<PipelineConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = PipelineConfig::default();

    if let Some(a) = file.audio {
        if let Some(v) = a.sample_rate {
            config.sample_rate = v;
        }
        if let Some(v) = a.duration_secs {
            config.duration_secs = v;
        }
        if let Some(v) = a.length_tolerance_secs {
            config.length_tolerance_secs = v;
        }
    }

    if let Some(s) = file.spectrogram {
        if let Some(v) = s.n_mels {
            config.n_mels = v;
        }
        if let Some(v) = s.n_fft {
            config.n_fft = v;
        }
        if let Some(v) = s.hop_length {
            config.hop_length = v;
        }
        if let Some(v) = s.frames {
            config.frames = v;
        }
        if let Some(v) = s.fmin {
            config.fmin = v;
        }
        if s.fmax.is_some() {
            config.fmax = s.fmax;
        }
        if s.top_db.is_some() {
            config.top_db = s.top_db;
        }
        if let Some(v) = s.display_scale {
            config.display_scale = v;
        }
    }

    if let Some(m) = file.model {
        if let Some(v) = m.path {
            config.model_path = v;
        }
        if let Some(v) = m.input_scale {
            config.model_input_scale = v;
        }
        if let Some(v) = m.labels {
            config.labels = v;
        }
    }

    if let Some(p) = file.paths {
        if let Some(v) = p.recording {
            config.recording_path = v;
        }
    }

    config.validate()?;
    Ok(config)
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// Relative model and recording paths are resolved against the directory of
/// the config file.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or validated.
///
/// # Example
/// ```no_run
/// use gc_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;

    let mut config = parse_config(&content)
        .with_context(|| format!("Configuration invalide dans {}", path.display()))?;

    if let Some(base) = path.parent() {
        for p in [
            &mut config.model_path,
            &mut config.recording_path,
        ] {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
    }

    log::debug!("Config chargée depuis {}", path.display());
    Ok(config)
}
