use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use gc_audio::{AudioError, AudioLoader, Spectrogram, SpectrogramExtractor};
use gc_core::{Label, LabelResolver, PipelineConfig, Scale};

use crate::error::ModelError;
use crate::model::{OnnxModel, argmax};

/// Classifier lifecycle. There is no transition back to `Unloaded`.
enum State {
    Unloaded,
    Loaded(Arc<OnnxModel>),
}

/// Label plus the full output distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Winning label.
    pub label: Label,
    /// Output vector, one probability per class in table order.
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// The `n` most likely classes, highest first (ties keep table order).
    #[must_use]
    pub fn top<'a>(&self, n: usize, resolver: &'a LabelResolver) -> Vec<(&'a str, f32)> {
        let mut ranked: Vec<(&str, f32)> = resolver
            .names()
            .zip(self.probabilities.iter().copied())
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.truncate(n);
        ranked
    }
}

/// Recording → chord label.
///
/// Holds the pipeline stages and, once [`load`](Self::load) succeeded, the
/// ONNX model session. Safe to share across threads: `load` is serialised by
/// the state lock and predictions go through the shared session.
///
/// # Example
/// ```no_run
/// use gc_core::PipelineConfig;
/// use gc_model::ChordClassifier;
///
/// let config = PipelineConfig::default();
/// let classifier = ChordClassifier::new(&config).unwrap();
/// classifier.load().unwrap();
/// let label = classifier.predict(&config.recording_path, false).unwrap();
/// println!("The recorded chord is {label}");
/// ```
pub struct ChordClassifier {
    model_path: PathBuf,
    input_shape: (usize, usize),
    input_scale: Scale,
    loader: AudioLoader,
    extractor: SpectrogramExtractor,
    resolver: LabelResolver,
    state: RwLock<State>,
    loads: AtomicUsize,
}

impl ChordClassifier {
    /// Create an unloaded classifier for `config`.
    ///
    /// # Errors
    /// Returns [`ModelError::Config`] if the pipeline parameters or the
    /// label table are invalid.
    pub fn new(config: &PipelineConfig) -> Result<Self, ModelError> {
        config.validate().map_err(ModelError::Config)?;
        Ok(Self {
            model_path: config.model_path.clone(),
            input_shape: config.input_shape(),
            input_scale: config.model_input_scale,
            loader: AudioLoader::new(config),
            extractor: SpectrogramExtractor::new(config)?,
            resolver: config.label_resolver().map_err(ModelError::Config)?,
            state: RwLock::new(State::Unloaded),
            loads: AtomicUsize::new(0),
        })
    }

    /// Load the ONNX model once. Later calls are no-ops.
    ///
    /// # Errors
    /// Returns [`ModelError::ModelLoad`] if the model is missing, malformed,
    /// or disagrees with the configured input shape or label table. The
    /// classifier stays `Unloaded` and nothing is retried automatically.
    pub fn load(&self) -> Result<(), ModelError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| ModelError::ModelLoad("verrou d'état empoisonné".into()))?;
        if matches!(*state, State::Loaded(_)) {
            log::debug!("Modèle déjà chargé");
            return Ok(());
        }

        log::info!("Loading model from {}", self.model_path.display());
        self.loads.fetch_add(1, Ordering::SeqCst);
        let model = OnnxModel::load(&self.model_path, self.input_shape)?;

        if model.output_len() != self.resolver.len() {
            return Err(ModelError::ModelLoad(format!(
                "{} sorties pour {} labels",
                model.output_len(),
                self.resolver.len()
            )));
        }

        log::info!("Modèle chargé : {}", model.summary());
        *state = State::Loaded(Arc::new(model));
        Ok(())
    }

    /// `true` once `load` succeeded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.model().is_some()
    }

    /// Number of times the model was actually read from storage.
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// The loaded model, if any.
    #[must_use]
    pub fn model(&self) -> Option<Arc<OnnxModel>> {
        match &*self.state.read().ok()? {
            State::Loaded(model) => Some(Arc::clone(model)),
            State::Unloaded => None,
        }
    }

    /// Label table used by this classifier.
    #[must_use]
    pub fn labels(&self) -> &LabelResolver {
        &self.resolver
    }

    /// Classify the recording at `path`.
    ///
    /// A missing recording yields the `"N/A"` sentinel, not an error.
    ///
    /// # Errors
    /// - [`ModelError::Audio`] for decode failures and clips that are too short.
    /// - [`ModelError::ModelLoad`] if `reload` is set and loading fails.
    /// - [`ModelError::NotLoaded`] if `reload` is unset and `load` never ran.
    /// - [`ModelError::Inference`] / [`ModelError::InvariantViolation`] for
    ///   forward-pass failures.
    pub fn predict(&self, path: impl AsRef<Path>, reload: bool) -> Result<Label, ModelError> {
        Ok(match self.classify(path, reload)? {
            Some(prediction) => prediction.label,
            None => self.resolver.not_available(),
        })
    }

    /// Like [`predict`](Self::predict) but keeps the probability vector.
    /// Returns `None` when the recording does not exist.
    ///
    /// # Errors
    /// Same as [`predict`](Self::predict).
    pub fn classify(
        &self,
        path: impl AsRef<Path>,
        reload: bool,
    ) -> Result<Option<Prediction>, ModelError> {
        if reload {
            self.load()?;
        }
        let path = path.as_ref();

        let waveform = match self.loader.load(path) {
            Ok(w) => w,
            Err(AudioError::ResourceNotFound { path }) => {
                log::info!("Aucun enregistrement à {} : N/A", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let spectrogram = self.extractor.extract(&waveform, self.input_scale)?;
        let prediction = self.predict_spectrogram(&spectrogram)?;
        log::info!("Accord prédit : {}", prediction.label);
        Ok(Some(prediction))
    }

    /// Forward pass + argmax + label resolution on an extracted spectrogram.
    ///
    /// # Errors
    /// - [`ModelError::NotLoaded`] before `load`.
    /// - [`ModelError::Inference`] on a scale or shape mismatch, or
    ///   non-finite output.
    /// - [`ModelError::InvariantViolation`] if the winning index is outside
    ///   the label table.
    pub fn predict_spectrogram(&self, spectrogram: &Spectrogram) -> Result<Prediction, ModelError> {
        let model = self.model().ok_or(ModelError::NotLoaded)?;

        if spectrogram.scale() != self.input_scale {
            return Err(ModelError::Inference(format!(
                "spectrogramme {}, le modèle attend {}",
                spectrogram.scale(),
                self.input_scale
            )));
        }

        let probabilities = model.run(spectrogram.values()).inspect_err(|e| {
            log::error!("Échec de l'inférence : {e}");
        })?;
        let index = argmax(&probabilities)?;
        let label = self
            .resolver
            .resolve(index)
            .map_err(ModelError::InvariantViolation)?;

        Ok(Prediction {
            label,
            probabilities,
        })
    }
}
