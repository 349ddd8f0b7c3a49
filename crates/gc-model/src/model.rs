//! ONNX Runtime session for the exported chord CNN.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array2, Array4, ArrayView2};
use ort::session::Session;
use ort::value::Tensor;

use crate::error::ModelError;

/// Chord CNN loaded into an ONNX Runtime session.
///
/// The input is the Keras channels-last layout `[1, bands, frames, 1]` and
/// the first output is one probability per class. `Session::run` takes
/// `&mut self`, so the session sits behind a mutex and concurrent forward
/// passes are serialised.
pub struct OnnxModel {
    session: Mutex<Session>,
    input_name: String,
    input_shape: (usize, usize),
    output_len: usize,
}

impl OnnxModel {
    /// Load the model at `path` for a `(bands, frames)` spectrogram input.
    ///
    /// A zero spectrogram is run once so that a model trained for another
    /// input shape fails here rather than at the first prediction.
    ///
    /// # Errors
    /// Returns [`ModelError::ModelLoad`] if the file is missing, is not a
    /// valid ONNX graph, or rejects the configured input shape.
    pub fn load(path: &Path, input_shape: (usize, usize)) -> Result<Self, ModelError> {
        if !path.exists() {
            return Err(ModelError::ModelLoad(format!(
                "modèle introuvable : {}",
                path.display()
            )));
        }

        let session = Session::builder()
            .and_then(|b| b.with_intra_threads(1))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| ModelError::ModelLoad(format!("{} : {e}", path.display())))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| ModelError::ModelLoad(format!("{} : aucune entrée", path.display())))?;

        let mut model = Self {
            session: Mutex::new(session),
            input_name,
            input_shape,
            output_len: 0,
        };

        let (bands, frames) = input_shape;
        let warmup = model.run(Array2::zeros(input_shape).view()).map_err(|e| {
            ModelError::ModelLoad(format!(
                "{} n'accepte pas une entrée 1×{bands}×{frames}×1 : {e}",
                path.display()
            ))
        })?;
        model.output_len = warmup.len();
        Ok(model)
    }

    /// Name of the graph input fed with the spectrogram.
    #[must_use]
    pub fn input_name(&self) -> &str {
        &self.input_name
    }

    /// Expected input, `(bands, frames)`.
    #[must_use]
    pub fn input_shape(&self) -> (usize, usize) {
        self.input_shape
    }

    /// Number of classes produced by the model.
    #[must_use]
    pub fn output_len(&self) -> usize {
        self.output_len
    }

    /// One-line description for `chordrec check`.
    #[must_use]
    pub fn summary(&self) -> String {
        let (bands, frames) = self.input_shape;
        format!(
            "entrée '{}' 1×{bands}×{frames}×1 → {} classes",
            self.input_name, self.output_len
        )
    }

    /// Forward pass on one spectrogram.
    ///
    /// # Errors
    /// Returns [`ModelError::Inference`] if `input` is not `(bands, frames)`,
    /// the runtime fails, or the output is empty or non-finite.
    pub fn run(&self, input: ArrayView2<'_, f32>) -> Result<Vec<f32>, ModelError> {
        if input.dim() != self.input_shape {
            return Err(ModelError::Inference(format!(
                "entrée {:?}, {:?} attendu",
                input.dim(),
                self.input_shape
            )));
        }

        let (bands, frames) = self.input_shape;
        let batch = Array4::from_shape_fn((1, bands, frames, 1), |(_, b, f, _)| input[[b, f]]);
        let tensor = Tensor::from_array(batch)
            .map_err(|e| ModelError::Inference(format!("création du tenseur : {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::Inference("session ONNX empoisonnée".into()))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let (_, value) = outputs
            .iter()
            .next()
            .ok_or_else(|| ModelError::Inference("le modèle n'a produit aucune sortie".into()))?;
        let (_shape, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Inference(format!("extraction de la sortie : {e}")))?;

        if data.is_empty() {
            return Err(ModelError::Inference("vecteur de sortie vide".into()));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Inference("sortie non finie (NaN/inf)".into()));
        }
        Ok(data.to_vec())
    }
}

/// Index of the first maximum.
///
/// # Errors
/// Returns [`ModelError::Inference`] on an empty or non-finite vector.
pub fn argmax(values: &[f32]) -> Result<usize, ModelError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::Inference("probabilités non finies".into()));
    }
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
        .ok_or_else(|| ModelError::Inference("vecteur de sortie vide".into()))
}
