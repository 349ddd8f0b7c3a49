use gc_audio::AudioError;
use gc_core::CoreError;
use thiserror::Error;

/// Errors originating from the model module.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Invalid classifier configuration (pipeline parameters or label table).
    #[error("Configuration du classifieur invalide : {0}")]
    Config(#[source] CoreError),

    /// ONNX model missing, unreadable, or incompatible with the configuration.
    #[error("Chargement du modèle impossible : {0}")]
    ModelLoad(String),

    /// `predict` called without `reload` on a classifier that was never loaded.
    #[error("Modèle non chargé : appeler load() avant predict()")]
    NotLoaded,

    /// Runtime, shape or numeric failure during the forward pass.
    #[error("Erreur d'inférence : {0}")]
    Inference(String),

    /// Class index outside the label table: model and table disagree.
    #[error("Invariant violé : {0}")]
    InvariantViolation(#[source] CoreError),

    /// Audio failure other than a missing recording.
    #[error(transparent)]
    Audio(#[from] AudioError),
}
