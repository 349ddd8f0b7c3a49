use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Invalid label table (empty, duplicated names, reserved sentinel).
    #[error("Table de labels invalide : {0}")]
    LabelTable(String),

    /// A class index outside the label table. Always a model/table mismatch.
    #[error("Index de classe {index} hors de la table ({len} labels)")]
    InvariantViolation {
        /// Index produced by the classifier.
        index: usize,
        /// Number of entries in the label table.
        len: usize,
    },

    /// Unknown spectrogram scale name.
    #[error("Échelle inconnue : {0} (attendu : linear | decibel)")]
    UnknownScale(String),
}
