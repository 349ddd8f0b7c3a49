/// Configuration, labels, and shared error types for chordrec.
///
/// Every stage of the pipeline (loader, extractor, classifier) receives the
/// same validated [`PipelineConfig`], so a spectrogram can never be produced
/// with parameters that differ from the ones the classifier expects.

pub mod config;
pub mod error;
pub mod label;

pub use config::{PipelineConfig, Scale};
pub use error::CoreError;
pub use label::{Label, LabelResolver};
