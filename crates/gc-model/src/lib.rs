// Chord classifier: ONNX model session and the predict pipeline.

pub mod classifier;
pub mod error;
pub mod model;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use classifier::{ChordClassifier, Prediction};
pub use error::ModelError;
pub use model::OnnxModel;
