mod error;
mod backend;
mod classifier;
mod builder;
mod utils;

pub use error::ClassifierError;
pub use backend::{InferenceBackend, OnnxBackend};
pub use classifier::{Classifier, Prediction};
pub use builder::ClassifierBuilder;

/// Information about the current state and configuration of a classifier
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassifierInfo {
    /// Path to the ONNX model file, if the classifier was built from one
    pub artifact_path: Option<String>,
    /// Model input width in pixels
    pub input_width: u32,
    /// Model input height in pixels
    pub input_height: u32,
    /// Number of classes the classifier is trained on
    pub num_classes: usize,
    /// Labels of the classes, in class-index order
    pub class_labels: Vec<String>,
}
