//! Plant-disease detection from leaf photos, served over HTTP.
//!
//! The pipeline is: raw upload bytes → decoded image → `(1, 128, 128, 3)`
//! tensor scaled to `[0, 1]` → quantized ONNX classifier → argmax class index
//! → disease label.
//!
//! # Basic Usage
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use leafscan::Classifier;
//!
//! let classifier = Classifier::builder()
//!     .with_artifact("artifacts/model.onnx")?
//!     .with_label_file("artifacts/class_names.txt")?
//!     .build()?;
//!
//! let bytes = std::fs::read("leaf.jpg")?;
//! let prediction = classifier.predict_bytes(&bytes)?;
//! println!("Predicted disease: {}", prediction.label);
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! `Classifier` is `Send + Sync`. Forward passes are serialized internally,
//! so one instance can be shared across threads or request handlers through
//! `Arc`.

pub mod classifier;
mod runtime;
pub mod artifact_manager;
pub mod assistant;
pub mod labels;
pub mod preprocess;
pub mod server;

pub use classifier::{
    Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo, InferenceBackend, OnnxBackend,
    Prediction,
};
pub use runtime::{create_session_builder, OptimizationLevel, RuntimeConfig};
pub use artifact_manager::{ArtifactError, ArtifactManager, ArtifactSource, RemoteFile};
pub use assistant::{AssistantClient, AssistantConfig, AssistantError};
pub use labels::LabelTable;
pub use preprocess::{ImageTensor, PreprocessConfig, Preprocessor, DEFAULT_INPUT_SIZE};

/// Initializes `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
