use std::sync::{Arc, Mutex};
use std::time::Instant;

use log::{debug, error};
use serde::Serialize;

use super::backend::InferenceBackend;
use super::error::ClassifierError;
use super::utils::argmax;
use crate::labels::LabelTable;
use crate::preprocess::{tensor_shape, ImageTensor, Preprocessor};

/// Outcome of classifying one uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub class_index: usize,
    /// Raw score of the winning class as produced by the model.
    pub confidence: f32,
}

/// A thread-safe plant-disease classifier.
///
/// # Thread Safety
///
/// The backend holds fixed input/output buffers, so every forward pass runs
/// under a `Mutex`. Everything else (label table, preprocessing settings) is
/// immutable after `build()`, which makes the classifier `Send + Sync` and
/// shareable through `Arc`:
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use leafscan::Classifier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let classifier = Arc::new(Classifier::builder()
///     .with_artifact("model.onnx")?
///     .with_label_file("class_names.txt")?
///     .build()?);
///
/// let bytes = std::fs::read("leaf.jpg")?;
/// let classifier_clone = Arc::clone(&classifier);
/// thread::spawn(move || {
///     classifier_clone.predict_bytes(&bytes).unwrap();
/// });
/// # Ok(())
/// # }
/// ```
pub struct Classifier {
    pub(crate) artifact_path: Option<String>,
    pub(crate) backend: Mutex<Box<dyn InferenceBackend>>,
    pub(crate) labels: Arc<LabelTable>,
    pub(crate) preprocessor: Preprocessor,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("artifact_path", &self.artifact_path)
            .field("num_classes", &self.labels.len())
            .field("preprocessor", &self.preprocessor)
            .finish_non_exhaustive()
    }
}

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> super::ClassifierInfo {
        let config = self.preprocessor.config();
        super::ClassifierInfo {
            artifact_path: self.artifact_path.clone(),
            input_width: config.width,
            input_height: config.height,
            num_classes: self.labels.len(),
            class_labels: self.labels.labels().to_vec(),
        }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Runs one forward pass and returns the index of the best-scoring class.
    ///
    /// Ties go to the lowest index, so the same tensor always maps to the same class.
    ///
    /// # Errors
    /// - `ShapeMismatchError` if `tensor` is not the shape the preprocessor produces
    /// - `ModelError` if the forward pass fails or yields no usable scores
    pub fn classify(&self, tensor: &ImageTensor) -> Result<usize, ClassifierError> {
        self.score(tensor).map(|(index, _)| index)
    }

    fn score(&self, tensor: &ImageTensor) -> Result<(usize, f32), ClassifierError> {
        let expected = self.preprocessor.input_shape();
        if tensor.shape() != expected {
            return Err(ClassifierError::ShapeMismatchError {
                expected: expected.iter().map(|&d| d as i64).collect(),
                actual: tensor_shape(tensor),
            });
        }

        let scores = {
            let mut backend = self.backend.lock().map_err(|_| {
                ClassifierError::ModelError("Classifier backend lock poisoned".into())
            })?;
            backend.forward(tensor)?
        };

        argmax(&scores).ok_or_else(|| {
            ClassifierError::ModelError(format!(
                "Model produced no usable scores ({} values)",
                scores.len()
            ))
        })
    }

    /// Looks up the label for a class index produced by `classify`.
    pub fn label_for(&self, index: usize) -> Result<&str, ClassifierError> {
        self.labels.label_for(index).inspect_err(|e| {
            error!("Classifier and label table disagree: {}", e);
        })
    }

    /// Full pipeline: decode and preprocess `bytes`, classify, map to a label.
    ///
    /// # Example
    /// ```no_run
    /// # use leafscan::Classifier;
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let classifier = Classifier::builder()
    /// #     .with_artifact("model.onnx")?
    /// #     .with_label_file("class_names.txt")?
    /// #     .build()?;
    /// let prediction = classifier.predict_bytes(&std::fs::read("leaf.jpg")?)?;
    /// println!("Predicted disease: {}", prediction.label);
    /// # Ok(())
    /// # }
    /// ```
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction, ClassifierError> {
        let start = Instant::now();
        let tensor = self.preprocessor.prepare(bytes)?;
        let (class_index, confidence) = self.score(&tensor)?;
        let label = self.label_for(class_index)?.to_string();
        debug!("Classified {} bytes as '{}' in {:.2?}", bytes.len(), label, start.elapsed());

        Ok(Prediction {
            label,
            class_index,
            confidence,
        })
    }
}
