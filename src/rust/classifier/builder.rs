use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{error, info};
use ndarray::Array4;

use super::backend::{InferenceBackend, OnnxBackend};
use super::classifier::Classifier;
use super::error::ClassifierError;
use crate::labels::LabelTable;
use crate::preprocess::{PreprocessConfig, Preprocessor};
use crate::runtime::RuntimeConfig;

/// A builder for constructing a Classifier with a fluent interface.
///
/// `build()` is where every startup check happens: the artifact's declared
/// input shape must match the preprocessor output, and the model's score
/// vector must be exactly as wide as the label table. A classifier that
/// exists has passed both.
#[derive(Default)]
pub struct ClassifierBuilder {
    artifact_path: Option<String>,
    backend: Option<Box<dyn InferenceBackend>>,
    labels: Option<LabelTable>,
    preprocess_config: PreprocessConfig,
    runtime_config: RuntimeConfig,
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    ///
    /// # Example
    /// ```
    /// use leafscan::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new();
    /// ```
    pub fn new() -> Self {
        Self {
            artifact_path: None,
            backend: None,
            labels: None,
            preprocess_config: PreprocessConfig::default(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Sets the runtime configuration for ONNX model execution.
    ///
    /// Only affects artifacts loaded afterwards with `with_artifact`.
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Sets the model input resolution (defaults to 128x128).
    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.preprocess_config = PreprocessConfig { width, height };
        self
    }

    /// Loads the ONNX classifier artifact at `model_path`.
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance if successful, or an error if:
    ///   - The path is empty
    ///   - A model is already set
    ///   - The file doesn't exist or ONNX Runtime cannot load it
    ///
    /// # Example
    /// ```no_run
    /// use leafscan::ClassifierBuilder;
    ///
    /// let builder = ClassifierBuilder::new()
    ///     .with_artifact("artifacts/model.onnx");
    /// ```
    pub fn with_artifact<P: AsRef<Path>>(mut self, model_path: P) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        if model_path.as_os_str().is_empty() {
            return Err(ClassifierError::BuildError("Model path cannot be empty".to_string()));
        }
        if self.backend.is_some() {
            return Err(ClassifierError::BuildError("Model already set".to_string()));
        }

        let backend = OnnxBackend::load(model_path, &self.runtime_config).map_err(|e| {
            error!("Failed to load classifier artifact {}: {}", model_path.display(), e);
            e
        })?;
        info!("Classifier artifact loaded from {}", model_path.display());

        self.artifact_path = Some(model_path.to_string_lossy().to_string());
        self.backend = Some(Box::new(backend));
        Ok(self)
    }

    /// Uses an already constructed inference backend instead of loading an artifact.
    pub fn with_backend(mut self, backend: Box<dyn InferenceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_labels(mut self, labels: LabelTable) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Loads the label table from a text file, one label per line.
    pub fn with_label_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ClassifierError> {
        let labels = LabelTable::load(path)?;
        Ok(self.with_labels(labels))
    }

    /// Builds and returns the final Classifier instance
    ///
    /// # Returns
    /// * `Result<Classifier, ClassifierError>` - The constructed Classifier if successful,
    ///   or an error if:
    ///   - No model or no label table was set
    ///   - The input resolution is zero
    ///   - The declared input shape differs from `[1, H, W, 3]` (`ShapeMismatchError`)
    ///   - The trial forward pass on a blank image fails
    ///   - The score vector width differs from the label count (`LabelMismatchError`)
    pub fn build(self) -> Result<Classifier, ClassifierError> {
        let mut backend = self.backend
            .ok_or_else(|| ClassifierError::BuildError("A model must be set".to_string()))?;
        let labels = self.labels
            .ok_or_else(|| ClassifierError::BuildError("A label table must be set".to_string()))?;
        if self.preprocess_config.width == 0 || self.preprocess_config.height == 0 {
            return Err(ClassifierError::BuildError("Input size must be non-zero".to_string()));
        }

        let preprocessor = Preprocessor::new(self.preprocess_config);
        let expected = preprocessor.input_shape();

        match backend.declared_input_shape() {
            Some(declared) => {
                Self::validate_input_shape(&declared, &expected)?;
                info!("Model input shape {:?} validated", declared);
            }
            None => info!("Model does not declare an input shape, relying on the trial pass"),
        }

        // Run a blank image through the model to learn the score vector width
        let blank = Array4::<f32>::zeros((expected[0], expected[1], expected[2], expected[3]));
        let scores = backend.forward(&blank)?;
        if scores.len() != labels.len() {
            error!(
                "Label table has {} entries but the model produces {} scores",
                labels.len(),
                scores.len()
            );
            return Err(ClassifierError::LabelMismatchError {
                labels: labels.len(),
                outputs: scores.len(),
            });
        }
        info!("Classifier ready with {} classes", labels.len());

        Ok(Classifier {
            artifact_path: self.artifact_path,
            backend: Mutex::new(backend),
            labels: Arc::new(labels),
            preprocessor,
        })
    }

    /// Compares a declared model input shape with the preprocessor output.
    ///
    /// Negative declared dimensions are symbolic and match anything.
    fn validate_input_shape(
        declared: &[i64],
        expected: &[usize; 4],
    ) -> Result<(), ClassifierError> {
        let matches = declared.len() == expected.len()
            && declared
                .iter()
                .zip(expected.iter())
                .all(|(&d, &e)| d < 0 || d as usize == e);

        if matches {
            Ok(())
        } else {
            Err(ClassifierError::ShapeMismatchError {
                expected: expected.iter().map(|&d| d as i64).collect(),
                actual: declared.to_vec(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::ImageTensor;

    struct FixedBackend {
        shape: Option<Vec<i64>>,
        scores: Vec<f32>,
    }

    impl InferenceBackend for FixedBackend {
        fn declared_input_shape(&self) -> Option<Vec<i64>> {
            self.shape.clone()
        }

        fn forward(&mut self, _input: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
            Ok(self.scores.clone())
        }
    }

    fn backend(shape: Option<Vec<i64>>, classes: usize) -> Box<dyn InferenceBackend> {
        Box::new(FixedBackend {
            shape,
            scores: vec![0.0; classes],
        })
    }

    fn labels(n: usize) -> LabelTable {
        LabelTable::from_labels((0..n).map(|i| format!("class_{}", i)).collect()).unwrap()
    }

    #[test]
    fn test_build_requires_model_and_labels() {
        assert!(matches!(
            ClassifierBuilder::new().with_labels(labels(2)).build(),
            Err(ClassifierError::BuildError(_))
        ));
        assert!(matches!(
            ClassifierBuilder::new().with_backend(backend(None, 2)).build(),
            Err(ClassifierError::BuildError(_))
        ));
    }

    #[test]
    fn test_dynamic_batch_dimension_is_accepted() {
        let classifier = ClassifierBuilder::new()
            .with_backend(backend(Some(vec![-1, 128, 128, 3]), 4))
            .with_labels(labels(4))
            .build();
        assert!(classifier.is_ok());
    }

    #[test]
    fn test_channels_first_model_is_rejected() {
        let result = ClassifierBuilder::new()
            .with_backend(backend(Some(vec![1, 3, 128, 128]), 4))
            .with_labels(labels(4))
            .build();
        match result {
            Err(ClassifierError::ShapeMismatchError { expected, actual }) => {
                assert_eq!(expected, vec![1, 128, 128, 3]);
                assert_eq!(actual, vec![1, 3, 128, 128]);
            }
            other => panic!("expected ShapeMismatchError, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_label_count_must_match_model_outputs() {
        let result = ClassifierBuilder::new()
            .with_backend(backend(None, 5))
            .with_labels(labels(3))
            .build();
        assert!(matches!(
            result,
            Err(ClassifierError::LabelMismatchError { labels: 3, outputs: 5 })
        ));
    }

    #[test]
    fn test_zero_input_size_is_rejected() {
        let result = ClassifierBuilder::new()
            .with_input_size(0, 128)
            .with_backend(backend(None, 2))
            .with_labels(labels(2))
            .build();
        assert!(matches!(result, Err(ClassifierError::BuildError(_))));
    }

    #[test]
    fn test_missing_artifact_fails_to_load() {
        let result = ClassifierBuilder::new().with_artifact("/nonexistent/leafscan/model.onnx");
        assert!(matches!(result, Err(ClassifierError::ArtifactLoadError(_))));
    }
}
