use std::collections::HashMap;
use std::path::Path;

use log::info;
use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};

use super::error::ClassifierError;
use crate::preprocess::{tensor_shape, ImageTensor};
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Runs one forward pass of an image classifier.
///
/// An implementation owns fixed input and output slots, which is why
/// `forward` takes `&mut self`: callers sharing a backend must serialize
/// access to it. `Classifier` does so with a mutex.
///
/// The expected model contract is:
/// - one image input of shape `[1, H, W, 3]`, `f32`, values in `[0, 1]`
/// - one output holding a score per class, shape `[1, N]` or `[N]`
pub trait InferenceBackend: Send {
    /// Input shape the artifact declares, if it declares one.
    ///
    /// Negative dimensions are symbolic (for example a dynamic batch axis).
    fn declared_input_shape(&self) -> Option<Vec<i64>>;

    /// Writes `input` into the input slot, runs the model, and returns the score vector.
    fn forward(&mut self, input: &ImageTensor) -> Result<Vec<f32>, ClassifierError>;
}

/// `InferenceBackend` over an ONNX Runtime session.
#[derive(Debug)]
pub struct OnnxBackend {
    session: Session,
    input_name: String,
    output_name: String,
    input_shape: Option<Vec<i64>>,
}

impl OnnxBackend {
    /// Loads the artifact at `model_path` and resolves its input and output slots.
    ///
    /// # Errors
    /// - `ArtifactLoadError` if the file is missing or cannot be parsed by ONNX Runtime
    /// - `ArtifactLoadError` if the model has no inputs or no outputs
    /// - `InputTypeError` if the image input is not an `f32` tensor
    pub fn load<P: AsRef<Path>>(
        model_path: P,
        config: &RuntimeConfig,
    ) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(ClassifierError::ArtifactLoadError(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let session = create_session_builder(config)?
            .commit_from_file(model_path)?;
        Self::from_session(session)
    }

    pub fn from_session(session: Session) -> Result<Self, ClassifierError> {
        let input = session.inputs.first().ok_or_else(|| {
            ClassifierError::ArtifactLoadError(
                "Model must have at least 1 input for the image".to_string(),
            )
        })?;
        let output = session.outputs.first().ok_or_else(|| {
            ClassifierError::ArtifactLoadError(
                "Model must have at least 1 output for class scores".to_string(),
            )
        })?;

        let input_shape = match &input.input_type {
            ValueType::Tensor { ty, dimensions, .. } => {
                if *ty != TensorElementType::Float32 {
                    return Err(ClassifierError::InputTypeError {
                        expected: TensorElementType::Float32.to_string(),
                        actual: ty.to_string(),
                    });
                }
                Some(dimensions.clone())
            }
            _ => None,
        };
        let input_name = input.name.clone();
        let output_name = output.name.clone();

        info!(
            "Resolved model slots: input '{}' {:?}, output '{}'",
            input_name, input_shape, output_name
        );

        Ok(Self {
            session,
            input_name,
            output_name,
            input_shape,
        })
    }
}

impl InferenceBackend for OnnxBackend {
    fn declared_input_shape(&self) -> Option<Vec<i64>> {
        self.input_shape.clone()
    }

    fn forward(&mut self, input: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        let input_dyn = input.clone().into_dyn();
        let input_view = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            self.input_name.as_str(),
            Tensor::from_array(&input_view).map_err(|e| {
                ClassifierError::ModelError(format!(
                    "Failed to create input tensor {:?}: {}",
                    tensor_shape(input),
                    e
                ))
            })?,
        );

        let outputs = self.session.run(input_tensors)
            .map_err(|e| ClassifierError::ModelError(format!("Failed to run model: {}", e)))?;
        let scores = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| {
                ClassifierError::ModelError(format!("Failed to extract output tensor: {}", e))
            })?;

        Ok(scores.iter().copied().collect())
    }
}
