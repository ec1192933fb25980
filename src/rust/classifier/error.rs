use ort::Error as OrtError;
use std::fmt;

/// Represents the different types of errors that can occur in the leaf classification pipeline.
#[derive(Debug)]
pub enum ClassifierError {
    /// The uploaded bytes are not a recognizable image
    DecodeError(String),
    /// A tensor does not match the shape the artifact was built for
    ShapeMismatchError {
        expected: Vec<i64>,
        actual: Vec<i64>,
    },
    /// The classifier artifact or label resource is missing or corrupt
    ArtifactLoadError(String),
    /// The label table and the classifier disagree on the number of classes
    LabelMismatchError {
        labels: usize,
        outputs: usize,
    },
    /// A class index fell outside the label table
    IndexRangeError {
        index: usize,
        len: usize,
    },
    /// Error occurred while running the model
    ModelError(String),
    /// The artifact's input tensor is not of the element type the preprocessor produces
    InputTypeError {
        expected: String,
        actual: String,
    },
    /// Error occurred during the build phase
    BuildError(String),
}

impl ClassifierError {
    /// True when the failure was caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::DecodeError(_))
    }
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            Self::ShapeMismatchError { expected, actual } => write!(
                f,
                "Shape mismatch: expected {:?}, got {:?}",
                expected, actual
            ),
            Self::ArtifactLoadError(msg) => write!(f, "Artifact load error: {}", msg),
            Self::LabelMismatchError { labels, outputs } => write!(
                f,
                "Label table has {} entries but the classifier produces {} scores",
                labels, outputs
            ),
            Self::IndexRangeError { index, len } => write!(
                f,
                "Class index {} is out of range for a label table of {} entries",
                index, len
            ),
            Self::ModelError(msg) => write!(f, "Model error: {}", msg),
            Self::InputTypeError { expected, actual } => write!(
                f,
                "Input type mismatch: expected {} elements, got {}",
                expected, actual
            ),
            Self::BuildError(msg) => write!(f, "Build error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::ArtifactLoadError(err.to_string())
    }
}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        ClassifierError::DecodeError(err.to_string())
    }
}
