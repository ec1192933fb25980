//! Image decoding and tensor construction for the classifier input.
//!
//! Every upload, whatever its format, size or color mode, becomes a
//! `(1, height, width, 3)` tensor of `f32` values in `[0.0, 1.0]`:
//!
//! 1. decode the bytes (format is sniffed from the content, not the file name)
//! 2. convert to 8-bit RGB (alpha is dropped, grayscale is expanded)
//! 3. resize directly to the model resolution with bicubic filtering,
//!    without preserving aspect ratio
//! 4. divide every channel value by 255
//! 5. add the leading batch dimension

use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::Array4;

use crate::classifier::ClassifierError;

/// Resolution the bundled plant-disease model was trained at.
pub const DEFAULT_INPUT_SIZE: u32 = 128;

/// Number of color channels in the model input.
pub const CHANNELS: usize = 3;

/// Model input tensor, laid out NHWC.
pub type ImageTensor = Array4<f32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_INPUT_SIZE,
            height: DEFAULT_INPUT_SIZE,
        }
    }
}

impl PreprocessConfig {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
}

/// Converts uploaded image bytes into classifier input tensors.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> PreprocessConfig {
        self.config
    }

    /// Shape of every tensor this preprocessor produces: `[1, H, W, 3]`.
    pub fn input_shape(&self) -> [usize; 4] {
        [
            1,
            self.config.height as usize,
            self.config.width as usize,
            CHANNELS,
        ]
    }

    /// Decodes `bytes` and builds the model input tensor.
    ///
    /// # Errors
    /// - `DecodeError` if the bytes are empty or not a recognizable image
    pub fn prepare(&self, bytes: &[u8]) -> Result<ImageTensor, ClassifierError> {
        if bytes.is_empty() {
            return Err(ClassifierError::DecodeError("Uploaded file is empty".into()));
        }
        let image = image::load_from_memory(bytes)?;
        self.prepare_image(&image)
    }

    /// Builds the model input tensor from an already decoded image.
    pub fn prepare_image(&self, image: &DynamicImage) -> Result<ImageTensor, ClassifierError> {
        let rgb = image.to_rgb8();
        let resized = imageops::resize(
            &rgb,
            self.config.width,
            self.config.height,
            FilterType::CatmullRom,
        );

        let values: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();

        let [n, h, w, c] = self.input_shape();
        Array4::from_shape_vec((n, h, w, c), values).map_err(|e| {
            ClassifierError::ModelError(format!("Failed to create input tensor: {}", e))
        })
    }
}

/// Shape of a tensor as the signed dimensions ONNX Runtime reports.
pub fn tensor_shape(tensor: &ImageTensor) -> Vec<i64> {
    tensor.shape().iter().map(|&d| d as i64).collect()
}
