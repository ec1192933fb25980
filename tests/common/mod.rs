#![allow(dead_code)]

pub mod onnx_model;

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use leafscan::{Classifier, ClassifierBuilder, ClassifierError, ImageTensor, InferenceBackend, LabelTable};

pub const LABELS: [&str; 3] = [
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Apple___Black_rot",
];

/// Stands in for the ONNX artifact: scores each class by the mean of one
/// color channel, so red images map to class 0, green to 1, blue to 2.
pub struct ChannelMeanBackend {
    pub declared_shape: Option<Vec<i64>>,
    pub classes: usize,
}

impl ChannelMeanBackend {
    pub fn new() -> Self {
        Self {
            declared_shape: Some(vec![1, 128, 128, 3]),
            classes: 3,
        }
    }
}

impl InferenceBackend for ChannelMeanBackend {
    fn declared_input_shape(&self) -> Option<Vec<i64>> {
        self.declared_shape.clone()
    }

    fn forward(&mut self, input: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        let pixels = (input.len() / 3) as f32;
        let mut scores = vec![0.0f32; self.classes];
        for pixel in input.rows() {
            for c in 0..self.classes.min(3) {
                scores[c] += pixel[c] / pixels;
            }
        }
        Ok(scores)
    }
}

pub fn test_classifier() -> Classifier {
    ClassifierBuilder::new()
        .with_backend(Box::new(ChannelMeanBackend::new()))
        .with_labels(LabelTable::from_labels(LABELS.to_vec()).unwrap())
        .build()
        .expect("Failed to create classifier")
}

pub fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

/// Serves `app` on an ephemeral localhost port for the rest of the test.
pub async fn serve_local(app: axum::Router) -> std::net::SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr
}
