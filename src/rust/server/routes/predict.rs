//! Image classification endpoint

use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use log::info;
use serde::{Deserialize, Serialize};

use crate::server::{ApiError, SharedState};

/// Name of the multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
}

/// POST /predict - Classify an uploaded leaf photo
///
/// The whole upload is buffered, then decoding, preprocessing and inference
/// run on the blocking thread pool so a slow forward pass never stalls the
/// async workers accepting other requests.
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut multipart = multipart?;
    let bytes = read_file_field(&mut multipart).await?;

    let start = Instant::now();
    let size = bytes.len();
    let classifier = Arc::clone(&state.classifier);
    let prediction = tokio::task::spawn_blocking(move || classifier.predict_bytes(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Inference task failed: {}", e)))??;

    info!(
        "Predicted '{}' (class {}) for {} byte upload in {:.2?}",
        prediction.label,
        prediction.class_index,
        size,
        start.elapsed()
    );

    Ok(Json(PredictResponse {
        prediction: prediction.label,
    }))
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            return Ok(field.bytes().await?);
        }
    }
    Err(ApiError::BadRequest(format!(
        "Missing '{}' field in multipart upload",
        FILE_FIELD
    )))
}
