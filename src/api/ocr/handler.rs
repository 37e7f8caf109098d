// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR endpoint handler

use anyhow::Result;
use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use tracing::{debug, info, warn};

use super::response::OcrResponse;
use crate::api::http_server::AppState;
use crate::api::upload::read_file_field;
use crate::api::ApiError;
use crate::vision::ocr::{OcrOutput, TextExtractor};
use crate::vision::{check_dimensions, decode_image_bytes};

/// POST /ocr - Extract text from an uploaded image
///
/// # Request
/// Multipart form with the image in the `file` field.
///
/// # Response
/// - `result.texts`: Recognized text per region, in reading order
/// - `result.scores`: Confidence per region, two decimals
/// - `result.boxes`: `{x, y, width, height}` per region, two decimals
///
/// Undecodable images, images over 10000px on either side and inference
/// failures answer 200 with `{"result": [], "msg": ...}`.
///
/// # Errors
/// - 400 Bad Request: No `file` field
/// - 401 Unauthorized: Missing or wrong `api-key`
/// - 503 Service Unavailable: OCR model failed to load
pub async fn ocr_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, ApiError> {
    let bytes = read_file_field(&mut multipart).await?;

    let extractor = state.models.ocr.acquire().await.map_err(|e| {
        warn!("OCR model not available: {:#}", e);
        ApiError::ServiceUnavailable(format!("OCR model not loaded: {:#}", e))
    })?;

    let outcome = tokio::task::spawn_blocking(move || extract_text(extractor.as_ref(), &bytes))
        .await
        .map_err(|e| ApiError::InternalError(format!("OCR task failed: {}", e)))?;

    match outcome {
        Ok(output) => {
            info!("OCR complete: {} regions", output.texts.len());
            Ok(Json(OcrResponse::success(output)))
        }
        Err(e) => {
            warn!("OCR failed: {:#}", e);
            Ok(Json(OcrResponse::failure(e.to_string())))
        }
    }
}

fn extract_text(extractor: &dyn TextExtractor, bytes: &[u8]) -> Result<OcrOutput> {
    let (image, image_info) = decode_image_bytes(bytes)?;
    debug!(
        "Decoded image: {}x{}, {} bytes",
        image_info.width, image_info.height, image_info.size_bytes
    );
    check_dimensions(&image_info)?;

    let result = extractor.extract(&image.to_rgb8())?;
    Ok(result.to_output())
}
