// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CLIP endpoint handlers

use anyhow::Result;
use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use tracing::{debug, info, warn};

use super::request::ClipTextRequest;
use super::response::ClipResponse;
use crate::api::http_server::AppState;
use crate::api::upload::read_file_field;
use crate::api::ApiError;
use crate::embeddings::ImageEmbedder;
use crate::vision::decode_image_bytes;

/// POST /clip/img - Embed an uploaded image
///
/// Undecodable images and inference failures answer 200 with
/// `{"result": [], "msg": ...}`.
///
/// # Errors
/// - 400 Bad Request: No `file` field
/// - 503 Service Unavailable: CLIP image model failed to load
pub async fn clip_image_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ClipResponse>, ApiError> {
    let bytes = read_file_field(&mut multipart).await?;

    let embedder = state.models.clip_image.acquire().await.map_err(|e| {
        warn!("CLIP image model not available: {:#}", e);
        ApiError::ServiceUnavailable(format!("CLIP image model not loaded: {:#}", e))
    })?;

    let outcome = tokio::task::spawn_blocking(move || embed_image(embedder.as_ref(), &bytes))
        .await
        .map_err(|e| ApiError::InternalError(format!("CLIP task failed: {}", e)))?;

    match outcome {
        Ok(embedding) => {
            info!("Image embedded: {} dimensions", embedding.len());
            Ok(Json(ClipResponse::from_embedding(&embedding)))
        }
        Err(e) => {
            warn!("Image embedding failed: {:#}", e);
            Ok(Json(ClipResponse::failure(e.to_string())))
        }
    }
}

fn embed_image(embedder: &dyn ImageEmbedder, bytes: &[u8]) -> Result<Vec<f32>> {
    let (image, image_info) = decode_image_bytes(bytes)?;
    debug!("Decoded image: {}x{}", image_info.width, image_info.height);
    embedder.embed_image(&image)
}

/// POST /clip/txt - Embed a piece of text
///
/// # Errors
/// - 400 Bad Request: Empty text
/// - 503 Service Unavailable: CLIP text model failed to load
/// - 500 Internal Server Error: Tokenization or inference failed
pub async fn clip_text_handler(
    State(state): State<AppState>,
    Json(request): Json<ClipTextRequest>,
) -> Result<Json<ClipResponse>, ApiError> {
    request.validate()?;
    debug!("Text embedding request: {} chars", request.text.chars().count());

    let embedder = state.models.clip_text.acquire().await.map_err(|e| {
        warn!("CLIP text model not available: {:#}", e);
        ApiError::ServiceUnavailable(format!("CLIP text model not loaded: {:#}", e))
    })?;

    let embedding = tokio::task::spawn_blocking(move || embedder.embed_text(&request.text))
        .await
        .map_err(|e| ApiError::InternalError(format!("CLIP task failed: {}", e)))?
        .map_err(|e| {
            warn!("Text embedding failed: {:#}", e);
            ApiError::InternalError(format!("Text embedding failed: {}", e))
        })?;

    Ok(Json(ClipResponse::from_embedding(&embedding)))
}
