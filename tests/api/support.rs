// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for the HTTP tests

use anyhow::Result;
use axum::{
    body::Body,
    http::{Method, Request},
    response::Response,
    Router,
};
use image::{DynamicImage, Rgb, RgbImage};
use photo_vision_node::api::{create_router, AppState, API_KEY_HEADER};
use photo_vision_node::config::ServerConfig;
use photo_vision_node::embeddings::{ImageEmbedder, TextEmbedder};
use photo_vision_node::vision::image_utils::encode_png;
use photo_vision_node::vision::ocr::{OcrResult, Quad, RecognizedText, TextExtractor, TextRegion};
use photo_vision_node::vision::{ModelHandle, ModelManager};
use std::sync::Arc;
use tower::util::ServiceExt;

pub const TEST_API_KEY: &str = "test-key";
const BOUNDARY: &str = "----photo-vision-boundary";

/// Reports one fixed region for any image
pub struct FakeOcr;

impl TextExtractor for FakeOcr {
    fn extract(&self, _image: &RgbImage) -> Result<OcrResult> {
        Ok(OcrResult {
            regions: vec![TextRegion::new(
                Quad::new([[10.004, 20.006], [50.0, 20.0], [50.0, 40.0], [10.0, 40.0]]),
                RecognizedText::new("你好".to_string(), 0.987),
            )],
        })
    }
}

/// Embeds everything as `[0.5, -0.25]`
pub struct FakeClip;

impl ImageEmbedder for FakeClip {
    fn embed_image(&self, _image: &DynamicImage) -> Result<Vec<f32>> {
        Ok(vec![0.5, -0.25])
    }
}

impl TextEmbedder for FakeClip {
    fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.5, -0.25])
    }
}

pub fn fake_models() -> ModelManager {
    ModelManager::new(
        ModelHandle::new("ocr", || Ok(Arc::new(FakeOcr) as Arc<dyn TextExtractor>)),
        ModelHandle::new("clip-image", || {
            Ok(Arc::new(FakeClip) as Arc<dyn ImageEmbedder>)
        }),
        ModelHandle::new("clip-text", || Ok(Arc::new(FakeClip) as Arc<dyn TextEmbedder>)),
    )
}

/// Handles whose loaders always fail
pub fn broken_models() -> ModelManager {
    ModelManager::new(
        ModelHandle::new("ocr", || anyhow::bail!("det_model.onnx not found")),
        ModelHandle::new("clip-image", || anyhow::bail!("image model not found")),
        ModelHandle::new("clip-text", || anyhow::bail!("text model not found")),
    )
}

pub fn test_state(models: ModelManager) -> AppState {
    AppState::new(ServerConfig::new(TEST_API_KEY), models)
}

pub fn test_app() -> (Router, AppState) {
    let state = test_state(fake_models());
    (create_router(state.clone()), state)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    encode_png(&DynamicImage::ImageRgb8(image)).unwrap()
}

/// `multipart/form-data` body with a single file field
pub fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"upload.png\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(uri: &str, field: &str, bytes: &[u8], api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(key) = api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::from(multipart_body(field, bytes))).unwrap()
}

pub fn json_request(uri: &str, json: serde_json::Value, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::from(json.to_string())).unwrap()
}

pub fn empty_request(method: Method, uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header(API_KEY_HEADER, key);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn send(app: Router, request: Request<Body>) -> Response {
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
