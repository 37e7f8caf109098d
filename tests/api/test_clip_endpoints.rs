// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /clip/img and POST /clip/txt

use axum::http::StatusCode;
use photo_vision_node::api::create_router;

use super::support::*;

#[tokio::test]
async fn test_clip_image_embedding() {
    let (app, _) = test_app();
    let request = upload_request("/clip/img", "file", &png_bytes(32, 32), Some(TEST_API_KEY));
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(
        json,
        serde_json::json!({"result": ["0.5000000000000000", "-0.2500000000000000"]})
    );
}

#[tokio::test]
async fn test_clip_image_undecodable() {
    let (app, _) = test_app();
    let request = upload_request("/clip/img", "file", b"\x00\x01\x02\x03", Some(TEST_API_KEY));
    let json = body_json(send(app, request).await).await;
    assert_eq!(json["result"], serde_json::json!([]));
    assert!(json["msg"].is_string());
}

#[tokio::test]
async fn test_clip_text_embedding() {
    let (app, state) = test_app();
    let request = json_request(
        "/clip/txt",
        serde_json::json!({"text": "海边的日落"}),
        Some(TEST_API_KEY),
    );
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["result"][0], "0.5000000000000000");
    assert!(state.models.clip_text.is_loaded().await);
    assert!(!state.models.clip_image.is_loaded().await);
}

#[tokio::test]
async fn test_clip_text_empty_rejected() {
    let (app, _) = test_app();
    let request = json_request("/clip/txt", serde_json::json!({"text": ""}), Some(TEST_API_KEY));
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clip_text_model_unavailable() {
    let app = create_router(test_state(broken_models()));
    let request = json_request("/clip/txt", serde_json::json!({"text": "cat"}), Some(TEST_API_KEY));
    let response = send(app, request).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
