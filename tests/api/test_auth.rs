// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! API key enforcement
//!
//! Every route except `/` requires the `api-key` header.

use axum::http::{Method, StatusCode};

use super::support::*;

#[tokio::test]
async fn test_root_needs_no_key() {
    let (app, _) = test_app();
    let response = send(app, empty_request(Method::GET, "/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["about"], "photo-vision-node");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_missing_key_rejected() {
    let (app, _) = test_app();
    let response = send(app, empty_request(Method::POST, "/check", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!({"detail": "Invalid API key"}));
}

#[tokio::test]
async fn test_wrong_key_rejected_on_every_protected_route() {
    for uri in ["/check", "/restart", "/ocr", "/clip/img", "/clip/txt"] {
        let (app, _) = test_app();
        let response = send(app, empty_request(Method::POST, uri, Some("nope"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "route {}", uri);
    }
}

#[tokio::test]
async fn test_rejected_request_never_loads_models() {
    let (app, state) = test_app();
    let request = upload_request("/ocr", "file", &png_bytes(32, 32), Some("nope"));
    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(state.models.loaded_models().await.is_empty());
}
