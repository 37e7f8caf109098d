// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::http_server::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutResponse {
    pub about: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub result: String,
    pub title: String,
    pub device: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartResponse {
    pub result: String,
}

/// GET /
pub async fn root_handler() -> Json<AboutResponse> {
    Json(AboutResponse {
        about: "photo-vision-node".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /check
pub async fn check_handler(State(state): State<AppState>) -> Json<CheckResponse> {
    Json(CheckResponse {
        result: "pass".to_string(),
        title: state.config.title().to_string(),
        device: state.config.device.to_string(),
    })
}

/// POST /restart - drop every loaded model; the next request reloads it
pub async fn restart_handler(State(state): State<AppState>) -> Json<RestartResponse> {
    let released = state.models.release_all().await;
    info!("Restart requested, released {} model(s)", released);
    Json(RestartResponse {
        result: "pass".to_string(),
    })
}
