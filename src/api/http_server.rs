// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::clip::{clip_image_handler, clip_text_handler};
use super::handlers::{check_handler, restart_handler, root_handler};
use super::ocr::ocr_handler;
use super::ApiError;
use crate::config::ServerConfig;
use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::{spawn_idle_reaper, ModelManager};

/// Header carrying the client's key
pub const API_KEY_HEADER: &str = "api-key";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub models: Arc<ModelManager>,
}

impl AppState {
    pub fn new(config: ServerConfig, models: ModelManager) -> Self {
        Self {
            config: Arc::new(config),
            models: Arc::new(models),
        }
    }

    /// State backed by the ONNX models named in `config`
    pub fn from_config(config: ServerConfig) -> Self {
        let models = ModelManager::from_configs(config.ocr.clone(), config.clip.clone());
        Self::new(config, models)
    }
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided != Some(state.config.api_key.as_str()) {
        warn!("Rejected {} {}: invalid API key", request.method(), request.uri().path());
        return ApiError::Unauthorized("Invalid API key".to_string()).into_response();
    }

    next.run(request).await
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/check", post(check_handler))
        // Release loaded models
        .route("/restart", post(restart_handler))
        // Text extraction
        .route("/ocr", post(ocr_handler))
        // CLIP embeddings
        .route("/clip/img", post(clip_image_handler))
        .route("/clip/txt", post(clip_text_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        // Service info, no key required
        .route("/", get(root_handler))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let addr = config.bind_addr()?;
    let state = AppState::from_config(config);

    let reaper = spawn_idle_reaper(state.models.clone(), state.config.idle_timeout);
    match &reaper {
        Some(_) => info!("Idle models released after {:?}", state.config.idle_timeout),
        None => info!("Idle model release disabled"),
    }

    if state.config.auto_load_text_model {
        info!("Preloading CLIP text model");
        state.models.preload_text_model().await;
    }

    let app = create_router(state.clone());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await
        .context("HTTP server error")?;

    if let Some(reaper) = reaper {
        reaper.abort();
    }
    state.models.release_all().await;
    Ok(())
}
