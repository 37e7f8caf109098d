// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use photo_vision_node::{cli::Cli, config::ServerConfig, start_server};
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServerConfig::try_from(Cli::parse())?;

    info!(
        "🚀 Starting Photo Vision Node v{} (device: {})",
        env!("CARGO_PKG_VERSION"),
        config.device
    );
    info!("OCR models: {}", config.ocr.model_dir.display());
    info!("CLIP models: {}", config.clip.model_dir.display());

    start_server(config).await
}
