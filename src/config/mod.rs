// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Resolved server configuration

use anyhow::{bail, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::embeddings::ClipModelConfig;
use crate::vision::ocr::OcrModelConfig;
use crate::vision::ExecutionDevice;

pub const DEFAULT_HTTP_HOST: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8060;
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Everything the HTTP server needs to start
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Value every authenticated request must send in the `api-key` header
    pub api_key: String,
    /// Models unused for this long are released; zero keeps them loaded
    pub idle_timeout: Duration,
    /// Load the CLIP text model before serving the first request
    pub auto_load_text_model: bool,
    pub device: ExecutionDevice,
    pub ocr: OcrModelConfig,
    pub clip: ClipModelConfig,
}

impl ServerConfig {
    /// Defaults for everything except the API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HTTP_HOST.to_string(),
            port: DEFAULT_HTTP_PORT,
            api_key: api_key.into(),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            auto_load_text_model: false,
            device: ExecutionDevice::Cpu,
            ocr: OcrModelConfig::default(),
            clip: ClipModelConfig::default(),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {}: {}", addr, e))
    }

    /// Service title reported by `/check`
    pub fn title(&self) -> &'static str {
        "photo-vision-node"
    }
}

impl TryFrom<Cli> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(cli: Cli) -> Result<Self> {
        let api_key = cli.api_key.trim().to_string();
        if api_key.is_empty() {
            bail!("API_AUTH_KEY must not be empty");
        }
        if cli.ocr_batch_size == 0 {
            bail!("OCR_BATCH_SIZE must be at least 1");
        }
        if cli.ocr_base_size == 0 {
            bail!("OCR_BASE_SIZE must be at least 1");
        }

        let ocr = OcrModelConfig {
            model_dir: PathBuf::from(cli.ocr_model_dir),
            device: cli.device,
            batch_size: cli.ocr_batch_size,
            base_size: cli.ocr_base_size,
            ..OcrModelConfig::default()
        };
        let clip = ClipModelConfig {
            model_dir: PathBuf::from(cli.clip_model_dir),
            device: cli.device,
            ..ClipModelConfig::default()
        };

        Ok(Self {
            host: cli.host,
            port: cli.port,
            api_key,
            idle_timeout: Duration::from_secs(cli.idle_timeout_secs),
            auto_load_text_model: cli.auto_load_text_model,
            device: cli.device,
            ocr,
            clip,
        })
    }
}
