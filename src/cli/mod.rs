// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use clap::Parser;

use crate::vision::ExecutionDevice;

/// Photo Vision Node - OCR and CLIP embedding server
#[derive(Parser, Debug, Clone)]
#[command(name = "photo-vision-node")]
#[command(version)]
#[command(about = "OCR and CLIP embedding HTTP server", long_about = None)]
pub struct Cli {
    /// Key clients send in the `api-key` header
    #[arg(long, env = "API_AUTH_KEY")]
    pub api_key: String,

    /// Address to listen on
    #[arg(long, env = "HTTP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "HTTP_PORT", default_value_t = 8060)]
    pub port: u16,

    /// Release models unused for this many seconds (0 disables)
    #[arg(long = "idle-timeout", env = "MODEL_IDLE_TIMEOUT_SECS", default_value_t = 300)]
    pub idle_timeout_secs: u64,

    /// Load the CLIP text model at startup
    #[arg(long = "auto-load-text-model", env = "AUTO_LOAD_TXT_MODEL")]
    pub auto_load_text_model: bool,

    /// Directory holding det_model.onnx, rec_model.onnx and ppocr_keys.txt
    #[arg(long, env = "OCR_MODEL_DIR", default_value = "models/ocr")]
    pub ocr_model_dir: String,

    /// Directory holding the CLIP encoders and tokenizer.json
    #[arg(long, env = "CLIP_MODEL_DIR", default_value = "models/clip")]
    pub clip_model_dir: String,

    /// Execution device for ONNX Runtime
    #[arg(long, env = "INFERENCE_DEVICE", value_enum, default_value_t = ExecutionDevice::Cpu)]
    pub device: ExecutionDevice,

    /// Crops per recognition batch
    #[arg(long, env = "OCR_BATCH_SIZE", default_value_t = 6)]
    pub ocr_batch_size: usize,

    /// Detection input grid size
    #[arg(long, env = "OCR_BASE_SIZE", default_value_t = 320)]
    pub ocr_base_size: u32,
}
