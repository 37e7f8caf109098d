// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ONNX Runtime session construction shared by the OCR and CLIP models

use anyhow::{Context, Result};
use clap::ValueEnum;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Intra-op threads per session
const INTRA_THREADS: usize = 4;

/// Where inference should run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionDevice {
    #[default]
    Cpu,
    Cuda,
}

impl ExecutionDevice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionDevice::Cpu => "cpu",
            ExecutionDevice::Cuda => "cuda",
        }
    }
}

impl fmt::Display for ExecutionDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a session for `model_path` on the requested device
///
/// CUDA is attempted first when requested; any failure there falls back to the
/// CPU provider. Returns the device the session actually uses.
pub fn build_session(model_path: &Path, device: ExecutionDevice) -> Result<(Session, ExecutionDevice)> {
    if device == ExecutionDevice::Cuda {
        match build_cuda_session(model_path) {
            Ok(session) => {
                info!("Loaded {} on CUDA", model_path.display());
                return Ok((session, ExecutionDevice::Cuda));
            }
            Err(e) => {
                warn!(
                    "CUDA session for {} failed, falling back to CPU: {}",
                    model_path.display(),
                    e
                );
            }
        }
    }

    let session = Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CPUExecutionProvider::default().build()])
        .context("Failed to set CPU execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(INTRA_THREADS)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!("Failed to load model from {}", model_path.display()))?;

    info!("Loaded {} on CPU", model_path.display());
    Ok((session, ExecutionDevice::Cpu))
}

fn build_cuda_session(model_path: &Path) -> Result<Session> {
    Session::builder()
        .context("Failed to create session builder")?
        .with_execution_providers([CUDAExecutionProvider::default()
            .build()
            .error_on_failure()])
        .context("Failed to set CUDA execution provider")?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .commit_from_file(model_path)
        .context(format!("Failed to load model from {}", model_path.display()))
}

/// First input name of a session, or `fallback`
pub fn input_name(session: &Session, fallback: &str) -> String {
    session
        .inputs
        .first()
        .map(|input| input.name.clone())
        .unwrap_or_else(|| fallback.to_string())
}
