// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types raised by the OCR pipeline itself
//!
//! Inference backends report their failures through `anyhow::Error`; those pass
//! through the pipeline untouched. The variants here cover problems the pipeline
//! detects on its own.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    /// Image (or requested resize) has a zero-length side
    #[error("Invalid image dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// A backend produced a tensor the pipeline cannot interpret
    #[error("Unexpected {stage} output shape: {shape:?}")]
    UnexpectedOutput {
        stage: &'static str,
        shape: Vec<usize>,
    },

    /// Recognizer returned a different number of rows than it was given
    #[error("Recognizer returned {got} results for a batch of {expected}")]
    BatchSizeMismatch { expected: usize, got: usize },

    /// Model or dictionary file missing on disk
    #[error("OCR model file not found: {0}")]
    ModelNotFound(String),
}
