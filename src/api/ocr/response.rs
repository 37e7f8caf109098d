// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR response types

use serde::{Deserialize, Serialize};

use crate::vision::ocr::OcrOutput;

/// Body of a `/ocr` reply
///
/// Failures still answer 200 with an empty `result` list and a `msg`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OcrResponse {
    Success {
        result: OcrOutput,
    },
    Failure {
        result: Vec<serde_json::Value>,
        msg: String,
    },
}

impl OcrResponse {
    pub fn success(result: OcrOutput) -> Self {
        OcrResponse::Success { result }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        OcrResponse::Failure {
            result: Vec::new(),
            msg: msg.into(),
        }
    }
}
