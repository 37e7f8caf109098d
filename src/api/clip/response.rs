// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::embeddings::format_embedding;

/// Embedding as 16-decimal strings, or an empty list and a `msg`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipResponse {
    pub result: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl ClipResponse {
    pub fn from_embedding(values: &[f32]) -> Self {
        Self {
            result: format_embedding(values),
            msg: None,
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            result: Vec::new(),
            msg: Some(msg.into()),
        }
    }
}
