// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Body of a `/clip/txt` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipTextRequest {
    pub text: String,
}

impl ClipTextRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.text.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "text".to_string(),
                message: "text must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
