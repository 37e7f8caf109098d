// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CLIP image/text embeddings

pub mod clip_model;
pub mod preprocessing;

use anyhow::Result;
use image::DynamicImage;

pub use clip_model::{ClipImageModel, ClipModelConfig, ClipTextModel};

/// Produces an embedding vector for an image
pub trait ImageEmbedder: Send + Sync {
    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>>;
}

/// Produces an embedding vector for a piece of text
pub trait TextEmbedder: Send + Sync {
    fn embed_text(&self, text: &str) -> Result<Vec<f32>>;
}

/// Render an embedding as fixed 16-decimal strings
pub fn format_embedding(values: &[f32]) -> Vec<String> {
    values.iter().map(|v| format!("{:.16}", f64::from(*v))).collect()
}
