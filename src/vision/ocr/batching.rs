// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Grouping of text crops into recognition batches
//!
//! Crops are sorted by aspect ratio so each batch pads to a similar width.
//! Every batch remembers which crop each of its rows came from, which lets
//! decoded results be written back in detection order.

use image::RgbImage;
use ndarray::{Array4, Axis};

use super::preprocessing::{
    aspect_ratio, normalize_for_recognition, recognition_batch_width, REC_INPUT_HEIGHT,
};

/// Default number of crops per recognition batch
pub const DEFAULT_BATCH_SIZE: usize = 6;

/// One recognizer input plus its row-to-crop mapping
#[derive(Debug, Clone)]
pub struct RecognitionBatch {
    /// `[N, 3, 48, W]` input tensor
    pub tensor: Array4<f32>,
    /// Original crop index for each tensor row
    pub indices: Vec<usize>,
}

impl RecognitionBatch {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Tensor width shared by every row
    pub fn width(&self) -> usize {
        self.tensor.shape()[3]
    }
}

#[derive(Debug, Clone)]
pub struct RecognitionBatcher {
    batch_size: usize,
}

impl Default for RecognitionBatcher {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl RecognitionBatcher {
    /// Batch size is clamped to at least 1
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Crop indices ordered by ascending width/height ratio (stable)
    pub fn sort_order(crops: &[RgbImage]) -> Vec<usize> {
        let ratios: Vec<f32> = crops.iter().map(aspect_ratio).collect();
        let mut order: Vec<usize> = (0..crops.len()).collect();
        order.sort_by(|&a, &b| ratios[a].total_cmp(&ratios[b]));
        order
    }

    /// Build the recognition batches for `crops`
    pub fn batches(&self, crops: &[RgbImage]) -> Vec<RecognitionBatch> {
        let order = Self::sort_order(crops);
        let height = REC_INPUT_HEIGHT as usize;

        order
            .chunks(self.batch_size)
            .map(|chunk| {
                let max_ratio = chunk
                    .iter()
                    .map(|&i| aspect_ratio(&crops[i]))
                    .fold(0.0f32, f32::max);
                let width = recognition_batch_width(max_ratio);

                let mut tensor = Array4::zeros((chunk.len(), 3, height, width));
                for (row, &index) in chunk.iter().enumerate() {
                    tensor
                        .index_axis_mut(Axis(0), row)
                        .assign(&normalize_for_recognition(&crops[index], width));
                }

                RecognitionBatch {
                    tensor,
                    indices: chunk.to_vec(),
                }
            })
            .collect()
    }
}

/// Place per-row results back at their original crop positions
///
/// Slots that no batch row maps to keep `T::default()`.
pub fn scatter_results<T, I>(len: usize, placed: I) -> Vec<T>
where
    T: Default + Clone,
    I: IntoIterator<Item = (usize, T)>,
{
    let mut results = vec![T::default(); len];
    for (index, value) in placed {
        if let Some(slot) = results.get_mut(index) {
            *slot = value;
        }
    }
    results
}
