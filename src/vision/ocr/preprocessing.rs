// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the detection and recognition models

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array3, Array4};

use super::error::OcrError;
use super::geometry::resize_target_dimensions;

/// Default base size for the detection resize
pub const DETECTION_BASE_SIZE: u32 = 320;

/// Recognition model input height
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Recognition batch width per unit of aspect ratio
pub const REC_WIDTH_PER_RATIO: f32 = 32.0;

/// Mean values for detection normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for detection normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Source and resized dimensions of a detection input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeInfo {
    pub source_width: u32,
    pub source_height: u32,
    pub resized_width: u32,
    pub resized_height: u32,
}

impl ResizeInfo {
    pub fn ratio_w(&self) -> f32 {
        self.resized_width as f32 / self.source_width as f32
    }

    pub fn ratio_h(&self) -> f32 {
        self.resized_height as f32 / self.source_height as f32
    }
}

/// Detection tensor plus the resize that produced it
#[derive(Debug, Clone)]
pub struct DetectionInput {
    /// `[1, 3, H, W]`, ImageNet-normalized
    pub tensor: Array4<f32>,
    pub resize: ResizeInfo,
}

/// Preprocess an image for text detection
///
/// Steps:
/// 1. Resize (bilinear) to the dimensions from `resize_target_dimensions`
/// 2. Normalize with ImageNet mean/std: (pixel/255 - mean) / std
/// 3. Convert to NCHW tensor format [1, 3, H, W]
pub fn preprocess_for_detection(
    image: &RgbImage,
    base_size: u32,
) -> Result<DetectionInput, OcrError> {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = resize_target_dimensions(width, height, base_size)?;
    let resized = imageops::resize(image, new_width, new_height, FilterType::Triangle);

    let mut tensor = Array4::zeros((1, 3, new_height as usize, new_width as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (f32::from(pixel[c]) / 255.0 - MEAN[c]) / STD[c];
        }
    }

    Ok(DetectionInput {
        tensor,
        resize: ResizeInfo {
            source_width: width,
            source_height: height,
            resized_width: new_width,
            resized_height: new_height,
        },
    })
}

/// Width/height ratio of a crop, 0.0 for an empty crop
pub fn aspect_ratio(crop: &RgbImage) -> f32 {
    let (width, height) = crop.dimensions();
    if height == 0 {
        0.0
    } else {
        width as f32 / height as f32
    }
}

/// Tensor width shared by a recognition batch whose widest crop has `max_ratio`
pub fn recognition_batch_width(max_ratio: f32) -> usize {
    ((REC_WIDTH_PER_RATIO * max_ratio) as usize).max(1)
}

/// Normalize one crop into a `[3, 48, batch_width]` slice
///
/// The crop is resized to height 48 keeping its aspect (width rounded up and
/// capped at `batch_width`), scaled to `[-1, 1]`, and zero-padded on the right.
pub fn normalize_for_recognition(crop: &RgbImage, batch_width: usize) -> Array3<f32> {
    let height = REC_INPUT_HEIGHT as usize;
    let mut out = Array3::zeros((3, height, batch_width));
    if crop.width() == 0 || crop.height() == 0 || batch_width == 0 {
        return out;
    }

    let target = (REC_INPUT_HEIGHT as f32 * aspect_ratio(crop)).ceil() as usize;
    let resized_width = target.clamp(1, batch_width);
    let resized = imageops::resize(
        crop,
        resized_width as u32,
        REC_INPUT_HEIGHT,
        FilterType::Triangle,
    );

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            out[[c, y as usize, x as usize]] = (f32::from(pixel[c]) / 255.0 - 0.5) / 0.5;
        }
    }

    out
}
