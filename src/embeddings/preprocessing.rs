// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Input preparation for the CLIP encoders

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::{Array2, Array4};

/// Square input size of the image encoder
pub const CLIP_IMAGE_SIZE: u32 = 224;

/// Token sequence length of the text encoder
pub const CLIP_CONTEXT_LENGTH: usize = 52;

/// CLIP normalization mean
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization std
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Resize to `size`x`size` (bicubic) and normalize into `[1, 3, size, size]`
pub fn clip_image_tensor(image: &DynamicImage, size: u32) -> Array4<f32> {
    let rgb = image.resize_exact(size, size, FilterType::CatmullRom).to_rgb8();
    let side = size as usize;

    let mut tensor = Array4::zeros((1, 3, side, side));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (f32::from(pixel[c]) / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }
    tensor
}

/// Wrap token ids as `[CLS] ids [SEP]`, truncate, and zero-pad to `context_length`
pub fn pack_token_ids(ids: &[u32], cls_id: u32, sep_id: u32, context_length: usize) -> Array2<i64> {
    let mut packed = Array2::zeros((1, context_length));
    if context_length < 2 {
        return packed;
    }

    let body = ids.iter().take(context_length - 2);
    let tokens = std::iter::once(&cls_id).chain(body).chain(std::iter::once(&sep_id));
    for (slot, &id) in packed.row_mut(0).iter_mut().zip(tokens) {
        *slot = i64::from(id);
    }
    packed
}
