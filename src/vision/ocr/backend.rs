// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inference seams the OCR pipeline is generic over
//!
//! Any engine that can turn a detection tensor into a probability map, and a
//! recognition batch into per-row character probabilities, can drive the
//! pipeline. The ONNX Runtime implementations live in `detection` and
//! `recognition`.

use anyhow::Result;
use ndarray::{Array2, Array3, Array4};
use std::sync::Arc;

/// Text detection network
pub trait Detector {
    /// `[1, 3, H, W]` normalized image -> `[H', W']` text probability map
    fn infer(&self, input: &Array4<f32>) -> Result<Array2<f32>>;
}

/// Text recognition network
pub trait Recognizer {
    /// `[N, 3, 48, W]` crop batch -> `[N, T, C]` per-timestep probabilities
    fn infer(&self, batch: &Array4<f32>) -> Result<Array3<f32>>;
}

impl<T: Detector + ?Sized> Detector for Arc<T> {
    fn infer(&self, input: &Array4<f32>) -> Result<Array2<f32>> {
        (**self).infer(input)
    }
}

impl<T: Recognizer + ?Sized> Recognizer for Arc<T> {
    fn infer(&self, batch: &Array4<f32>) -> Result<Array3<f32>> {
        (**self).infer(batch)
    }
}

impl<T: Detector + ?Sized> Detector for Box<T> {
    fn infer(&self, input: &Array4<f32>) -> Result<Array2<f32>> {
        (**self).infer(input)
    }
}

impl<T: Recognizer + ?Sized> Recognizer for Box<T> {
    fn infer(&self, batch: &Array4<f32>) -> Result<Array3<f32>> {
        (**self).infer(batch)
    }
}
