// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing: OCR, image loading and model lifecycle
//!
//! This module provides:
//! - OCR (text detection + recognition) via PaddleOCR ONNX models
//! - Lazy model handles that are released when idle

pub mod image_utils;
pub mod model_manager;
pub mod ocr;
pub mod runtime;

pub use image_utils::{check_dimensions, decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use model_manager::{spawn_idle_reaper, ModelHandle, ModelManager};
pub use runtime::ExecutionDevice;
