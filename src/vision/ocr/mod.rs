// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR-style text extraction from images
//!
//! Components:
//! - `geometry` - Quad math, perspective crops, reading order
//! - `preprocessing` - Detection and recognition tensors
//! - `detection` - Probability-map post-processing and the ONNX detector
//! - `batching` - Aspect-sorted recognition batches
//! - `decoder` - CTC decoding and the character vocabulary
//! - `recognition` - ONNX recognizer
//! - `pipeline` - Orchestration over injected backends
//! - `model` - Result types and the ONNX-backed engine

pub mod backend;
pub mod batching;
pub mod decoder;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod recognition;

pub use backend::{Detector, Recognizer};
pub use batching::{RecognitionBatch, RecognitionBatcher};
pub use decoder::{CtcDecoder, RecognizedText, Vocabulary};
pub use detection::{DetectionConfig, DetectionPostProcessor, OnnxDetector};
pub use error::OcrError;
pub use geometry::{BoundingBox, Quad};
pub use model::{
    load_ocr_engine, FixedBox, OcrEngine, OcrModelConfig, OcrOutput, OcrResult, TextExtractor,
    TextRegion,
};
pub use pipeline::{OcrPipeline, PipelineConfig, PipelineStage};
pub use recognition::OnnxRecognizer;
