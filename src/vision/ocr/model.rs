// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OCR result types and the ONNX-backed engine

use anyhow::{Context, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, trace};

use super::batching::DEFAULT_BATCH_SIZE;
use super::decoder::{RecognizedText, Vocabulary};
use super::detection::{DetectionConfig, OnnxDetector};
use super::geometry::{bounding_rect, to_fixed, BoundingBox, Quad};
use super::pipeline::{OcrPipeline, PipelineConfig};
use super::preprocessing::DETECTION_BASE_SIZE;
use super::recognition::OnnxRecognizer;
use crate::vision::runtime::ExecutionDevice;

/// A detected text region with its recognized content
#[derive(Debug, Clone, PartialEq)]
pub struct TextRegion {
    /// Extracted text content
    pub text: String,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Detected polygon in source image coordinates
    pub quad: Quad,
    /// Axis-aligned summary of `quad`
    pub bounding_box: BoundingBox,
}

impl TextRegion {
    pub fn new(quad: Quad, recognized: RecognizedText) -> Self {
        Self {
            text: recognized.text,
            confidence: recognized.confidence,
            bounding_box: bounding_rect(&quad),
            quad,
        }
    }
}

/// Result of OCR processing, regions in reading order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrResult {
    pub regions: Vec<TextRegion>,
}

impl OcrResult {
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// All region texts joined by newlines
    pub fn text(&self) -> String {
        self.regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Wire form with parallel arrays of fixed two-decimal strings
    pub fn to_output(&self) -> OcrOutput {
        OcrOutput {
            texts: self.regions.iter().map(|r| r.text.clone()).collect(),
            scores: self
                .regions
                .iter()
                .map(|r| to_fixed(r.confidence as f64))
                .collect(),
            boxes: self
                .regions
                .iter()
                .map(|r| FixedBox::from(r.bounding_box))
                .collect(),
        }
    }
}

/// Bounding box rendered as fixed two-decimal strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedBox {
    pub x: String,
    pub y: String,
    pub width: String,
    pub height: String,
}

impl From<BoundingBox> for FixedBox {
    fn from(bbox: BoundingBox) -> Self {
        Self {
            x: to_fixed(bbox.x),
            y: to_fixed(bbox.y),
            width: to_fixed(bbox.width),
            height: to_fixed(bbox.height),
        }
    }
}

/// `{texts, scores, boxes}` as returned to clients
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrOutput {
    pub texts: Vec<String>,
    pub scores: Vec<String>,
    pub boxes: Vec<FixedBox>,
}

/// Anything that can turn an image into an [`OcrResult`]
pub trait TextExtractor: Send + Sync {
    fn extract(&self, image: &RgbImage) -> Result<OcrResult>;
}

impl<D, R> TextExtractor for OcrPipeline<D, R>
where
    D: super::backend::Detector + Send + Sync,
    R: super::backend::Recognizer + Send + Sync,
{
    fn extract(&self, image: &RgbImage) -> Result<OcrResult> {
        self.run_observed(image, |stage| trace!(?stage, "ocr pipeline stage"))
    }
}

/// Pipeline driven by the ONNX Runtime models
pub type OcrEngine = OcrPipeline<OnnxDetector, OnnxRecognizer>;

/// Where the OCR model files live and how to run them
#[derive(Debug, Clone, PartialEq)]
pub struct OcrModelConfig {
    pub model_dir: PathBuf,
    pub det_model: String,
    pub rec_model: String,
    pub dictionary: String,
    pub device: ExecutionDevice,
    pub batch_size: usize,
    pub base_size: u32,
}

impl Default for OcrModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/ocr"),
            det_model: "det_model.onnx".to_string(),
            rec_model: "rec_model.onnx".to_string(),
            dictionary: "ppocr_keys.txt".to_string(),
            device: ExecutionDevice::Cpu,
            batch_size: DEFAULT_BATCH_SIZE,
            base_size: DETECTION_BASE_SIZE,
        }
    }
}

impl OcrModelConfig {
    pub fn det_path(&self) -> PathBuf {
        self.model_dir.join(&self.det_model)
    }

    pub fn rec_path(&self) -> PathBuf {
        self.model_dir.join(&self.rec_model)
    }

    pub fn dictionary_path(&self) -> PathBuf {
        self.model_dir.join(&self.dictionary)
    }
}

/// Load detection, recognition and dictionary into a ready engine
///
/// Expected files under `model_dir`:
/// - det_model.onnx (text detection)
/// - rec_model.onnx (text recognition)
/// - ppocr_keys.txt (character dictionary)
pub fn load_ocr_engine(config: &OcrModelConfig) -> Result<OcrEngine> {
    info!("Loading OCR models from {}", config.model_dir.display());

    let detector = OnnxDetector::new(config.det_path(), config.device)?;
    let recognizer = OnnxRecognizer::new(config.rec_path(), config.device)?;
    let vocabulary = Vocabulary::from_file(config.dictionary_path(), true)
        .context("Failed to load OCR dictionary")?;

    info!(
        "OCR engine ready ({} symbols, device {})",
        vocabulary.len(),
        detector.device()
    );

    Ok(OcrPipeline::new(
        detector,
        recognizer,
        vocabulary,
        PipelineConfig {
            base_size: config.base_size,
            batch_size: config.batch_size,
            detection: DetectionConfig::default(),
        },
    ))
}
