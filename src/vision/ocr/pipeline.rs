// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end OCR orchestration
//!
//! `OcrPipeline` owns a detector, a recognizer and the pure processing steps
//! between them. It holds no per-call state, so one pipeline can serve any
//! number of concurrent calls as long as its backends allow it.

use anyhow::Result;
use image::RgbImage;

use super::backend::{Detector, Recognizer};
use super::batching::{scatter_results, RecognitionBatcher, DEFAULT_BATCH_SIZE};
use super::decoder::{CtcDecoder, RecognizedText, Vocabulary};
use super::detection::{DetectionConfig, DetectionPostProcessor};
use super::error::OcrError;
use super::geometry::{perspective_crop, Quad};
use super::model::{OcrResult, TextRegion};
use super::preprocessing::{preprocess_for_detection, DETECTION_BASE_SIZE};

/// Steps a single `run` moves through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Idle,
    Preprocessing,
    Detecting,
    PostprocessingDetection,
    CroppingAndBatching,
    Recognizing,
    Decoding,
    Assembling,
    Done,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base size for the detection resize
    pub base_size: u32,
    /// Crops per recognition batch
    pub batch_size: usize,
    pub detection: DetectionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_size: DETECTION_BASE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            detection: DetectionConfig::default(),
        }
    }
}

pub struct OcrPipeline<D, R> {
    detector: D,
    recognizer: R,
    postprocessor: DetectionPostProcessor,
    batcher: RecognitionBatcher,
    decoder: CtcDecoder,
    base_size: u32,
}

impl<D, R> std::fmt::Debug for OcrPipeline<D, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrPipeline")
            .field("base_size", &self.base_size)
            .field("batch_size", &self.batcher.batch_size())
            .field("vocabulary_size", &self.decoder.vocabulary().len())
            .finish_non_exhaustive()
    }
}

impl<D: Detector, R: Recognizer> OcrPipeline<D, R> {
    pub fn new(detector: D, recognizer: R, vocabulary: Vocabulary, config: PipelineConfig) -> Self {
        Self {
            detector,
            recognizer,
            postprocessor: DetectionPostProcessor::new(config.detection),
            batcher: RecognitionBatcher::new(config.batch_size),
            decoder: CtcDecoder::new(vocabulary),
            base_size: config.base_size,
        }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Extract every text region from `image`
    pub fn run(&self, image: &RgbImage) -> Result<OcrResult> {
        self.run_observed(image, |_| {})
    }

    /// Same as [`run`](Self::run), reporting each stage transition to `observe`
    ///
    /// Backend errors are returned unchanged. An image with no detected text
    /// skips recognition entirely and yields an empty result.
    pub fn run_observed<F>(&self, image: &RgbImage, mut observe: F) -> Result<OcrResult>
    where
        F: FnMut(PipelineStage),
    {
        observe(PipelineStage::Preprocessing);
        let input = preprocess_for_detection(image, self.base_size)?;

        observe(PipelineStage::Detecting);
        let map = self.detector.infer(&input.tensor)?;

        observe(PipelineStage::PostprocessingDetection);
        let boxes = self.postprocessor.process(map.view(), &input.resize);
        if boxes.is_empty() {
            return Ok(Self::assemble(Vec::new(), Vec::new(), &mut observe));
        }

        observe(PipelineStage::CroppingAndBatching);
        let (boxes, crops): (Vec<Quad>, Vec<RgbImage>) = boxes
            .into_iter()
            .map(|quad| (quad, perspective_crop(image, &quad)))
            .filter(|(_, crop)| crop.width() > 0 && crop.height() > 0)
            .unzip();
        if crops.is_empty() {
            return Ok(Self::assemble(Vec::new(), Vec::new(), &mut observe));
        }

        let mut placed = Vec::with_capacity(crops.len());
        for batch in self.batcher.batches(&crops) {
            observe(PipelineStage::Recognizing);
            let probs = self.recognizer.infer(&batch.tensor)?;
            if probs.shape()[0] != batch.len() {
                return Err(OcrError::BatchSizeMismatch {
                    expected: batch.len(),
                    got: probs.shape()[0],
                }
                .into());
            }

            observe(PipelineStage::Decoding);
            let decoded = self.decoder.decode_batch(probs.view());
            placed.extend(batch.indices.iter().copied().zip(decoded));
        }

        let texts = scatter_results(crops.len(), placed);
        Ok(Self::assemble(boxes, texts, &mut observe))
    }

    fn assemble<F>(boxes: Vec<Quad>, texts: Vec<RecognizedText>, observe: &mut F) -> OcrResult
    where
        F: FnMut(PipelineStage),
    {
        observe(PipelineStage::Assembling);
        let regions = boxes
            .into_iter()
            .zip(texts)
            .map(|(quad, recognized)| TextRegion::new(quad, recognized))
            .collect();
        observe(PipelineStage::Done);
        OcrResult { regions }
    }
}
