// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Text detection: ONNX model plus DB-style post-processing
//!
//! The detection network outputs a per-pixel text probability map. The
//! post-processor binarizes it, fits a rotated rectangle to every connected
//! region, scores and expands the rectangle, and maps the result back to
//! source image coordinates.

use anyhow::{Context, Result};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use ndarray::{Array2, Array4, ArrayView2, ArrayViewD};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::backend::Detector;
use super::error::OcrError;
use super::geometry::{filter_and_order_boxes, min_area_rect, Quad, RotatedRect};
use super::preprocessing::ResizeInfo;
use crate::vision::runtime::{build_session, input_name, ExecutionDevice};

/// Tunables for [`DetectionPostProcessor`]
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Pixels strictly above this probability are text
    pub threshold: f32,
    /// Minimum mean probability inside a candidate box
    pub box_threshold: f32,
    /// Expansion factor applied to every candidate rectangle
    pub unclip_ratio: f32,
    /// Minimum short side of a candidate rectangle, in map pixels
    pub min_size: f32,
    /// Upper bound on contours examined per image
    pub max_candidates: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            box_threshold: 0.6,
            unclip_ratio: 1.5,
            min_size: 3.0,
            max_candidates: 1000,
        }
    }
}

/// Converts a probability map into ordered quads in source-image space
#[derive(Debug, Clone, Default)]
pub struct DetectionPostProcessor {
    config: DetectionConfig,
}

impl DetectionPostProcessor {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run the full post-processing chain
    ///
    /// An empty or all-background map yields an empty list.
    pub fn process(&self, map: ArrayView2<f32>, resize: &ResizeInfo) -> Vec<Quad> {
        let (map_height, map_width) = map.dim();
        if map_height == 0 || map_width == 0 {
            return Vec::new();
        }

        let threshold = self.config.threshold;
        let mask = GrayImage::from_fn(map_width as u32, map_height as u32, |x, y| {
            if map[[y as usize, x as usize]] > threshold {
                Luma([255])
            } else {
                Luma([0])
            }
        });

        let source_width = resize.source_width as f32;
        let source_height = resize.source_height as f32;
        let scale_x = source_width / map_width as f32;
        let scale_y = source_height / map_height as f32;

        let boxes = find_contours::<i32>(&mask)
            .into_iter()
            .filter(|contour| contour.border_type == BorderType::Outer)
            .take(self.config.max_candidates)
            .filter_map(|contour| self.candidate_box(map, &contour.points))
            .map(|quad| {
                Quad::new(quad.points.map(|[x, y]| {
                    [
                        (x * scale_x).round().clamp(0.0, source_width),
                        (y * scale_y).round().clamp(0.0, source_height),
                    ]
                }))
            })
            .collect();

        filter_and_order_boxes(boxes, resize.source_width, resize.source_height)
    }

    /// Fit, score and expand one contour; `None` when it fails a threshold
    fn candidate_box(&self, map: ArrayView2<f32>, points: &[Point<i32>]) -> Option<Quad> {
        let rect = min_area_rect(points)?;
        if rect.min_side() < self.config.min_size {
            return None;
        }

        if box_score(map, &rect.corners()) < self.config.box_threshold {
            return None;
        }

        let expanded = unclip(&rect, self.config.unclip_ratio);
        if expanded.min_side() < self.config.min_size + 2.0 {
            return None;
        }

        Some(expanded.corners())
    }
}

/// Grow a rectangle by `area * ratio / perimeter` on every side
pub fn unclip(rect: &RotatedRect, ratio: f32) -> RotatedRect {
    let perimeter = rect.perimeter();
    if perimeter <= 0.0 {
        return *rect;
    }
    rect.expanded(rect.area() * ratio / perimeter)
}

/// Mean probability of `map` inside the filled quad
pub fn box_score(map: ArrayView2<f32>, quad: &Quad) -> f32 {
    let (height, width) = map.dim();
    if height == 0 || width == 0 {
        return 0.0;
    }

    let window = |lo: f32, hi: f32, limit: usize| {
        let lo = (lo.floor().max(0.0) as usize).min(limit - 1);
        let hi = (hi.ceil().max(0.0) as usize).min(limit - 1);
        (lo, hi)
    };
    let (x_min, x_max) = window(quad.min_x(), quad.max_x(), width);
    let (y_min, y_max) = window(quad.min_y(), quad.max_y(), height);

    let mut mask = GrayImage::new((x_max - x_min + 1) as u32, (y_max - y_min + 1) as u32);
    let polygon: Vec<Point<i32>> = quad
        .points
        .iter()
        .map(|[x, y]| Point::new((x - x_min as f32) as i32, (y - y_min as f32) as i32))
        .collect();

    if polygon.first() == polygon.last() {
        // Collapsed polygon: score the whole window
        mask.pixels_mut().for_each(|p| *p = Luma([1]));
    } else {
        draw_polygon_mut(&mut mask, &polygon, Luma([1]));
    }

    let (sum, count) = mask
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 0)
        .fold((0.0f32, 0usize), |(sum, count), (x, y, _)| {
            let value = map[[y_min + y as usize, x_min + x as usize]];
            (sum + value, count + 1)
        });

    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Reduce a detection output tensor to its `[H, W]` map
///
/// Accepts `[H, W]` or any shape whose leading dimensions are all 1.
pub fn probability_map(output: ArrayViewD<f32>) -> Result<Array2<f32>, OcrError> {
    let shape = output.shape();
    let unexpected = || OcrError::UnexpectedOutput {
        stage: "detection",
        shape: shape.to_vec(),
    };

    if shape.len() < 2 || shape[..shape.len() - 2].iter().any(|&d| d != 1) {
        return Err(unexpected());
    }

    let (height, width) = (shape[shape.len() - 2], shape[shape.len() - 1]);
    Array2::from_shape_vec((height, width), output.iter().copied().collect())
        .map_err(|_| unexpected())
}

/// PaddleOCR text detection model on ONNX Runtime
#[derive(Clone)]
pub struct OnnxDetector {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Device the session ended up on
    device: ExecutionDevice,
}

impl std::fmt::Debug for OnnxDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxDetector")
            .field("input_name", &self.input_name)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl OnnxDetector {
    /// Load the detection model from a file
    ///
    /// # Errors
    /// Returns error if the model file is missing or ONNX Runtime rejects it.
    pub fn new<P: AsRef<Path>>(model_path: P, device: ExecutionDevice) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(OcrError::ModelNotFound(model_path.display().to_string()).into());
        }

        info!("Loading OCR detection model from {}", model_path.display());
        let (session, device) = build_session(model_path, device)?;
        let input_name = input_name(&session, "x");
        debug!("Detection model input: {}", input_name);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            device,
        })
    }

    pub fn device(&self) -> ExecutionDevice {
        self.device
    }
}

impl Detector for OnnxDetector {
    fn infer(&self, input: &Array4<f32>) -> Result<Array2<f32>> {
        let shape = input.shape();
        if shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Detection session lock poisoned"))?;

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Detection output shape: {:?}", output.shape());
        Ok(probability_map(output.view())?)
    }
}
