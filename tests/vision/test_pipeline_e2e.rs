// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end OCR pipeline tests with synthetic backends
//!
//! The detector returns a hand-made probability map and the recognizer
//! inspects the batch tensor it receives, so these tests exercise every
//! step between the two model calls without any model files.

use anyhow::Result;
use image::{Rgb, RgbImage};
use ndarray::{s, Array2, Array3, Array4};
use photo_vision_node::vision::ocr::{
    Detector, OcrPipeline, PipelineConfig, PipelineStage, Recognizer, Vocabulary,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Marks fixed `(rows, cols)` rectangles of the detection map as text
struct MapDetector {
    regions: Vec<(std::ops::Range<usize>, std::ops::Range<usize>)>,
}

impl Detector for MapDetector {
    fn infer(&self, input: &Array4<f32>) -> Result<Array2<f32>> {
        let shape = input.shape();
        let mut map = Array2::zeros((shape[2], shape[3]));
        for (rows, cols) in &self.regions {
            map.slice_mut(s![rows.clone(), cols.clone()]).fill(0.9);
        }
        Ok(map)
    }
}

/// Vocabulary index 1 = "H", 2 = "V"
fn marker_vocabulary() -> Vocabulary {
    Vocabulary::from_symbols(["H", "V"], false)
}

/// One-character output per row: `class` at t=0, blank afterwards
fn single_char_output(classes: &[usize], num_classes: usize) -> Array3<f32> {
    let mut probs = Array3::zeros((classes.len(), 4, num_classes));
    for (row, &class) in classes.iter().enumerate() {
        probs[[row, 0, class]] = 0.8;
        for t in 1..4 {
            probs[[row, t, 0]] = 1.0;
        }
    }
    probs
}

/// Emits "V" for crops whose left edge is red, "H" otherwise
struct MarkerRecognizer {
    calls: AtomicUsize,
}

impl Recognizer for MarkerRecognizer {
    fn infer(&self, input: &Array4<f32>) -> Result<Array3<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let classes: Vec<usize> = (0..input.shape()[0])
            .map(|n| {
                let red = input[[n, 0, 24, 2]];
                let green = input[[n, 1, 24, 2]];
                if red > 0.5 && green < 0.0 {
                    2
                } else {
                    1
                }
            })
            .collect();
        Ok(single_char_output(&classes, 3))
    }
}

/// 640x640 white page; the vertical line's top end is painted red
fn marker_image() -> RgbImage {
    let mut image = RgbImage::from_pixel(640, 640, Rgb([255, 255, 255]));
    for y in 150..300 {
        for x in 470..560 {
            image.put_pixel(x, y, Rgb([255, 0, 0]));
        }
    }
    image
}

#[test]
fn test_horizontal_and_vertical_lines() {
    let detector = MapDetector {
        regions: vec![
            // Vertical line listed first to check ordering
            (200..500, 500..530),
            (100..130, 100..400),
        ],
    };
    let recognizer = MarkerRecognizer {
        calls: AtomicUsize::new(0),
    };
    let pipeline = OcrPipeline::new(
        detector,
        recognizer,
        marker_vocabulary(),
        PipelineConfig::default(),
    );

    let result = pipeline.run(&marker_image()).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.regions[0].text, "H");
    assert_eq!(result.regions[1].text, "V");
    assert!(result.regions[0].quad.top_left()[1] < result.regions[1].quad.top_left()[1]);

    // Vertical region is taller than wide in the source image
    let vertical = &result.regions[1].bounding_box;
    assert!(vertical.height > vertical.width * 1.5);

    // Both crops share one batch of the default size
    assert_eq!(pipeline.recognizer().calls.load(Ordering::SeqCst), 1);

    let output = result.to_output();
    assert_eq!(output.texts, vec!["H", "V"]);
    assert_eq!(output.scores, vec!["0.80", "0.80"]);
    assert_eq!(output.boxes.len(), 2);
}

#[test]
fn test_empty_map_skips_recognition() {
    let pipeline = OcrPipeline::new(
        MapDetector { regions: vec![] },
        MarkerRecognizer {
            calls: AtomicUsize::new(0),
        },
        marker_vocabulary(),
        PipelineConfig::default(),
    );

    let mut stages = Vec::new();
    let result = pipeline
        .run_observed(&marker_image(), |stage| stages.push(stage))
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(pipeline.recognizer().calls.load(Ordering::SeqCst), 0);
    assert!(!stages.contains(&PipelineStage::Recognizing));
    assert_eq!(stages.last(), Some(&PipelineStage::Done));

    let output = result.to_output();
    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json, serde_json::json!({"texts": [], "scores": [], "boxes": []}));
}

/// Labels each crop by the width of the batch tensor it arrives in
struct WidthRecognizer {
    widths: Mutex<Vec<usize>>,
}

impl Recognizer for WidthRecognizer {
    fn infer(&self, input: &Array4<f32>) -> Result<Array3<f32>> {
        let width = input.shape()[3];
        if let Ok(mut widths) = self.widths.lock() {
            widths.push(width);
        }
        // 1 = short, 2 = medium, 3 = long
        let class = if width < 80 {
            1
        } else if width > 160 {
            3
        } else {
            2
        };
        Ok(single_char_output(&vec![class; input.shape()[0]], 4))
    }
}

#[test]
fn test_results_return_to_reading_order() {
    let detector = MapDetector {
        regions: vec![
            (50..80, 100..160),   // short
            (200..230, 100..540), // long
            (350..380, 100..300), // medium
        ],
    };
    let pipeline = OcrPipeline::new(
        detector,
        WidthRecognizer {
            widths: Mutex::new(Vec::new()),
        },
        Vocabulary::from_symbols(["S", "M", "L"], false),
        PipelineConfig {
            batch_size: 1,
            ..PipelineConfig::default()
        },
    );

    let image = RgbImage::from_pixel(640, 640, Rgb([255, 255, 255]));
    let result = pipeline.run(&image).unwrap();

    let texts: Vec<&str> = result.regions.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec!["S", "L", "M"]);

    // Batches are submitted narrowest first
    let widths = pipeline.recognizer().widths.lock().unwrap().clone();
    assert_eq!(widths.len(), 3);
    assert!(widths.windows(2).all(|w| w[0] <= w[1]));
}

struct BrokenRecognizer;

impl Recognizer for BrokenRecognizer {
    fn infer(&self, _input: &Array4<f32>) -> Result<Array3<f32>> {
        anyhow::bail!("recognizer session closed")
    }
}

#[test]
fn test_recognizer_error_propagates() {
    let pipeline = OcrPipeline::new(
        MapDetector {
            regions: vec![(100..130, 100..400)],
        },
        BrokenRecognizer,
        marker_vocabulary(),
        PipelineConfig::default(),
    );

    let err = pipeline.run(&marker_image()).unwrap_err();
    assert!(err.to_string().contains("recognizer session closed"));
}

#[test]
fn test_pipeline_shared_across_threads() {
    let pipeline = Arc::new(OcrPipeline::new(
        MapDetector {
            regions: vec![(100..130, 100..400)],
        },
        MarkerRecognizer {
            calls: AtomicUsize::new(0),
        },
        marker_vocabulary(),
        PipelineConfig::default(),
    ));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = pipeline.clone();
            std::thread::spawn(move || pipeline.run(&marker_image()).unwrap().to_output())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().texts, vec!["H"]);
    }
    assert_eq!(pipeline.recognizer().calls.load(Ordering::SeqCst), 4);
}
