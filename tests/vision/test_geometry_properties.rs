// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Properties of the pure OCR building blocks through the public API

use image::{Rgb, RgbImage};
use ndarray::Array2;
use photo_vision_node::vision::ocr::batching::scatter_results;
use photo_vision_node::vision::ocr::geometry::{
    bounding_rect, filter_and_order_boxes, resize_target_dimensions, to_fixed,
};
use photo_vision_node::vision::ocr::{CtcDecoder, FixedBox, Quad, RecognitionBatcher, Vocabulary};

#[test]
fn test_filter_and_order_is_idempotent() {
    let boxes = vec![
        Quad::from_rect(300.0, 104.0, 80.0, 20.0),
        Quad::from_rect(20.0, 100.0, 120.0, 24.0),
        Quad::from_rect(15.0, 40.0, 200.0, 30.0),
        Quad::from_rect(400.0, 300.0, 60.0, 18.0),
    ];

    let once = filter_and_order_boxes(boxes, 640, 480);
    let twice = filter_and_order_boxes(once.clone(), 640, 480);
    assert_eq!(once, twice);

    // Same-line boxes read left to right despite the 4px y offset
    assert_eq!(once[0].top_left(), [15.0, 40.0]);
    assert_eq!(once[1].top_left(), [20.0, 100.0]);
    assert_eq!(once[2].top_left(), [300.0, 104.0]);
}

#[test]
fn test_bounding_rect_fixed_strings() {
    let quad = Quad::new([[10.004, 20.006], [50.0, 20.0], [50.0, 40.0], [10.0, 40.0]]);
    let fixed = FixedBox::from(bounding_rect(&quad));
    assert_eq!(
        fixed,
        FixedBox {
            x: "10.00".to_string(),
            y: "20.01".to_string(),
            width: "40.00".to_string(),
            height: "20.00".to_string(),
        }
    );
    assert_eq!(to_fixed(0.98765), "0.99");
}

#[test]
fn test_decode_repeated_then_blank() {
    // blank, A, B
    let decoder = CtcDecoder::new(Vocabulary::from_symbols(["A", "B"], false));
    let probs = Array2::from_shape_vec(
        (4, 3),
        vec![
            0.1, 0.9, 0.0, // A
            0.2, 0.7, 0.1, // A (collapsed)
            0.8, 0.1, 0.1, // blank
            0.1, 0.1, 0.6, // B
        ],
    )
    .unwrap();

    let decoded = decoder.decode(probs.view());
    assert_eq!(decoded.text, "AB");
    assert!((decoded.confidence - 0.75).abs() < 1e-6);
}

#[test]
fn test_batches_cover_every_crop_once() {
    let crops: Vec<RgbImage> = [(90, 30), (40, 40), (300, 30), (10, 20), (150, 50), (60, 30), (200, 20)]
        .iter()
        .map(|&(w, h)| RgbImage::from_pixel(w, h, Rgb([200, 200, 200])))
        .collect();

    let batcher = RecognitionBatcher::new(3);
    let batches = batcher.batches(&crops);
    assert_eq!(batches.len(), 3);
    assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), crops.len());

    let mut seen: Vec<usize> = batches.iter().flat_map(|b| b.indices.clone()).collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..crops.len()).collect::<Vec<_>>());

    // Gathering each crop's own width back by index restores input order
    let placed = batches
        .iter()
        .flat_map(|b| b.indices.iter().map(|&i| (i, crops[i].width())));
    let widths: Vec<u32> = scatter_results(crops.len(), placed);
    assert_eq!(widths, crops.iter().map(|c| c.width()).collect::<Vec<_>>());
}

#[test]
fn test_resize_target_for_full_hd() {
    // Aspect 1.78 rounds to 2; 960 / 2 = 480 is off the 320 grid, so the
    // short side snaps to 960 / (2 - 1) and the target comes out square
    assert_eq!(resize_target_dimensions(1920, 1080, 320).unwrap(), (960, 960));
}

#[test]
fn test_resize_target_rejects_empty_image() {
    assert!(resize_target_dimensions(0, 100, 320).is_err());
}
