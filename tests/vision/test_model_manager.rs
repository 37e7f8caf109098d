// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model handle lifecycle tests
//!
//! Loaders here build in-memory fakes, so no model files are needed.

use anyhow::Result;
use image::{DynamicImage, RgbImage};
use photo_vision_node::embeddings::{ImageEmbedder, TextEmbedder};
use photo_vision_node::vision::ocr::{OcrResult, TextExtractor};
use photo_vision_node::vision::{spawn_idle_reaper, ModelHandle, ModelManager};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct NoText;

impl TextExtractor for NoText {
    fn extract(&self, _image: &RgbImage) -> Result<OcrResult> {
        Ok(OcrResult::default())
    }
}

struct FixedEmbedder(Vec<f32>);

impl ImageEmbedder for FixedEmbedder {
    fn embed_image(&self, _image: &DynamicImage) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

impl TextEmbedder for FixedEmbedder {
    fn embed_text(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(self.0.clone())
    }
}

fn fake_manager(ocr_loads: Arc<AtomicUsize>) -> ModelManager {
    ModelManager::new(
        ModelHandle::new("ocr", move || {
            ocr_loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(NoText) as Arc<dyn TextExtractor>)
        }),
        ModelHandle::new("clip-image", || {
            Ok(Arc::new(FixedEmbedder(vec![1.0])) as Arc<dyn ImageEmbedder>)
        }),
        ModelHandle::new("clip-text", || {
            Ok(Arc::new(FixedEmbedder(vec![2.0])) as Arc<dyn TextEmbedder>)
        }),
    )
}

#[tokio::test]
async fn test_concurrent_acquire_loads_once() {
    let loads = Arc::new(AtomicUsize::new(0));
    let manager = Arc::new(fake_manager(loads.clone()));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.ocr.acquire().await.is_ok() })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap());
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(manager.loaded_models().await, vec!["ocr".to_string()]);
}

#[tokio::test]
async fn test_release_all_keeps_in_flight_model() {
    let manager = fake_manager(Arc::new(AtomicUsize::new(0)));
    let extractor = manager.ocr.acquire().await.unwrap();
    manager.clip_text.acquire().await.unwrap();

    assert_eq!(manager.release_all().await, 2);
    assert!(manager.loaded_models().await.is_empty());

    // A request that already holds the model can still finish
    let result = extractor.extract(&RgbImage::new(4, 4)).unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_preload_text_model() {
    let manager = fake_manager(Arc::new(AtomicUsize::new(0)));
    manager.preload_text_model().await;
    assert!(manager.clip_text.is_loaded().await);
    assert!(!manager.ocr.is_loaded().await);
}

#[tokio::test]
async fn test_reaper_releases_idle_models() {
    let manager = Arc::new(fake_manager(Arc::new(AtomicUsize::new(0))));
    manager.clip_image.acquire().await.unwrap();

    let reaper = spawn_idle_reaper(manager.clone(), Duration::from_millis(50)).unwrap();

    let mut released = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if !manager.clip_image.is_loaded().await {
            released = true;
            break;
        }
    }
    reaper.abort();
    assert!(released, "idle model was never released");
}

#[test]
fn test_failed_load_reports_model_name() {
    let handle: ModelHandle<dyn TextExtractor> =
        ModelHandle::new("ocr", || anyhow::bail!("det_model.onnx not found"));

    let err = tokio_test::block_on(handle.acquire()).err().unwrap();
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to load ocr model"));
    assert!(message.contains("not found"));
}
