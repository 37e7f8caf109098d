// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Lazy model loading and idle release
//!
//! Each model sits behind a [`ModelHandle`] that loads it on first use and can
//! drop it again to give the memory back. The [`ModelManager`] owns the handles
//! for every model the server uses and a background reaper releases the ones
//! that have gone unused for too long.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::embeddings::{ClipImageModel, ClipModelConfig, ClipTextModel, ImageEmbedder, TextEmbedder};
use crate::vision::ocr::{load_ocr_engine, OcrModelConfig, TextExtractor};

type Loader<T> = Arc<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

/// Lazily loaded, releasable model
pub struct ModelHandle<T: ?Sized> {
    name: String,
    loader: Loader<T>,
    slot: Mutex<Option<Arc<T>>>,
    created: Instant,
    /// Milliseconds since `created` at the last acquire
    last_used_ms: AtomicU64,
}

impl<T: ?Sized> std::fmt::Debug for ModelHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T: ?Sized + Send + Sync + 'static> ModelHandle<T> {
    /// Create an unloaded handle; `loader` runs on the blocking pool
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<T>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            loader: Arc::new(loader),
            slot: Mutex::new(None),
            created: Instant::now(),
            last_used_ms: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the loaded model, loading it first if needed
    ///
    /// Concurrent callers wait for a single load.
    pub async fn acquire(&self) -> Result<Arc<T>> {
        let mut slot = self.slot.lock().await;
        self.touch();

        if let Some(model) = slot.as_ref() {
            return Ok(model.clone());
        }

        info!("Loading {} model", self.name);
        let loader = self.loader.clone();
        let model = tokio::task::spawn_blocking(move || loader())
            .await
            .context("Model loader task panicked")?
            .with_context(|| format!("Failed to load {} model", self.name))?;

        *slot = Some(model.clone());
        info!("✅ {} model loaded", self.name);
        Ok(model)
    }

    /// Drop the handle's reference; returns whether a model was loaded
    ///
    /// Requests already holding the model keep it until they finish.
    pub async fn release(&self) -> bool {
        let released = self.slot.lock().await.take().is_some();
        if released {
            info!("Released {} model", self.name);
        }
        released
    }

    pub async fn is_loaded(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Time since the last `acquire` (or since creation)
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_used_ms.load(Ordering::Relaxed));
        self.created.elapsed().saturating_sub(last)
    }

    /// Release the model if it has been idle for at least `timeout`
    pub async fn release_if_idle(&self, timeout: Duration) -> bool {
        if self.idle_for() < timeout {
            return false;
        }
        debug!("{} model idle for {:?}", self.name, self.idle_for());
        self.release().await
    }

    fn touch(&self) {
        let elapsed = self.created.elapsed().as_millis() as u64;
        self.last_used_ms.store(elapsed, Ordering::Relaxed);
    }
}

/// Owns every model handle the server uses
#[derive(Debug)]
pub struct ModelManager {
    pub ocr: ModelHandle<dyn TextExtractor>,
    pub clip_image: ModelHandle<dyn ImageEmbedder>,
    pub clip_text: ModelHandle<dyn TextEmbedder>,
}

impl ModelManager {
    pub fn new(
        ocr: ModelHandle<dyn TextExtractor>,
        clip_image: ModelHandle<dyn ImageEmbedder>,
        clip_text: ModelHandle<dyn TextEmbedder>,
    ) -> Self {
        Self {
            ocr,
            clip_image,
            clip_text,
        }
    }

    /// Handles backed by the ONNX models described in the configs
    pub fn from_configs(ocr: OcrModelConfig, clip: ClipModelConfig) -> Self {
        let image_config = clip.clone();
        Self::new(
            ModelHandle::new("ocr", move || {
                Ok(Arc::new(load_ocr_engine(&ocr)?) as Arc<dyn TextExtractor>)
            }),
            ModelHandle::new("clip-image", move || {
                Ok(Arc::new(ClipImageModel::load(&image_config)?) as Arc<dyn ImageEmbedder>)
            }),
            ModelHandle::new("clip-text", move || {
                Ok(Arc::new(ClipTextModel::load(&clip)?) as Arc<dyn TextEmbedder>)
            }),
        )
    }

    /// Release every loaded model, returning how many were dropped
    pub async fn release_all(&self) -> usize {
        let results = [
            self.ocr.release().await,
            self.clip_image.release().await,
            self.clip_text.release().await,
        ];
        results.into_iter().filter(|released| *released).count()
    }

    /// Release models idle for at least `timeout`
    pub async fn release_idle(&self, timeout: Duration) -> usize {
        let results = [
            self.ocr.release_if_idle(timeout).await,
            self.clip_image.release_if_idle(timeout).await,
            self.clip_text.release_if_idle(timeout).await,
        ];
        results.into_iter().filter(|released| *released).count()
    }

    /// Names of the models currently in memory
    pub async fn loaded_models(&self) -> Vec<String> {
        let mut loaded = Vec::new();
        if self.ocr.is_loaded().await {
            loaded.push(self.ocr.name().to_string());
        }
        if self.clip_image.is_loaded().await {
            loaded.push(self.clip_image.name().to_string());
        }
        if self.clip_text.is_loaded().await {
            loaded.push(self.clip_text.name().to_string());
        }
        loaded
    }

    /// Load the CLIP text model ahead of the first request
    pub async fn preload_text_model(&self) {
        if let Err(e) = self.clip_text.acquire().await {
            warn!("⚠️ Failed to preload CLIP text model: {:#}", e);
        }
    }
}

/// Periodically release idle models; `None` when `idle_timeout` is zero
pub fn spawn_idle_reaper(manager: Arc<ModelManager>, idle_timeout: Duration) -> Option<JoinHandle<()>> {
    if idle_timeout.is_zero() {
        return None;
    }

    let period = (idle_timeout / 4).max(Duration::from_secs(1));
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let released = manager.release_idle(idle_timeout).await;
            if released > 0 {
                info!("Released {} idle model(s)", released);
            }
        }
    }))
}
