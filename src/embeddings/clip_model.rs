// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Chinese-CLIP image and text encoders on ONNX Runtime
//!
//! Both encoders return the unnormalised feature vector of the first (only)
//! batch row. Callers compare image and text vectors in the same space.

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::{Array2, Array4, Axis, Ix2};
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::preprocessing::{clip_image_tensor, pack_token_ids, CLIP_CONTEXT_LENGTH, CLIP_IMAGE_SIZE};
use super::{ImageEmbedder, TextEmbedder};
use crate::vision::runtime::{build_session, input_name, ExecutionDevice};

/// Where the CLIP model files live and how to run them
#[derive(Debug, Clone, PartialEq)]
pub struct ClipModelConfig {
    pub model_dir: PathBuf,
    pub image_model: String,
    pub text_model: String,
    pub tokenizer: String,
    pub device: ExecutionDevice,
}

impl Default for ClipModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/clip"),
            image_model: "vit-b-16.img.fp32.onnx".to_string(),
            text_model: "vit-b-16.txt.fp32.onnx".to_string(),
            tokenizer: "tokenizer.json".to_string(),
            device: ExecutionDevice::Cpu,
        }
    }
}

impl ClipModelConfig {
    pub fn image_path(&self) -> PathBuf {
        self.model_dir.join(&self.image_model)
    }

    pub fn text_path(&self) -> PathBuf {
        self.model_dir.join(&self.text_model)
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.model_dir.join(&self.tokenizer)
    }
}

fn open_session(model_path: &Path, device: ExecutionDevice, kind: &str) -> Result<(Session, ExecutionDevice)> {
    if !model_path.exists() {
        anyhow::bail!("CLIP {} model not found: {}", kind, model_path.display());
    }
    info!("Loading CLIP {} model from {}", kind, model_path.display());
    build_session(model_path, device)
}

/// Run a single-input session and return its first output row
fn first_row(session: &Mutex<Session>, input_name: &str, input: Value) -> Result<Vec<f32>> {
    let mut session = session
        .lock()
        .map_err(|_| anyhow::anyhow!("CLIP session lock poisoned"))?;

    let outputs = session
        .run(ort::inputs![input_name => input])
        .context("CLIP inference failed")?;

    let output = outputs[0]
        .try_extract_array::<f32>()
        .context("Failed to extract output tensor")?;

    let features = output
        .into_dimensionality::<Ix2>()
        .context("Unexpected CLIP output rank")?;
    debug!("CLIP output shape: {:?}", features.shape());

    if features.shape()[0] == 0 {
        anyhow::bail!("CLIP model returned an empty batch");
    }
    Ok(features.index_axis(Axis(0), 0).to_vec())
}

/// CLIP image encoder
#[derive(Clone)]
pub struct ClipImageModel {
    session: Arc<Mutex<Session>>,
    input_name: String,
    image_size: u32,
    device: ExecutionDevice,
}

impl std::fmt::Debug for ClipImageModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipImageModel")
            .field("input_name", &self.input_name)
            .field("image_size", &self.image_size)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl ClipImageModel {
    pub fn new<P: AsRef<Path>>(model_path: P, device: ExecutionDevice) -> Result<Self> {
        let (session, device) = open_session(model_path.as_ref(), device, "image")?;
        let input_name = input_name(&session, "image");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            image_size: CLIP_IMAGE_SIZE,
            device,
        })
    }

    pub fn load(config: &ClipModelConfig) -> Result<Self> {
        Self::new(config.image_path(), config.device)
    }

    pub fn device(&self) -> ExecutionDevice {
        self.device
    }

    fn run(&self, tensor: Array4<f32>) -> Result<Vec<f32>> {
        let input = Value::from_array(tensor).context("Failed to create image tensor")?;
        first_row(&self.session, &self.input_name, input.into_dyn())
    }
}

impl ImageEmbedder for ClipImageModel {
    fn embed_image(&self, image: &DynamicImage) -> Result<Vec<f32>> {
        self.run(clip_image_tensor(image, self.image_size))
    }
}

/// CLIP text encoder with its BERT tokenizer
#[derive(Clone)]
pub struct ClipTextModel {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    input_name: String,
    cls_id: u32,
    sep_id: u32,
    context_length: usize,
    device: ExecutionDevice,
}

impl std::fmt::Debug for ClipTextModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipTextModel")
            .field("input_name", &self.input_name)
            .field("context_length", &self.context_length)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl ClipTextModel {
    pub fn new<P: AsRef<Path>>(model_path: P, tokenizer_path: P, device: ExecutionDevice) -> Result<Self> {
        let tokenizer_path = tokenizer_path.as_ref();
        if !tokenizer_path.exists() {
            anyhow::bail!("Tokenizer file not found: {}", tokenizer_path.display());
        }

        let (session, device) = open_session(model_path.as_ref(), device, "text")?;
        let input_name = input_name(&session, "text");

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        let cls_id = tokenizer
            .token_to_id("[CLS]")
            .context("Tokenizer has no [CLS] token")?;
        let sep_id = tokenizer
            .token_to_id("[SEP]")
            .context("Tokenizer has no [SEP] token")?;

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            input_name,
            cls_id,
            sep_id,
            context_length: CLIP_CONTEXT_LENGTH,
            device,
        })
    }

    pub fn load(config: &ClipModelConfig) -> Result<Self> {
        Self::new(config.text_path(), config.tokenizer_path(), config.device)
    }

    pub fn device(&self) -> ExecutionDevice {
        self.device
    }

    /// Token ids laid out for the encoder, `[1, context_length]`
    pub fn encode(&self, text: &str) -> Result<Array2<i64>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
        Ok(pack_token_ids(
            encoding.get_ids(),
            self.cls_id,
            self.sep_id,
            self.context_length,
        ))
    }
}

impl TextEmbedder for ClipTextModel {
    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let ids = self.encode(text)?;
        let input = Value::from_array(ids).context("Failed to create text tensor")?;
        first_row(&self.session, &self.input_name, input.into_dyn())
    }
}
