// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text recognition model
//!
//! Runs a batch of normalized text crops through the recognition network and
//! returns the raw per-timestep character probabilities. Decoding to strings
//! happens in [`super::decoder`].

use anyhow::{Context, Result};
use ndarray::{Array3, Array4, ArrayViewD, Ix3};
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::backend::Recognizer;
use super::error::OcrError;
use super::preprocessing::REC_INPUT_HEIGHT;
use crate::vision::runtime::{build_session, input_name, ExecutionDevice};

/// PaddleOCR text recognition model on ONNX Runtime
#[derive(Clone)]
pub struct OnnxRecognizer {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    device: ExecutionDevice,
}

impl std::fmt::Debug for OnnxRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxRecognizer")
            .field("input_name", &self.input_name)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl OnnxRecognizer {
    /// Load the recognition model from a file
    ///
    /// # Errors
    /// Returns error if the model file is missing or ONNX Runtime rejects it.
    pub fn new<P: AsRef<Path>>(model_path: P, device: ExecutionDevice) -> Result<Self> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(OcrError::ModelNotFound(model_path.display().to_string()).into());
        }

        info!("Loading OCR recognition model from {}", model_path.display());
        let (session, device) = build_session(model_path, device)?;
        let input_name = input_name(&session, "x");
        debug!("Recognition model input: {}", input_name);

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

impl Recognizer for OnnxRecognizer {
    fn infer(&self, batch: &Array4<f32>) -> Result<Array3<f32>> {
        let shape = batch.shape();
        if shape[1] != 3 || shape[2] != REC_INPUT_HEIGHT as usize {
            anyhow::bail!(
                "Invalid input shape: {:?}, expected [N, 3, {}, W]",
                shape,
                REC_INPUT_HEIGHT
            );
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("Recognition session lock poisoned"))?;

        let input_value =
            Value::from_array(batch.to_owned()).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Recognition inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        debug!("Recognition output shape: {:?}", output.shape());
        Ok(sequence_probabilities(output.view())?)
    }
}

/// Interpret a recognition output as `[N, T, C]`
pub fn sequence_probabilities(output: ArrayViewD<f32>) -> Result<Array3<f32>, OcrError> {
    output
        .to_owned()
        .into_dimensionality::<Ix3>()
        .map_err(|_| OcrError::UnexpectedOutput {
            stage: "recognition",
            shape: output.shape().to_vec(),
        })
}
