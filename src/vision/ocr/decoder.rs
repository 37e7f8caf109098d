// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CTC greedy decoding of recognition output
//!
//! The recognizer emits a `[T, C]` probability matrix per crop. Decoding takes
//! the argmax per timestep, collapses consecutive repeats, then drops the blank
//! class (index 0).

use anyhow::{Context, Result};
use ndarray::{ArrayView2, ArrayView3, Axis};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

/// Symbol stored at the CTC blank index
pub const BLANK_SYMBOL: &str = "blank";

/// Index of the CTC blank class
pub const BLANK_INDEX: usize = 0;

/// Recognized text with confidence score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognizedText {
    /// The recognized text content
    pub text: String,
    /// Mean of the per-character confidences, 0.0 when nothing was decoded
    pub confidence: f32,
    /// Max probability of every kept timestep
    pub char_confidences: Vec<f32>,
}

impl RecognizedText {
    pub fn new(text: String, confidence: f32) -> Self {
        Self {
            text,
            confidence,
            char_confidences: Vec::new(),
        }
    }

    /// Check if the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Class index to symbol table
///
/// Index 0 is always [`BLANK_SYMBOL`]. With `use_space_char` a trailing `" "`
/// symbol is appended after the dictionary entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    symbols: Vec<String>,
}

impl Vocabulary {
    pub fn from_symbols<I, S>(symbols: I, use_space_char: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = vec![BLANK_SYMBOL.to_string()];
        all.extend(symbols.into_iter().map(Into::into));
        if use_space_char {
            all.push(" ".to_string());
        }
        Self { symbols: all }
    }

    /// Load a dictionary file, one symbol per line (blank lines skipped)
    pub fn from_file<P: AsRef<Path>>(path: P, use_space_char: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open dictionary: {}", path.display()))?;

        let mut symbols = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.context("Failed to read dictionary line")?;
            if !line.is_empty() {
                symbols.push(line);
            }
        }

        Ok(Self::from_symbols(symbols, use_space_char))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.symbols.get(index).map(String::as_str)
    }
}

/// Greedy CTC decoder bound to a vocabulary
#[derive(Debug, Clone)]
pub struct CtcDecoder {
    vocabulary: Arc<Vocabulary>,
}

impl CtcDecoder {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary: Arc::new(vocabulary),
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Decode one `[T, C]` probability matrix
    pub fn decode(&self, probs: ArrayView2<f32>) -> RecognizedText {
        let mut text = String::new();
        let mut char_confidences = Vec::new();
        let mut prev_index: Option<usize> = None;

        for row in probs.rows() {
            let (index, prob) = row.iter().copied().enumerate().fold(
                (BLANK_INDEX, f32::NEG_INFINITY),
                |best, (i, p)| if p > best.1 { (i, p) } else { best },
            );

            let repeated = prev_index == Some(index);
            prev_index = Some(index);
            if index == BLANK_INDEX || repeated {
                continue;
            }

            // Indices past the vocabulary decode to nothing
            if let Some(symbol) = self.vocabulary.get(index) {
                text.push_str(symbol);
                char_confidences.push(prob);
            }
        }

        let confidence = if char_confidences.is_empty() {
            0.0
        } else {
            char_confidences.iter().sum::<f32>() / char_confidences.len() as f32
        };

        RecognizedText {
            text,
            confidence,
            char_confidences,
        }
    }

    /// Decode every row of a `[N, T, C]` batch, preserving row order
    pub fn decode_batch(&self, probs: ArrayView3<f32>) -> Vec<RecognizedText> {
        probs
            .axis_iter(Axis(0))
            .map(|matrix| self.decode(matrix))
            .collect()
    }
}
