// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! CLIP embedding endpoints
//!
//! Provides POST /clip/img and POST /clip/txt.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{clip_image_handler, clip_text_handler};
pub use request::ClipTextRequest;
pub use response::ClipResponse;
