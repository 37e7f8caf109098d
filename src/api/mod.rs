// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod clip;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod ocr;
pub mod upload;

pub use clip::{clip_image_handler, clip_text_handler, ClipResponse, ClipTextRequest};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{AboutResponse, CheckResponse, RestartResponse};
pub use http_server::{create_router, start_server, AppState, API_KEY_HEADER};
pub use ocr::{ocr_handler, OcrResponse};
