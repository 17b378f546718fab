//! Pipeline stages shared by the two batch drivers.
//!
//! ## Data Flow
//!
//! ```text
//! files ──▶ ocr  ──────────────▶ files        (verdict-ocr)
//! files ──▶ chat ──▶ postprocess ──▶ files    (verdict-rewrite)
//! ```
//!
//! 1. [`files`]       — enumerate inputs, derive output names, atomic writes
//! 2. [`ocr`]         — multipart upload to the OCR service, page decoding
//! 3. [`chat`]        — OpenAI-compatible chat completion
//! 4. [`postprocess`] — deterministic cleanup of model replies

pub mod chat;
pub mod files;
pub mod ocr;
pub mod postprocess;
