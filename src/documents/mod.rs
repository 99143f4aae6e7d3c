// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PDF document ingestion
//!
//! Turns uploaded PDF bytes into per-page plain text. Layout, images and
//! annotations are ignored.

pub mod errors;
pub mod pdf;

pub use errors::DocumentError;
pub use pdf::{extract_pdf, is_pdf, PdfDocument};
