// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! PDF upload endpoint (POST /v1/documents)

pub mod handler;
pub mod response;

pub use handler::upload_documents_handler;
pub use response::ProcessResponse;
