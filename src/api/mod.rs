// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod ask;
pub mod documents;
pub mod errors;
pub mod handlers;
pub mod server;
pub mod ui;

pub use ask::{ask_handler, AskRequest, AskResponse, SourceResult};
pub use documents::{upload_documents_handler, ProcessResponse};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::HealthResponse;
pub use server::{create_app, ApiConfig, ApiServer, AppState};
