// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /v1/documents handler
//!
//! Accepts `multipart/form-data` with one `files` part per PDF and rebuilds
//! the index from them.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use tracing::{debug, info};

use super::ProcessResponse;
use crate::api::server::AppState;
use crate::api::ApiError;
use crate::rag::UploadedFile;

const FILE_FIELDS: [&str; 2] = ["files", "file"];

pub async fn upload_documents_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let files = match multipart {
        Ok(multipart) => match read_files(multipart).await {
            Ok(files) => files,
            Err(e) => return e.into_response_with_id(request_id),
        },
        Err(rejection) => {
            return ApiError::InvalidRequest {
                code: "INVALID_MULTIPART",
                message: rejection.body_text(),
            }
            .into_response_with_id(request_id)
        }
    };

    info!(
        request_id = %request_id,
        files = files.len(),
        "Processing uploaded documents"
    );

    match state.pipeline.process_documents(files).await {
        Ok(summary) => Json(ProcessResponse::from_summary(summary, request_id)).into_response(),
        Err(e) => ApiError::from(e).into_response_with_id(request_id),
    }
}

async fn read_files(mut multipart: Multipart) -> Result<Vec<UploadedFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        if !FILE_FIELDS.contains(&name.as_str()) {
            debug!("Ignoring multipart field '{}'", name);
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;

        // Browsers send an empty, unnamed part when nothing was selected
        if bytes.is_empty() && file_name.is_empty() {
            continue;
        }
        let file_name = if file_name.is_empty() {
            format!("upload-{}.pdf", files.len() + 1)
        } else {
            file_name
        };
        files.push(UploadedFile::new(file_name, bytes.to_vec()));
    }

    Ok(files)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::InvalidRequest {
            code: "INVALID_MULTIPART",
            message: err.body_text(),
        }
    }
}
