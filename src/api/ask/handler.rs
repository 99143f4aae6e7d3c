// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /v1/ask handler

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::info;

use super::{AskRequest, AskResponse};
use crate::api::server::AppState;
use crate::api::ApiError;

pub async fn ask_handler(
    State(state): State<AppState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return ApiError::InvalidRequest {
                code: "INVALID_JSON",
                message: rejection.body_text(),
            }
            .into_response_with_id(request_id)
        }
    };

    if let Err(e) = request.validate() {
        return e.into_response_with_id(request_id);
    }

    info!(
        request_id = %request_id,
        question_chars = request.question.chars().count(),
        top_k = ?request.top_k,
        "Answering question"
    );

    match state.pipeline.ask(&request.question, request.top_k).await {
        Ok(answer) => Json(AskResponse::from_answer(answer, request_id)).into_response(),
        Err(e) => ApiError::from(e).into_response_with_id(request_id),
    }
}
