// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Google Gemini `generateContent` client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Completion, CompletionError, CompletionModel};
use crate::config::GeminiConfig;

// --- generateContent serde structs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

/// Client for the Gemini REST API
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    temperature: f32,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: &str,
        temperature: f32,
        api_base: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let model = normalize_model_name(model);
        let api_base = api_base.trim_end_matches('/').to_string();
        info!(
            "Gemini client configured: base={}, model={}, temperature={}",
            api_base, model, temperature
        );

        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base,
            model,
            temperature,
        })
    }

    /// Build from configuration; fails when no API key is configured
    pub fn from_config(config: &GeminiConfig) -> anyhow::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow::anyhow!("GOOGLE_API_KEY is not set"))?;
        Self::new(
            api_key,
            &config.model,
            config.temperature,
            &config.api_base,
            config.timeout,
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

/// Accepts both `gemini-2.5-flash` and `models/gemini-2.5-flash`
pub fn normalize_model_name(model: &str) -> String {
    model.trim().trim_start_matches("models/").to_string()
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect())
}

fn map_status(status: StatusCode, retry_after: Option<u64>, body: &str) -> CompletionError {
    let message = error_message(body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited {
            retry_after_secs: retry_after,
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionError::Unauthorized(message),
        // Gemini reports an invalid key as 400 INVALID_ARGUMENT
        StatusCode::BAD_REQUEST if message.contains("API key") => {
            CompletionError::Unauthorized(message)
        }
        _ => CompletionError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

fn into_completion(response: GenerateResponse, model: &str) -> Result<Completion, CompletionError> {
    let (prompt_tokens, completion_tokens) = response
        .usage_metadata
        .as_ref()
        .map(|u| (u.prompt_token_count, u.candidates_token_count))
        .unwrap_or((0, 0));

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(CompletionError::Blocked(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(CompletionError::Blocked(
            candidate
                .finish_reason
                .unwrap_or_else(|| "empty response".to_string()),
        ));
    }

    Ok(Completion {
        text,
        model: model.to_string(),
        prompt_tokens,
        completion_tokens,
        finish_reason: candidate.finish_reason,
    })
}

#[async_trait]
impl CompletionModel for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<Completion, CompletionError> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let body = response.text().await.unwrap_or_default();
            let err = map_status(status, retry_after, &body);
            warn!("Gemini request failed: {}", err);
            return Err(err);
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout
            } else {
                CompletionError::Network(e.to_string())
            }
        })?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let completion = into_completion(parsed, &self.model)?;
        debug!(
            "Gemini completion in {}ms ({} prompt / {} completion tokens)",
            start.elapsed().as_millis(),
            completion.prompt_tokens,
            completion.completion_tokens
        );
        Ok(completion)
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}
