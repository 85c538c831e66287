//! Remote model client.
//!
//! One REST client serves all three model uses: audio transcription
//! (audio bytes inlined base64 into the request), field extraction, and
//! rubric scoring. The client implements the engine's [`Transcriber`] and
//! [`GenerationClient`] boundaries, absorbing failures into `None` as those
//! contracts require.

use crate::{AppError, AppResult};

use call_audit_core::{GenerationClient, Transcriber};

use std::{panic::Location, path::Path, time::Duration};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use error_location::ErrorLocation;
use serde_json::{Value, json};
use tracing::{debug, error, info, instrument};

const GEMINI_API: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Text-only calls finish fast; a stuck one should fail the batch and let
/// the fallback table take over.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Audio uploads plus transcription of long calls can take minutes.
const TRANSCRIPTION_TIMEOUT: Duration = Duration::from_secs(600);

/// Fixed transcription prompt; transcripts default to Ukrainian but keep
/// other languages verbatim.
const TRANSCRIPTION_PROMPT: &str = "Будь ласка, транскрибуй цей аудіо файл українською мовою.\n\
     Якщо в аудіо звучить інша мова, транскрибуй її оригінальною мовою.\n\
     Збережи структуру мовлення, розділи на абзаци де це доречно.";

/// MIME type for an audio file, by extension.
pub(crate) fn mime_for_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("aac") => "audio/aac",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// REST client for the generative model API.
pub(crate) struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    /// Creates the client.
    ///
    /// Timeouts are applied per request (transcription gets a much longer
    /// one), so the underlying client carries none.
    #[track_caller]
    #[instrument(skip(api_key))]
    pub(crate) fn new(api_key: &str, model: &str) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::ModelApi {
                reason: format!("Failed to build HTTP client: {}", e),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!(model, "Model client initialized");

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// One `generateContent` call; returns the concatenated candidate text.
    async fn generate_content(&self, parts: Vec<Value>, timeout: Duration) -> AppResult<String> {
        let url = format!(
            "{GEMINI_API}/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let response = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(&json!({ "contents": [{ "parts": parts }] }))
            .send()
            .await
            .map_err(|e| self.api_error(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(self.api_error(format!("{status}: {detail}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.api_error(format!("malformed response: {}", e)))?;

        let text = body["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(self.api_error("empty response".to_string()));
        }

        Ok(text)
    }

    #[track_caller]
    fn api_error(&self, reason: String) -> AppError {
        AppError::ModelApi {
            reason,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Option<String> {
        match self
            .generate_content(vec![json!({ "text": prompt })], GENERATION_TIMEOUT)
            .await
        {
            Ok(text) => {
                debug!(response_len = text.len(), "Generation complete");
                Some(text)
            }
            Err(e) => {
                error!(error = ?e, "Generation call failed");
                None
            }
        }
    }
}

#[async_trait]
impl Transcriber for GeminiClient {
    async fn transcribe(&self, audio_path: &Path) -> Option<String> {
        let bytes = match std::fs::read(audio_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(path = %audio_path.display(), error = %e, "Failed to read audio file");
                return None;
            }
        };

        let parts = vec![
            json!({ "text": TRANSCRIPTION_PROMPT }),
            json!({
                "inline_data": {
                    "mime_type": mime_for_extension(audio_path),
                    "data": STANDARD.encode(&bytes),
                }
            }),
        ];

        let start = std::time::Instant::now();
        match self.generate_content(parts, TRANSCRIPTION_TIMEOUT).await {
            Ok(text) => {
                info!(
                    path = %audio_path.display(),
                    duration_ms = start.elapsed().as_millis(),
                    text_len = text.len(),
                    "Transcription complete"
                );
                Some(text)
            }
            Err(e) => {
                error!(path = %audio_path.display(), error = ?e, "Transcription failed");
                None
            }
        }
    }
}
