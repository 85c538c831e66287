use serde::{Deserialize, Serialize};

/// Remote generative model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key; overridable via the `CALL_AUDIT_API_KEY` environment
    /// variable so the key can stay out of the config file.
    #[serde(default)]
    pub api_key: String,

    /// Model name used for transcription, extraction, and scoring.
    pub model: String,
}
