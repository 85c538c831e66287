//! Collaborator boundaries for the remote model services.
//!
//! Both services are opaque to the engine and absorb their own failures:
//! a failed call surfaces as `None`, never as an error the pipeline has to
//! unwind past this boundary.

use std::path::Path;

use async_trait::async_trait;

/// Single-shot text completion service.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generates a completion for `prompt`; `None` on any failure or an
    /// empty response.
    async fn generate(&self, prompt: &str) -> Option<String>;
}

/// Speech-to-text service.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribes the audio file at `audio_path`; `None` on any failure
    /// or an empty transcript.
    async fn transcribe(&self, audio_path: &Path) -> Option<String>;
}
