//! Speech-to-text interface.
//!
//! The core only trusts `text` and `segments`; audio files are opaque byte
//! blobs handled by the backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// A transcription result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub language: String,
    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,
}

/// A timed segment within a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Speech-to-text trait.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe an audio file.
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript>;
}

/// HTTP transcription client speaking the OpenAI-compatible
/// `/audio/transcriptions` shape (whisper.cpp server, faster-whisper, or the
/// hosted API).
pub struct TranscriptionClient {
    base_url: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WireSegment>,
}

#[derive(Debug, Deserialize)]
struct WireSegment {
    start: f64,
    end: f64,
    text: String,
}

impl TranscriptionClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            http,
        }
    }
}

#[async_trait]
impl SpeechToText for TranscriptionClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let bytes = tokio::fs::read(audio_path)
            .await
            .map_err(|e| Error::Internal(format!("failed to read audio file: {}", e)))?;

        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .part("file", part);

        let url = format!("{}/audio/transcriptions", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::backend("stt", "connection refused")
                } else if e.is_timeout() {
                    Error::backend("stt", "request timed out")
                } else {
                    Error::backend("stt", format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::backend("stt", format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::backend(
                "stt",
                format!("HTTP {}: {}", status, body.chars().take(200).collect::<String>()),
            ));
        }

        let api_response: TranscriptionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::backend("stt", format!("failed to parse response: {}", e)))?;

        Ok(Transcript {
            text: api_response.text.trim().to_string(),
            language: api_response.language.unwrap_or_else(|| "unknown".to_string()),
            segments: api_response
                .segments
                .into_iter()
                .map(|s| TranscriptSegment {
                    start: s.start,
                    end: s.end,
                    text: s.text,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_deserializes_without_segments() {
        let transcript: Transcript =
            serde_json::from_str(r#"{"text":"hello there","language":"en"}"#).unwrap();
        assert_eq!(transcript.text, "hello there");
        assert!(transcript.segments.is_empty());
    }

    #[test]
    fn test_transcript_roundtrip() {
        let transcript = Transcript {
            text: "I built the cache layer".to_string(),
            language: "en".to_string(),
            segments: vec![TranscriptSegment {
                start: 0.0,
                end: 2.4,
                text: "I built the cache layer".to_string(),
            }],
        };

        let json = serde_json::to_string(&transcript).unwrap();
        let back: Transcript = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text, transcript.text);
        assert_eq!(back.segments.len(), 1);
    }
}
