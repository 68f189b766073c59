use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::config::TextToSpeechConfig;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("request to speech endpoint failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("speech endpoint returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("speech endpoint returned no audio")]
    EmptyAudio,
}

/// Converts a finished document into audio bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn render(&self, text: &str) -> Result<Vec<u8>, AudioError>;

    /// File extension for the produced audio, e.g. `mp3`.
    fn extension(&self) -> &str;
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
    speed: f32,
}

/// Client for an OpenAI-compatible `/v1/audio/speech` endpoint.
pub struct SpeechRenderer {
    client: Client,
    config: TextToSpeechConfig,
}

impl SpeechRenderer {
    pub fn new(config: TextToSpeechConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    fn request<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.config.model,
            input: text,
            voice: &self.config.voice,
            response_format: &self.config.response_format,
            speed: self.config.speed,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechRenderer {
    async fn render(&self, text: &str) -> Result<Vec<u8>, AudioError> {
        debug!(
            endpoint = %self.config.endpoint_url,
            chars = text.len(),
            "Requesting speech synthesis"
        );

        let response = self
            .client
            .post(&self.config.endpoint_url)
            .json(&self.request(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(AudioError::Api { status, body });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(AudioError::EmptyAudio);
        }

        Ok(bytes.to_vec())
    }

    fn extension(&self) -> &str {
        &self.config.response_format
    }
}
