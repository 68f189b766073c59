use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("request to model failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("model returned an empty summary")]
    EmptyResponse,
}

/// Turns article text into a short summary.
#[async_trait]
pub trait Summarize: Send + Sync {
    async fn summarize(&self, article_text: &str) -> Result<String, SummarizeError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: Message,
}

#[derive(Serialize)]
struct ModelRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Summarizer backed by a local Ollama server.
pub struct OllamaSummarizer {
    client: Client,
    chat_url: Url,
    show_url: Url,
    pull_url: Url,
    model: String,
    max_article_chars: Option<usize>,
}

impl OllamaSummarizer {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = config.ollama_base_url()?;

        Ok(Self {
            client,
            chat_url: base_url.join("api/chat")?,
            show_url: base_url.join("api/show")?,
            pull_url: base_url.join("api/pull")?,
            model: config.ollama_model.clone(),
            max_article_chars: config.max_article_chars,
        })
    }

    /// Make sure the configured model is present, pulling it if the server lacks it.
    pub async fn ensure_model_available(&self) -> Result<()> {
        let response = self
            .client
            .post(self.show_url.clone())
            .json(&ModelRequest {
                model: &self.model,
                stream: None,
            })
            .send()
            .await
            .context("Failed to reach Ollama server")?;

        let status = response.status();
        if status.is_success() {
            debug!(model = %self.model, "Model available");
            return Ok(());
        }

        if status != StatusCode::NOT_FOUND {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!(
                "Unexpected error checking model '{}': {} - {}",
                self.model,
                status,
                error_text
            );
        }

        warn!(model = %self.model, "Model not found, attempting to pull");

        // Pulling downloads gigabytes; the request timeout does not apply here.
        let pull_client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        let response = pull_client
            .post(self.pull_url.clone())
            .json(&ModelRequest {
                model: &self.model,
                stream: Some(false),
            })
            .send()
            .await
            .with_context(|| format!("Failed to pull model '{}'", self.model))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!(
                "Failed to pull model '{}': {} - {}",
                self.model,
                status,
                error_text
            );
        }

        info!(model = %self.model, "Successfully pulled model");
        Ok(())
    }
}

#[async_trait]
impl Summarize for OllamaSummarizer {
    async fn summarize(&self, article_text: &str) -> Result<String, SummarizeError> {
        let content = truncate(article_text, self.max_article_chars);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user".to_string(),
                content: build_prompt(content),
            }],
            stream: false,
        };

        let response = self
            .client
            .post(self.chat_url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(SummarizeError::Api { status, body });
        }

        let chat = response.json::<ChatResponse>().await?;

        clean_summary(&chat.message.content).ok_or(SummarizeError::EmptyResponse)
    }
}

fn build_prompt(article: &str) -> String {
    format!(
        r#"## INSTRUCTION

Respond with 1-2 sentences that summarize the key message of this article:

## ARTICLE

{}

## RULES

- DO NOT INCLUDE ANYTHING OTHER THAN THE SUMMARY IN YOUR RESPONSE
- DO NOT ADD ANY TEXT BEFORE OR AFTER THE SUMMARY
- ONLY RESPOND WITH THE ARTICLE SUMMARY"#,
        article
    )
}

/// Trim every line and drop blank ones. `None` if nothing is left.
fn clean_summary(text: &str) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Cut `content` to at most `limit` bytes without splitting a character.
fn truncate(content: &str, limit: Option<usize>) -> &str {
    let Some(limit) = limit else {
        return content;
    };

    if content.len() <= limit {
        return content;
    }

    let mut end = limit;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}
