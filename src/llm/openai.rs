//! OpenAI-compatible completion backend
//!
//! Speaks the chat-completions protocol with `stream: true` and decodes
//! the SSE response incrementally. The API key is read from
//! `OPENAI_API_KEY`; the endpoint can be redirected at any compatible
//! server via `OPENAI_BASE_URL` or the config file.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use super::streaming::SseDecoder;
use super::{ChunkCallback, CompletionBackend, Message, SamplingParams};
use crate::config::Config;
use crate::errors::ShaiError;

/// Wire request for `POST {base_url}/chat/completions`
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiBackend {
    /// Build a backend from config and environment. Missing credentials
    /// are a configuration error so no request is ever attempted.
    pub fn new(config: &Config) -> Result<Self, ShaiError> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ShaiError::Configuration("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| config.base_url.clone());
        let base_url = base_url.trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ShaiError::Generation(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(
        &self,
        messages: &[Message],
        params: &SamplingParams,
        on_chunk: ChunkCallback<'_>,
    ) -> Result<String, ShaiError> {
        let request = ChatRequest {
            model: &params.model,
            messages,
            temperature: params.temperature,
            top_p: params.top_p,
            max_tokens: params.max_tokens,
            stream: true,
        };

        tracing::debug!(model = %params.model, turns = messages.len(), "requesting completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(ShaiError::from_network_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ShaiError::from_http_status(status, body));
        }

        let mut decoder = SseDecoder::new();
        let mut full_text = String::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(ShaiError::from_network_error)?;
            for payload in decoder.push(&bytes) {
                if payload == "[DONE]" {
                    return Ok(full_text);
                }
                consume_payload(&payload, &mut full_text, on_chunk)?;
            }
        }

        for payload in decoder.finish() {
            if payload == "[DONE]" {
                break;
            }
            consume_payload(&payload, &mut full_text, on_chunk)?;
        }

        Ok(full_text)
    }
}

fn consume_payload(
    payload: &str,
    full_text: &mut String,
    on_chunk: ChunkCallback<'_>,
) -> Result<(), ShaiError> {
    let chunk: ChatChunk = serde_json::from_str(payload)
        .map_err(|e| ShaiError::Generation(format!("malformed stream event: {e}: {payload}")))?;

    if let Some(content) = chunk.choices.first().and_then(|c| c.delta.content.as_deref()) {
        full_text.push_str(content);
        on_chunk(content);
    }
    Ok(())
}
