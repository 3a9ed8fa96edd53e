//! Generative-text backend client.
//!
//! The orchestrator talks to the backend through the [`TextGenerator`] trait;
//! [`GeminiClient`] is the production implementation against the Gemini REST
//! API, supporting both unary and streamed (SSE) delivery.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Backend requests get a little more headroom than article fetches;
/// generation is slower than a page load.
const BACKEND_TIMEOUT: Duration = Duration::from_secs(60);

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend answered with status {status}: {body}")]
    BadStatus {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("backend response carried no generated text")]
    EmptyResponse,
}

/// Generation parameters forwarded to the backend. `None` fields are left
/// to the backend's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationParams {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
    /// Relax content-safety filtering to its least restrictive setting
    pub relax_safety: bool,
}

/// Delivery mode for a generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Unary,
    Streamed,
}

/// A single generation request against one model
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub params: GenerationParams,
    pub delivery: Delivery,
}

/// Seam between the orchestrator and whichever backend produces text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError>;
}

/// Gemini REST API client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(BACKEND_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    async fn generate_unary(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );
        let payload = build_payload(request);

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::BadStatus { status, body });
        }

        let body: Value = response.json().await?;
        candidate_text(&body).ok_or(BackendError::EmptyResponse)
    }

    /// Streamed delivery: concatenate SSE text deltas into one result
    async fn generate_streamed(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, request.model, self.api_key
        );
        let payload = build_payload(request);

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::BadStatus { status, body });
        }

        accumulate_sse_stream(Box::pin(response.bytes_stream())).await
    }
}

/// Accumulate the text deltas of an SSE byte stream into one result.
///
/// A fault after at least one non-empty chunk yields the accumulated
/// prefix; a fault before any usable text is an error.
async fn accumulate_sse_stream<S, B, E>(mut stream: S) -> Result<String, BackendError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<BackendError>,
{
    let mut accumulated = String::new();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(bytes) => bytes,
            Err(err) if accumulated.trim().is_empty() => return Err(err.into()),
            Err(err) => {
                let err = err.into();
                debug!(%err, "stream faulted mid-way, keeping accumulated prefix");
                break;
            }
        };
        buffer.push_str(&String::from_utf8_lossy(chunk.as_ref()));

        // SSE frames are newline-delimited; keep any trailing partial line
        while let Some(newline) = buffer.find('\n') {
            let line = buffer[..newline].to_string();
            buffer.drain(..=newline);
            if let Some(text) = parse_sse_data_line(&line) {
                accumulated.push_str(&text);
            }
        }
    }

    // a well-behaved stream ends with a newline, but a final frame can
    // arrive without one
    if let Some(text) = parse_sse_data_line(&buffer) {
        accumulated.push_str(&text);
    }

    if accumulated.trim().is_empty() {
        return Err(BackendError::EmptyResponse);
    }
    Ok(accumulated)
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        match request.delivery {
            Delivery::Unary => self.generate_unary(request).await,
            Delivery::Streamed => self.generate_streamed(request).await,
        }
    }
}

/// Build the JSON payload for a generation request
fn build_payload(request: &GenerationRequest) -> Value {
    let mut payload = json!({
        "contents": [
            {
                "parts": [
                    {"text": request.prompt}
                ]
            }
        ]
    });

    let params = &request.params;
    let mut generation_config = serde_json::Map::new();
    if let Some(temperature) = params.temperature {
        generation_config.insert("temperature".into(), json!(temperature));
    }
    if let Some(top_p) = params.top_p {
        generation_config.insert("topP".into(), json!(top_p));
    }
    if let Some(top_k) = params.top_k {
        generation_config.insert("topK".into(), json!(top_k));
    }
    if let Some(max_tokens) = params.max_output_tokens {
        generation_config.insert("maxOutputTokens".into(), json!(max_tokens));
    }
    if !generation_config.is_empty() {
        payload["generationConfig"] = Value::Object(generation_config);
    }

    if params.relax_safety {
        let settings: Vec<Value> = HARM_CATEGORIES
            .iter()
            .map(|category| json!({"category": category, "threshold": "BLOCK_NONE"}))
            .collect();
        payload["safetySettings"] = Value::Array(settings);
    }

    payload
}

/// Pull the generated text out of a response body
fn candidate_text(body: &Value) -> Option<String> {
    let text = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|candidates| candidates.first())
        .and_then(|candidate| candidate.pointer("/content/parts"))
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Extract the text delta from one SSE `data:` line, if it carries one
fn parse_sse_data_line(line: &str) -> Option<String> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    let value: Value = serde_json::from_str(data).ok()?;
    candidate_text(&value)
}
