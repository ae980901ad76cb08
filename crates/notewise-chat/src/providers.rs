//! OpenAI-compatible HTTP backend.
//!
//! Non-streaming calls read `choices[0].message.content`; streaming calls
//! read SSE `data:` lines until `[DONE]`.

use futures::future::BoxFuture;
use futures::Stream;
use reqwest::Client;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use crate::backend::{BoxedStream, GenerationBackend};
use crate::config::GenerationConfig;
use crate::types::{ChatMessage, CompletionRequest, StreamChunk, TransportError};

/// Backend for any endpoint speaking the OpenAI chat-completions protocol.
#[derive(Clone)]
pub struct OpenAiCompatBackend {
    client: Client,
    url: String,
    api_key: String,
}

impl OpenAiCompatBackend {
    /// `None` when the configuration has no usable key or base URL.
    pub fn from_config(config: &GenerationConfig) -> Option<Self> {
        if !config.is_configured() {
            return None;
        }
        Some(Self {
            client: Client::new(),
            url: config.completions_url(),
            api_key: config.api_key.clone().unwrap_or_default(),
        })
    }

    fn body(request: &CompletionRequest, stream: bool) -> Value {
        let msgs: Vec<Value> = request
            .messages
            .iter()
            .map(|m: &ChatMessage| json!({"role": m.role, "content": m.content}))
            .collect();
        let mut body = json!({
            "model": request.model,
            "messages": msgs,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if stream {
            body["stream"] = json!(true);
            body["stream_options"] = json!({"include_usage": true});
        }
        body
    }
}

impl GenerationBackend for OpenAiCompatBackend {
    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn complete(&self, request: CompletionRequest) -> BoxFuture<'static, Result<String, TransportError>> {
        let client = self.client.clone();
        let url = self.url.clone();
        let api_key = self.api_key.clone();

        Box::pin(async move {
            let body = Self::body(&request, false);
            debug!(
                "Calling {} with model {}, prompt length {}",
                url,
                request.model,
                request.prompt_chars()
            );

            let response = client
                .post(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .timeout(request.timeout)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                return Err(TransportError::from_status(status.as_u16(), truncate(&text, 500)));
            }

            let value: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                // Some gateways answer with the bare completion text.
                Err(_) => return Ok(text.trim().to_string()),
            };
            extract_message_text(&value)
                .ok_or_else(|| TransportError::Decode("response has no message content".into()))
        })
    }

    fn stream(&self, request: CompletionRequest) -> BoxedStream {
        Box::pin(stream_openai_compat(
            self.client.clone(),
            self.url.clone(),
            self.api_key.clone(),
            request,
        ))
    }
}

/// Text of the first choice, tolerating the shapes seen in the wild:
/// a bare string, `message.content` as a string or as an array of parts,
/// or legacy `choices[0].text`.
pub fn extract_message_text(value: &Value) -> Option<String> {
    if let Some(s) = value.as_str() {
        return Some(s.trim().to_string());
    }
    let choice = &value["choices"][0];
    let content = &choice["message"]["content"];
    match content {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Array(parts) => Some(
            parts
                .iter()
                .filter_map(|p| p["text"].as_str().or_else(|| p.as_str()))
                .collect::<String>()
                .trim()
                .to_string(),
        ),
        Value::Null => choice["text"].as_str().map(|s| s.trim().to_string()),
        _ => None,
    }
}

/// Content of one SSE delta. Absent or null content is an empty delta.
fn delta_text(parsed: &Value) -> String {
    match &parsed["choices"][0]["delta"]["content"] {
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts.iter().filter_map(|p| p["text"].as_str()).collect(),
        _ => String::new(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

fn stream_openai_compat(
    client: Client,
    url: String,
    api_key: String,
    request: CompletionRequest,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    async_stream::stream! {
        let body = OpenAiCompatBackend::body(&request, true);

        debug!(
            "Streaming from {} with model {}, prompt length {}",
            url,
            request.model,
            request.prompt_chars()
        );

        let response = match client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(e.into());
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(TransportError::from_status(status, truncate(&body, 500)));
            return;
        }

        let mut stream = response.bytes_stream();
        // Raw bytes: a UTF-8 sequence may straddle two network reads, so only
        // complete lines are decoded.
        let mut buffer: Vec<u8> = Vec::new();
        let mut tokens_used: Option<u64> = None;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(e.into());
                    return;
                }
            };

            buffer.extend_from_slice(&bytes);

            // Process complete SSE lines
            while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=line_end).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();

                if line.is_empty() || line.starts_with(':') {
                    continue;
                }

                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    yield StreamChunk::Done { tokens_used };
                    return;
                }

                match serde_json::from_str::<Value>(data) {
                    Ok(parsed) => {
                        if let Some(total) = parsed["usage"]["total_tokens"].as_u64() {
                            tokens_used = Some(total);
                        }
                        let text = delta_text(&parsed);
                        if !text.is_empty() {
                            yield StreamChunk::Token(text);
                        }
                    }
                    Err(e) => warn!("Skipping undecodable stream line: {}", e),
                }
            }
        }

        yield StreamChunk::Done { tokens_used };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_message_text_shapes() {
        let plain = json!({"choices": [{"message": {"content": "  hi  "}}]});
        assert_eq!(extract_message_text(&plain).as_deref(), Some("hi"));

        let parts = json!({"choices": [{"message": {"content": [
            {"type": "text", "text": "a"}, {"type": "text", "text": "b"}
        ]}}]});
        assert_eq!(extract_message_text(&parts).as_deref(), Some("ab"));

        let legacy = json!({"choices": [{"text": "old"}]});
        assert_eq!(extract_message_text(&legacy).as_deref(), Some("old"));

        assert_eq!(extract_message_text(&json!("bare")).as_deref(), Some("bare"));
        assert_eq!(extract_message_text(&json!({"choices": []})), None);
    }

    #[test]
    fn test_delta_text_tolerates_missing_content() {
        assert_eq!(delta_text(&json!({"choices": [{"delta": {"content": "x"}}]})), "x");
        assert_eq!(delta_text(&json!({"choices": [{"delta": {}}]})), "");
        assert_eq!(delta_text(&json!({"choices": [{"delta": {"content": null}}]})), "");
        assert_eq!(delta_text(&json!({"choices": [], "usage": {"total_tokens": 5}})), "");
    }

    #[test]
    fn test_unconfigured_has_no_backend() {
        assert!(OpenAiCompatBackend::from_config(&GenerationConfig::default()).is_none());
    }
}
