//! Generation client: one canonical text result per call, transport
//! failures absorbed into the mock responder.

use std::sync::Arc;

use notewise_core::{CancelToken, EventSink, GenerationEvent, Result};
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

use crate::backend::{BoxedStream, GenerationBackend, UnavailableBackend};
use crate::config::{GenerationConfig, DEFAULT_MODEL};
use crate::mock::MockResponder;
use crate::providers::OpenAiCompatBackend;
use crate::types::{
    CallOptions, ChatMessage, Completion, CompletionRequest, CompletionSource, StreamChunk,
    TransportError,
};

const MOCK_CHUNK_CHARS: usize = 24;

/// Outcome of a streamed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub total_chars: usize,
    pub chunks: usize,
    pub source: CompletionSource,
    /// The stream failed after some text had already been delivered.
    pub truncated: bool,
    pub tokens_used: Option<u64>,
}

#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn GenerationBackend>,
    default_model: String,
    mock: MockResponder,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn GenerationBackend>, default_model: impl Into<String>) -> Self {
        Self {
            backend,
            default_model: default_model.into(),
            mock: MockResponder::new(),
        }
    }

    /// Live client when the configuration is usable, mock mode otherwise.
    pub fn from_config(config: &GenerationConfig) -> Self {
        match OpenAiCompatBackend::from_config(config) {
            Some(backend) => {
                info!(
                    "Generation client ready: {} (model {})",
                    config.base_url, config.default_model
                );
                Self::new(Arc::new(backend), config.default_model.clone())
            }
            None => {
                warn!("Generation endpoint not configured, running in mock mode");
                Self::unavailable()
            }
        }
    }

    pub fn unavailable() -> Self {
        Self::new(Arc::new(UnavailableBackend), DEFAULT_MODEL)
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    fn request(&self, messages: Vec<ChatMessage>, opts: &CallOptions) -> CompletionRequest {
        CompletionRequest {
            messages,
            model: opts.model.clone().unwrap_or_else(|| self.default_model.clone()),
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
            timeout: opts.timeout,
        }
    }

    fn mock_completion(&self, prompt: &str) -> Completion {
        Completion {
            text: self.mock.respond(prompt),
            source: CompletionSource::Mock,
        }
    }

    fn log_failure(&self, e: &TransportError) {
        error!(
            category = e.category(),
            backend = self.backend.name(),
            "Generation call failed: {}",
            e
        );
        warn!("Falling back to mock response");
    }

    /// Single-prompt blocking call. Never fails: transport problems yield
    /// the mock reply, marked as such.
    pub async fn call(&self, prompt: &str, opts: &CallOptions) -> Completion {
        self.chat(vec![ChatMessage::user(prompt)], opts).await
    }

    pub async fn chat(&self, messages: Vec<ChatMessage>, opts: &CallOptions) -> Completion {
        let request = self.request(messages, opts);
        let prompt = request.last_user_content().to_string();

        if !self.is_available() {
            return self.mock_completion(&prompt);
        }

        info!(
            "Calling generation API, model {}, prompt length {}",
            request.model,
            request.prompt_chars()
        );

        match self.backend.complete(request).await {
            Ok(text) => {
                info!("Generation call succeeded, response length {}", text.chars().count());
                Completion {
                    text,
                    source: CompletionSource::Live,
                }
            }
            Err(e) => {
                self.log_failure(&e);
                self.mock_completion(&prompt)
            }
        }
    }

    fn mock_stream(&self, prompt: &str) -> BoxedStream {
        let items: Vec<StreamChunk> = self
            .mock
            .respond_chunked(prompt, MOCK_CHUNK_CHARS)
            .into_iter()
            .map(StreamChunk::Token)
            .chain(std::iter::once(StreamChunk::Done { tokens_used: None }))
            .collect();
        Box::pin(futures::stream::iter(items))
    }

    /// Lazy chunk stream. Not restartable; issue a fresh call to retry.
    pub fn stream(&self, prompt: &str, opts: &CallOptions) -> BoxedStream {
        if !self.is_available() {
            return self.mock_stream(prompt);
        }
        self.backend
            .stream(self.request(vec![ChatMessage::user(prompt)], opts))
    }

    /// Drive a streamed call to completion, handing each piece to `write`
    /// and emitting a content event with the running character total.
    ///
    /// A failure before the first piece switches to the mock reply; a
    /// failure later keeps what arrived and reports the run as truncated.
    /// Cancellation is checked between pieces and drops the connection.
    pub async fn stream_into<W>(
        &self,
        prompt: &str,
        opts: &CallOptions,
        sink: &dyn EventSink,
        cancel: &CancelToken,
        mut write: W,
    ) -> Result<StreamSummary>
    where
        W: FnMut(&str) -> Result<()>,
    {
        let mut summary = StreamSummary {
            total_chars: 0,
            chunks: 0,
            source: CompletionSource::Live,
            truncated: false,
            tokens_used: None,
        };

        let mut stream = if self.is_available() {
            self.stream(prompt, opts)
        } else {
            summary.source = CompletionSource::Mock;
            self.mock_stream(prompt)
        };

        loop {
            cancel.check()?;
            let Some(item) = stream.next().await else {
                break;
            };
            match item {
                StreamChunk::Token(piece) => {
                    write(&piece)?;
                    summary.total_chars += piece.chars().count();
                    summary.chunks += 1;
                    sink.emit(GenerationEvent::Content {
                        chunk: piece,
                        total_chars: summary.total_chars,
                    });
                }
                StreamChunk::Done { tokens_used } => {
                    summary.tokens_used = tokens_used;
                    break;
                }
                StreamChunk::Error(e) => {
                    self.log_failure(&e);
                    if summary.chunks == 0 && summary.source == CompletionSource::Live {
                        summary.source = CompletionSource::Mock;
                        stream = self.mock_stream(prompt);
                        continue;
                    }
                    warn!(
                        "Stream interrupted after {} chars, keeping partial output",
                        summary.total_chars
                    );
                    summary.truncated = true;
                    break;
                }
            }
        }

        info!(
            "Stream finished: {} chars in {} chunks ({:?})",
            summary.total_chars, summary.chunks, summary.source
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{ScriptedBackend, ScriptedReply};
    use notewise_core::CollectingSink;

    fn client_with(backend: ScriptedBackend) -> (GenerationClient, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        (GenerationClient::new(backend.clone(), "test-model"), backend)
    }

    #[tokio::test]
    async fn test_call_live() {
        let (client, backend) = client_with(ScriptedBackend::new(vec![ScriptedReply::Text(
            "hello".into(),
        )]));
        let out = client.call("prompt one", &CallOptions::default()).await;
        assert_eq!(out.text, "hello");
        assert!(out.is_live());
        assert_eq!(backend.prompts(), vec!["prompt one".to_string()]);
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_mock() {
        let (client, _) = client_with(ScriptedBackend::new(vec![ScriptedReply::Fail(
            TransportError::Timeout,
        )]));
        let out = client
            .call("Write one true/false statement", &CallOptions::default())
            .await;
        assert_eq!(out.source, CompletionSource::Mock);
        assert!(out.text.contains("A. True"));
    }

    #[tokio::test]
    async fn test_unavailable_short_circuits() {
        let (client, backend) = client_with(ScriptedBackend::offline());
        assert!(!client.is_available());
        let out = client.call("anything", &CallOptions::default()).await;
        assert_eq!(out.source, CompletionSource::Mock);
        assert!(backend.prompts().is_empty());

        let plain = GenerationClient::unavailable();
        assert!(!plain.is_available());
    }

    #[tokio::test]
    async fn test_stream_into_accumulates() {
        let (client, _) = client_with(ScriptedBackend::new(vec![ScriptedReply::Chunks(vec![
            "# Ti".into(),
            "tle\n".into(),
            "body".into(),
        ])]));
        let sink = CollectingSink::new();
        let mut written = String::new();
        let summary = client
            .stream_into("p", &CallOptions::default(), &sink, &CancelToken::new(), |s| {
                written.push_str(s);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(written, "# Title\nbody");
        assert_eq!(summary.total_chars, 12);
        assert_eq!(summary.chunks, 3);
        assert_eq!(summary.source, CompletionSource::Live);
        assert!(!summary.truncated);
        let last = sink.events().last().cloned().unwrap();
        assert_eq!(
            last,
            GenerationEvent::Content {
                chunk: "body".into(),
                total_chars: 12
            }
        );
    }

    #[tokio::test]
    async fn test_stream_error_before_first_piece_uses_mock() {
        let (client, _) = client_with(ScriptedBackend::new(vec![ScriptedReply::Fail(
            TransportError::Connection("refused".into()),
        )]));
        let sink = CollectingSink::new();
        let summary = client
            .stream_into("notes please", &CallOptions::default(), &sink, &CancelToken::new(), |_| Ok(()))
            .await
            .unwrap();
        assert_eq!(summary.source, CompletionSource::Mock);
        assert_eq!(sink.streamed_text(), MockResponder::new().respond("notes please"));
    }

    #[tokio::test]
    async fn test_stream_error_midway_keeps_partial() {
        let (client, _) = client_with(ScriptedBackend::new(vec![ScriptedReply::ChunksThenFail(
            vec!["partial ".into(), "text".into()],
            TransportError::Timeout,
        )]));
        let sink = CollectingSink::new();
        let summary = client
            .stream_into("p", &CallOptions::default(), &sink, &CancelToken::new(), |_| Ok(()))
            .await
            .unwrap();
        assert!(summary.truncated);
        assert_eq!(summary.source, CompletionSource::Live);
        assert_eq!(sink.streamed_text(), "partial text");
    }

    #[tokio::test]
    async fn test_stream_cancelled() {
        let (client, _) = client_with(ScriptedBackend::new(vec![ScriptedReply::Chunks(vec![
            "a".into(),
            "b".into(),
            "c".into(),
        ])]));
        let cancel = CancelToken::new();
        let sink = CollectingSink::new();
        let trigger = cancel.clone();
        let result = client
            .stream_into("p", &CallOptions::default(), &sink, &cancel, |piece| {
                if piece == "b" {
                    trigger.cancel();
                }
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(notewise_core::Error::Cancelled)));
        assert_eq!(sink.streamed_text(), "ab");
    }

    #[tokio::test]
    async fn test_default_model_applied() {
        let (client, _) = client_with(ScriptedBackend::new(vec![]));
        let req = client.request(vec![ChatMessage::user("x")], &CallOptions::default());
        assert_eq!(req.model, "test-model");
        let req = client.request(
            vec![ChatMessage::user("x")],
            &CallOptions::default().with_model("other"),
        );
        assert_eq!(req.model, "other");
    }
}
