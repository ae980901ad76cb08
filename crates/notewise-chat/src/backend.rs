//! Backend abstraction over the chat-completion endpoint.

use std::pin::Pin;

use futures::future::BoxFuture;
use futures::Stream;

use crate::types::{CompletionRequest, StreamChunk, TransportError};

/// Boxed stream type for returning different stream implementations.
pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// Something that can answer a completion request.
pub trait GenerationBackend: Send + Sync {
    /// Whether this backend can serve live requests at all.
    fn is_available(&self) -> bool;

    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Blocking completion returning the first choice's text.
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'static, Result<String, TransportError>>;

    /// Streamed completion. The stream ends after `Done` or `Error`.
    fn stream(&self, request: CompletionRequest) -> BoxedStream;
}

/// Backend used when no endpoint is configured.
pub struct UnavailableBackend;

impl GenerationBackend for UnavailableBackend {
    fn is_available(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unavailable"
    }

    fn complete(&self, _request: CompletionRequest) -> BoxFuture<'static, Result<String, TransportError>> {
        Box::pin(async { Err(TransportError::Unknown("no generation endpoint configured".into())) })
    }

    fn stream(&self, _request: CompletionRequest) -> BoxedStream {
        Box::pin(futures::stream::once(async {
            StreamChunk::Error(TransportError::Unknown("no generation endpoint configured".into()))
        }))
    }
}
