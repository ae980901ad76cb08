//! In-memory backend that replays scripted replies. Used by tests across
//! the workspace so no test needs network access.

use std::collections::VecDeque;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use crate::backend::{BoxedStream, GenerationBackend};
use crate::types::{CompletionRequest, StreamChunk, TransportError};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Full text; streamed in small pieces.
    Text(String),
    /// Explicit stream pieces, then a normal end.
    Chunks(Vec<String>),
    /// Stream pieces, then a transport failure.
    ChunksThenFail(Vec<String>, TransportError),
    Fail(TransportError),
}

type Responder = Box<dyn Fn(&str) -> ScriptedReply + Send + Sync>;

/// Replays queued replies in order, then falls back to a responder
/// function keyed on the prompt.
pub struct ScriptedBackend {
    queue: Mutex<VecDeque<ScriptedReply>>,
    responder: Option<Responder>,
    prompts: Mutex<Vec<String>>,
    available: bool,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            queue: Mutex::new(replies.into()),
            responder: None,
            prompts: Mutex::new(Vec::new()),
            available: true,
        }
    }

    /// Answer every request through `f`.
    pub fn responding(f: impl Fn(&str) -> ScriptedReply + Send + Sync + 'static) -> Self {
        Self {
            responder: Some(Box::new(f)),
            ..Self::new(Vec::new())
        }
    }

    /// A backend that reports itself unavailable.
    pub fn offline() -> Self {
        Self {
            available: false,
            ..Self::new(Vec::new())
        }
    }

    /// Prompts received so far (last user message of each request).
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn next_reply(&self, request: &CompletionRequest) -> ScriptedReply {
        let prompt = request.last_user_content().to_string();
        self.prompts.lock().push(prompt.clone());
        if let Some(reply) = self.queue.lock().pop_front() {
            return reply;
        }
        match &self.responder {
            Some(f) => f(&prompt),
            None => ScriptedReply::Fail(TransportError::Unknown("script exhausted".into())),
        }
    }
}

fn split_pieces(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(8).map(|c| c.iter().collect()).collect()
}

impl GenerationBackend for ScriptedBackend {
    fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(&self, request: CompletionRequest) -> BoxFuture<'static, Result<String, TransportError>> {
        let result = match self.next_reply(&request) {
            ScriptedReply::Text(text) => Ok(text),
            ScriptedReply::Chunks(pieces) => Ok(pieces.concat()),
            ScriptedReply::ChunksThenFail(_, e) | ScriptedReply::Fail(e) => Err(e),
        };
        Box::pin(async move { result })
    }

    fn stream(&self, request: CompletionRequest) -> BoxedStream {
        let items: Vec<StreamChunk> = match self.next_reply(&request) {
            ScriptedReply::Text(text) => split_pieces(&text)
                .into_iter()
                .map(StreamChunk::Token)
                .chain(std::iter::once(StreamChunk::Done { tokens_used: None }))
                .collect(),
            ScriptedReply::Chunks(pieces) => pieces
                .into_iter()
                .map(StreamChunk::Token)
                .chain(std::iter::once(StreamChunk::Done { tokens_used: None }))
                .collect(),
            ScriptedReply::ChunksThenFail(pieces, e) => pieces
                .into_iter()
                .map(StreamChunk::Token)
                .chain(std::iter::once(StreamChunk::Error(e)))
                .collect(),
            ScriptedReply::Fail(e) => vec![StreamChunk::Error(e)],
        };
        Box::pin(futures::stream::iter(items))
    }
}
