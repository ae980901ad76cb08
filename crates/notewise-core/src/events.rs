//! Lifecycle events emitted by long-running generation runs.
//!
//! The web layer (or the job registry) consumes these to update progress
//! without blocking on the run itself.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

/// Files written by a completed run, keyed by role.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Artifacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<PathBuf>,
}

/// Discrete progress events.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GenerationEvent {
    Start,
    Content {
        chunk: String,
        #[serde(rename = "totalChars")]
        total_chars: usize,
    },
    /// Item-level progress for multi-step runs (quiz batches).
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    Complete { artifacts: Artifacts },
    Error { message: String },
}

impl GenerationEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationEvent::Complete { .. } | GenerationEvent::Error { .. })
    }
}

/// Receiver of lifecycle events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: GenerationEvent);
}

/// Sink that discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: GenerationEvent) {}
}

impl EventSink for UnboundedSender<GenerationEvent> {
    fn emit(&self, event: GenerationEvent) {
        // Receiver gone means nobody is polling any more.
        let _ = self.send(event);
    }
}

/// Sink that records every event in memory.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<GenerationEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GenerationEvent> {
        self.events.lock().clone()
    }

    /// Concatenation of all streamed chunks.
    pub fn streamed_text(&self) -> String {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                GenerationEvent::Content { chunk, .. } => Some(chunk.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: GenerationEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let ev = GenerationEvent::Content {
            chunk: "ab".into(),
            total_chars: 2,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "content");
        assert_eq!(json["totalChars"], 2);

        let done = GenerationEvent::Complete {
            artifacts: Artifacts {
                notes: Some(PathBuf::from("run/notes.md")),
                ..Default::default()
            },
        };
        let json = serde_json::to_value(&done).unwrap();
        assert_eq!(json["type"], "complete");
        assert_eq!(json["artifacts"]["notes"], "run/notes.md");
        assert!(json["artifacts"].get("contents").is_none());
        assert!(done.is_terminal());
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.emit(GenerationEvent::Start);
        sink.emit(GenerationEvent::Content { chunk: "He".into(), total_chars: 2 });
        sink.emit(GenerationEvent::Content { chunk: "llo".into(), total_chars: 5 });
        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.streamed_text(), "Hello");
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.emit(GenerationEvent::Start);
        drop(rx.recv().await);
        drop(rx);
        // Closed receiver is not an error for the emitter.
        tx.emit(GenerationEvent::Error { message: "late".into() });
    }
}
