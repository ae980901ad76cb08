//! Chat-completion client for an OpenAI-compatible endpoint.
//!
//! Supports blocking and streamed calls. When no endpoint is configured,
//! or a call fails in transport, a deterministic mock responder answers
//! instead so the pipeline stays usable offline.

pub mod backend;
pub mod client;
pub mod config;
pub mod mock;
pub mod providers;
pub mod scripted;
pub mod types;

pub use backend::{BoxedStream, GenerationBackend, UnavailableBackend};
pub use client::{GenerationClient, StreamSummary};
pub use config::GenerationConfig;
pub use mock::MockResponder;
pub use providers::OpenAiCompatBackend;
pub use scripted::{ScriptedBackend, ScriptedReply};
pub use types::*;
