//! Notewise Core — error taxonomy, configuration, lifecycle events, cancellation.

pub mod cancel;
pub mod config;
pub mod error;
pub mod events;

pub use cancel::CancelToken;
pub use config::{DataPaths, NotewiseConfig};
pub use error::{Error, Outcome, Result};
pub use events::{Artifacts, CollectingSink, EventSink, GenerationEvent, NullSink};
