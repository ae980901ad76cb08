//! Notewise Notes — study notes from extracted document records.
//!
//! A run streams the model's Markdown straight into `notes.md`, then derives
//! the table of contents. Follow-up work on a run (section questions,
//! rewrites, section mind maps) goes through the assistant types here.

pub mod assistant;
pub mod generator;
pub mod mindmap;
pub mod store;

pub use assistant::{AssistantReply, PendingEdit, SectionAssistant};
pub use generator::{NoteGenerator, NoteRun};
pub use mindmap::MindMapRefiner;
pub use store::{latest_notes, write_table_of_contents, CONTENTS_FILE, EXTRACTED_FILE, NOTES_FILE, PROMPT_FILE};
