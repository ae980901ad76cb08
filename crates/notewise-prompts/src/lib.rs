//! Notewise Prompts — template store and prompt assembly.
//!
//! Templates are configuration data: built-in defaults that can be
//! overridden per name from a JSON file and are validated for their
//! placeholders before first use.

pub mod builder;
pub mod defaults;
pub mod templates;

pub use builder::{content_window, window_bounds, PromptBuilder};
pub use templates::{TemplateName, TemplateStore};
