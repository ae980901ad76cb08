//! Notewise Ingest — turns the document parser's page-tagged records into
//! one ordered text blob plus an image manifest.

pub mod extract;
pub mod records;

pub use extract::{ContentExtractor, ExtractedContent, ImageRef};
pub use records::{load_records, PageNumber, PageRecord};
