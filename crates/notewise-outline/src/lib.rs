//! Notewise Outline — heading hierarchy of Markdown notes.
//!
//! One left-to-right pass over heading lines builds the tree that backs
//! both the table of contents and the mind-map view. Section operations
//! share a single title-matching rule.

pub mod heading;
pub mod mindmap;
pub mod sections;
pub mod toc;
pub mod tree;

pub use heading::{heading_level, parse_heading, strip_emphasis};
pub use mindmap::MindMapNode;
pub use sections::{
    detect_section_edit, extract_section, has_edit_intent, parse_section_mention, replace_section, section_titles,
    SectionEditTarget, SectionInfo, SectionMention,
};
pub use toc::render_table_of_contents;
pub use tree::{HeadingNode, HeadingTreeBuilder};
