//! Record-to-text extraction.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use notewise_core::Result;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::records::{PageNumber, PageRecord};

/// Figure reference carried alongside the text blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRef {
    pub page: PageNumber,
    pub absolute_path: String,
    pub relative_path: String,
    pub caption: String,
}

/// Ordered text plus image manifest for one generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedContent {
    pub text_content: String,
    pub images_info: Vec<ImageRef>,
}

impl ExtractedContent {
    pub fn is_empty(&self) -> bool {
        self.text_content.trim().is_empty()
    }
}

#[derive(Default)]
struct PageBlock {
    texts: Vec<String>,
    figures: Vec<String>,
}

/// Groups records by page and renders them as `=== Page n ===` blocks.
pub struct ContentExtractor {
    output_dir: Option<PathBuf>,
}

impl ContentExtractor {
    /// `output_dir` is where the generated notes will live; figure paths are
    /// made relative to it.
    pub fn new(output_dir: Option<&Path>) -> Self {
        Self {
            output_dir: output_dir.map(Path::to_path_buf),
        }
    }

    pub fn extract(&self, records: &[PageRecord]) -> ExtractedContent {
        let mut pages: BTreeMap<PageNumber, PageBlock> = BTreeMap::new();
        let mut images_info = Vec::new();

        for record in records {
            match record {
                PageRecord::Text { page, content } => {
                    let content = content.trim();
                    if !content.is_empty() {
                        pages.entry(*page).or_default().texts.push(content.to_string());
                    }
                }
                PageRecord::Figure { page, path, caption } => {
                    let relative_path = self.relative_path(path);
                    pages
                        .entry(*page)
                        .or_default()
                        .figures
                        .push(format!("[image] path: {}\ncaption: {}", relative_path, caption));
                    images_info.push(ImageRef {
                        page: *page,
                        absolute_path: path.clone(),
                        relative_path,
                        caption: caption.clone(),
                    });
                }
            }
        }

        let blocks: Vec<String> = pages
            .iter()
            .filter_map(|(page, block)| {
                let mut sections = Vec::new();
                let text = block.texts.join("\n");
                if !text.trim().is_empty() {
                    sections.push(text.trim().to_string());
                }
                let figures = block.figures.join("\n");
                if !figures.trim().is_empty() {
                    sections.push(figures.trim().to_string());
                }
                if sections.is_empty() {
                    None
                } else {
                    Some(format!("=== Page {} ===\n{}", page, sections.join("\n\n")))
                }
            })
            .collect();

        debug!(
            "Extracted {} page blocks, {} images from {} records",
            blocks.len(),
            images_info.len(),
            records.len()
        );

        ExtractedContent {
            text_content: blocks.join("\n\n"),
            images_info,
        }
    }

    /// Decode a raw parser payload, then extract.
    pub fn extract_value(&self, value: Value) -> Result<ExtractedContent> {
        let records = PageRecord::decode_all(value)?;
        Ok(self.extract(&records))
    }

    /// Figure path as seen from the notes file.
    pub fn relative_path(&self, source: &str) -> String {
        let mut rel = source.to_string();
        if let Some(out) = &self.output_dir {
            let src = Path::new(source);
            if src.is_absolute() {
                if let Some(r) = relative_to(src, out) {
                    rel = r;
                }
            }
        }
        let rel = rel.replace('\\', "/");

        // Note files sit two levels above the uploads tree.
        let segments: Vec<&str> = rel.split('/').collect();
        match segments.iter().position(|s| *s == "uploads") {
            Some(idx) => format!("../../{}", segments[idx..].join("/")),
            None => rel,
        }
    }
}

fn relative_to(path: &Path, base: &Path) -> Option<String> {
    if !base.is_absolute() {
        return None;
    }
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();
    if common == 0 {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    for _ in common..base_parts.len() {
        parts.push("..".to_string());
    }
    for part in &path_parts[common..] {
        parts.push(part.as_os_str().to_string_lossy().into_owned());
    }
    if parts.is_empty() {
        return Some(".".to_string());
    }
    Some(parts.join("/"))
}
