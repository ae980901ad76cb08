//! Section lookup and editing by heading title.
//!
//! Title matching, used by every operation here: compare emphasis-stripped,
//! case-insensitive titles; the first exact match wins, otherwise the first
//! heading where either title contains the other.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::heading::{heading_level, parse_heading, strip_emphasis};

static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@([^@\s]+)").unwrap());
static MENTION_STRIP: Lazy<Regex> = Lazy::new(|| Regex::new(r"@[^@\s]+\s*").unwrap());

/// Words signalling that a chat message asks for an edit.
const EDIT_KEYWORDS: &[&str] = &[
    "edit", "modify", "improve", "rewrite", "update", "expand", "refine", "simplify",
    "elaborate", "revise", "polish", "more detail",
];

const PREVIEW_CHARS: usize = 100;

fn normalize(title: &str) -> String {
    strip_emphasis(title).to_lowercase()
}

/// Index and level of the heading line matching `title`.
fn find_heading(lines: &[&str], title: &str) -> Option<(usize, usize)> {
    let wanted = normalize(title);
    if wanted.is_empty() {
        return None;
    }

    let headings: Vec<(usize, usize, String)> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let level = heading_level(line)?;
            let text = normalize(&line.trim()[level..]);
            (!text.is_empty()).then_some((i, level, text))
        })
        .collect();

    headings
        .iter()
        .find(|(_, _, text)| *text == wanted)
        .or_else(|| {
            headings
                .iter()
                .find(|(_, _, text)| text.contains(&wanted) || wanted.contains(text.as_str()))
        })
        .map(|(i, level, _)| (*i, *level))
}

/// Half-open line range `[start, end)` of the section headed by `title`:
/// the heading plus everything up to the next heading of the same or a
/// higher level.
fn section_range(lines: &[&str], title: &str) -> Option<(usize, usize)> {
    let (start, level) = find_heading(lines, title)?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| heading_level(line).is_some_and(|l| l <= level))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());
    Some((start, end))
}

/// The section's heading line and body, including nested sub-sections.
pub fn extract_section(markdown: &str, title: &str) -> Option<String> {
    let lines: Vec<&str> = markdown.lines().collect();
    let (start, end) = section_range(&lines, title)?;
    Some(lines[start..end].join("\n").trim_end().to_string())
}

/// Swap the whole section (heading and sub-sections) for `new_content`.
/// A blank line is kept before the following heading.
pub fn replace_section(markdown: &str, title: &str, new_content: &str) -> Option<String> {
    let lines: Vec<&str> = markdown.lines().collect();
    let (start, end) = section_range(&lines, title)?;
    debug!("Replacing section lines {}..{}", start, end);

    let mut out: Vec<&str> = lines[..start].to_vec();
    out.extend(new_content.trim_end().lines());
    if end < lines.len() {
        out.push("");
        out.extend(&lines[end..]);
    }
    let mut result = out.join("\n");
    if markdown.ends_with('\n') {
        result.push('\n');
    }
    Some(result)
}

/// Heading of a given level with a short preview of its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionInfo {
    pub title: String,
    pub level: u8,
    pub preview: String,
}

/// Headings of exactly `level`, for section pickers.
pub fn section_titles(markdown: &str, level: u8) -> Vec<SectionInfo> {
    let lines: Vec<&str> = markdown.lines().collect();
    let mut sections = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some((l, title)) = parse_heading(line) else {
            continue;
        };
        if l != level {
            continue;
        }

        let preview_lines: Vec<&str> = lines[i + 1..]
            .iter()
            .take(3)
            .map(|s| s.trim())
            .take_while(|s| !s.starts_with('#'))
            .filter(|s| !s.is_empty())
            .collect();
        let joined = preview_lines.join(" ");
        let preview = if joined.is_empty() {
            "No preview available".to_string()
        } else if joined.chars().count() > PREVIEW_CHARS {
            format!("{}...", joined.chars().take(PREVIEW_CHARS).collect::<String>())
        } else {
            joined
        };

        sections.push(SectionInfo {
            title,
            level: l,
            preview,
        });
    }
    sections
}

/// `@Section question` split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionMention {
    pub title: String,
    pub question: String,
}

/// First `@title` token in a message plus the message with every mention
/// removed. `None` when the message has no mention.
pub fn parse_section_mention(message: &str) -> Option<SectionMention> {
    let title = MENTION.captures(message)?.get(1)?.as_str().to_string();
    let question = MENTION_STRIP.replace_all(message, "").trim().to_string();
    Some(SectionMention { title, question })
}

/// Section a free-form edit request most likely refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionEditTarget {
    pub title: String,
    pub level: u8,
    pub content: String,
}

/// Whether a message asks for an edit rather than an answer.
pub fn has_edit_intent(message: &str) -> bool {
    let lower = message.to_lowercase();
    EDIT_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Score headings against a message that expresses an edit intent. Each
/// title word found in the message adds its length; the whole title found
/// adds twice its length. The best score must exceed 2.
pub fn detect_section_edit(message: &str, markdown: &str) -> Option<SectionEditTarget> {
    if !has_edit_intent(message) {
        return None;
    }
    let message_lower = message.to_lowercase();

    let mut best: Option<(usize, u8, String)> = None;
    for (level, title) in markdown.lines().filter_map(parse_heading) {
        let title_lower = title.to_lowercase();
        let mut score: usize = title_lower
            .split_whitespace()
            .filter(|w| message_lower.contains(w))
            .map(|w| w.chars().count())
            .sum();
        if message_lower.contains(&title_lower) {
            score += title_lower.chars().count() * 2;
        }
        if best.as_ref().map_or(true, |(s, _, _)| score > *s) {
            best = Some((score, level, title));
        }
    }

    let (score, level, title) = best?;
    if score <= 2 {
        return None;
    }
    let content = extract_section(markdown, &title)?;
    Some(SectionEditTarget {
        title,
        level,
        content,
    })
}
