//! Heading line recognition.

/// Deepest heading level Markdown supports.
pub const MAX_LEVEL: usize = 6;

/// Number of leading `#` on a trimmed line, or `None` for non-heading lines.
/// Not capped at six; callers use it for section boundaries.
pub fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    (level > 0).then_some(level)
}

/// Remove residual emphasis markup (`**`, `*`, backticks) from a title.
pub fn strip_emphasis(title: &str) -> String {
    title
        .replace("**", "")
        .replace(['*', '`'], "")
        .trim()
        .to_string()
}

/// `(level, clean title)` for a heading of level 1..=6 with a non-empty
/// title after emphasis stripping.
pub fn parse_heading(line: &str) -> Option<(u8, String)> {
    let level = heading_level(line)?;
    if level > MAX_LEVEL {
        return None;
    }
    let trimmed = line.trim();
    let title = strip_emphasis(&trimmed[level..]);
    if title.is_empty() {
        return None;
    }
    Some((level as u8, title))
}
