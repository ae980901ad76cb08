//! Table of contents rendering.

use crate::heading::parse_heading;

/// Markdown table of contents: one nested bullet per heading (two spaces
/// per level below 1) and a generation footer.
pub fn render_table_of_contents(markdown: &str, generated_at: &str) -> String {
    let mut lines = vec!["# Table of Contents".to_string(), String::new()];

    let entries: Vec<String> = markdown
        .lines()
        .filter_map(parse_heading)
        .map(|(level, title)| format!("{}- {}", "  ".repeat(level as usize - 1), title))
        .collect();

    if entries.is_empty() {
        lines.push("- No headings found".to_string());
    } else {
        lines.extend(entries);
    }

    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(format!("*Generated: {}*", generated_at));
    lines.join("\n")
}
