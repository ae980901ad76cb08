//! Deterministic prompt assembly for single-question generation.

/// Upper bound on a diversity window, in characters.
pub const MAX_WINDOW_CHARS: usize = 1000;

/// Lower bound on a diversity window, in characters (or the whole content
/// when shorter).
pub const MIN_WINDOW_CHARS: usize = 200;

const EMPTY_CONTENT: &str = "(no notes content available)";

/// Window `[start, end)` in characters for item `index` of `total` over
/// content of `len` characters.
///
/// Size is `min(1000, len / total)` raised to at least `min(len, 200)`, so
/// small inputs and large totals never yield empty windows. Start wraps
/// modulo `max(len - size, 1)`.
pub fn window_bounds(len: usize, index: usize, total: usize) -> (usize, usize) {
    if len == 0 {
        return (0, 0);
    }
    let size = (len / total.max(1))
        .min(MAX_WINDOW_CHARS)
        .max(len.min(MIN_WINDOW_CHARS));
    let start = index.wrapping_mul(size) % len.saturating_sub(size).max(1);
    let end = (start + size).min(len);
    (start, end)
}

/// The content slice for item `index` of `total`.
pub fn content_window(content: &str, index: usize, total: usize) -> &str {
    let len = content.chars().count();
    let (start, end) = window_bounds(len, index, total);
    let byte_at = |pos: usize| {
        content
            .char_indices()
            .nth(pos)
            .map(|(b, _)| b)
            .unwrap_or(content.len())
    };
    &content[byte_at(start)..byte_at(end)]
}

/// Builds the per-question prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Template, diversity instruction, content window, optional preferences
    /// and the JSON field contract, in that order.
    pub fn build(
        &self,
        template: &str,
        type_name: &str,
        content: &str,
        preferences: &str,
        index: usize,
        total: usize,
    ) -> String {
        let window = if content.trim().is_empty() {
            EMPTY_CONTENT
        } else {
            content_window(content, index, total)
        };

        let preference_line = if preferences.trim().is_empty() {
            String::new()
        } else {
            format!("\nLearner preferences: {}", preferences.trim())
        };

        format!(
            "{template}

Make sure this question differs from the ones generated before and focuses on a different point.
This is question {n} of {total} {type_name} questions.

Study notes:
{window}
{preference_line}

Write exactly one {type_name} question based on the notes above. Keep it accurate and meaningful, and give a detailed explanation.
Return JSON with these fields:
- text: the question
- type: the question type
- options: list of labeled options (choice-style questions only)
- answer: the correct answer
- explanation: a detailed explanation
",
            n = index + 1,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distinct_starts_for_long_content() {
        let starts: Vec<usize> = (0..4).map(|i| window_bounds(10_000, i, 4).0).collect();
        assert_eq!(starts, vec![0, 1000, 2000, 3000]);
        for i in 0..4 {
            let (s, e) = window_bounds(10_000, i, 4);
            assert_eq!(e - s, 1000);
        }
    }

    #[test]
    fn test_window_never_empty() {
        // 150 chars, 20 items: the raw formula would give 7-char windows.
        for i in 0..20 {
            let (s, e) = window_bounds(150, i, 20);
            assert_eq!((s, e), (0, 150));
        }
        // 1000 chars, 50 items: clamped up to 200.
        let (s, e) = window_bounds(1000, 3, 50);
        assert_eq!(e - s, 200);
        assert_eq!(s, 600);
        assert_eq!(window_bounds(0, 0, 1), (0, 0));
        assert_eq!(window_bounds(10, 0, 0), (0, 10));
    }

    #[test]
    fn test_window_respects_char_boundaries() {
        let content = "é".repeat(3000);
        let w = content_window(&content, 1, 3);
        assert_eq!(w.chars().count(), 1000);
    }

    #[test]
    fn test_build_layout() {
        let prompt = PromptBuilder::new().build(
            "TEMPLATE",
            "multiple choice",
            "The mitochondria is the powerhouse of the cell.",
            "focus on biology",
            1,
            3,
        );
        assert!(prompt.starts_with("TEMPLATE\n\n"));
        assert!(prompt.contains("This is question 2 of 3 multiple choice questions."));
        assert!(prompt.contains("powerhouse"));
        assert!(prompt.contains("Learner preferences: focus on biology"));
        assert!(prompt.contains("- explanation:"));
    }

    #[test]
    fn test_build_without_content_or_preferences() {
        let prompt = PromptBuilder::new().build("T", "short answer", "  ", "", 0, 1);
        assert!(prompt.contains(EMPTY_CONTENT));
        assert!(!prompt.contains("Learner preferences"));
    }
}
