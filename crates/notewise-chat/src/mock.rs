//! Deterministic offline responder.
//!
//! Answers by keyword sniffing on the prompt so every pipeline stage can
//! run without network access or credentials.

use tracing::warn;

const MOCK_MULTIPLE_CHOICE: &str = r#"```json
{
    "text": "This is a mock multiple choice question used to exercise the system.",
    "type": "multipleChoice",
    "options": ["A. Option 1", "B. Option 2", "C. Option 3", "D. Option 4"],
    "answer": "A",
    "explanation": "This is a mock explanation. Configure a generation endpoint for real content."
}
```"#;

const MOCK_FILL_BLANK: &str = r#"```json
{
    "text": "This is a mock fill-in-the-blank question: please fill in ______.",
    "type": "fillBlank",
    "answer": "answer",
    "explanation": "This is a mock explanation. Configure a generation endpoint for real content."
}
```"#;

const MOCK_TRUE_FALSE: &str = r#"```json
{
    "text": "This is a mock true/false statement.",
    "type": "trueFalse",
    "options": ["A. True", "B. False"],
    "answer": "A",
    "explanation": "This is a mock explanation. Configure a generation endpoint for real content."
}
```"#;

const MOCK_SHORT_ANSWER: &str = r#"```json
{
    "text": "This is a mock short answer question.",
    "type": "shortAnswer",
    "answer": "This is a mock answer.",
    "explanation": "This is a mock explanation. Configure a generation endpoint for real content."
}
```"#;

const MOCK_GENERIC: &str =
    "This is a mock response. Configure a generation endpoint and API key to enable live generation.";

/// Keyword-sniffing responder.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockResponder;

impl MockResponder {
    pub fn new() -> Self {
        Self
    }

    /// Canned reply for a prompt. Question-type phrases select a fenced
    /// JSON question; anything else gets a generic notice.
    pub fn respond(&self, prompt: &str) -> String {
        warn!("Using mock response ({} prompt chars)", prompt.chars().count());
        let lower = prompt.to_lowercase();
        if lower.contains("multiple choice") {
            MOCK_MULTIPLE_CHOICE.to_string()
        } else if lower.contains("fill-in-the-blank") {
            MOCK_FILL_BLANK.to_string()
        } else if lower.contains("true/false") {
            MOCK_TRUE_FALSE.to_string()
        } else if lower.contains("short answer") {
            MOCK_SHORT_ANSWER.to_string()
        } else {
            MOCK_GENERIC.to_string()
        }
    }

    /// The reply split into small pieces, as a stream would deliver it.
    pub fn respond_chunked(&self, prompt: &str, chunk_chars: usize) -> Vec<String> {
        let text = self.respond(prompt);
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(chunk_chars.max(1))
            .map(|c| c.iter().collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniffing() {
        let mock = MockResponder::new();
        assert!(mock.respond("Write one Multiple Choice question").contains("\"options\""));
        assert!(mock.respond("a fill-in-the-blank question").contains("______"));
        assert!(mock.respond("one true/false statement").contains("A. True"));
        assert!(mock.respond("a short answer question").contains("mock answer"));
        assert_eq!(mock.respond("summarize this"), MOCK_GENERIC);
    }

    #[test]
    fn test_chunks_reassemble() {
        let mock = MockResponder::new();
        let chunks = mock.respond_chunked("true/false", 16);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 16));
        assert_eq!(chunks.concat(), mock.respond("true/false"));
    }
}
