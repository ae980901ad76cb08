//! Model reply to question record.
//!
//! JSON is looked for in three places, first hit wins: a fenced `json`
//! block, the first balanced `{...}` span that decodes, the whole reply.
//! Replies that yield no usable object become fallback records.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::fallback::FallbackGenerator;
use crate::types::{QuestionRecord, QuestionType};

static FENCED: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)```\s*json\s*(.*?)```").unwrap());
static OPTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[A-Da-d]\s*[.、:)．]\s*").unwrap());
/// A bare option letter, alone or followed by a label separator.
static CHOICE_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([A-Da-d])\s*(?:[.、:)．]|$)").unwrap());

const TRUTHY: &[&str] = &[
    "true", "t", "yes", "y", "correct", "right", "对", "正确", "是", "√", "✓",
];
const FALSY: &[&str] = &[
    "false", "f", "no", "n", "incorrect", "wrong", "错", "错误", "否", "×", "✗",
];

const LABELS: [&str; 4] = ["A", "B", "C", "D"];
const NO_EXPLANATION: &str = "No explanation was provided for this question.";

/// First JSON value found in a model reply.
pub fn extract_json(raw: &str) -> Option<Value> {
    if let Some(body) = FENCED.captures(raw).and_then(|c| c.get(1)) {
        match serde_json::from_str(body.as_str().trim()) {
            Ok(value) => return Some(value),
            Err(e) => debug!("Fenced block is not JSON: {}", e),
        }
    }

    for (start, _) in raw.match_indices('{') {
        if let Some(span) = balanced_object(&raw[start..]) {
            if let Ok(value) = serde_json::from_str(span) {
                return Some(value);
            }
        }
    }
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&raw[start..=end]) {
                return Some(value);
            }
        }
    }

    serde_json::from_str(raw.trim()).ok()
}

/// The balanced `{...}` span at the start of `raw`, skipping braces inside
/// string literals.
fn balanced_object(raw: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in raw.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&raw[..offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Result of one generation item. The batch always gets a record.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    Generated(QuestionRecord),
    Fallback(QuestionRecord),
}

impl ItemOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ItemOutcome::Fallback(_))
    }

    pub fn into_record(self) -> QuestionRecord {
        match self {
            ItemOutcome::Generated(record) | ItemOutcome::Fallback(record) => record,
        }
    }
}

pub struct ResponseParser {
    fallback: Arc<FallbackGenerator>,
}

impl ResponseParser {
    pub fn new(fallback: Arc<FallbackGenerator>) -> Self {
        Self { fallback }
    }

    /// Parse a reply for item `index` of `expected`. Never fails.
    pub fn parse(&self, raw: &str, expected: QuestionType, index: usize) -> ItemOutcome {
        let record = extract_json(raw)
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|obj| normalize(obj, expected));

        match record {
            Some(record) => ItemOutcome::Generated(record),
            None => {
                warn!(
                    "Unusable {} reply ({} chars), substituting fallback question",
                    expected,
                    raw.chars().count()
                );
                ItemOutcome::Fallback(self.fallback.fallback(expected, index))
            }
        }
    }
}

fn field_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .map(value_text)
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(", "),
        _ => String::new(),
    }
}

/// Field-complete record from a decoded object, or `None` when the object
/// has neither question text nor answer.
fn normalize(obj: &Map<String, Value>, expected: QuestionType) -> Option<QuestionRecord> {
    let text = field_text(obj, &["text", "question"]);
    let answer = field_text(obj, &["answer", "correct_answer"]);
    if text.is_none() && answer.is_none() {
        return None;
    }

    let explanation = field_text(obj, &["explanation", "analysis"])
        .unwrap_or_else(|| NO_EXPLANATION.to_string());
    let text = text.unwrap_or_else(|| placeholder_text(expected).to_string());

    let raw_options: Vec<String> = obj
        .get("options")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(value_text)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let (options, answer) = match expected {
        QuestionType::MultipleChoice => {
            let options = multiple_choice_options(&raw_options);
            let answer = answer
                .map(|a| choice_letter(&a, &options))
                .unwrap_or_else(|| "A".to_string());
            (Some(options), answer)
        }
        QuestionType::TrueFalse => {
            let answer = match answer.as_deref().and_then(true_false_label) {
                Some(label) => label.to_string(),
                None => {
                    warn!("Unrecognized true/false answer {:?}, defaulting to A", answer);
                    "A".to_string()
                }
            };
            (Some(vec!["A. True".to_string(), "B. False".to_string()]), answer)
        }
        QuestionType::FillBlank | QuestionType::ShortAnswer => (
            None,
            answer.unwrap_or_else(|| placeholder_answer(expected).to_string()),
        ),
    };

    Some(QuestionRecord {
        id: String::new(),
        question_type: expected,
        text,
        options,
        answer,
        explanation,
        fallback: false,
    })
}

/// Exactly four options labeled `A.` to `D.`; placeholders fill the gaps.
fn multiple_choice_options(raw: &[String]) -> Vec<String> {
    LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| match raw.get(i) {
            Some(option) => format!("{}. {}", label, OPTION_LABEL.replace(option, "")),
            None => format!("{}. Option {}", label, label),
        })
        .collect()
}

/// Letter of the correct option: the option whose text equals the answer,
/// else a bare `A`-`D` letter. "a mitochondrion" names an option, not A.
fn choice_letter(answer: &str, options: &[String]) -> String {
    let wanted = OPTION_LABEL.replace(answer.trim(), "").to_lowercase();
    if let Some((_, label)) = options
        .iter()
        .zip(LABELS)
        .find(|(option, _)| OPTION_LABEL.replace(option, "").trim().to_lowercase() == wanted)
    {
        return label.to_string();
    }
    match CHOICE_LETTER.captures(answer) {
        Some(c) => c[1].to_uppercase(),
        None => answer.trim().to_string(),
    }
}

/// `A` for truthy answers, `B` for falsy ones.
pub(crate) fn true_false_label(answer: &str) -> Option<&'static str> {
    let lower = answer
        .trim()
        .trim_end_matches(['.', '。', '!'])
        .trim()
        .to_lowercase();

    for (letter, label) in [("a", "A"), ("b", "B")] {
        if lower == letter
            || [".", ")", " ", "、", ":"]
                .iter()
                .any(|sep| lower.starts_with(&format!("{}{}", letter, sep)))
        {
            return Some(label);
        }
    }
    if TRUTHY.contains(&lower.as_str()) {
        Some("A")
    } else if FALSY.contains(&lower.as_str()) {
        Some("B")
    } else {
        None
    }
}

fn placeholder_text(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::MultipleChoice => "Which of the following statements is correct?",
        QuestionType::FillBlank => "Fill in the blank: ______.",
        QuestionType::TrueFalse => "Decide whether the following statement is true.",
        QuestionType::ShortAnswer => "Briefly answer the following question.",
    }
}

fn placeholder_answer(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::ShortAnswer => "See the explanation for the key points.",
        _ => "(answer not provided)",
    }
}
