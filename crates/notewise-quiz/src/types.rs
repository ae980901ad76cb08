//! Canonical quiz items.

use std::fmt;

use notewise_prompts::TemplateName;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    MultipleChoice,
    FillBlank,
    #[serde(alias = "trueOrFalse")]
    TrueFalse,
    ShortAnswer,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::MultipleChoice,
        QuestionType::FillBlank,
        QuestionType::TrueFalse,
        QuestionType::ShortAnswer,
    ];

    /// Wire key, as used in type configurations and question files.
    pub fn key(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multipleChoice",
            QuestionType::FillBlank => "fillBlank",
            QuestionType::TrueFalse => "trueFalse",
            QuestionType::ShortAnswer => "shortAnswer",
        }
    }

    /// Accepts wire keys and a few loose spellings (`mc`, `tf`, `fill`, ...).
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized: String = key
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "multiplechoice" | "mc" | "choice" => Some(QuestionType::MultipleChoice),
            "fillblank" | "fillinblank" | "fillintheblank" | "fill" => Some(QuestionType::FillBlank),
            "truefalse" | "trueorfalse" | "tf" => Some(QuestionType::TrueFalse),
            "shortanswer" | "short" => Some(QuestionType::ShortAnswer),
            _ => None,
        }
    }

    /// Name used in prompts and summaries.
    pub fn display_name(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple choice",
            QuestionType::FillBlank => "fill-in-the-blank",
            QuestionType::TrueFalse => "true/false",
            QuestionType::ShortAnswer => "short answer",
        }
    }

    pub fn template(&self) -> TemplateName {
        match self {
            QuestionType::MultipleChoice => TemplateName::MultipleChoiceGeneration,
            QuestionType::FillBlank => TemplateName::FillInBlankGeneration,
            QuestionType::TrueFalse => TemplateName::TrueFalseGeneration,
            QuestionType::ShortAnswer => TemplateName::ShortAnswerGeneration,
        }
    }

    /// Whether records of this type carry labeled options.
    pub fn has_options(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::TrueFalse)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One field-complete quiz item.
///
/// `options` is present only for multiple choice (four, labeled A-D) and
/// true/false (two, labeled A/B).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub answer: String,
    pub explanation: String,
    /// Synthesized locally rather than produced by the model.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
}
