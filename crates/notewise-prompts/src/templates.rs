//! Named template store with placeholder validation.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use notewise_core::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::defaults;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").unwrap());

/// Every template the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateName {
    NoteGeneration,
    MultipleChoiceGeneration,
    FillInBlankGeneration,
    TrueFalseGeneration,
    ShortAnswerGeneration,
    SectionQa,
    SectionModification,
    ChatAssistant,
    AnswerReportGeneration,
    QuestionSummary,
    AnswerExplanation,
    SectionMindmap,
}

impl TemplateName {
    pub const ALL: [TemplateName; 12] = [
        TemplateName::NoteGeneration,
        TemplateName::MultipleChoiceGeneration,
        TemplateName::FillInBlankGeneration,
        TemplateName::TrueFalseGeneration,
        TemplateName::ShortAnswerGeneration,
        TemplateName::SectionQa,
        TemplateName::SectionModification,
        TemplateName::ChatAssistant,
        TemplateName::AnswerReportGeneration,
        TemplateName::QuestionSummary,
        TemplateName::AnswerExplanation,
        TemplateName::SectionMindmap,
    ];

    /// Key used in override files.
    pub fn key(&self) -> &'static str {
        match self {
            TemplateName::NoteGeneration => "NOTE_GENERATION",
            TemplateName::MultipleChoiceGeneration => "MULTIPLE_CHOICE_GENERATION",
            TemplateName::FillInBlankGeneration => "FILL_IN_BLANK_GENERATION",
            TemplateName::TrueFalseGeneration => "TRUE_FALSE_GENERATION",
            TemplateName::ShortAnswerGeneration => "SHORT_ANSWER_GENERATION",
            TemplateName::SectionQa => "SECTION_QA",
            TemplateName::SectionModification => "SECTION_MODIFICATION",
            TemplateName::ChatAssistant => "CHAT_ASSISTANT",
            TemplateName::AnswerReportGeneration => "ANSWER_REPORT_GENERATION",
            TemplateName::QuestionSummary => "QUESTION_SUMMARY",
            TemplateName::AnswerExplanation => "ANSWER_EXPLANATION",
            TemplateName::SectionMindmap => "SECTION_MINDMAP",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.key() == key)
    }

    /// Placeholders a template must contain and a render call must supply.
    pub fn placeholders(&self) -> &'static [&'static str] {
        match self {
            TemplateName::NoteGeneration
            | TemplateName::MultipleChoiceGeneration
            | TemplateName::FillInBlankGeneration
            | TemplateName::TrueFalseGeneration
            | TemplateName::ShortAnswerGeneration => &[],
            TemplateName::SectionQa => &["section_title", "section_content", "user_question"],
            TemplateName::SectionModification => {
                &["section_title", "section_content", "modification_request"]
            }
            TemplateName::ChatAssistant => &["notes_content", "user_question"],
            TemplateName::AnswerReportGeneration => {
                &["total", "correct", "accuracy", "type_breakdown", "wrong_count"]
            }
            TemplateName::QuestionSummary => &["type_distribution", "question_list"],
            TemplateName::AnswerExplanation => &[
                "question_type",
                "question_text",
                "correct_answer",
                "user_answer",
                "verdict",
            ],
            TemplateName::SectionMindmap => &["section_title", "section_content"],
        }
    }

    fn default_text(&self) -> &'static str {
        match self {
            TemplateName::NoteGeneration => defaults::NOTE_GENERATION,
            TemplateName::MultipleChoiceGeneration => defaults::MULTIPLE_CHOICE_GENERATION,
            TemplateName::FillInBlankGeneration => defaults::FILL_IN_BLANK_GENERATION,
            TemplateName::TrueFalseGeneration => defaults::TRUE_FALSE_GENERATION,
            TemplateName::ShortAnswerGeneration => defaults::SHORT_ANSWER_GENERATION,
            TemplateName::SectionQa => defaults::SECTION_QA,
            TemplateName::SectionModification => defaults::SECTION_MODIFICATION,
            TemplateName::ChatAssistant => defaults::CHAT_ASSISTANT,
            TemplateName::AnswerReportGeneration => defaults::ANSWER_REPORT_GENERATION,
            TemplateName::QuestionSummary => defaults::QUESTION_SUMMARY,
            TemplateName::AnswerExplanation => defaults::ANSWER_EXPLANATION,
            TemplateName::SectionMindmap => defaults::SECTION_MINDMAP,
        }
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Resolved template texts.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    templates: HashMap<TemplateName, String>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateStore {
    pub fn builtin() -> Self {
        let templates = TemplateName::ALL
            .iter()
            .map(|name| (*name, name.default_text().to_string()))
            .collect();
        Self { templates }
    }

    /// Built-ins overlaid with a JSON object of `{"KEY": "text"}`. A missing
    /// file means no overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut store = Self::builtin();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(e) => return Err(e.into()),
        };

        let overrides: HashMap<String, String> = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        for (key, text) in overrides {
            match TemplateName::from_key(&key) {
                Some(name) => store.set(name, text)?,
                None => warn!("Ignoring unknown template key {}", key),
            }
        }

        info!("Loaded prompt templates from {}", path.display());
        Ok(store)
    }

    /// Replace one template, checking it still carries every placeholder.
    pub fn set(&mut self, name: TemplateName, text: String) -> Result<()> {
        let missing: Vec<&str> = name
            .placeholders()
            .iter()
            .copied()
            .filter(|p| !text.contains(&format!("{{{}}}", p)))
            .collect();
        if !missing.is_empty() {
            return Err(Error::Config(format!(
                "template {} is missing placeholders: {}",
                name,
                missing.join(", ")
            )));
        }
        self.templates.insert(name, text);
        Ok(())
    }

    pub fn get(&self, name: TemplateName) -> &str {
        self.templates
            .get(&name)
            .map(String::as_str)
            .unwrap_or_else(|| name.default_text())
    }

    /// Substitute `{placeholder}` tokens in a single pass. Every placeholder
    /// the template declares must be supplied; substituted values are not
    /// re-scanned.
    pub fn render(&self, name: TemplateName, vars: &[(&str, &str)]) -> Result<String> {
        if let Some(missing) = name
            .placeholders()
            .iter()
            .find(|p| !vars.iter().any(|(k, _)| k == *p))
        {
            return Err(Error::Input(format!(
                "template {} needs a value for {{{}}}",
                name, missing
            )));
        }

        let rendered = PLACEHOLDER.replace_all(self.get(name), |caps: &regex::Captures| {
            let key = &caps[1];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(rendered.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_carry_their_placeholders() {
        let mut store = TemplateStore::builtin();
        for name in TemplateName::ALL {
            let text = store.get(name).to_string();
            store.set(name, text).unwrap();
        }
    }

    #[test]
    fn test_key_round_trip() {
        for name in TemplateName::ALL {
            assert_eq!(TemplateName::from_key(name.key()), Some(name));
        }
        assert_eq!(TemplateName::from_key("NOPE"), None);
    }

    #[test]
    fn test_render_substitutes_once() {
        let store = TemplateStore::builtin();
        let out = store
            .render(
                TemplateName::SectionQa,
                &[
                    ("section_title", "Cells"),
                    ("section_content", "literal {user_question} stays"),
                    ("user_question", "What is a cell?"),
                ],
            )
            .unwrap();
        assert!(out.contains("Section: Cells"));
        assert!(out.contains("literal {user_question} stays"));
        assert!(out.contains("Question: What is a cell?"));
    }

    #[test]
    fn test_render_missing_var_is_input_error() {
        let store = TemplateStore::builtin();
        let err = store
            .render(TemplateName::SectionMindmap, &[("section_title", "x")])
            .unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn test_mindmap_template_keeps_json_example() {
        let store = TemplateStore::builtin();
        let out = store
            .render(
                TemplateName::SectionMindmap,
                &[("section_title", "T"), ("section_content", "C")],
            )
            .unwrap();
        assert!(out.contains("{\"name\": \"section title\""));
    }

    #[test]
    fn test_load_overrides_and_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("templates.json");

        assert!(TemplateStore::load(&path).is_ok());

        std::fs::write(
            &path,
            r#"{"CHAT_ASSISTANT": "Notes: {notes_content}\nQ: {user_question}", "UNKNOWN": "x"}"#,
        )
        .unwrap();
        let store = TemplateStore::load(&path).unwrap();
        assert_eq!(
            store.get(TemplateName::ChatAssistant),
            "Notes: {notes_content}\nQ: {user_question}"
        );

        std::fs::write(&path, r#"{"SECTION_QA": "no placeholders here"}"#).unwrap();
        let err = TemplateStore::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
