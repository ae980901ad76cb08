//! Free-text quiz requests ("8 hard questions about enzymes").

use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::orchestrator::{QuizRequest, TypeRequest};
use crate::types::QuestionType;

static COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:[a-z/-]+\s+){0,6}?(?:questions?|items?)\b").unwrap());
static TOPIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:about|on)\s+([^.,;:?!]+)").unwrap());

pub const DEFAULT_COUNT: usize = 5;
pub const MAX_COUNT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        })
    }
}

/// What a free-text request asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRequirement {
    pub count: usize,
    pub difficulty: Difficulty,
    pub types: Vec<QuestionType>,
    pub topics: Vec<String>,
}

impl ParsedRequirement {
    pub fn parse(text: &str) -> Self {
        let lower = text.to_lowercase();

        let count = COUNT
            .captures(text)
            .and_then(|c| c[1].parse::<usize>().ok())
            .map(|n| n.clamp(1, MAX_COUNT))
            .unwrap_or(DEFAULT_COUNT);

        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        let difficulty = if has(&["easy", "simple", "basic"]) {
            Difficulty::Easy
        } else if has(&["hard", "difficult", "advanced", "challenging", "in-depth"]) {
            Difficulty::Hard
        } else {
            Difficulty::Medium
        };

        let mut types = Vec::new();
        if has(&["multiple choice", "multiple-choice", "mcq"]) {
            types.push(QuestionType::MultipleChoice);
        }
        if has(&["fill-in", "fill in", "blank"]) {
            types.push(QuestionType::FillBlank);
        }
        if has(&["true/false", "true or false", "true-false"]) {
            types.push(QuestionType::TrueFalse);
        }
        if has(&["short answer", "short-answer", "open question"]) {
            types.push(QuestionType::ShortAnswer);
        }
        if types.is_empty() {
            types = vec![QuestionType::MultipleChoice, QuestionType::FillBlank];
        }

        let topics = TOPIC
            .captures_iter(text)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            count,
            difficulty,
            types,
            topics,
        }
    }

    /// `count` split across the requested types, earlier types taking the
    /// remainder.
    pub fn type_requests(&self) -> Vec<TypeRequest> {
        let n = self.types.len().max(1);
        self.types
            .iter()
            .enumerate()
            .map(|(i, ty)| TypeRequest {
                question_type: *ty,
                count: self.count / n + usize::from(i < self.count % n),
            })
            .filter(|t| t.count > 0)
            .collect()
    }

    /// Lines of `content` around mentions of any topic (three before, ten
    /// after), or the whole content when nothing matches.
    pub fn focus<'a>(&self, content: &'a str) -> Cow<'a, str> {
        let lines: Vec<&str> = content.lines().collect();
        let topics: Vec<String> = self.topics.iter().map(|t| t.to_lowercase()).collect();
        let mut blocks = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            let lower = line.to_lowercase();
            if topics.iter().any(|t| lower.contains(t.as_str())) {
                let start = i.saturating_sub(3);
                let end = (i + 10).min(lines.len());
                blocks.push(lines[start..end].join("\n"));
            }
        }

        if blocks.is_empty() {
            Cow::Borrowed(content)
        } else {
            Cow::Owned(blocks.join("\n---\n"))
        }
    }
}

impl QuizRequest {
    /// Request derived from free text. The text itself is passed on as the
    /// learner's preferences, prefixed with the detected difficulty.
    pub fn from_requirement(requirement: &str) -> Self {
        let parsed = ParsedRequirement::parse(requirement);
        let mut preferences = format!("Difficulty: {}.", parsed.difficulty);
        if !requirement.trim().is_empty() {
            preferences.push(' ');
            preferences.push_str(requirement.trim());
        }
        Self {
            types: parsed.type_requests(),
            preferences,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let parsed = ParsedRequirement::parse("make me a quiz");
        assert_eq!(parsed.count, DEFAULT_COUNT);
        assert_eq!(parsed.difficulty, Difficulty::Medium);
        assert_eq!(parsed.types, vec![QuestionType::MultipleChoice, QuestionType::FillBlank]);
        let split: Vec<usize> = parsed.type_requests().iter().map(|t| t.count).collect();
        assert_eq!(split, vec![3, 2]);
    }

    #[test]
    fn test_count_types_and_difficulty() {
        let parsed = ParsedRequirement::parse(
            "Give me 7 hard true/false and short answer questions about enzyme kinetics.",
        );
        assert_eq!(parsed.count, 7);
        assert_eq!(parsed.difficulty, Difficulty::Hard);
        assert_eq!(parsed.types, vec![QuestionType::TrueFalse, QuestionType::ShortAnswer]);
        assert_eq!(parsed.topics, vec!["enzyme kinetics".to_string()]);
    }

    #[test]
    fn test_count_is_capped() {
        assert_eq!(ParsedRequirement::parse("50 questions").count, MAX_COUNT);
    }

    #[test]
    fn test_focus_keeps_context() {
        let content: String = (0..30).map(|i| format!("line {}\n", i)).collect();
        let parsed = ParsedRequirement {
            topics: vec!["LINE 15".into()],
            ..ParsedRequirement::parse("")
        };
        let focused = parsed.focus(&content);
        assert!(focused.starts_with("line 12\n"));
        assert!(focused.ends_with("line 24"));

        let unmatched = ParsedRequirement {
            topics: vec!["absent".into()],
            ..ParsedRequirement::parse("")
        };
        assert_eq!(unmatched.focus(&content), content.as_str());
    }

    #[test]
    fn test_quiz_request_from_requirement() {
        let request = QuizRequest::from_requirement("4 easy multiple choice questions");
        assert_eq!(request.types.len(), 1);
        assert_eq!(request.types[0].question_type, QuestionType::MultipleChoice);
        assert_eq!(request.types[0].count, 4);
        assert!(request.preferences.starts_with("Difficulty: easy."));
    }
}
