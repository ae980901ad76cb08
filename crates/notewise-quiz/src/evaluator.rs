//! Answer grading heuristics.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::parser::true_false_label;
use crate::types::QuestionType;

// ASCII-bounded: `\b` sees no boundary between CJK text and a letter.
static OPTION_LETTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[^a-z0-9])([a-d])(?:[^a-z0-9]|$)").unwrap());

fn option_letter(answer: &str) -> Option<String> {
    OPTION_LETTER
        .captures(answer)
        .map(|c| c[1].to_uppercase())
}

/// Grade one answer. An empty answer is always wrong.
///
/// - multiple choice, true/false: compare the first `A`-`D` token of each
///   side; true/false also maps `true`/`false` style words onto `A`/`B`.
///   Without a letter on both sides, case-insensitive equality.
/// - fill-in-the-blank: case-insensitive equality ignoring all whitespace.
/// - short answer: either side contains the other, case-insensitively.
pub fn is_correct(user_answer: &str, correct_answer: &str, question_type: QuestionType) -> bool {
    let user = user_answer.trim();
    let correct = correct_answer.trim();
    if user.is_empty() {
        return false;
    }

    match question_type {
        QuestionType::MultipleChoice | QuestionType::TrueFalse => {
            let letter = |s: &str| {
                option_letter(s).or_else(|| {
                    (question_type == QuestionType::TrueFalse)
                        .then(|| true_false_label(s).map(str::to_string))
                        .flatten()
                })
            };
            match (letter(user), letter(correct)) {
                (Some(u), Some(c)) => u == c,
                _ => user.to_lowercase() == correct.to_lowercase(),
            }
        }
        QuestionType::FillBlank => {
            let squash = |s: &str| {
                s.chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<String>()
                    .to_lowercase()
            };
            squash(user) == squash(correct)
        }
        QuestionType::ShortAnswer => {
            let user = user.to_lowercase();
            let correct = correct.to_lowercase();
            !correct.is_empty() && (user.contains(&correct) || correct.contains(&user))
        }
    }
}
