//! Canned questions used when live generation or parsing fails.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::types::{QuestionRecord, QuestionType};

/// Prefix tag on every synthesized question; `#N` is appended per item.
pub const FALLBACK_MARKER: &str = "[fallback";

struct Canned {
    text: &'static str,
    options: &'static [&'static str],
    answer: &'static str,
    explanation: &'static str,
}

const MULTIPLE_CHOICE: &[Canned] = &[
    Canned {
        text: "Which study habit best supports long-term retention of new material?",
        options: &[
            "A. Spaced review over several days",
            "B. A single long session the night before",
            "C. Rereading the notes once",
            "D. Highlighting every paragraph",
        ],
        answer: "A",
        explanation: "Spacing reviews over time strengthens recall far more than massed practice.",
    },
    Canned {
        text: "What is the main purpose of a section summary in study notes?",
        options: &[
            "A. To add new facts not in the source",
            "B. To condense the key points of the section",
            "C. To list every example verbatim",
            "D. To replace the section headings",
        ],
        answer: "B",
        explanation: "A summary condenses the section's key points for quick review.",
    },
    Canned {
        text: "Which activity is an example of active recall?",
        options: &[
            "A. Reading the chapter again",
            "B. Copying the notes by hand",
            "C. Answering questions without looking at the notes",
            "D. Listening to a recorded lecture",
        ],
        answer: "C",
        explanation: "Active recall means retrieving information from memory, as in self-testing.",
    },
];

const FILL_BLANK: &[Canned] = &[
    Canned {
        text: "Reviewing material at increasing intervals is called ______ repetition.",
        options: &[],
        answer: "spaced",
        explanation: "Spaced repetition schedules reviews at growing intervals.",
    },
    Canned {
        text: "Retrieving information from memory without prompts is called active ______.",
        options: &[],
        answer: "recall",
        explanation: "Active recall is the practice of retrieving facts from memory.",
    },
    Canned {
        text: "A short statement of a section's key points is called a ______.",
        options: &[],
        answer: "summary",
        explanation: "Summaries condense the key points of a section.",
    },
];

const TRUE_FALSE: &[Canned] = &[
    Canned {
        text: "Testing yourself on material is generally more effective than rereading it.",
        options: &["A. True", "B. False"],
        answer: "A",
        explanation: "Self-testing produces stronger retention than passive rereading.",
    },
    Canned {
        text: "Cramming everything in one session gives the best long-term retention.",
        options: &["A. True", "B. False"],
        answer: "B",
        explanation: "Massed practice helps short-term performance but retention fades quickly.",
    },
    Canned {
        text: "Organizing notes under headings makes them easier to review.",
        options: &["A. True", "B. False"],
        answer: "A",
        explanation: "A clear heading hierarchy lets you locate and review topics quickly.",
    },
];

const SHORT_ANSWER: &[Canned] = &[
    Canned {
        text: "Briefly explain why spaced review improves retention.",
        options: &[],
        answer: "Each review happens as memory begins to fade, which strengthens recall and slows forgetting.",
        explanation: "Key points: forgetting curve, retrieval effort, repeated reinforcement.",
    },
    Canned {
        text: "Describe one way to check your understanding of a topic.",
        options: &[],
        answer: "Explain the topic in your own words or answer practice questions without notes.",
        explanation: "Key points: self-explanation, practice questions, identifying gaps.",
    },
    Canned {
        text: "Why is it useful to connect new material to what you already know?",
        options: &[],
        answer: "Links to prior knowledge give new facts context, which makes them easier to understand and recall.",
        explanation: "Key points: context, association, easier retrieval.",
    },
];

fn table(question_type: QuestionType) -> &'static [Canned] {
    match question_type {
        QuestionType::MultipleChoice => MULTIPLE_CHOICE,
        QuestionType::FillBlank => FILL_BLANK,
        QuestionType::TrueFalse => TRUE_FALSE,
        QuestionType::ShortAnswer => SHORT_ANSWER,
    }
}

/// Picks canned questions pseudo-randomly, one table per type.
pub struct FallbackGenerator {
    rng: Mutex<StdRng>,
}

impl Default for FallbackGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic selection, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Fallback question for item `index` (zero-based) of a type. The text
    /// is tagged `[fallback #index+1]`.
    pub fn fallback(&self, question_type: QuestionType, index: usize) -> QuestionRecord {
        let entries = table(question_type);
        let pick = self.rng.lock().gen_range(0..entries.len());
        let canned = &entries[pick];
        debug!("Fallback {} question #{} (entry {})", question_type, index + 1, pick);

        QuestionRecord {
            id: String::new(),
            question_type,
            text: format!("{} #{}] {}", FALLBACK_MARKER, index + 1, canned.text),
            options: question_type
                .has_options()
                .then(|| canned.options.iter().map(|o| o.to_string()).collect()),
            answer: canned.answer.to_string(),
            explanation: canned.explanation.to_string(),
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_and_shape() {
        let generator = FallbackGenerator::with_seed(7);
        for ty in QuestionType::ALL {
            let q = generator.fallback(ty, 2);
            assert!(q.text.starts_with("[fallback #3] "), "{}", q.text);
            assert_eq!(q.question_type, ty);
            assert!(q.fallback);
            match ty {
                QuestionType::MultipleChoice => assert_eq!(q.options.as_ref().unwrap().len(), 4),
                QuestionType::TrueFalse => assert_eq!(q.options.as_ref().unwrap().len(), 2),
                _ => assert!(q.options.is_none()),
            }
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let a = FallbackGenerator::with_seed(42);
        let b = FallbackGenerator::with_seed(42);
        for i in 0..5 {
            assert_eq!(
                a.fallback(QuestionType::ShortAnswer, i),
                b.fallback(QuestionType::ShortAnswer, i)
            );
        }
    }

    #[test]
    fn test_selection_varies() {
        let generator = FallbackGenerator::with_seed(1);
        let texts: std::collections::HashSet<String> = (0..30)
            .map(|i| {
                let q = generator.fallback(QuestionType::MultipleChoice, i);
                q.text.split("] ").nth(1).unwrap_or_default().to_string()
            })
            .collect();
        assert!(texts.len() > 1);
    }
}
