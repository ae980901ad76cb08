//! Answer explanations and session reports.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use notewise_chat::{CallOptions, GenerationClient};
use notewise_core::{Error, Result};
use notewise_prompts::{TemplateName, TemplateStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::answers::AnswerRecord;
use crate::types::{QuestionRecord, QuestionType};

pub const REPORT_FILE: &str = "report.json";

const EXPLANATION_MAX_TOKENS: u32 = 300;
const REPORT_MAX_TOKENS: u32 = 500;
/// Shorter model explanations are discarded in favor of the canned hint.
const MIN_EXPLANATION_CHARS: usize = 10;
const MAX_WEAK_POINTS: usize = 5;

const RECOMMENDATIONS: [&str; 4] = [
    "Review the questions you missed and understand why",
    "Focus your revision on the weak knowledge points",
    "Practice more questions on the related topics",
    "Revisit material you have already learned at regular intervals",
];

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        correct as f64 / total as f64 * 100.0
    }
}

fn type_hint(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::MultipleChoice => {
            "This is a multiple choice question: pick the option that best fits the question."
        }
        QuestionType::FillBlank => {
            "This is a fill-in-the-blank question: the blank needs the exact key term or concept."
        }
        QuestionType::TrueFalse => {
            "This is a true/false question: decide whether the statement matches the notes."
        }
        QuestionType::ShortAnswer => "Review the related part of your study notes to understand this one.",
    }
}

/// Verdict line plus a short explanation: the model's when it is live and
/// says something substantial, otherwise a per-type hint.
pub async fn explain_answer(
    client: &GenerationClient,
    templates: &TemplateStore,
    question: &QuestionRecord,
    user_answer: &str,
    is_correct: bool,
) -> String {
    let verdict = if is_correct {
        "Correct!".to_string()
    } else {
        format!("Incorrect. The correct answer is {}", question.answer)
    };

    let rendered = templates.render(
        TemplateName::AnswerExplanation,
        &[
            ("question_type", question.question_type.display_name()),
            ("question_text", question.text.as_str()),
            ("correct_answer", question.answer.as_str()),
            ("user_answer", user_answer),
            ("verdict", if is_correct { "correct" } else { "incorrect" }),
        ],
    );

    match rendered {
        Ok(prompt) => {
            let options = CallOptions::default().with_max_tokens(EXPLANATION_MAX_TOKENS);
            let completion = client.call(&prompt, &options).await;
            let text = completion.text.trim();
            if completion.is_live() && text.chars().count() > MIN_EXPLANATION_CHARS {
                return format!("{}\n\n{}", verdict, text);
            }
        }
        Err(e) => warn!("Explanation template failed: {}", e),
    }

    format!("{}\n\n{}", verdict, type_hint(question.question_type))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    pub question_type: QuestionType,
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakPoint {
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub user_answer: String,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_questions: usize,
    pub correct_count: usize,
    pub accuracy: f64,
    pub type_stats: Vec<TypeStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerReport {
    pub summary: ReportSummary,
    pub ai_analysis: String,
    pub weak_points: Vec<WeakPoint>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl AnswerReport {
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(REPORT_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Saved answer report to {}", path.display());
        Ok(path)
    }
}

pub struct ReportBuilder {
    client: GenerationClient,
    templates: Arc<TemplateStore>,
}

impl ReportBuilder {
    pub fn new(client: GenerationClient, templates: Arc<TemplateStore>) -> Self {
        Self { client, templates }
    }

    /// Statistics over `records`. Fails with a business error when there
    /// are none.
    pub async fn build(&self, records: &[AnswerRecord]) -> Result<AnswerReport> {
        if records.is_empty() {
            return Err(Error::Business("No answers recorded for this session".into()));
        }

        let total = records.len();
        let correct = records.iter().filter(|r| r.is_correct).count();
        let accuracy = percent(correct, total);

        let mut type_stats: Vec<TypeStats> = Vec::new();
        let mut weak_points = Vec::new();
        for record in records {
            let idx = match type_stats
                .iter()
                .position(|s| s.question_type == record.question_type)
            {
                Some(idx) => idx,
                None => {
                    type_stats.push(TypeStats {
                        question_type: record.question_type,
                        total: 0,
                        correct: 0,
                        accuracy: 0.0,
                    });
                    type_stats.len() - 1
                }
            };
            let stats = &mut type_stats[idx];
            stats.total += 1;
            if record.is_correct {
                stats.correct += 1;
            } else {
                weak_points.push(WeakPoint {
                    question: record.question_text.clone(),
                    question_type: record.question_type,
                    user_answer: record.user_answer.clone(),
                    correct_answer: record.correct_answer.clone(),
                });
            }
        }
        for stats in &mut type_stats {
            stats.accuracy = round1(percent(stats.correct, stats.total));
        }

        let ai_analysis = self
            .analysis(total, correct, accuracy, &type_stats, weak_points.len())
            .await;
        weak_points.truncate(MAX_WEAK_POINTS);

        info!("Built answer report: {}/{} correct", correct, total);
        Ok(AnswerReport {
            summary: ReportSummary {
                total_questions: total,
                correct_count: correct,
                accuracy: round1(accuracy),
                type_stats,
            },
            ai_analysis,
            weak_points,
            recommendations: RECOMMENDATIONS.iter().map(|s| s.to_string()).collect(),
            generated_at: Utc::now(),
        })
    }

    async fn analysis(
        &self,
        total: usize,
        correct: usize,
        accuracy: f64,
        type_stats: &[TypeStats],
        wrong: usize,
    ) -> String {
        let canned = format!(
            "You completed {} questions with {:.1}% accuracy. Keep practicing and review the key points regularly.",
            total, accuracy
        );
        if !self.client.is_available() {
            return canned;
        }

        let breakdown = type_stats
            .iter()
            .map(|s| {
                format!(
                    "- {}: {}/{} ({:.1}%)",
                    s.question_type, s.correct, s.total, s.accuracy
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        let (total, correct, accuracy, wrong) = (
            total.to_string(),
            correct.to_string(),
            format!("{:.1}", accuracy),
            wrong.to_string(),
        );

        let prompt = match self.templates.render(
            TemplateName::AnswerReportGeneration,
            &[
                ("total", total.as_str()),
                ("correct", correct.as_str()),
                ("accuracy", accuracy.as_str()),
                ("type_breakdown", breakdown.as_str()),
                ("wrong_count", wrong.as_str()),
            ],
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Report template failed: {}", e);
                return canned;
            }
        };

        let options = CallOptions::default().with_max_tokens(REPORT_MAX_TOKENS);
        let completion = self.client.call(&prompt, &options).await;
        let text = completion.text.trim();
        if completion.is_live() && !text.is_empty() {
            text.to_string()
        } else {
            canned
        }
    }
}
