//! Notewise Quiz — question generation and grading.
//!
//! Every generation call yields exactly one question: either parsed from
//! the model's reply or synthesized from a small canned table. A batch
//! never aborts on a single bad reply.

pub mod answers;
pub mod evaluator;
pub mod fallback;
pub mod orchestrator;
pub mod parser;
pub mod report;
pub mod requirement;
pub mod types;

pub use answers::{AnswerLog, AnswerRecord};
pub use evaluator::is_correct;
pub use fallback::{FallbackGenerator, FALLBACK_MARKER};
pub use orchestrator::{QuestionOrchestrator, QuizBatch, QuizRequest, TypeRequest};
pub use parser::{extract_json, ItemOutcome, ResponseParser};
pub use report::{explain_answer, AnswerReport, ReportBuilder, ReportSummary, TypeStats, WeakPoint};
pub use requirement::{Difficulty, ParsedRequirement};
pub use types::{QuestionRecord, QuestionType};
