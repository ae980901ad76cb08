//! Append-only answer history (`answers.jsonl`).

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use notewise_core::Result;

use crate::evaluator::is_correct;
use crate::types::{QuestionRecord, QuestionType};

pub const ANSWERS_FILE: &str = "answers.jsonl";

/// One graded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub session_id: String,
    pub question_index: usize,
    pub question_id: String,
    pub question_type: QuestionType,
    pub question_text: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    #[serde(default)]
    pub time_spent_secs: u64,
    pub answered_at: DateTime<Utc>,
}

impl AnswerRecord {
    /// Grade `user_answer` against `question` and record the result.
    pub fn grade(
        session_id: impl Into<String>,
        question_index: usize,
        question: &QuestionRecord,
        user_answer: impl Into<String>,
        time_spent_secs: u64,
    ) -> Self {
        let user_answer = user_answer.into();
        Self {
            session_id: session_id.into(),
            question_index,
            question_id: question.id.clone(),
            question_type: question.question_type,
            question_text: question.text.clone(),
            is_correct: is_correct(&user_answer, &question.answer, question.question_type),
            user_answer,
            correct_answer: question.answer.clone(),
            time_spent_secs,
            answered_at: Utc::now(),
        }
    }
}

/// JSON-lines log under one directory. Lines are only ever appended.
#[derive(Debug, Clone)]
pub struct AnswerLog {
    path: PathBuf,
}

impl AnswerLog {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(ANSWERS_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &AnswerRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        debug!(
            "Recorded answer {} of session {}",
            record.question_index, record.session_id
        );
        Ok(())
    }

    /// Every record in file order. Unreadable lines are skipped.
    pub fn load_all(&self) -> Result<Vec<AnswerRecord>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        Ok(raw
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .filter_map(|(n, line)| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping bad answer line {} in {}: {}", n + 1, self.path.display(), e);
                    None
                }
            })
            .collect())
    }

    /// Records of one session, ordered by question index.
    pub fn load_session(&self, session_id: &str) -> Result<Vec<AnswerRecord>> {
        let mut records: Vec<AnswerRecord> = self
            .load_all()?
            .into_iter()
            .filter(|r| r.session_id == session_id)
            .collect();
        records.sort_by_key(|r| r.question_index);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(answer: &str) -> QuestionRecord {
        QuestionRecord {
            id: "q_u_1_1".into(),
            question_type: QuestionType::FillBlank,
            text: "Plants absorb ______.".into(),
            options: None,
            answer: answer.into(),
            explanation: String::new(),
            fallback: false,
        }
    }

    #[test]
    fn test_append_and_load_session() {
        let tmp = tempfile::tempdir().unwrap();
        let log = AnswerLog::new(&tmp.path().join("questions"));

        log.append(&AnswerRecord::grade("s2", 1, &question("light"), "Light", 12)).unwrap();
        log.append(&AnswerRecord::grade("s1", 0, &question("light"), "water", 3)).unwrap();
        log.append(&AnswerRecord::grade("s2", 0, &question("water"), "water", 5)).unwrap();

        let all = log.load_all().unwrap();
        assert_eq!(all.len(), 3);

        let session = log.load_session("s2").unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(session[0].question_index, 0);
        assert!(session[0].is_correct);
        assert!(session[1].is_correct);
        assert!(!log.load_session("s1").unwrap()[0].is_correct);
    }

    #[test]
    fn test_missing_file_and_bad_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let log = AnswerLog::new(tmp.path());
        assert!(log.load_all().unwrap().is_empty());

        log.append(&AnswerRecord::grade("s", 0, &question("x"), "x", 0)).unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        file.write_all(b"not json\n").unwrap();
        assert_eq!(log.load_all().unwrap().len(), 1);
    }
}
