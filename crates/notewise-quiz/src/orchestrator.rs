//! Question batch generation.
//!
//! Types are generated in the order requested and, within a type,
//! sequentially by index; the index selects the content window each prompt
//! sees. Each item yields one record, live or fallback.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notewise_chat::{CallOptions, GenerationClient};
use notewise_core::{Artifacts, CancelToken, Error, EventSink, GenerationEvent, Result};
use notewise_prompts::{PromptBuilder, TemplateName, TemplateStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::fallback::FallbackGenerator;
use crate::parser::{ItemOutcome, ResponseParser};
use crate::types::{QuestionRecord, QuestionType};

pub const QUESTIONS_FILE: &str = "questions.json";

/// Questions shown to the summary prompt.
const SUMMARY_QUESTIONS: usize = 10;
const SUMMARY_MAX_TOKENS: u32 = 500;
const DEFAULT_CONTENT_LIMIT: usize = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRequest {
    pub question_type: QuestionType,
    pub count: usize,
}

/// One batch request. Types are generated in vector order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizRequest {
    pub content: String,
    pub types: Vec<TypeRequest>,
    pub preferences: String,
    pub requester: String,
}

impl QuizRequest {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, question_type: QuestionType, count: usize) -> Self {
        self.types.push(TypeRequest {
            question_type,
            count,
        });
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_preferences(mut self, preferences: impl Into<String>) -> Self {
        self.preferences = preferences.into();
        self
    }

    pub fn with_requester(mut self, requester: impl Into<String>) -> Self {
        self.requester = requester.into();
        self
    }

    pub fn total_requested(&self) -> usize {
        self.types.iter().map(|t| t.count).sum()
    }

    /// Mix used when a caller names no types: 3 multiple choice, 2 fill-in,
    /// 2 true/false, 1 short answer.
    pub fn default_mix() -> Vec<TypeRequest> {
        [
            (QuestionType::MultipleChoice, 3),
            (QuestionType::FillBlank, 2),
            (QuestionType::TrueFalse, 2),
            (QuestionType::ShortAnswer, 1),
        ]
        .into_iter()
        .map(|(question_type, count)| TypeRequest {
            question_type,
            count,
        })
        .collect()
    }
}

/// Generated questions plus batch metadata, as saved to `questions.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizBatch {
    pub questions: Vec<QuestionRecord>,
    pub summary: String,
    /// No live generation took place; every record is a fallback.
    pub degraded: bool,
    pub fallback_count: usize,
    pub message: String,
    pub generated_at: String,
}

impl QuizBatch {
    /// Question counts per type, in first-seen order.
    pub fn type_counts(&self) -> Vec<(QuestionType, usize)> {
        let mut counts: Vec<(QuestionType, usize)> = Vec::new();
        for q in &self.questions {
            match counts.iter_mut().find(|(ty, _)| *ty == q.question_type) {
                Some((_, n)) => *n += 1,
                None => counts.push((q.question_type, 1)),
            }
        }
        counts
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(QUESTIONS_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!("Saved {} questions to {}", self.questions.len(), path.display());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

pub struct QuestionOrchestrator {
    client: GenerationClient,
    templates: Arc<TemplateStore>,
    builder: PromptBuilder,
    fallback: Arc<FallbackGenerator>,
    parser: ResponseParser,
    options: CallOptions,
    content_limit: usize,
}

impl QuestionOrchestrator {
    pub fn new(client: GenerationClient, templates: Arc<TemplateStore>) -> Self {
        let fallback = Arc::new(FallbackGenerator::new());
        Self {
            client,
            templates,
            builder: PromptBuilder::new(),
            parser: ResponseParser::new(fallback.clone()),
            fallback,
            options: CallOptions::default(),
            content_limit: DEFAULT_CONTENT_LIMIT,
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<FallbackGenerator>) -> Self {
        self.parser = ResponseParser::new(fallback.clone());
        self.fallback = fallback;
        self
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Characters of notes fed into prompts; 0 means unlimited.
    pub fn with_content_limit(mut self, limit: usize) -> Self {
        self.content_limit = limit;
        self
    }

    fn validate(request: &QuizRequest) -> Result<()> {
        if request.content.trim().is_empty() {
            return Err(Error::Input(
                "No notes found, upload a document and generate notes first".into(),
            ));
        }
        if request.total_requested() == 0 {
            return Err(Error::Input("Select at least one question type".into()));
        }
        Ok(())
    }

    /// Generate a batch. Emits `start` and one `progress` per item, and
    /// `error` when the batch fails.
    pub async fn generate(
        &self,
        request: &QuizRequest,
        sink: &dyn EventSink,
        cancel: &CancelToken,
    ) -> Result<QuizBatch> {
        match self.run(request, sink, cancel).await {
            Ok(batch) => Ok(batch),
            Err(e) => {
                sink.emit(GenerationEvent::Error {
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    /// [`generate`](Self::generate), then save to `dir` and emit `complete`.
    pub async fn generate_and_save(
        &self,
        request: &QuizRequest,
        dir: &Path,
        sink: &dyn EventSink,
        cancel: &CancelToken,
    ) -> Result<(QuizBatch, PathBuf)> {
        let batch = self.generate(request, sink, cancel).await?;
        let path = match batch.save(dir) {
            Ok(path) => path,
            Err(e) => {
                sink.emit(GenerationEvent::Error {
                    message: e.user_message(),
                });
                return Err(e);
            }
        };
        sink.emit(GenerationEvent::Complete {
            artifacts: Artifacts {
                questions: Some(path.clone()),
                ..Artifacts::default()
            },
        });
        Ok((batch, path))
    }

    async fn run(
        &self,
        request: &QuizRequest,
        sink: &dyn EventSink,
        cancel: &CancelToken,
    ) -> Result<QuizBatch> {
        Self::validate(request)?;

        let content: String = if self.content_limit > 0 {
            request.content.chars().take(self.content_limit).collect()
        } else {
            request.content.clone()
        };
        let live = self.client.is_available();
        if !live {
            warn!("Generation service unavailable, synthesizing fallback questions");
        }

        let total = request.total_requested();
        info!(
            "Generating {} questions across {} types for {}",
            total,
            request.types.len(),
            requester_label(&request.requester)
        );
        sink.emit(GenerationEvent::Start);

        let mut questions = Vec::with_capacity(total);
        let mut fallback_count = 0usize;

        for type_request in request.types.iter().filter(|t| t.count > 0) {
            let ty = type_request.question_type;
            for index in 0..type_request.count {
                cancel.check()?;
                sink.emit(GenerationEvent::Progress {
                    current: questions.len() + 1,
                    total,
                    message: format!(
                        "Generating {} question {} of {}",
                        ty,
                        index + 1,
                        type_request.count
                    ),
                });

                let outcome = if live {
                    self.generate_one(ty, &content, &request.preferences, index, type_request.count)
                        .await
                } else {
                    ItemOutcome::Fallback(self.fallback.fallback(ty, index))
                };
                if outcome.is_fallback() {
                    fallback_count += 1;
                }
                questions.push(outcome.into_record());
            }
        }

        if questions.is_empty() {
            return Err(Error::Business("No questions could be generated".into()));
        }

        let now = chrono::Utc::now();
        let owner = requester_label(&request.requester);
        for (n, q) in questions.iter_mut().enumerate() {
            q.id = format!("q_{}_{}_{}", owner, now.timestamp(), n + 1);
        }

        let mut batch = QuizBatch {
            degraded: !live || fallback_count == questions.len(),
            fallback_count,
            message: String::new(),
            summary: String::new(),
            generated_at: now.to_rfc3339(),
            questions,
        };
        batch.message = batch_message(&batch, live);
        batch.summary = if batch.degraded {
            simple_summary(&batch, live)
        } else {
            self.summarize(&batch).await
        };

        info!(
            "Generated {} questions ({} fallback)",
            batch.questions.len(),
            batch.fallback_count
        );
        Ok(batch)
    }

    async fn generate_one(
        &self,
        ty: QuestionType,
        content: &str,
        preferences: &str,
        index: usize,
        count: usize,
    ) -> ItemOutcome {
        let template = self.templates.get(ty.template());
        let prompt = self
            .builder
            .build(template, ty.display_name(), content, preferences, index, count);
        let completion = self.client.call(&prompt, &self.options).await;
        if !completion.is_live() {
            warn!("No live reply for {} question {}, using fallback", ty, index + 1);
            return ItemOutcome::Fallback(self.fallback.fallback(ty, index));
        }
        self.parser.parse(&completion.text, ty, index)
    }

    async fn summarize(&self, batch: &QuizBatch) -> String {
        let distribution = batch
            .type_counts()
            .iter()
            .map(|(ty, n)| format!("- {}: {}", ty, n))
            .collect::<Vec<_>>()
            .join("\n");
        let list = batch
            .questions
            .iter()
            .take(SUMMARY_QUESTIONS)
            .enumerate()
            .map(|(i, q)| format!("{}. [{}] {}", i + 1, q.question_type, q.text))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = match self.templates.render(
            TemplateName::QuestionSummary,
            &[
                ("type_distribution", distribution.as_str()),
                ("question_list", list.as_str()),
            ],
        ) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Summary template failed: {}", e);
                return simple_summary(batch, true);
            }
        };

        let options = self.options.clone().with_max_tokens(SUMMARY_MAX_TOKENS);
        let completion = self.client.call(&prompt, &options).await;
        let text = completion.text.trim();
        if completion.is_live() && !text.is_empty() {
            text.to_string()
        } else {
            simple_summary(batch, true)
        }
    }
}

fn requester_label(requester: &str) -> &str {
    if requester.is_empty() {
        "anonymous"
    } else {
        requester
    }
}

/// One-sentence summary listing per-type counts.
pub fn simple_summary(batch: &QuizBatch, live: bool) -> String {
    let n = batch.questions.len();
    if !live {
        return format!("Generated {} example questions (service unavailable)", n);
    }
    let parts = batch
        .type_counts()
        .iter()
        .map(|(ty, count)| format!("{} {}", count, ty))
        .collect::<Vec<_>>()
        .join(", ");
    format!("Generated {} questions, including {}.", n, parts)
}

fn batch_message(batch: &QuizBatch, live: bool) -> String {
    let n = batch.questions.len();
    if !live {
        "Generation service unavailable, showing example questions".to_string()
    } else if batch.fallback_count > 0 {
        format!(
            "Generated {} questions ({} replaced by example questions)",
            n, batch.fallback_count
        )
    } else {
        format!("Generated {} questions", n)
    }
}
