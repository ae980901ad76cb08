//! Subcommand implementations. Each returns the JSON payload printed on
//! success.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notewise_chat::{CallOptions, GenerationClient, GenerationConfig};
use notewise_core::{Error, NotewiseConfig, Result};
use notewise_ingest::load_records;
use notewise_notes::{MindMapRefiner, SectionAssistant};
use notewise_outline::{extract_section, render_table_of_contents, section_titles, HeadingTreeBuilder};
use notewise_prompts::TemplateStore;
use notewise_quiz::{
    explain_answer, is_correct, AnswerLog, AnswerRecord, ParsedRequirement, QuestionType,
    QuizBatch, QuizRequest, ReportBuilder,
};
use notewise_runtime::{run_folder_name, JobState, JobStatus, JobStore, SpawnedJob, Workers};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::args::Args;

const DEFAULT_OWNER: &str = "local";
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Configuration, client and workers shared by the generating commands.
pub struct Context {
    client: GenerationClient,
    templates: Arc<TemplateStore>,
    call_options: CallOptions,
    workers: Workers,
}

impl Context {
    pub fn load() -> Result<Self> {
        let config = NotewiseConfig::from_env()?;
        let paths = config.data_paths.clone();
        info!("Data directory: {}", paths.root.display());

        let generation = GenerationConfig::load(&paths.llm_config_file);
        let client = GenerationClient::from_config(&generation);
        let templates = Arc::new(TemplateStore::load(&paths.templates_file)?);
        let call_options = generation.call_options();

        let workers = Workers::new(Arc::new(JobStore::new()), client.clone(), templates.clone(), paths)
            .with_call_options(call_options.clone())
            .with_note_options(generation.note_options())
            .with_quiz_content_limit(config.quiz_content_limit);

        Ok(Self {
            client,
            templates,
            call_options,
            workers,
        })
    }
}

/// `notes <records.json>... [--out DIR] [--owner ID]`
pub async fn notes(ctx: &Context, args: &Args) -> Result<Value> {
    if args.positional().is_empty() {
        return Err(Error::Input("notes needs at least one record file".into()));
    }
    let records = load_records(args.positional())?;
    let owner = args.value("owner").unwrap_or(DEFAULT_OWNER);

    let spawned = match args.value("out") {
        Some(out) => ctx
            .workers
            .spawn_notes_in(owner, records, PathBuf::from(out).join(run_folder_name()))?,
        None => ctx.workers.spawn_notes(owner, records)?,
    };
    let status = follow(&ctx.workers, spawned).await?;
    Ok(serde_json::to_value(status)?)
}

/// `quiz <notes.md> [--mc N] [--fill N] [--tf N] [--short N] [--prefs TEXT] [--ask TEXT] [--owner ID]`
pub async fn quiz(ctx: &Context, args: &Args) -> Result<Value> {
    let notes_path = PathBuf::from(args.required(0, "notes file")?);
    let notes = std::fs::read_to_string(&notes_path)?;
    let owner = args.value("owner").unwrap_or(DEFAULT_OWNER);

    let mut request = match args.value("ask") {
        Some(ask) => {
            let focused = ParsedRequirement::parse(ask).focus(&notes).into_owned();
            QuizRequest::from_requirement(ask).with_content(focused)
        }
        None => QuizRequest::new(notes.as_str()),
    };

    let explicit = [
        ("mc", QuestionType::MultipleChoice),
        ("fill", QuestionType::FillBlank),
        ("tf", QuestionType::TrueFalse),
        ("short", QuestionType::ShortAnswer),
    ];
    let mut counts = Vec::new();
    for (flag, ty) in explicit {
        if let Some(n) = args.count(flag)? {
            counts.push((ty, n));
        }
    }
    if !counts.is_empty() {
        request.types.clear();
        for (ty, n) in counts {
            request = request.with_type(ty, n);
        }
    } else if request.types.is_empty() {
        request.types = QuizRequest::default_mix();
    }
    if let Some(prefs) = args.value("prefs") {
        let joined = format!("{} {}", request.preferences, prefs);
        request = request.with_preferences(joined.trim());
    }

    let spawned = ctx
        .workers
        .spawn_quiz_in(owner, request, quiz_run_dir(&notes_path))?;
    let status = follow(&ctx.workers, spawned).await?;
    let path = status
        .artifacts
        .questions
        .clone()
        .ok_or_else(|| Error::Business("quiz run saved no questions".into()))?;
    let batch = QuizBatch::load(&path)?;
    Ok(json!({ "questionsFile": path, "batch": batch }))
}

/// `outline <notes.md>`
pub fn outline(args: &Args) -> Result<Value> {
    let notes = std::fs::read_to_string(args.required(0, "notes file")?)?;
    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let tree = HeadingTreeBuilder::new().build(&notes);
    Ok(json!({
        "toc": render_table_of_contents(&notes, &generated_at),
        "mindmap": tree.to_mind_map(),
        "sections": section_titles(&notes, 2),
    }))
}

/// `section <notes.md> <title> [--mindmap]`
pub async fn section(ctx: Option<&Context>, args: &Args) -> Result<Value> {
    let notes = std::fs::read_to_string(args.required(0, "notes file")?)?;
    let title = args.required(1, "section title")?;
    let content = extract_section(&notes, title)
        .ok_or_else(|| Error::NotFound(format!("section {}", title)))?;

    let mut payload = json!({ "title": title, "content": content });
    if let Some(ctx) = ctx {
        let refiner = MindMapRefiner::new(ctx.client.clone(), ctx.templates.clone());
        payload["mindmap"] = serde_json::to_value(refiner.refine(title, &content).await?)?;
    }
    Ok(payload)
}

/// `chat <notes.md> <message...> [--apply]`
pub async fn chat(ctx: &Context, args: &Args) -> Result<Value> {
    let notes_path = PathBuf::from(args.required(0, "notes file")?);
    let message = args.positional()[1..].join(" ");
    if message.trim().is_empty() {
        return Err(Error::Input("missing message".into()));
    }
    let notes = std::fs::read_to_string(&notes_path)?;

    let assistant = SectionAssistant::new(ctx.client.clone(), ctx.templates.clone())
        .with_options(ctx.call_options.clone());
    let reply = assistant.respond(&notes, &message).await?;

    let applied = match (&reply.pending, args.has("apply")) {
        (Some(edit), true) => {
            assistant.apply(&notes_path, edit)?;
            true
        }
        _ => false,
    };
    Ok(json!({ "reply": reply, "applied": applied }))
}

/// `answer <questions.json> <index> <answer...> [--session ID] [--secs N]`
pub async fn answer(ctx: &Context, args: &Args) -> Result<Value> {
    let questions_path = PathBuf::from(args.required(0, "questions file")?);
    let index: usize = args
        .required(1, "question index")?
        .parse()
        .map_err(|_| Error::Input("question index must be a number".into()))?;
    let user_answer = args.positional().get(2..).unwrap_or_default().join(" ");

    let batch = QuizBatch::load(&questions_path)?;
    let question = batch
        .questions
        .get(index)
        .ok_or_else(|| Error::NotFound(format!("question {}", index)))?;

    let session = args.value("session").unwrap_or("default");
    let secs = args.count("secs")?.unwrap_or(0) as u64;
    let record = AnswerRecord::grade(session, index, question, user_answer.as_str(), secs);
    AnswerLog::new(notes_dir(&questions_path)).append(&record)?;

    let explanation = explain_answer(
        &ctx.client,
        &ctx.templates,
        question,
        &user_answer,
        record.is_correct,
    )
    .await;
    Ok(json!({ "record": record, "explanation": explanation }))
}

/// `report <answers-dir> <session>`
pub async fn report(ctx: &Context, args: &Args) -> Result<Value> {
    let dir = PathBuf::from(args.required(0, "answers directory")?);
    let session = args.required(1, "session id")?;

    let records = AnswerLog::new(&dir).load_session(session)?;
    let report = ReportBuilder::new(ctx.client.clone(), ctx.templates.clone())
        .build(&records)
        .await?;
    let path = report.save(&dir)?;
    Ok(json!({ "reportFile": path, "report": report }))
}

/// `grade <type> <user-answer> <correct-answer>`
pub fn grade(args: &Args) -> Result<Value> {
    let key = args.required(0, "question type")?;
    let ty = QuestionType::from_key(key)
        .ok_or_else(|| Error::Input(format!("unknown question type {}", key)))?;
    let user = args.required(1, "user answer")?;
    let correct = args.required(2, "correct answer")?;
    Ok(json!({ "type": ty, "correct": is_correct(user, correct, ty) }))
}

fn notes_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

/// Fresh `questions/<timestamp>` folder next to the notes file.
fn quiz_run_dir(notes_path: &Path) -> PathBuf {
    notes_dir(notes_path)
        .join("questions")
        .join(run_folder_name())
}

/// Wait for a background job, reporting progress on stderr. Ctrl-C cancels
/// the job and waits for it to stop.
async fn follow(workers: &Workers, spawned: SpawnedJob) -> Result<JobStatus> {
    let SpawnedJob {
        id,
        output_dir,
        mut handle,
    } = spawned;
    info!("Job {} writing to {}", id, output_dir.display());

    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    let mut cancel_sent = false;
    let result = loop {
        tokio::select! {
            joined = &mut handle => {
                break joined.map_err(|e| Error::System(format!("job task failed: {}", e)))?;
            }
            _ = ticker.tick() => {
                if let Some(status) = workers.jobs().get(&id) {
                    print_progress(&status);
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancel_sent => {
                warn!("Interrupted, cancelling job {}", id);
                workers.jobs().cancel(&id)?;
                cancel_sent = true;
            }
        }
    };
    eprintln!();

    let status = workers
        .jobs()
        .get(&id)
        .ok_or_else(|| Error::NotFound(format!("job {}", id)))?;
    match (result, status.state) {
        (_, JobState::Cancelled) => Err(Error::Cancelled),
        (Err(e), _) => Err(e),
        (Ok(()), JobState::Completed) => Ok(status),
        (Ok(()), _) => Err(Error::Business(
            status.error.unwrap_or_else(|| "generation failed".to_string()),
        )),
    }
}

fn print_progress(status: &JobStatus) {
    if status.total > 0 {
        eprint!("\r{} of {} items", status.current, status.total);
    } else if status.chars_streamed > 0 {
        eprint!("\r{} characters streamed", status.chars_streamed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_batches_get_their_own_folder() {
        let dir = quiz_run_dir(Path::new("runs/20240101-090000/notes.md"));
        assert_eq!(
            dir.parent(),
            Some(Path::new("runs/20240101-090000/questions"))
        );
        assert_eq!(dir.file_name().unwrap().len(), 15);
    }
}
