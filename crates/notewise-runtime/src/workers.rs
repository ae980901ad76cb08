//! Background runs on the tokio runtime.

use std::path::PathBuf;
use std::sync::Arc;

use notewise_chat::{CallOptions, GenerationClient};
use notewise_core::{DataPaths, Error, Result};
use notewise_ingest::PageRecord;
use notewise_notes::NoteGenerator;
use notewise_prompts::TemplateStore;
use notewise_quiz::{QuestionOrchestrator, QuizRequest};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::jobs::{JobCell, JobStore};
use crate::types::JobKind;

/// Timestamped name for a run folder.
pub fn run_folder_name() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}

/// A job that is running in the background. The handle yields the run's
/// own result.
pub struct SpawnedJob {
    pub id: String,
    pub output_dir: PathBuf,
    pub handle: JoinHandle<Result<()>>,
}

/// Everything a background run needs, shared by every job.
#[derive(Clone)]
pub struct Workers {
    jobs: Arc<JobStore>,
    client: GenerationClient,
    templates: Arc<TemplateStore>,
    paths: DataPaths,
    call_options: CallOptions,
    note_options: CallOptions,
    quiz_content_limit: usize,
}

impl Workers {
    pub fn new(
        jobs: Arc<JobStore>,
        client: GenerationClient,
        templates: Arc<TemplateStore>,
        paths: DataPaths,
    ) -> Self {
        Self {
            jobs,
            client,
            templates,
            paths,
            call_options: CallOptions::default(),
            note_options: CallOptions::default(),
            quiz_content_limit: 8000,
        }
    }

    pub fn with_call_options(mut self, options: CallOptions) -> Self {
        self.call_options = options;
        self
    }

    pub fn with_note_options(mut self, options: CallOptions) -> Self {
        self.note_options = options;
        self
    }

    pub fn with_quiz_content_limit(mut self, limit: usize) -> Self {
        self.quiz_content_limit = limit;
        self
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    /// Generate notes for `owner` into a fresh run folder under their
    /// output tree.
    pub fn spawn_notes(&self, owner: &str, records: Vec<PageRecord>) -> Result<SpawnedJob> {
        let run_dir = self.paths.user_output(owner).join(run_folder_name());
        self.spawn_notes_in(owner, records, run_dir)
    }

    /// [`spawn_notes`](Self::spawn_notes) into an explicit run folder.
    pub fn spawn_notes_in(
        &self,
        owner: &str,
        records: Vec<PageRecord>,
        run_dir: PathBuf,
    ) -> Result<SpawnedJob> {
        let cell = self.jobs.begin(owner, JobKind::Notes)?;
        let generator = NoteGenerator::new(
            self.client.clone(),
            self.templates.clone(),
            self.note_options.clone(),
        );

        let dir = run_dir.clone();
        let job = cell.clone();
        let handle = self.supervise(cell, async move {
            let cancel = job.cancel_token();
            generator
                .generate(&records, &dir, job.as_ref(), &cancel)
                .await
                .map(|_| ())
        });
        Ok(handle.into_spawned(run_dir))
    }

    /// Generate a quiz for `owner`; each batch lands in a fresh run folder
    /// under their questions tree.
    pub fn spawn_quiz(&self, owner: &str, request: QuizRequest) -> Result<SpawnedJob> {
        let out_dir = self.paths.user_questions(owner).join(run_folder_name());
        self.spawn_quiz_in(owner, request, out_dir)
    }

    pub fn spawn_quiz_in(
        &self,
        owner: &str,
        request: QuizRequest,
        out_dir: PathBuf,
    ) -> Result<SpawnedJob> {
        let cell = self.jobs.begin(owner, JobKind::Quiz)?;
        let orchestrator = QuestionOrchestrator::new(self.client.clone(), self.templates.clone())
            .with_options(self.call_options.clone())
            .with_content_limit(self.quiz_content_limit);
        let request = request.with_requester(owner);

        let dir = out_dir.clone();
        let job = cell.clone();
        let handle = self.supervise(cell, async move {
            let cancel = job.cancel_token();
            orchestrator
                .generate_and_save(&request, &dir, job.as_ref(), &cancel)
                .await
                .map(|_| ())
        });
        Ok(handle.into_spawned(out_dir))
    }

    /// Run `work` on its own task and make sure the job ends in a terminal
    /// state, even when the run panics.
    fn supervise<F>(&self, cell: Arc<JobCell>, work: F) -> Supervised
    where
        F: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let id = cell.id();
        let jobs = self.jobs.clone();
        let job_id = id.clone();
        let handle = tokio::spawn(async move {
            let result = match tokio::spawn(work).await {
                Ok(Ok(())) => {
                    info!("Job {} finished", job_id);
                    Ok(())
                }
                Ok(Err(e)) => {
                    info!("Job {} ended with error: {}", job_id, e);
                    cell.fail_with(&e);
                    Err(e)
                }
                Err(e) => {
                    error!("Job {} aborted: {}", job_id, e);
                    cell.fail("Generation stopped unexpectedly");
                    let err = Error::System(format!("job {} aborted: {}", job_id, e));
                    cell.fail_with(&err);
                    Err(err)
                }
            };
            jobs.prune();
            result
        });
        Supervised { id, handle }
    }
}

struct Supervised {
    id: String,
    handle: JoinHandle<Result<()>>,
}

impl Supervised {
    fn into_spawned(self, output_dir: PathBuf) -> SpawnedJob {
        SpawnedJob {
            id: self.id,
            output_dir,
            handle: self.handle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JobState;
    use notewise_chat::{ScriptedBackend, ScriptedReply};
    use notewise_quiz::QuestionType;
    use serde_json::json;

    fn workers(backend: ScriptedBackend, root: &std::path::Path) -> Workers {
        Workers::new(
            Arc::new(JobStore::new()),
            GenerationClient::new(Arc::new(backend), "m"),
            Arc::new(TemplateStore::builtin()),
            DataPaths::new(root).unwrap(),
        )
    }

    fn records() -> Vec<PageRecord> {
        PageRecord::decode_all(json!([{"type": "text", "page": 1, "content": "Cells divide."}])).unwrap()
    }

    #[tokio::test]
    async fn test_notes_job_completes() {
        let tmp = tempfile::tempdir().unwrap();
        let workers = workers(
            ScriptedBackend::new(vec![ScriptedReply::Text("# Cells\nThey divide.".into())]),
            tmp.path(),
        );

        let spawned = workers.spawn_notes("u1", records()).unwrap();
        assert!(spawned.output_dir.starts_with(tmp.path().join("u1").join("output")));
        assert!(matches!(
            workers.spawn_notes("u1", records()),
            Err(Error::Busy(_))
        ));
        spawned.handle.await.unwrap().unwrap();

        let status = workers.jobs().get(&spawned.id).unwrap();
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.chars_streamed, "# Cells\nThey divide.".chars().count());
        let notes = status.artifacts.notes.unwrap();
        assert_eq!(std::fs::read_to_string(notes).unwrap(), "# Cells\nThey divide.");
    }

    #[tokio::test]
    async fn test_failed_notes_job_is_terminal() {
        let tmp = tempfile::tempdir().unwrap();
        let workers = workers(ScriptedBackend::new(vec![]), tmp.path());

        let spawned = workers.spawn_notes("u1", Vec::new()).unwrap();
        let result = spawned.handle.await.unwrap();
        assert!(matches!(result, Err(Error::Input(_))));

        let status = workers.jobs().get(&spawned.id).unwrap();
        assert_eq!(status.state, JobState::Failed);
        assert!(status.error.is_some());
        assert_eq!(status.error_code, Some("VALIDATION_ERROR"));
        assert!(workers.spawn_notes("u1", records()).is_ok());
    }

    #[tokio::test]
    async fn test_quiz_job_saves_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let workers = workers(ScriptedBackend::offline(), tmp.path());
        let request = QuizRequest::new("# Cells\nCells divide by mitosis.")
            .with_type(QuestionType::TrueFalse, 2);

        let spawned = workers.spawn_quiz("u2", request).unwrap();
        spawned.handle.await.unwrap().unwrap();

        let status = workers.jobs().get(&spawned.id).unwrap();
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.total, 2);
        let saved = status.artifacts.questions.unwrap();
        let questions_root = tmp.path().join("u2").join("output").join("questions");
        assert_eq!(spawned.output_dir.parent(), Some(questions_root.as_path()));
        let run_folder = spawned.output_dir.file_name().unwrap().to_str().unwrap();
        assert_eq!(run_folder.len(), 15);
        assert!(saved.starts_with(&spawned.output_dir));
        let batch = notewise_quiz::QuizBatch::load(&saved).unwrap();
        assert_eq!(batch.questions.len(), 2);
        assert!(batch.questions[0].id.starts_with("q_u2_"));
    }

    #[test]
    fn test_run_folder_name_shape() {
        let name = run_folder_name();
        assert_eq!(name.len(), 15);
        assert_eq!(name.as_bytes()[8], b'-');
    }
}
