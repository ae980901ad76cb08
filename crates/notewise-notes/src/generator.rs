//! Streaming note generation.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use notewise_chat::{CallOptions, GenerationClient, StreamSummary};
use notewise_core::{Artifacts, CancelToken, Error, EventSink, GenerationEvent, Result};
use notewise_ingest::{ContentExtractor, ExtractedContent, PageRecord};
use notewise_prompts::{TemplateName, TemplateStore};
use tracing::{info, warn};

use crate::store::{write_table_of_contents, EXTRACTED_FILE, NOTES_FILE, PROMPT_FILE};

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct NoteRun {
    pub artifacts: Artifacts,
    pub stream: StreamSummary,
}

pub struct NoteGenerator {
    client: GenerationClient,
    templates: Arc<TemplateStore>,
    options: CallOptions,
}

impl NoteGenerator {
    pub fn new(client: GenerationClient, templates: Arc<TemplateStore>, options: CallOptions) -> Self {
        Self {
            client,
            templates,
            options,
        }
    }

    /// Full prompt: template, image manifest, then the page text.
    pub fn build_prompt(&self, extracted: &ExtractedContent) -> String {
        let mut prompt = self.templates.get(TemplateName::NoteGeneration).to_string();
        if !extracted.images_info.is_empty() {
            prompt.push_str("\n\nAvailable images:\n");
            for (i, image) in extracted.images_info.iter().enumerate() {
                prompt.push_str(&format!(
                    "{}. page {} - path: {}\n   caption: {}\n",
                    i + 1,
                    image.page,
                    image.relative_path,
                    image.caption
                ));
            }
        }
        prompt.push_str("\n\nText content:\n");
        prompt.push_str(&extracted.text_content);
        prompt
    }

    /// Generate notes for `records` into `run_dir`.
    ///
    /// Emits `start`, one `content` per streamed piece, then `complete` with
    /// the written artifacts, or `error` on failure.
    pub async fn generate(
        &self,
        records: &[PageRecord],
        run_dir: &Path,
        sink: &dyn EventSink,
        cancel: &CancelToken,
    ) -> Result<NoteRun> {
        match self.run(records, run_dir, sink, cancel).await {
            Ok(run) => {
                sink.emit(GenerationEvent::Complete {
                    artifacts: run.artifacts.clone(),
                });
                Ok(run)
            }
            Err(e) => {
                warn!("Note generation failed: {}", e);
                sink.emit(GenerationEvent::Error {
                    message: e.user_message(),
                });
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        records: &[PageRecord],
        run_dir: &Path,
        sink: &dyn EventSink,
        cancel: &CancelToken,
    ) -> Result<NoteRun> {
        let extracted = ContentExtractor::new(Some(run_dir)).extract(records);
        if extracted.text_content.trim().is_empty() {
            return Err(Error::Input("No text content found in the document records".into()));
        }

        std::fs::create_dir_all(run_dir)?;
        let prompt = self.build_prompt(&extracted);
        let extracted_path = run_dir.join(EXTRACTED_FILE);
        let prompt_path = run_dir.join(PROMPT_FILE);
        std::fs::write(&extracted_path, &extracted.text_content)?;
        std::fs::write(&prompt_path, &prompt)?;

        info!(
            "Generating notes from {} records ({} images, prompt length {})",
            records.len(),
            extracted.images_info.len(),
            prompt.chars().count()
        );
        sink.emit(GenerationEvent::Start);

        let notes_path = run_dir.join(NOTES_FILE);
        let mut file = File::create(&notes_path)?;
        let mut notes = String::new();
        let stream = self
            .client
            .stream_into(&prompt, &self.options, sink, cancel, |piece| {
                file.write_all(piece.as_bytes())?;
                file.flush()?;
                notes.push_str(piece);
                Ok(())
            })
            .await?;
        drop(file);

        if stream.truncated {
            warn!("Notes for {} are incomplete", run_dir.display());
        }
        let contents_path = write_table_of_contents(run_dir, &notes)?;

        Ok(NoteRun {
            artifacts: Artifacts {
                notes: Some(notes_path),
                contents: Some(contents_path),
                extracted: Some(extracted_path),
                prompt: Some(prompt_path),
                questions: None,
            },
            stream,
        })
    }
}
