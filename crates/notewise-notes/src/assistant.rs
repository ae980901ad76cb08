//! Chat over a generated run: section questions, section rewrites and
//! general questions about the notes.
//!
//! Rewrites are two-phase. `propose` asks the model for new section text
//! and hands back a [`PendingEdit`]; nothing touches disk until `apply`.

use std::path::Path;
use std::sync::Arc;

use notewise_chat::{CallOptions, GenerationClient};
use notewise_core::{Error, Result};
use notewise_outline::{
    detect_section_edit, extract_section, has_edit_intent, parse_heading, parse_section_mention,
    replace_section,
};
use notewise_prompts::{TemplateName, TemplateStore};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::store::write_table_of_contents;

/// Notes context for general chat is cut to this many characters.
const CHAT_CONTEXT_CHARS: usize = 1000;

/// A rewrite waiting for confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingEdit {
    pub title: String,
    pub request: String,
    pub original: String,
    pub proposed: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssistantReply {
    pub text: String,
    /// False when the text is a mock reply.
    pub live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingEdit>,
}

pub struct SectionAssistant {
    client: GenerationClient,
    templates: Arc<TemplateStore>,
    options: CallOptions,
}

impl SectionAssistant {
    pub fn new(client: GenerationClient, templates: Arc<TemplateStore>) -> Self {
        Self {
            client,
            templates,
            options: CallOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Route a chat message: `@Section` mentions and edit requests that name
    /// a section go to the section operations, anything else is answered
    /// against the whole notes.
    pub async fn respond(&self, notes: &str, message: &str) -> Result<AssistantReply> {
        if let Some(mention) = parse_section_mention(message) {
            debug!("Message mentions section {}", mention.title);
            if has_edit_intent(&mention.question) {
                let edit = self.propose(notes, &mention.title, &mention.question).await?;
                return Ok(proposal_reply(edit));
            }
            return self.answer(notes, &mention.title, &mention.question).await;
        }

        if let Some(target) = detect_section_edit(message, notes) {
            info!("Edit request matched section {}", target.title);
            let edit = self.propose(notes, &target.title, message).await?;
            return Ok(proposal_reply(edit));
        }

        self.chat(notes, message).await
    }

    /// Answer a question about one section.
    pub async fn answer(&self, notes: &str, title: &str, question: &str) -> Result<AssistantReply> {
        let section = find_section(notes, title)?;
        let question = if question.trim().is_empty() {
            "Summarize this section."
        } else {
            question
        };
        let prompt = self.templates.render(
            TemplateName::SectionQa,
            &[
                ("section_title", title),
                ("section_content", section.as_str()),
                ("user_question", question),
            ],
        )?;

        let completion = self.client.call(&prompt, &self.options).await;
        Ok(AssistantReply {
            text: format!("About section «{}»:\n\n{}", title, completion.text.trim()),
            live: completion.is_live(),
            pending: None,
        })
    }

    /// Ask the model for a rewrite of one section. Requires a live reply:
    /// a mock rewrite would destroy the section.
    pub async fn propose(&self, notes: &str, title: &str, request: &str) -> Result<PendingEdit> {
        let original = find_section(notes, title)?;
        let prompt = self.templates.render(
            TemplateName::SectionModification,
            &[
                ("section_title", title),
                ("section_content", original.as_str()),
                ("modification_request", request),
            ],
        )?;

        let completion = self.client.call(&prompt, &self.options).await;
        if !completion.is_live() {
            warn!("No live completion for rewrite of {}", title);
            return Err(Error::Transport(format!(
                "no live completion for rewrite of section {}",
                title
            )));
        }

        let proposed = clean_rewrite(&completion.text, &original);
        if proposed.is_empty() {
            return Err(Error::Business(format!("Empty rewrite returned for section {}", title)));
        }

        Ok(PendingEdit {
            title: title.to_string(),
            request: request.to_string(),
            original,
            proposed,
        })
    }

    /// Write a confirmed rewrite into `notes_path` and rebuild the table of
    /// contents beside it. Returns the updated notes.
    pub fn apply(&self, notes_path: &Path, edit: &PendingEdit) -> Result<String> {
        let notes = std::fs::read_to_string(notes_path)?;
        let updated = replace_section(&notes, &edit.title, &edit.proposed)
            .ok_or_else(|| Error::NotFound(format!("section {}", edit.title)))?;

        std::fs::write(notes_path, &updated)?;
        if let Some(run_dir) = notes_path.parent() {
            write_table_of_contents(run_dir, &updated)?;
        }
        info!("Applied rewrite of section {} to {}", edit.title, notes_path.display());
        Ok(updated)
    }

    async fn chat(&self, notes: &str, message: &str) -> Result<AssistantReply> {
        let context = if notes.chars().count() > CHAT_CONTEXT_CHARS {
            format!("{}...", notes.chars().take(CHAT_CONTEXT_CHARS).collect::<String>())
        } else {
            notes.to_string()
        };
        let prompt = self.templates.render(
            TemplateName::ChatAssistant,
            &[("notes_content", context.as_str()), ("user_question", message)],
        )?;

        let completion = self.client.call(&prompt, &self.options).await;
        Ok(AssistantReply {
            live: completion.is_live(),
            text: completion.text,
            pending: None,
        })
    }
}

fn find_section(notes: &str, title: &str) -> Result<String> {
    extract_section(notes, title).ok_or_else(|| Error::NotFound(format!("section {}", title)))
}

fn proposal_reply(edit: PendingEdit) -> AssistantReply {
    AssistantReply {
        text: format!(
            "Proposed rewrite of section «{}»:\n\n{}\n\nConfirm to apply it to the notes.",
            edit.title, edit.proposed
        ),
        live: true,
        pending: Some(edit),
    }
}

/// Drop code fences around the reply and keep the original heading when the
/// model left it out.
fn clean_rewrite(raw: &str, original: &str) -> String {
    let mut text = raw.trim();
    for fence in ["```markdown", "```md", "```"] {
        if let Some(rest) = text.strip_prefix(fence) {
            text = rest;
            break;
        }
    }
    let text = text.strip_suffix("```").unwrap_or(text).trim();
    if text.is_empty() {
        return String::new();
    }

    let starts_with_heading = text.lines().next().and_then(parse_heading).is_some();
    if starts_with_heading {
        return text.to_string();
    }
    match original.lines().next().filter(|l| parse_heading(l).is_some()) {
        Some(heading) => format!("{}\n{}", heading, text),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notewise_chat::{ScriptedBackend, ScriptedReply};

    const NOTES: &str = "# Biology\nIntro.\n## Photosynthesis\nLight to sugar.\n## Respiration\nSugar to energy.\n";

    fn assistant(backend: ScriptedBackend) -> (SectionAssistant, Arc<ScriptedBackend>) {
        let backend = Arc::new(backend);
        let client = GenerationClient::new(backend.clone(), "m");
        (
            SectionAssistant::new(client, Arc::new(TemplateStore::builtin())),
            backend,
        )
    }

    #[tokio::test]
    async fn test_mention_answers_section_question() {
        let (assistant, backend) = assistant(ScriptedBackend::new(vec![ScriptedReply::Text(
            "Chlorophyll absorbs light.".into(),
        )]));
        let reply = assistant
            .respond(NOTES, "@Photosynthesis what absorbs light?")
            .await
            .unwrap();

        assert_eq!(reply.text, "About section «Photosynthesis»:\n\nChlorophyll absorbs light.");
        assert!(reply.live);
        assert!(reply.pending.is_none());
        let prompt = &backend.prompts()[0];
        assert!(prompt.contains("Light to sugar."));
        assert!(prompt.contains("what absorbs light?"));
        assert!(!prompt.contains("Sugar to energy."));
    }

    #[tokio::test]
    async fn test_unknown_section_is_not_found() {
        let (assistant, backend) = assistant(ScriptedBackend::new(vec![]));
        let err = assistant.respond(NOTES, "@Genetics explain").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_edit_request_is_proposed_then_applied() {
        let tmp = tempfile::tempdir().unwrap();
        let notes_path = tmp.path().join(crate::store::NOTES_FILE);
        std::fs::write(&notes_path, NOTES).unwrap();

        let (assistant, _) = assistant(ScriptedBackend::new(vec![ScriptedReply::Text(
            "```markdown\nSugar is oxidised to release ATP.\n```".into(),
        )]));
        let reply = assistant
            .respond(NOTES, "Please expand the respiration section")
            .await
            .unwrap();

        let edit = reply.pending.unwrap();
        assert_eq!(edit.title, "Respiration");
        assert_eq!(edit.original, "## Respiration\nSugar to energy.");
        assert_eq!(edit.proposed, "## Respiration\nSugar is oxidised to release ATP.");
        assert_eq!(std::fs::read_to_string(&notes_path).unwrap(), NOTES);

        let updated = assistant.apply(&notes_path, &edit).unwrap();
        assert!(updated.contains("release ATP."));
        assert!(!updated.contains("Sugar to energy."));
        assert!(updated.contains("## Photosynthesis\nLight to sugar."));
        assert_eq!(std::fs::read_to_string(&notes_path).unwrap(), updated);
        assert!(tmp.path().join(crate::store::CONTENTS_FILE).exists());
    }

    #[tokio::test]
    async fn test_mention_with_edit_keyword_proposes() {
        let (assistant, _) = assistant(ScriptedBackend::new(vec![ScriptedReply::Text(
            "## Photosynthesis\nPlants turn light into sugar.".into(),
        )]));
        let reply = assistant
            .respond(NOTES, "@Photosynthesis simplify this")
            .await
            .unwrap();
        let edit = reply.pending.unwrap();
        assert_eq!(edit.request, "simplify this");
        assert_eq!(edit.proposed, "## Photosynthesis\nPlants turn light into sugar.");
    }

    #[tokio::test]
    async fn test_propose_refuses_mock_rewrite() {
        let (assistant, _) = assistant(ScriptedBackend::offline());
        let err = assistant
            .propose(NOTES, "Respiration", "rewrite it")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_apply_missing_section() {
        let tmp = tempfile::tempdir().unwrap();
        let notes_path = tmp.path().join("notes.md");
        std::fs::write(&notes_path, "# Other\ntext\n").unwrap();
        let (assistant, _) = assistant(ScriptedBackend::new(vec![]));
        let edit = PendingEdit {
            title: "Respiration".into(),
            request: "x".into(),
            original: String::new(),
            proposed: "## Respiration\nnew".into(),
        };
        assert!(matches!(
            assistant.apply(&notes_path, &edit),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_general_chat_truncates_context() {
        let long_notes = format!("# Long\n{}", "a".repeat(2000));
        let (assistant, backend) = assistant(ScriptedBackend::new(vec![ScriptedReply::Text(
            "General answer.".into(),
        )]));
        let reply = assistant.respond(&long_notes, "what is this about?").await.unwrap();
        assert_eq!(reply.text, "General answer.");
        assert!(reply.pending.is_none());

        let prompt = &backend.prompts()[0];
        assert!(prompt.contains(&format!("{}...", &long_notes[..CHAT_CONTEXT_CHARS])));
        assert!(!prompt.contains(&long_notes));
    }

    #[test]
    fn test_clean_rewrite() {
        let original = "## Title\nold";
        assert_eq!(clean_rewrite("```md\nbody\n```", original), "## Title\nbody");
        assert_eq!(clean_rewrite("## New Title\nbody", original), "## New Title\nbody");
        assert_eq!(clean_rewrite("```\n```", original), "");
    }
}
