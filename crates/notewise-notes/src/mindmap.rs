//! Model-refined mind map for a single section.

use std::sync::Arc;

use notewise_chat::{CallOptions, GenerationClient};
use notewise_core::Result;
use notewise_outline::MindMapNode;
use notewise_prompts::{TemplateName, TemplateStore};
use notewise_quiz::extract_json;
use tracing::{debug, warn};

const PLACEHOLDER_BRANCH: &str = "Mind map generation failed, edit manually";

pub struct MindMapRefiner {
    client: GenerationClient,
    templates: Arc<TemplateStore>,
    options: CallOptions,
}

impl MindMapRefiner {
    pub fn new(client: GenerationClient, templates: Arc<TemplateStore>) -> Self {
        Self {
            client,
            templates,
            options: CallOptions::default().with_max_tokens(1500),
        }
    }

    /// `{name, children}` tree for one section. A mock reply or an
    /// unparseable one yields a single-branch tree named after the section.
    pub async fn refine(&self, title: &str, section_text: &str) -> Result<MindMapNode> {
        let prompt = self.templates.render(
            TemplateName::SectionMindmap,
            &[("section_title", title), ("section_content", section_text)],
        )?;

        let completion = self.client.call(&prompt, &self.options).await;
        if !completion.is_live() {
            return Ok(placeholder(title));
        }

        let parsed = extract_json(&completion.text)
            .and_then(|value| serde_json::from_value::<MindMapNode>(value).ok())
            .filter(|node| !node.name.trim().is_empty());
        match parsed {
            Some(node) => {
                debug!("Refined mind map for {} with depth {}", title, node.depth());
                Ok(node)
            }
            None => {
                warn!("Could not parse mind map for section {}", title);
                Ok(placeholder(title))
            }
        }
    }
}

fn placeholder(title: &str) -> MindMapNode {
    MindMapNode {
        name: title.to_string(),
        level: None,
        children: vec![MindMapNode::leaf(PLACEHOLDER_BRANCH)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notewise_chat::{ScriptedBackend, ScriptedReply};

    fn refiner(backend: ScriptedBackend) -> MindMapRefiner {
        MindMapRefiner::new(
            GenerationClient::new(Arc::new(backend), "m"),
            Arc::new(TemplateStore::builtin()),
        )
    }

    #[tokio::test]
    async fn test_refine_parses_fenced_tree() {
        let reply = "Here you go:\n```json\n{\"name\": \"Mitosis\", \"children\": [{\"name\": \"Prophase\"}, {\"name\": \"Metaphase\", \"children\": [{\"name\": \"Spindle\"}]}]}\n```";
        let node = refiner(ScriptedBackend::new(vec![ScriptedReply::Text(reply.into())]))
            .refine("Mitosis", "## Mitosis\nPhases.")
            .await
            .unwrap();

        assert_eq!(node.name, "Mitosis");
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.children[1].children[0].name, "Spindle");
        assert_eq!(node.depth(), 3);
    }

    #[tokio::test]
    async fn test_unparseable_reply_gives_placeholder() {
        let node = refiner(ScriptedBackend::new(vec![ScriptedReply::Text(
            "I cannot draw that.".into(),
        )]))
        .refine("Mitosis", "text")
        .await
        .unwrap();
        assert_eq!(node.name, "Mitosis");
        assert_eq!(node.children, vec![MindMapNode::leaf(PLACEHOLDER_BRANCH)]);
    }

    #[tokio::test]
    async fn test_offline_gives_placeholder() {
        let node = refiner(ScriptedBackend::offline())
            .refine("Cells", "text")
            .await
            .unwrap();
        assert_eq!(node.name, "Cells");
        assert_eq!(node.children.len(), 1);
    }
}
