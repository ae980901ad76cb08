//! Heading tree construction.

use serde::Serialize;
use tracing::debug;

use crate::heading::parse_heading;

pub const ROOT_LABEL: &str = "Study Notes";

/// A heading and its nested headings. The synthetic root has level 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingNode {
    pub label: String,
    pub level: u8,
    pub children: Vec<HeadingNode>,
}

impl HeadingNode {
    pub fn new(label: impl Into<String>, level: u8) -> Self {
        Self {
            label: label.into(),
            level,
            children: Vec::new(),
        }
    }

    pub fn root() -> Self {
        Self::new(ROOT_LABEL, 0)
    }

    /// Number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    /// Heading-only Markdown rendering of the subtree, pre-order, without
    /// this node itself when it is the root.
    pub fn skeleton(&self) -> String {
        let mut lines = Vec::new();
        self.push_skeleton(&mut lines);
        lines.join("\n")
    }

    fn push_skeleton(&self, lines: &mut Vec<String>) {
        if self.level > 0 {
            lines.push(format!("{} {}", "#".repeat(self.level as usize), self.label));
        }
        for child in &self.children {
            child.push_skeleton(lines);
        }
    }

    /// Placeholder branch shown when notes contain no headings.
    fn placeholder() -> Self {
        let mut overview = HeadingNode::new("Content overview", 1);
        overview.children = vec![
            HeadingNode::new("Notes content loaded", 2),
            HeadingNode::new("Check the source document formatting", 2),
            HeadingNode::new("Use Markdown headings to structure the notes", 2),
        ];
        overview
    }
}

/// Builds a [`HeadingNode`] tree from Markdown in one pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadingTreeBuilder;

impl HeadingTreeBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Each heading attaches to the nearest open heading of lower level;
    /// a heading closes every open heading of the same or deeper level.
    /// Notes without headings get one placeholder branch.
    pub fn build(&self, markdown: &str) -> HeadingNode {
        // Open path from the root; levels strictly increase along it.
        let mut open: Vec<HeadingNode> = vec![HeadingNode::root()];
        let mut found = 0usize;

        for line in markdown.lines() {
            let Some((level, title)) = parse_heading(line) else {
                continue;
            };
            found += 1;
            while open.len() > 1 && open.last().is_some_and(|n| n.level >= level) {
                close_last(&mut open);
            }
            open.push(HeadingNode::new(title, level));
        }

        while open.len() > 1 {
            close_last(&mut open);
        }
        let mut root = open.pop().unwrap_or_else(HeadingNode::root);

        if found == 0 {
            root.children.push(HeadingNode::placeholder());
        }
        debug!("Built heading tree with {} headings", found);
        root
    }
}

fn close_last(open: &mut Vec<HeadingNode>) {
    if let Some(node) = open.pop() {
        if let Some(parent) = open.last_mut() {
            parent.children.push(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(nodes: &[HeadingNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.label.as_str()).collect()
    }

    #[test]
    fn test_two_level_tree() {
        let root = HeadingTreeBuilder::new().build("# A\n## B\n## C\n# D");
        assert_eq!(root.level, 0);
        assert_eq!(labels(&root.children), vec!["A", "D"]);
        assert_eq!(labels(&root.children[0].children), vec!["B", "C"]);
        assert!(root.children[0].children.iter().all(|n| n.level == 2));
        assert!(root.children[1].children.is_empty());
    }

    #[test]
    fn test_skipped_levels_attach_to_nearest_ancestor() {
        let md = "# A\n### deep\n## mid\n#### deeper\n# B";
        let root = HeadingTreeBuilder::new().build(md);
        let a = &root.children[0];
        assert_eq!(labels(&a.children), vec!["deep", "mid"]);
        assert_eq!(labels(&a.children[1].children), vec!["deeper"]);
        assert_eq!(root.children[1].label, "B");
    }

    #[test]
    fn test_leading_subheading_attaches_to_root() {
        let root = HeadingTreeBuilder::new().build("## first\n# top\n## child");
        assert_eq!(labels(&root.children), vec!["first", "top"]);
        assert_eq!(labels(&root.children[1].children), vec!["child"]);
    }

    #[test]
    fn test_body_text_and_deep_headings_ignored() {
        let md = "intro\n# A\nsome text\n####### seven\n## **B**";
        let root = HeadingTreeBuilder::new().build(md);
        assert_eq!(root.descendant_count(), 2);
        assert_eq!(root.children[0].children[0].label, "B");
    }

    #[test]
    fn test_no_headings_yields_placeholder() {
        let root = HeadingTreeBuilder::new().build("just text\nmore text");
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.children[0].label, "Content overview");
        assert_eq!(root.children[0].children.len(), 3);
    }

    #[test]
    fn test_skeleton_reparse_is_isomorphic() {
        let md = "# Intro\ntext\n## *Why*\n### Details\n## How\n# Summary\n#### Note";
        let builder = HeadingTreeBuilder::new();
        let tree = builder.build(md);
        let again = builder.build(&tree.skeleton());
        assert_eq!(tree, again);
        assert_eq!(again.skeleton(), tree.skeleton());
    }
}
