//! Display form of heading trees for the mind-map view.

use serde::{Deserialize, Serialize};

use crate::tree::HeadingNode;

const ROOT_ICON: &str = "📚";
const LEVEL_ICONS: [&str; 6] = ["📖", "📝", "📋", "📌", "🔸", "🔹"];

/// Mind-map node as consumed by the front end: `{name, children}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MindMapNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default)]
    pub children: Vec<MindMapNode>,
}

impl MindMapNode {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
            children: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(MindMapNode::depth).max().unwrap_or(0)
    }
}

fn icon_for(level: u8) -> &'static str {
    if level == 0 {
        return ROOT_ICON;
    }
    LEVEL_ICONS[(level as usize - 1).min(LEVEL_ICONS.len() - 1)]
}

impl HeadingNode {
    /// Decorated copy with per-level icons. Labels in the tree itself stay
    /// undecorated.
    pub fn to_mind_map(&self) -> MindMapNode {
        MindMapNode {
            name: format!("{} {}", icon_for(self.level), self.label),
            level: (self.level > 0).then_some(self.level),
            children: self.children.iter().map(HeadingNode::to_mind_map).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::HeadingTreeBuilder;

    #[test]
    fn test_icons_per_level() {
        let root = HeadingTreeBuilder::new().build("# A\n## B\n###### F");
        let map = root.to_mind_map();
        assert_eq!(map.name, "📚 Study Notes");
        assert_eq!(map.level, None);
        assert_eq!(map.children[0].name, "📖 A");
        assert_eq!(map.children[0].children[0].name, "📝 B");
        assert_eq!(map.children[0].children[0].children[0].name, "🔹 F");
        assert_eq!(map.depth(), 4);
    }

    #[test]
    fn test_wire_shape() {
        let map = HeadingTreeBuilder::new().build("# A").to_mind_map();
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["children"][0]["name"], "📖 A");
        assert_eq!(json["children"][0]["level"], 1);
        assert!(json.get("level").is_none());

        let parsed: MindMapNode =
            serde_json::from_str(r#"{"name": "x", "children": [{"name": "y"}]}"#).unwrap();
        assert_eq!(parsed.children[0], MindMapNode::leaf("y"));
    }
}
