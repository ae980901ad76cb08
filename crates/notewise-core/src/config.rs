//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Paths to the Notewise data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Uploaded source documents and their parsed record files (`data/uploads/`).
    pub uploads: PathBuf,
    /// Prompt template overrides (`data/templates.json`).
    pub templates_file: PathBuf,
    /// Generation endpoint configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            uploads: root.join("uploads"),
            templates_file: root.join("templates.json"),
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        std::fs::create_dir_all(&paths.uploads)?;
        Ok(paths)
    }

    /// Per-owner output tree (`data/<owner>/output`). Run folders below it are
    /// named by the caller.
    pub fn user_output(&self, owner: &str) -> PathBuf {
        self.root.join(owner).join("output")
    }

    /// Per-owner quiz tree (`data/<owner>/output/questions`).
    pub fn user_questions(&self, owner: &str) -> PathBuf {
        self.user_output(owner).join("questions")
    }
}

/// Top-level Notewise configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotewiseConfig {
    pub data_paths: DataPaths,
    /// Character cap on notes fed into quiz generation.
    pub quiz_content_limit: usize,
}

impl NotewiseConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env() -> std::io::Result<Self> {
        let data_dir = std::env::var("NOTEWISE_DATA_DIR").unwrap_or_else(|_| "data".to_string());
        Self::with_data_dir(data_dir)
    }

    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let quiz_content_limit = std::env::var("NOTEWISE_QUIZ_CONTENT_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8000);

        Ok(Self {
            data_paths: DataPaths::new(data_dir)?,
            quiz_content_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_layout() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path()).unwrap();
        assert!(paths.uploads.is_dir());
        assert_eq!(paths.user_output("42"), dir.path().join("42").join("output"));
        assert_eq!(
            paths.user_questions("42"),
            dir.path().join("42").join("output").join("questions")
        );
        assert!(paths.llm_config_file.ends_with("llm-config.json"));
    }

    #[test]
    fn test_config_with_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = NotewiseConfig::with_data_dir(dir.path()).unwrap();
        assert!(config.quiz_content_limit > 0);
        assert_eq!(config.data_paths.root, dir.path());
    }
}
