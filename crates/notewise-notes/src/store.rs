//! Run folder layout.

use std::path::{Path, PathBuf};

use notewise_core::Result;
use notewise_outline::render_table_of_contents;
use tracing::debug;

pub const NOTES_FILE: &str = "notes.md";
pub const CONTENTS_FILE: &str = "contents.md";
pub const EXTRACTED_FILE: &str = "extracted_content.txt";
pub const PROMPT_FILE: &str = "full_prompt.txt";

/// `notes.md` of the newest run folder under `output_root`. Run folders are
/// named by timestamp, so the greatest name is the newest. Folders without
/// notes are ignored.
pub fn latest_notes(output_root: &Path) -> Result<Option<PathBuf>> {
    let entries = match std::fs::read_dir(output_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.join(NOTES_FILE).is_file())
        .collect();
    candidates.sort();

    let latest = candidates.pop().map(|dir| dir.join(NOTES_FILE));
    debug!("Latest notes under {}: {:?}", output_root.display(), latest);
    Ok(latest)
}

/// Rebuild `contents.md` beside the notes file.
pub fn write_table_of_contents(run_dir: &Path, notes: &str) -> Result<PathBuf> {
    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let path = run_dir.join(CONTENTS_FILE);
    std::fs::write(&path, render_table_of_contents(notes, &generated_at))?;
    Ok(path)
}
