use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use recap_core::window::{parse_date, DATE_FORMAT};
use recap_core::ActivityWindow;

use crate::paths::RecapPaths;
use crate::write_atomic;

/// A report draft loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub path: PathBuf,
    pub markdown: String,
    pub window: ActivityWindow,
}

/// Dated Markdown drafts, one file per window end date.
#[derive(Debug, Clone)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    pub fn new(paths: &RecapPaths) -> Self {
        Self {
            dir: paths.drafts_dir.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<drafts>/<to>.md`
    pub fn path_for(&self, window: &ActivityWindow) -> PathBuf {
        self.dir
            .join(format!("{}.md", window.to.format(DATE_FORMAT)))
    }

    /// Write (or overwrite) the draft for `window`.
    pub fn save(&self, window: &ActivityWindow, markdown: &str) -> anyhow::Result<PathBuf> {
        let path = self.path_for(window);
        write_atomic(&path, markdown.as_bytes())?;
        tracing::info!(path = %path.display(), "draft saved");
        Ok(path)
    }

    /// Draft files, newest first. The `YYYY-MM-DD` naming makes the
    /// lexicographic order chronological.
    pub fn list(&self) -> anyhow::Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
        Ok(files)
    }

    pub fn latest(&self) -> anyhow::Result<Option<Draft>> {
        match self.list()?.into_iter().next() {
            Some(path) => Ok(Some(load(&path)?)),
            None => Ok(None),
        }
    }
}

/// Read a draft, recovering its window from the marker comment or, for
/// hand-written drafts, from the filename (Monday..Friday ending that day).
pub fn load(path: &Path) -> anyhow::Result<Draft> {
    let markdown = fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read draft {}: {e}", path.display()))?;
    let window = match ActivityWindow::find_marker_comment(&markdown) {
        Some(w) => w,
        None => window_from_filename(path)?,
    };
    Ok(Draft {
        path: path.to_path_buf(),
        markdown,
        window,
    })
}

fn window_from_filename(path: &Path) -> anyhow::Result<ActivityWindow> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow::anyhow!("draft {} has no usable name", path.display()))?;
    let to = parse_date(stem)?;
    Ok(ActivityWindow::new(to - Duration::days(4), to)?)
}
