use std::path::PathBuf;

/// All well-known paths directly under the store root.
#[derive(Debug, Clone)]
pub struct RecapPaths {
    pub root: PathBuf,
    pub drafts_dir: PathBuf,
    pub config_json: PathBuf,
    pub thread_json: PathBuf,
    pub preview_html: PathBuf,
    pub templates_dir: PathBuf,
}

impl RecapPaths {
    /// Derive all paths from the store root. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            drafts_dir: root.join("drafts"),
            config_json: root.join("config.json"),
            thread_json: root.join("thread.json"),
            preview_html: root.join("preview.html"),
            templates_dir: root.join("templates"),
            root,
        }
    }

    /// Create the directories recap writes into. Idempotent.
    pub fn ensure_layout(&self) -> anyhow::Result<()> {
        for dir in [&self.root, &self.drafts_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.drafts_dir.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_builds_correct_paths() {
        let p = RecapPaths::discover("/tmp/home/.recap");
        assert_eq!(p.root, PathBuf::from("/tmp/home/.recap"));
        assert_eq!(p.drafts_dir, PathBuf::from("/tmp/home/.recap/drafts"));
        assert_eq!(p.config_json, PathBuf::from("/tmp/home/.recap/config.json"));
        assert_eq!(p.thread_json, PathBuf::from("/tmp/home/.recap/thread.json"));
        assert_eq!(
            p.preview_html,
            PathBuf::from("/tmp/home/.recap/preview.html")
        );
        assert_eq!(p.templates_dir, PathBuf::from("/tmp/home/.recap/templates"));
    }

    #[test]
    fn store_root_is_not_nested() {
        let p = RecapPaths::discover("/data/recap");
        assert_eq!(p.config_json.parent(), Some(p.root.as_path()));
        assert!(p.root.components().all(|c| c.as_os_str() != ".recap"));
    }

    #[test]
    fn ensure_layout_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let p = RecapPaths::discover(tmp.path().join("store"));
        assert!(!p.is_initialized());
        p.ensure_layout().unwrap();
        p.ensure_layout().unwrap();
        assert!(p.is_initialized());
        assert!(p.drafts_dir.is_dir());
    }
}
