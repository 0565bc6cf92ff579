pub mod drafts;
pub mod paths;
pub mod thread;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use drafts::{Draft, DraftStore};
pub use paths::RecapPaths;
pub use thread::ThreadState;

/// Return the per-user store root.
/// `RECAP_HOME` wins; otherwise `<data dir>/recap`, falling back to `~/.recap`.
pub fn store_root() -> PathBuf {
    if let Some(home) = std::env::var_os("RECAP_HOME").filter(|v| !v.is_empty()) {
        PathBuf::from(home)
    } else if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("recap")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".recap")
    } else {
        PathBuf::from(".recap-store")
    }
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_root_is_not_empty() {
        let root = store_root();
        assert!(!root.as_os_str().is_empty());
    }

    #[test]
    fn write_atomic_creates_parents_and_replaces() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("state.json");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }
}
