use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::reconcile::ReconciledItem;
use crate::types::{LocalCommit, TrackedIssue, WorkItem};
use crate::window::ActivityWindow;

/// Everything one run collected, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySnapshot {
    pub window: ActivityWindow,
    /// Display name used in the title and subject.
    pub author: String,
    /// All in-window merge requests that were not dropped as unattributable.
    pub work_items: Vec<WorkItem>,
    pub reconciled: Vec<ReconciledItem>,
    pub issues: BTreeMap<String, TrackedIssue>,
    pub local_commits: Vec<LocalCommit>,
    /// Sources that degraded to empty, one line each.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ActivitySnapshot {
    pub fn empty(window: ActivityWindow, author: impl Into<String>) -> Self {
        Self {
            window,
            author: author.into(),
            work_items: Vec::new(),
            reconciled: Vec::new(),
            issues: BTreeMap::new(),
            local_commits: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Commit counts per local repository, zero-count repositories omitted.
    pub fn commits_per_repo(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.local_commits {
            *counts.entry(c.repo.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Tracked issues mentioned by `item`, in mention order.
    pub fn issues_for<'a>(&'a self, item: &'a ReconciledItem) -> impl Iterator<Item = &'a TrackedIssue> {
        item.issue_keys.iter().filter_map(|k| self.issues.get(k))
    }

    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn local(repo: &str, sha: &str) -> LocalCommit {
        LocalCommit {
            repo: repo.into(),
            sha: sha.into(),
            author_email: "jdoe@example.com".into(),
            authored_at: Utc.with_ymd_and_hms(2026, 2, 17, 10, 0, 0).unwrap(),
            subject: "work".into(),
        }
    }

    #[test]
    fn commits_per_repo_counts_and_sorts() {
        let window = ActivityWindow::parse("2026-02-16", "2026-02-20").unwrap();
        let mut snap = ActivitySnapshot::empty(window, "Jane");
        snap.local_commits = vec![local("web", "1"), local("api", "2"), local("web", "3")];
        let counts: Vec<_> = snap.commits_per_repo().into_iter().collect();
        assert_eq!(counts, vec![("api", 1), ("web", 2)]);
        assert!(!snap.is_partial());
    }
}
