use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::{LocalHistoryError, RemoteError};
use crate::reconcile::Identity;
use crate::types::{LocalCommit, RawCommit, TrackedIssue, WorkItem};
use crate::window::ActivityWindow;

/// Code-hosting service holding the merge requests.
#[async_trait::async_trait]
pub trait CodeHost: Send + Sync {
    /// Host name, compared against local clones' `origin` URLs.
    fn host(&self) -> &str;

    /// Merge requests by `author` updated at or after `updated_after`.
    async fn merge_requests(
        &self,
        author: &str,
        updated_after: DateTime<Utc>,
    ) -> Result<Vec<WorkItem>, RemoteError>;

    async fn merge_request_commits(&self, item: &WorkItem) -> Result<Vec<RawCommit>, RemoteError>;

    /// Names of the branches that contain `sha`.
    async fn branches_containing(
        &self,
        project_id: u64,
        sha: &str,
    ) -> Result<Vec<String>, RemoteError>;
}

/// Issue tracker holding the records referenced by keys like `HCM-123`.
#[async_trait::async_trait]
pub trait IssueTracker: Send + Sync {
    async fn issues_by_keys(
        &self,
        keys: &BTreeSet<String>,
    ) -> Result<Vec<TrackedIssue>, RemoteError>;
}

/// Commit history of local clones that track the code host.
#[async_trait::async_trait]
pub trait LocalHistory: Send + Sync {
    async fn commits(
        &self,
        host: &str,
        window: &ActivityWindow,
        identity: &Identity,
    ) -> Result<Vec<LocalCommit>, LocalHistoryError>;
}
