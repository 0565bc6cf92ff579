use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Merge request lifecycle as reported by the code host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MrState {
    Opened,
    Closed,
    Merged,
    Locked,
}

impl MrState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "opened" | "open" => Some(Self::Opened),
            "closed" => Some(Self::Closed),
            "merged" => Some(Self::Merged),
            "locked" => Some(Self::Locked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Merged => "merged",
            Self::Locked => "locked",
        }
    }
}

/// Stable handle back to a merge request on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkItemRef {
    pub project_id: u64,
    pub iid: u64,
}

/// A merge request, projected down to what the report needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkItemRef,
    /// Human reference such as `group/app!42`.
    pub reference: String,
    pub web_url: String,
    pub title: String,
    pub description: String,
    pub state: MrState,
    pub draft: bool,
    pub source_branch: String,
    pub target_branch: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
    pub merge_commit_sha: Option<String>,
}

impl WorkItem {
    pub fn is_merged(&self) -> bool {
        self.state == MrState::Merged
    }

    /// Timestamp used to order items in the report: merge time, else creation.
    pub fn sort_key(&self) -> (DateTime<Utc>, &WorkItemRef) {
        (self.merged_at.unwrap_or(self.created_at), &self.id)
    }
}

/// A commit exactly as the host lists it for a merge request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCommit {
    pub sha: String,
    pub title: String,
    pub author_name: String,
    pub author_email: String,
}

/// A commit attributed to the configured identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub work_item: WorkItemRef,
    pub short_sha: String,
    /// First line of the commit message.
    pub message: String,
    pub author_name: String,
}

/// A commit read from a local clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCommit {
    pub repo: String,
    pub sha: String,
    pub author_email: String,
    pub authored_at: DateTime<Utc>,
    pub subject: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Feature,
    Defect,
}

impl IssueCategory {
    /// Anything whose tracker type mentions "bug" is a defect.
    pub fn from_type_name(type_name: &str) -> Self {
        if type_name.to_lowercase().contains("bug") {
            Self::Defect
        } else {
            Self::Feature
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedIssue {
    pub key: String,
    pub summary: String,
    pub category: IssueCategory,
    pub status: String,
}

/// Inferred deployment progress of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStage {
    InDevelopment,
    InTesting,
    InStagedRollout,
    Released,
}

impl DeliveryStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::InDevelopment => "in development",
            Self::InTesting => "in testing",
            Self::InStagedRollout => "in staged rollout",
            Self::Released => "released",
        }
    }
}

impl std::fmt::Display for DeliveryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
