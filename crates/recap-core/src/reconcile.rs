//! Rules that decide which merge requests and commits belong in a report and
//! how far each merged item has travelled.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::branches::BranchPolicy;
use crate::keys::keys_in_all;
use crate::types::{CommitRecord, DeliveryStage, MrState, RawCommit, WorkItem};
use crate::window::ActivityWindow;

static MERGE_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Merge (remote-tracking )?branch ").unwrap());

/// The person the report is about.
///
/// Commits are attributed by comparing the local part of the author email
/// against [`Identity::local_part`]. Someone whose commit email differs from
/// their host login (e.g. `jdoe@corp` vs login `john.doe`) without a
/// configured email will silently lose commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(username: impl Into<String>, email: Option<String>) -> Self {
        Self {
            username: username.into(),
            email: email.filter(|e| !e.trim().is_empty()),
        }
    }

    pub fn local_part(&self) -> &str {
        match &self.email {
            Some(email) => email_local_part(email),
            None => &self.username,
        }
    }

    pub fn is_author(&self, author_email: &str) -> bool {
        email_local_part(author_email).eq_ignore_ascii_case(self.local_part())
    }
}

pub fn email_local_part(email: &str) -> &str {
    let email = email.trim();
    email.split_once('@').map_or(email, |(local, _)| local)
}

/// `Merge branch 'x' into y` and `Merge remote-tracking branch ...`.
pub fn is_merge_noise(message: &str) -> bool {
    MERGE_NOISE.is_match(first_line(message))
}

pub fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or("").trim_end()
}

/// Keep items touched inside the window; abandoned (closed) items never count.
pub fn in_window(item: &WorkItem, window: &ActivityWindow) -> bool {
    if item.state == MrState::Closed {
        return false;
    }
    window.contains(item.created_at)
        || item.merged_at.is_some_and(|t| window.contains(t))
        || window.contains(item.updated_at)
}

/// Both ends long-lived: a promotion such as `release -> main`.
pub fn is_branch_promotion(item: &WorkItem, policy: &BranchPolicy) -> bool {
    policy.is_long_lived(&item.source_branch) && policy.is_long_lived(&item.target_branch)
}

/// Targeting anything but an integration branch bypasses the normal flow.
pub fn is_hotfix(item: &WorkItem, policy: &BranchPolicy) -> bool {
    !policy.is_integration(&item.target_branch)
}

/// Stage from lifecycle plus the branches that contain the merge commit.
pub fn delivery_stage(
    item: &WorkItem,
    containing_branches: &[String],
    policy: &BranchPolicy,
) -> DeliveryStage {
    if !item.is_merged() {
        return DeliveryStage::InDevelopment;
    }
    let tier = policy
        .highest_tier(containing_branches.iter().map(String::as_str))
        .or_else(|| policy.tier_of(&item.target_branch));
    tier.map_or(DeliveryStage::InDevelopment, |t| t.stage())
}

/// Commits on `item` written by `identity`, minus merge noise.
pub fn attributable_commits(
    item: &WorkItem,
    commits: &[RawCommit],
    identity: &Identity,
) -> Vec<CommitRecord> {
    commits
        .iter()
        .filter(|c| identity.is_author(&c.author_email))
        .filter(|c| !is_merge_noise(&c.title))
        .map(|c| CommitRecord {
            work_item: item.id.clone(),
            short_sha: c.sha.chars().take(8).collect(),
            message: first_line(&c.title).to_string(),
            author_name: c.author_name.clone(),
        })
        .collect()
}

/// A work item that survived reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledItem {
    pub item: WorkItem,
    pub commits: Vec<CommitRecord>,
    pub stage: DeliveryStage,
    pub is_hotfix: bool,
    /// Issue keys from the title, both branches, description and kept commits.
    pub issue_keys: Vec<String>,
}

/// Combine an item with its fetched commits and branch membership.
///
/// Returns `None` when nothing on the item is attributable to `identity`.
pub fn reconcile_item(
    item: WorkItem,
    commits: &[RawCommit],
    containing_branches: &[String],
    policy: &BranchPolicy,
    identity: &Identity,
) -> Option<ReconciledItem> {
    let kept = attributable_commits(&item, commits, identity);
    if kept.is_empty() {
        return None;
    }
    let stage = delivery_stage(&item, containing_branches, policy);
    let is_hotfix = is_hotfix(&item, policy);
    let issue_keys = keys_in_all(
        [
            item.title.as_str(),
            item.source_branch.as_str(),
            item.target_branch.as_str(),
            item.description.as_str(),
        ]
        .into_iter()
        .chain(kept.iter().map(|c| c.message.as_str())),
    );
    Some(ReconciledItem {
        item,
        commits: kept,
        stage,
        is_hotfix,
        issue_keys,
    })
}
