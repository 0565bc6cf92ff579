//! One pass over the sources for a window: list merge requests, reconcile
//! each against its commits and branches, read local clones, then resolve
//! every issue key with a single tracker query.
//!
//! A failing source is logged, noted in [`ActivitySnapshot::warnings`] and
//! treated as empty. Calls are awaited one at a time.

use std::collections::BTreeMap;

use recap_core::keys::KeySet;
use recap_core::reconcile::{in_window, is_branch_promotion, reconcile_item};
use recap_core::{
    ActivitySnapshot, ActivityWindow, BranchPolicy, CodeHost, Identity, IssueTracker,
    LocalHistory, ReconciledItem, WorkItem,
};

/// What to collect and for whom.
#[derive(Debug, Clone)]
pub struct CollectRequest {
    pub window: ActivityWindow,
    pub identity: Identity,
    /// Display name for the report title.
    pub author: String,
    pub policy: BranchPolicy,
}

/// The sources of one run. Tracker and local history are optional.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub host: &'a dyn CodeHost,
    pub tracker: Option<&'a dyn IssueTracker>,
    pub local: Option<&'a dyn LocalHistory>,
}

pub async fn collect(sources: Sources<'_>, req: &CollectRequest) -> ActivitySnapshot {
    let mut snap = ActivitySnapshot::empty(req.window, req.author.clone());

    let listed = match sources
        .host
        .merge_requests(&req.identity.username, req.window.start_utc())
        .await
    {
        Ok(items) => items,
        Err(e) => {
            degrade(&mut snap, format!("merge requests unavailable: {e}"));
            Vec::new()
        }
    };
    let mut items: Vec<WorkItem> = listed
        .into_iter()
        .filter(|w| in_window(w, &req.window))
        .collect();
    items.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    tracing::info!(count = items.len(), "merge requests in window");

    for item in items {
        if is_branch_promotion(&item, &req.policy) {
            tracing::debug!(reference = %item.reference, "branch promotion, not reconciled");
            snap.work_items.push(item);
            continue;
        }
        if let Some(reconciled) = reconcile(sources.host, item, req, &mut snap).await {
            snap.work_items.push(reconciled.item.clone());
            snap.reconciled.push(reconciled);
        }
    }

    if let Some(local) = sources.local {
        match local
            .commits(sources.host.host(), &req.window, &req.identity)
            .await
        {
            Ok(commits) => snap.local_commits = commits,
            Err(e) => degrade(&mut snap, format!("local git history unavailable: {e}")),
        }
    }

    let mut keys = KeySet::new();
    for r in &snap.reconciled {
        for k in &r.issue_keys {
            keys.scan(k);
        }
    }
    for c in &snap.local_commits {
        keys.scan(&c.subject);
    }
    snap.issues = lookup_issues(sources.tracker, keys, &mut snap.warnings).await;
    snap
}

async fn reconcile(
    host: &dyn CodeHost,
    item: WorkItem,
    req: &CollectRequest,
    snap: &mut ActivitySnapshot,
) -> Option<ReconciledItem> {
    let commits = match host.merge_request_commits(&item).await {
        Ok(c) => c,
        Err(e) => {
            degrade(snap, format!("commits of {} unavailable, item dropped: {e}", item.reference));
            return None;
        }
    };

    let mut containing = Vec::new();
    if let (true, Some(sha)) = (item.is_merged(), item.merge_commit_sha.as_deref()) {
        match host.branches_containing(item.id.project_id, sha).await {
            Ok(branches) => containing = branches,
            Err(e) => degrade(
                snap,
                format!(
                    "branches of {} unavailable, stage inferred from target branch: {e}",
                    item.reference
                ),
            ),
        }
    }

    let reference = item.reference.clone();
    let out = reconcile_item(item, &commits, &containing, &req.policy, &req.identity);
    if out.is_none() {
        tracing::debug!(%reference, "no attributable commits, dropped");
    }
    out
}

async fn lookup_issues(
    tracker: Option<&dyn IssueTracker>,
    keys: KeySet,
    warnings: &mut Vec<String>,
) -> BTreeMap<String, recap_core::TrackedIssue> {
    let Some(tracker) = tracker else {
        return BTreeMap::new();
    };
    if keys.is_empty() {
        tracing::debug!("no issue keys, tracker not queried");
        return BTreeMap::new();
    }
    match tracker.issues_by_keys(keys.as_set()).await {
        Ok(found) => found.into_iter().map(|i| (i.key.clone(), i)).collect(),
        Err(e) => {
            let msg = format!("issue tracker unavailable: {e}");
            tracing::warn!("{msg}");
            warnings.push(msg);
            BTreeMap::new()
        }
    }
}

fn degrade(snap: &mut ActivitySnapshot, msg: String) {
    tracing::warn!("{msg}");
    snap.warnings.push(msg);
}
