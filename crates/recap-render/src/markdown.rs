use std::str::FromStr;

use recap_core::{
    ActivitySnapshot, IssueCategory, MrState, ReconciledItem, TrackedIssue, WorkItem,
};

/// How the "Completed this period" section is grouped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Granularity {
    /// One entry per merge request with its commits nested underneath.
    #[default]
    WorkItem,
    /// A flat list of attributed commits.
    Commit,
    /// Entries grouped by the tracker category of their issues.
    Category,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkItem => "work-item",
            Self::Commit => "commit",
            Self::Category => "category",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown granularity `{0}` (expected work-item, commit or category)")]
pub struct UnknownGranularity(String);

impl FromStr for Granularity {
    type Err = UnknownGranularity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work-item" | "workitem" | "item" => Ok(Self::WorkItem),
            "commit" => Ok(Self::Commit),
            "category" => Ok(Self::Category),
            _ => Err(UnknownGranularity(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub granularity: Granularity,
}

/// Render a snapshot as a Markdown draft.
///
/// Output depends only on the snapshot and options, so equal inputs give
/// byte-identical drafts.
pub fn render_markdown(snap: &ActivitySnapshot, opts: &RenderOptions) -> String {
    let mut out = String::new();
    out.push_str(&snap.window.marker_comment());
    out.push('\n');
    out.push_str(&format!(
        "# Weekly Report: {} ({})\n\n",
        escape(&snap.author),
        snap.window.dotted()
    ));

    if snap.is_partial() {
        out.push_str("> **Partial report:** some sources were unavailable.\n");
        for w in &snap.warnings {
            out.push_str(&format!("> - {}\n", escape(w)));
        }
        out.push('\n');
    }

    out.push_str("## Completed this period\n\n");
    if snap.reconciled.is_empty() {
        out.push_str("_No completed work recorded._\n\n");
    } else {
        match opts.granularity {
            Granularity::WorkItem => render_items(&mut out, snap),
            Granularity::Commit => render_commits(&mut out, snap),
            Granularity::Category => render_categories(&mut out, snap),
        }
    }

    render_mr_table(&mut out, snap);
    render_repo_table(&mut out, snap);

    out.push_str("## Next week\n\n- _TBD_\n");
    out
}

// ── Completed work ──

fn item_line(r: &ReconciledItem) -> String {
    let mut line = format!(
        "**{}** ([{}]({})): {}",
        escape(&r.item.title),
        escape(&r.item.reference),
        r.item.web_url,
        r.stage
    );
    if r.is_hotfix {
        line.push_str(&format!(" (hotfix to `{}`)", r.item.target_branch));
    }
    line
}

fn issue_line(issue: &TrackedIssue) -> String {
    format!(
        "{} {} [{}]",
        issue.key,
        escape(&issue.summary),
        escape(&issue.status)
    )
}

fn render_item(out: &mut String, snap: &ActivitySnapshot, r: &ReconciledItem) {
    out.push_str(&format!("- {}\n", item_line(r)));
    for issue in snap.issues_for(r) {
        out.push_str(&format!("  - {}\n", issue_line(issue)));
    }
    for c in &r.commits {
        out.push_str(&format!("  - `{}` {}\n", c.short_sha, escape(&c.message)));
    }
}

fn render_items(out: &mut String, snap: &ActivitySnapshot) {
    for r in &snap.reconciled {
        render_item(out, snap, r);
    }
    out.push('\n');
}

fn render_commits(out: &mut String, snap: &ActivitySnapshot) {
    for r in &snap.reconciled {
        for c in &r.commits {
            out.push_str(&format!(
                "- `{}` {} ({}, {})\n",
                c.short_sha,
                escape(&c.message),
                escape(&r.item.reference),
                r.stage
            ));
        }
    }
    out.push('\n');
}

/// Defect wins over feature when an item mentions both.
fn category_of(snap: &ActivitySnapshot, r: &ReconciledItem) -> Option<IssueCategory> {
    snap.issues_for(r).map(|i| i.category).max()
}

fn render_categories(out: &mut String, snap: &ActivitySnapshot) {
    let groups = [
        ("Features", Some(IssueCategory::Feature)),
        ("Defects", Some(IssueCategory::Defect)),
        ("Other work", None),
    ];
    for (heading, category) in groups {
        let members: Vec<&ReconciledItem> = snap
            .reconciled
            .iter()
            .filter(|r| category_of(snap, r) == category)
            .collect();
        if members.is_empty() {
            continue;
        }
        out.push_str(&format!("### {heading}\n\n"));
        for r in members {
            render_item(out, snap, r);
        }
        out.push('\n');
    }
}

// ── Tables ──

fn status_cell(item: &WorkItem) -> String {
    let emoji = match item.state {
        MrState::Merged => "✅",
        MrState::Opened => "🔵",
        MrState::Closed => "🔴",
        MrState::Locked => "⬜",
    };
    let draft = if item.draft { " (draft)" } else { "" };
    format!("{emoji} {}{draft}", item.state.as_str())
}

fn render_mr_table(out: &mut String, snap: &ActivitySnapshot) {
    out.push_str("## Merge requests\n\n");
    if snap.work_items.is_empty() {
        out.push_str("_No merge requests in this period._\n\n");
        return;
    }
    out.push_str("| Status | Merge request | Title | Branches | Stage |\n");
    out.push_str("|---|---|---|---|---|\n");
    for item in &snap.work_items {
        let stage = snap
            .reconciled
            .iter()
            .find(|r| r.item.id == item.id)
            .map_or("branch promotion", |r| r.stage.label());
        out.push_str(&format!(
            "| {} | [{}]({}) | {} | `{}` → `{}` | {} |\n",
            status_cell(item),
            escape(&item.reference),
            item.web_url,
            escape(&item.title),
            item.source_branch,
            item.target_branch,
            stage
        ));
    }
    out.push('\n');
}

fn render_repo_table(out: &mut String, snap: &ActivitySnapshot) {
    let counts = snap.commits_per_repo();
    if counts.is_empty() {
        return;
    }
    out.push_str("## Local commits\n\n");
    out.push_str("| Repository | Commits |\n");
    out.push_str("|---|---|\n");
    for (repo, n) in counts {
        out.push_str(&format!("| {} | {n} |\n", escape(repo)));
    }
    out.push('\n');
}

/// Backslash-escape Markdown punctuation that would change inline rendering.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '*' | '_' | '[' | ']' | '<' | '>' | '|' | '`') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use recap_core::{
        ActivityWindow, CommitRecord, DeliveryStage, LocalCommit, WorkItemRef,
    };

    fn work_item(iid: u64, title: &str, state: MrState, source: &str, target: &str) -> WorkItem {
        let at = Utc.with_ymd_and_hms(2026, 2, 18, 15, 0, 0).unwrap();
        WorkItem {
            id: WorkItemRef { project_id: 7, iid },
            reference: format!("hcm/app!{iid}"),
            web_url: format!("https://git.example.com/hcm/app/-/merge_requests/{iid}"),
            title: title.into(),
            description: String::new(),
            state,
            draft: false,
            source_branch: source.into(),
            target_branch: target.into(),
            created_at: at,
            updated_at: at,
            merged_at: (state == MrState::Merged).then_some(at),
            merge_commit_sha: None,
        }
    }

    fn reconciled(item: WorkItem, stage: DeliveryStage, keys: &[&str]) -> ReconciledItem {
        let commit = CommitRecord {
            work_item: item.id.clone(),
            short_sha: format!("{:08}", item.id.iid),
            message: item.title.clone(),
            author_name: "Jane".into(),
        };
        ReconciledItem {
            is_hotfix: item.target_branch != "main",
            item,
            commits: vec![commit],
            stage,
            issue_keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn issue(key: &str, category: IssueCategory) -> TrackedIssue {
        TrackedIssue {
            key: key.into(),
            summary: format!("summary {key}"),
            category,
            status: "Done".into(),
        }
    }

    fn snapshot() -> ActivitySnapshot {
        let window = ActivityWindow::parse("2026-02-16", "2026-02-20").unwrap();
        let mut snap = ActivitySnapshot::empty(window, "Jane Doe");
        let fix = work_item(1, "HCM-50624 fix default applicant", MrState::Merged, "feature/HCM-50624", "main");
        let bug = work_item(3, "HCMBUGS-16852 crash on save", MrState::Opened, "bugfix/crash", "main");
        let promo = work_item(2, "Release 2.3", MrState::Merged, "release", "main");
        snap.work_items = vec![fix.clone(), promo, bug.clone()];
        snap.reconciled = vec![
            reconciled(fix, DeliveryStage::Released, &["HCM-50624"]),
            reconciled(bug, DeliveryStage::InDevelopment, &["HCMBUGS-16852"]),
        ];
        for i in [
            issue("HCM-50624", IssueCategory::Feature),
            issue("HCMBUGS-16852", IssueCategory::Defect),
        ] {
            snap.issues.insert(i.key.clone(), i);
        }
        snap
    }

    #[test]
    fn released_item_line_mentions_its_key() {
        let md = render_markdown(&snapshot(), &RenderOptions::default());
        let line = md
            .lines()
            .find(|l| l.starts_with("- ") && l.contains("HCM-50624"))
            .unwrap();
        assert!(line.contains("released"), "{line}");
        assert!(md.starts_with("<!-- recap:window 2026-02-16..2026-02-20 -->\n"));
    }

    #[test]
    fn rendering_twice_is_byte_identical() {
        let snap = snapshot();
        for g in [Granularity::WorkItem, Granularity::Commit, Granularity::Category] {
            let opts = RenderOptions { granularity: g };
            assert_eq!(render_markdown(&snap, &opts), render_markdown(&snap, &opts));
        }
    }

    #[test]
    fn table_lists_promotions_with_status_emoji() {
        let md = render_markdown(&snapshot(), &RenderOptions::default());
        assert!(md.contains("| ✅ merged | [hcm/app!2]"));
        assert!(md.contains("| branch promotion |"));
        assert!(md.contains("| 🔵 opened | [hcm/app!3]"));
    }

    #[test]
    fn category_mode_groups_by_tracker_type() {
        let opts = RenderOptions {
            granularity: Granularity::Category,
        };
        let md = render_markdown(&snapshot(), &opts);
        let features = md.find("### Features").unwrap();
        let defects = md.find("### Defects").unwrap();
        assert!(features < defects);
        assert!(!md.contains("### Other work"));
        assert!(md[defects..].contains("HCMBUGS-16852"));
    }

    #[test]
    fn commit_mode_lists_each_commit_once() {
        let opts = RenderOptions {
            granularity: Granularity::Commit,
        };
        let md = render_markdown(&snapshot(), &opts);
        assert!(md.contains("- `00000001` HCM-50624 fix default applicant (hcm/app!1, released)"));
    }

    #[test]
    fn repo_table_only_with_local_commits() {
        let mut snap = snapshot();
        let md = render_markdown(&snap, &RenderOptions::default());
        assert!(!md.contains("## Local commits"));

        snap.local_commits.push(LocalCommit {
            repo: "app".into(),
            sha: "abc".into(),
            author_email: "jdoe@example.com".into(),
            authored_at: Utc.with_ymd_and_hms(2026, 2, 17, 10, 0, 0).unwrap(),
            subject: "work".into(),
        });
        let md = render_markdown(&snap, &RenderOptions::default());
        assert!(md.contains("| app | 1 |"));
        assert!(md.trim_end().ends_with("- _TBD_"));
    }

    #[test]
    fn partial_snapshot_is_flagged() {
        let mut snap = snapshot();
        snap.warnings.push("issue tracker unavailable: timeout".into());
        let md = render_markdown(&snap, &RenderOptions::default());
        assert!(md.contains("> **Partial report:**"));
    }

    #[test]
    fn titles_are_escaped() {
        assert_eq!(escape("a|b *c* [d]"), "a\\|b \\*c\\* \\[d\\]");
    }

    #[test]
    fn granularity_parses_names() {
        assert_eq!("commit".parse::<Granularity>(), Ok(Granularity::Commit));
        assert_eq!("Work-Item".parse::<Granularity>(), Ok(Granularity::WorkItem));
        assert!("weekly".parse::<Granularity>().is_err());
    }
}
