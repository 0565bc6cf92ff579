use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, ValueEnum};
use recap_collect::{collect, CollectRequest, Sources};
use recap_core::{ActivitySnapshot, ActivityWindow, IssueTracker, LocalHistory};
use recap_git::GitHistory;
use recap_gitlab::GitlabClient;
use recap_jira::JiraClient;
use recap_render::{render_markdown, Granularity, RenderOptions};
use recap_store::{DraftStore, RecapPaths};

use crate::settings::Settings;

// ── CLI Schema ──

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Preset {
    /// Monday to Friday of the current week
    ThisWeek,
    /// Monday to Friday of the previous week
    LastWeek,
}

#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// First day of the window (YYYY-MM-DD)
    #[arg(long, requires = "to", conflicts_with = "preset")]
    pub from: Option<String>,
    /// Last day of the window (YYYY-MM-DD)
    #[arg(long, requires = "from", conflicts_with = "preset")]
    pub to: Option<String>,
    /// Named window; defaults to this-week
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,
}

impl WindowArgs {
    pub fn resolve(&self, today: NaiveDate) -> anyhow::Result<ActivityWindow> {
        match (&self.from, &self.to) {
            (Some(from), Some(to)) => Ok(ActivityWindow::parse(from, to)?),
            _ => Ok(match self.preset.unwrap_or(Preset::ThisWeek) {
                Preset::ThisWeek => ActivityWindow::this_week(today),
                Preset::LastWeek => ActivityWindow::last_week(today),
            }),
        }
    }
}

// ── Command Implementations ──

/// Gather activity for `window` from every configured source.
pub async fn gather(settings: &Settings, window: ActivityWindow) -> anyhow::Result<ActivitySnapshot> {
    let host_cfg = settings.code_host()?;
    let host = GitlabClient::new(host_cfg.url, host_cfg.token)
        .context("cannot set up the code host client")?;

    let tracker = match settings.tracker() {
        Some(t) => Some(
            JiraClient::new(t.url, t.username, t.password)
                .context("cannot set up the issue tracker client")?,
        ),
        None => {
            tracing::info!("issue tracker not configured, skipping issue lookups");
            None
        }
    };
    let local = (!settings.git_repo_roots.is_empty())
        .then(|| GitHistory::new(settings.git_repo_roots.clone()));

    let sources = Sources {
        host: &host,
        tracker: tracker.as_ref().map(|t| t as &dyn IssueTracker),
        local: local.as_ref().map(|l| l as &dyn LocalHistory),
    };
    let request = CollectRequest {
        window,
        identity: settings.identity(),
        author: settings.author(),
        policy: settings.policy.clone(),
    };
    Ok(collect(sources, &request).await)
}

/// `recap draft`: collect, render and store the Markdown draft.
pub fn execute(
    paths: &RecapPaths,
    settings: &Settings,
    window: &WindowArgs,
    granularity: Option<Granularity>,
) -> anyhow::Result<PathBuf> {
    let window = window.resolve(chrono::Local::now().date_naive())?;
    // Fail on missing settings before a runtime or client exists.
    settings.code_host()?;
    paths.ensure_layout()?;

    let snap = tokio::runtime::Runtime::new()?.block_on(gather(settings, window))?;
    let opts = RenderOptions {
        granularity: granularity.unwrap_or(settings.granularity),
    };
    let markdown = render_markdown(&snap, &opts);
    let path = DraftStore::new(paths).save(&window, &markdown)?;

    println!(
        "Draft for {} written to {}",
        window.marker(),
        path.display()
    );
    println!(
        "  {} merge request(s), {} reconciled, {} issue(s), {} local commit(s)",
        snap.work_items.len(),
        snap.reconciled.len(),
        snap.issues.len(),
        snap.local_commits.len()
    );
    for w in &snap.warnings {
        eprintln!("  warning: {w}");
    }
    Ok(path)
}
