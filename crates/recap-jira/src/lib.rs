//! Jira REST client: cookie session login, then one JQL search per run.

use std::collections::BTreeSet;
use std::time::Duration;

use recap_core::{IssueCategory, IssueTracker, RemoteError, TrackedIssue};
use serde::Deserialize;

const SERVICE: &str = "jira";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const FIELDS: &str = "summary,issuetype,status";
/// Jira caps `maxResults` server side; larger key sets are paged.
const PAGE_SIZE: usize = 100;

// ── Wire types ──

#[derive(Debug, Deserialize)]
struct SessionResponse {
    session: SessionInfo,
}

#[derive(Debug, Deserialize)]
struct SessionInfo {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, rename = "startAt")]
    start_at: usize,
    #[serde(default)]
    total: usize,
    #[serde(default)]
    issues: Vec<ApiIssue>,
}

impl SearchResponse {
    /// `startAt` of the following page, or `None` once every match is in.
    fn next_start(&self) -> Option<usize> {
        let next = self.start_at + self.issues.len();
        (!self.issues.is_empty() && next < self.total).then_some(next)
    }
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    key: String,
    fields: ApiFields,
}

#[derive(Debug, Deserialize)]
struct ApiFields {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    issuetype: Option<Named>,
    #[serde(default)]
    status: Option<Named>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

impl From<ApiIssue> for TrackedIssue {
    fn from(issue: ApiIssue) -> Self {
        let type_name = issue.fields.issuetype.map(|t| t.name).unwrap_or_default();
        TrackedIssue {
            key: issue.key,
            summary: issue.fields.summary,
            category: IssueCategory::from_type_name(&type_name),
            status: issue.fields.status.map(|s| s.name).unwrap_or_default(),
        }
    }
}

/// `key in (HCM-1, OPS-2)`. Keys come from the issue-key pattern, so they
/// never need quoting.
pub fn key_query(keys: &BTreeSet<String>) -> String {
    let list: Vec<&str> = keys.iter().map(String::as_str).collect();
    format!("key in ({})", list.join(", "))
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        service: SERVICE,
        message: e.to_string(),
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::status(SERVICE, status.as_u16(), body))
}

// ── Client ──

pub struct JiraClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl JiraClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self, RemoteError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| RemoteError::Transport {
            service: SERVICE,
            message: format!("invalid base URL `{base_url}`: {e}"),
        })?;
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            base_url,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Open a session and return the `Cookie` header value for it.
    async fn login(&self) -> Result<String, RemoteError> {
        let url = format!("{}/rest/auth/1/session", self.base_url);
        let body = serde_json::json!({
            "username": self.username,
            "password": self.password,
        });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let session: SessionResponse = check(resp).await?.json().await.map_err(|e| {
            RemoteError::Decode {
                service: SERVICE,
                message: e.to_string(),
            }
        })?;
        tracing::debug!("jira session opened");
        Ok(format!("{}={}", session.session.name, session.session.value))
    }

    async fn search_page(
        &self,
        cookie: &str,
        jql: &str,
        start_at: usize,
        max: usize,
    ) -> Result<SearchResponse, RemoteError> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::COOKIE, cookie)
            .query(&[
                ("jql", jql.to_string()),
                ("fields", FIELDS.to_string()),
                ("startAt", start_at.to_string()),
                ("maxResults", max.to_string()),
                // Unknown keys become warnings instead of failing the whole query.
                ("validateQuery", "warn".to_string()),
            ])
            .send()
            .await
            .map_err(transport)?;
        check(resp).await?.json().await.map_err(|e| RemoteError::Decode {
            service: SERVICE,
            message: e.to_string(),
        })
    }

    /// Every issue matching `jql`, following `startAt` until `total` is reached.
    async fn search(&self, cookie: &str, jql: &str, expected: usize) -> Result<Vec<ApiIssue>, RemoteError> {
        let max = expected.clamp(1, PAGE_SIZE);
        let mut issues = Vec::new();
        let mut start_at = 0;
        loop {
            let mut page = self.search_page(cookie, jql, start_at, max).await?;
            let next = page.next_start();
            tracing::debug!(start_at, got = page.issues.len(), total = page.total, "jira search page");
            issues.append(&mut page.issues);
            match next {
                Some(n) => start_at = n,
                None => break,
            }
        }
        Ok(issues)
    }
}

#[async_trait::async_trait]
impl IssueTracker for JiraClient {
    async fn issues_by_keys(
        &self,
        keys: &BTreeSet<String>,
    ) -> Result<Vec<TrackedIssue>, RemoteError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let cookie = self.login().await?;
        let issues = self.search(&cookie, &key_query(keys), keys.len()).await?;
        tracing::info!(requested = keys.len(), found = issues.len(), "jira issues resolved");
        Ok(issues.into_iter().map(TrackedIssue::from).collect())
    }
}
