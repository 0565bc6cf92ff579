//! Client for the GitLab v4 REST API.
//!
//! Authenticates with a personal access token in the `PRIVATE-TOKEN` header.
//! Calls are issued one at a time; list endpoints follow `X-Next-Page`.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use recap_core::{CodeHost, MrState, RawCommit, RemoteError, WorkItem, WorkItemRef};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const SERVICE: &str = "gitlab";
const PER_PAGE: u32 = 100;
/// Hard stop for pagination so a misbehaving server cannot loop us forever.
const MAX_PAGES: u32 = 50;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ── Wire types ──

#[derive(Debug, Deserialize)]
struct ApiMergeRequest {
    iid: u64,
    project_id: u64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    state: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    work_in_progress: bool,
    source_branch: String,
    target_branch: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    merge_commit_sha: Option<String>,
    #[serde(default)]
    squash_commit_sha: Option<String>,
    #[serde(default)]
    web_url: String,
    #[serde(default)]
    references: Option<ApiReferences>,
}

#[derive(Debug, Deserialize)]
struct ApiReferences {
    full: String,
}

#[derive(Debug, Deserialize)]
struct ApiCommit {
    id: String,
    title: String,
    #[serde(default)]
    author_name: String,
    #[serde(default)]
    author_email: String,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "type")]
    kind: String,
    name: String,
}

impl ApiMergeRequest {
    fn into_work_item(self) -> Option<WorkItem> {
        let Some(state) = MrState::parse(&self.state) else {
            tracing::debug!(iid = self.iid, state = %self.state, "skipping merge request with unknown state");
            return None;
        };
        let reference = self
            .references
            .map(|r| r.full)
            .unwrap_or_else(|| format!("!{}", self.iid));
        Some(WorkItem {
            id: WorkItemRef {
                project_id: self.project_id,
                iid: self.iid,
            },
            reference,
            web_url: self.web_url,
            title: self.title,
            description: self.description.unwrap_or_default(),
            state,
            draft: self.draft || self.work_in_progress,
            source_branch: self.source_branch,
            target_branch: self.target_branch,
            created_at: self.created_at,
            updated_at: self.updated_at,
            merged_at: self.merged_at,
            merge_commit_sha: self
                .merge_commit_sha
                .filter(|s| !s.is_empty())
                .or(self.squash_commit_sha.filter(|s| !s.is_empty())),
        })
    }
}

impl From<ApiCommit> for RawCommit {
    fn from(c: ApiCommit) -> Self {
        RawCommit {
            sha: c.id,
            title: c.title,
            author_name: c.author_name,
            author_email: c.author_email,
        }
    }
}

fn branch_names(refs: Vec<ApiRef>) -> Vec<String> {
    refs.into_iter()
        .filter(|r| r.kind == "branch")
        .map(|r| r.name)
        .collect()
}

fn next_page(headers: &reqwest::header::HeaderMap) -> Option<u32> {
    headers
        .get("x-next-page")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn transport(e: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        service: SERVICE,
        message: e.to_string(),
    }
}

fn decode(e: impl std::fmt::Display) -> RemoteError {
    RemoteError::Decode {
        service: SERVICE,
        message: e.to_string(),
    }
}

// ── Client ──

pub struct GitlabClient {
    client: reqwest::Client,
    base_url: String,
    host: String,
    token: String,
}

impl GitlabClient {
    /// `base_url` is the instance root, e.g. `https://gitlab.example.com`.
    pub fn new(base_url: &str, token: &str) -> Result<Self, RemoteError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let parsed = reqwest::Url::parse(&base_url).map_err(|e| RemoteError::Transport {
            service: SERVICE,
            message: format!("invalid base URL `{base_url}`: {e}"),
        })?;
        let host = parsed
            .host_str()
            .ok_or_else(|| RemoteError::Transport {
                service: SERVICE,
                message: format!("base URL `{base_url}` has no host"),
            })?
            .to_lowercase();
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            base_url,
            host,
            token: token.to_string(),
        })
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/v4{}", self.base_url, path)
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<(T, Option<u32>), RemoteError> {
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .header("PRIVATE-TOKEN", &self.token)
            .query(query)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::status(SERVICE, status.as_u16(), body));
        }
        let next = next_page(resp.headers());
        let text = resp.text().await.map_err(transport)?;
        let value = serde_json::from_str(&text).map_err(decode)?;
        Ok((value, next))
    }

    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, RemoteError> {
        let url = self.api(path);
        let mut out = Vec::new();
        let mut page = 1;
        loop {
            let mut q = query.to_vec();
            q.push(("per_page", PER_PAGE.to_string()));
            q.push(("page", page.to_string()));
            let (items, next): (Vec<T>, _) = self.get_page(&url, &q).await?;
            out.extend(items);
            match next {
                Some(n) if n > page && n <= MAX_PAGES => page = n,
                Some(n) if n > MAX_PAGES => {
                    tracing::warn!(%path, pages = MAX_PAGES, "pagination limit reached, results truncated");
                    break;
                }
                _ => break,
            }
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl CodeHost for GitlabClient {
    fn host(&self) -> &str {
        &self.host
    }

    async fn merge_requests(
        &self,
        author: &str,
        updated_after: DateTime<Utc>,
    ) -> Result<Vec<WorkItem>, RemoteError> {
        let query = [
            ("author_username", author.to_string()),
            (
                "updated_after",
                updated_after.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            ("scope", "all".to_string()),
            ("order_by", "updated_at".to_string()),
        ];
        let raw: Vec<ApiMergeRequest> = self.get_all("/merge_requests", &query).await?;
        let items: Vec<WorkItem> = raw
            .into_iter()
            .filter_map(ApiMergeRequest::into_work_item)
            .collect();
        tracing::info!(count = items.len(), "merge requests listed");
        Ok(items)
    }

    async fn merge_request_commits(&self, item: &WorkItem) -> Result<Vec<RawCommit>, RemoteError> {
        let path = format!(
            "/projects/{}/merge_requests/{}/commits",
            item.id.project_id, item.id.iid
        );
        let raw: Vec<ApiCommit> = self.get_all(&path, &[]).await?;
        Ok(raw.into_iter().map(RawCommit::from).collect())
    }

    async fn branches_containing(
        &self,
        project_id: u64,
        sha: &str,
    ) -> Result<Vec<String>, RemoteError> {
        let path = format!("/projects/{project_id}/repository/commits/{sha}/refs");
        let raw: Vec<ApiRef> = self
            .get_all(&path, &[("type", "branch".to_string())])
            .await?;
        Ok(branch_names(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MR_JSON: &str = r#"[
      {
        "id": 9001, "iid": 42, "project_id": 7,
        "title": "HCM-50624 fix default applicant",
        "description": null,
        "state": "merged",
        "draft": false,
        "source_branch": "fix/HCM-50624",
        "target_branch": "main",
        "created_at": "2026-02-17T09:00:00.000+08:00",
        "updated_at": "2026-02-18T16:00:00.000+08:00",
        "merged_at": "2026-02-18T15:30:00.000+08:00",
        "merge_commit_sha": null,
        "squash_commit_sha": "abc123",
        "web_url": "https://git.example.com/hcm/app/-/merge_requests/42",
        "references": { "short": "!42", "relative": "!42", "full": "hcm/app!42" }
      },
      {
        "id": 9002, "iid": 43, "project_id": 7,
        "title": "WIP thing", "state": "opened", "work_in_progress": true,
        "source_branch": "feature/x", "target_branch": "main",
        "created_at": "2026-02-19T01:00:00Z", "updated_at": "2026-02-19T01:00:00Z"
      },
      {
        "id": 9003, "iid": 44, "project_id": 7,
        "title": "odd", "state": "reopened_somehow",
        "source_branch": "a", "target_branch": "b",
        "created_at": "2026-02-19T01:00:00Z", "updated_at": "2026-02-19T01:00:00Z"
      }
    ]"#;

    #[test]
    fn merge_requests_convert_to_work_items() {
        let raw: Vec<ApiMergeRequest> = serde_json::from_str(MR_JSON).unwrap();
        let items: Vec<WorkItem> = raw
            .into_iter()
            .filter_map(ApiMergeRequest::into_work_item)
            .collect();
        assert_eq!(items.len(), 2);

        let merged = &items[0];
        assert_eq!(merged.id, WorkItemRef { project_id: 7, iid: 42 });
        assert_eq!(merged.reference, "hcm/app!42");
        assert_eq!(merged.state, MrState::Merged);
        assert_eq!(merged.description, "");
        assert_eq!(merged.merge_commit_sha.as_deref(), Some("abc123"));
        // offsets are normalised to UTC
        assert_eq!(
            merged.merged_at.unwrap().to_rfc3339(),
            "2026-02-18T07:30:00+00:00"
        );

        let wip = &items[1];
        assert!(wip.draft);
        assert_eq!(wip.reference, "!43");
        assert_eq!(wip.merge_commit_sha, None);
    }

    #[test]
    fn refs_keep_only_branches() {
        let raw: Vec<ApiRef> = serde_json::from_str(
            r#"[{"type":"branch","name":"main"},{"type":"tag","name":"v1.2"},{"type":"branch","name":"release"}]"#,
        )
        .unwrap();
        assert_eq!(branch_names(raw), vec!["main", "release"]);
    }

    #[test]
    fn commits_map_to_raw_commits() {
        let raw: Vec<ApiCommit> = serde_json::from_str(
            r#"[{"id":"0123456789abcdef","short_id":"01234567","title":"HCM-1 do it","message":"HCM-1 do it\n\nbody","author_name":"Jane","author_email":"jdoe@example.com"}]"#,
        )
        .unwrap();
        let commits: Vec<RawCommit> = raw.into_iter().map(RawCommit::from).collect();
        assert_eq!(commits[0].sha, "0123456789abcdef");
        assert_eq!(commits[0].title, "HCM-1 do it");
        assert_eq!(commits[0].author_email, "jdoe@example.com");
    }

    #[test]
    fn next_page_header_parsing() {
        let mut headers = reqwest::header::HeaderMap::new();
        assert_eq!(next_page(&headers), None);
        headers.insert("x-next-page", "".parse().unwrap());
        assert_eq!(next_page(&headers), None);
        headers.insert("x-next-page", "3".parse().unwrap());
        assert_eq!(next_page(&headers), Some(3));
    }

    #[test]
    fn client_derives_host_and_api_urls() {
        let c = GitlabClient::new("https://Git.Example.com/", "t").unwrap();
        assert_eq!(c.host(), "git.example.com");
        assert_eq!(
            c.api("/merge_requests"),
            "https://Git.Example.com/api/v4/merge_requests"
        );
        assert!(GitlabClient::new("not a url", "t").is_err());
    }
}
