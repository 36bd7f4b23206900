//! Bitbucket-Server ("Stash") REST client.
//!
//! Endpoints used:
//! - GET    /rest/api/1.0/projects/:proj/repos/:repo/pull-requests/:id.diff
//! - GET    /rest/api/1.0/projects/:proj/repos/:repo/pull-requests/:id/comments?path=...
//! - POST   /rest/api/1.0/projects/:proj/repos/:repo/pull-requests/:id/comments
//! - POST   /rest/api/1.0/tasks
//! - POST   /rest/api/1.0/projects/:proj/repos/:repo/pull-requests/:id/approve
//! - DELETE /rest/api/1.0/projects/:proj/repos/:repo/pull-requests/:id/approve
//! - GET    /rest/api/1.0/projects/:proj/repos/:repo/pull-requests/:id
//! - GET    /rest/api/1.0/users/:slug
//! - PUT    /rest/api/1.0/projects/:proj/repos/:repo/pull-requests/:id  (reviewers)
//!
//! Inline comment anchors carry the diff-relative line, the segment type
//! and the file path; retry/backoff and pagination are left to the server
//! defaults (a single page of up to `COMMENT_PAGE_LIMIT` comments per file).

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::{PullRequestId, PullRequestInfo, ReviewServer, UserInfo};
use crate::comments::PostedComment;
use crate::diff::{FileDiff, SegmentKind, parse_unified_diff};
use crate::errors::{ConfigError, ReportResult};

const COMMENT_PAGE_LIMIT: u32 = 1000;

/// Connection settings for one review server.
#[derive(Debug, Clone)]
pub struct StashConfig {
    /// Server root, e.g. "https://stash.example.com".
    pub base_url: String,
    pub login: String,
    pub password: String,
    /// Request timeout for every call.
    pub timeout: Duration,
}

impl StashConfig {
    /// Reads connection settings from `PR_REPORTER_STASH_*` variables.
    pub fn from_env() -> ReportResult<Self> {
        let base_url =
            std::env::var("PR_REPORTER_STASH_URL").map_err(|_| ConfigError::MissingBaseUrl)?;
        let login = std::env::var("PR_REPORTER_STASH_LOGIN")
            .map_err(|_| ConfigError::MissingCredentials)?;
        let password = std::env::var("PR_REPORTER_STASH_PASSWORD")
            .map_err(|_| ConfigError::MissingCredentials)?;
        let timeout_ms = std::env::var("PR_REPORTER_STASH_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30_000u64);
        Ok(Self {
            base_url,
            login,
            password,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Reqwest-backed [`ReviewServer`] implementation.
#[derive(Debug, Clone)]
pub struct StashClient {
    http: Client,
    base_url: String,
    login: String,
    password: String,
}

impl StashClient {
    pub fn new(cfg: StashConfig) -> ReportResult<Self> {
        if cfg.base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl.into());
        }
        let http = Client::builder()
            .user_agent("pr-reporter/0.1")
            .connect_timeout(Duration::from_secs(10))
            .timeout(cfg.timeout)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            login: cfg.login,
            password: cfg.password,
        })
    }

    fn pr_url(&self, id: &PullRequestId) -> String {
        format!(
            "{}/rest/api/1.0/projects/{}/repos/{}/pull-requests/{}",
            self.base_url,
            urlencoding::encode(&id.project),
            urlencoding::encode(&id.repo),
            id.id
        )
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.basic_auth(&self.login, Some(&self.password))
    }
}

// ===== Wire types =====

#[derive(Debug, Deserialize)]
struct CommentPage {
    values: Vec<RawComment>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: u64,
    text: String,
    anchor: Option<RawAnchor>,
}

#[derive(Debug, Deserialize)]
struct RawAnchor {
    path: Option<String>,
    line: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CommentCreated {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    version: u64,
    #[serde(default)]
    reviewers: Vec<RawParticipant>,
}

#[derive(Debug, Deserialize)]
struct RawParticipant {
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: u64,
    name: String,
    slug: String,
}

impl ReviewServer for StashClient {
    async fn fetch_diff(&self, id: &PullRequestId) -> ReportResult<Vec<FileDiff>> {
        let url = format!("{}.diff", self.pr_url(id));
        debug!("stash: fetch diff pr={}", id.id);
        let raw = self
            .auth(self.http.get(url))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(parse_unified_diff(&raw)?)
    }

    async fn fetch_comments(
        &self,
        id: &PullRequestId,
        path: &str,
    ) -> ReportResult<Vec<PostedComment>> {
        let url = format!(
            "{}/comments?path={}&limit={}",
            self.pr_url(id),
            urlencoding::encode(path),
            COMMENT_PAGE_LIMIT
        );
        let page: CommentPage = self
            .auth(self.http.get(url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(page
            .values
            .into_iter()
            .map(|c| {
                let (anchor_path, line) = match c.anchor {
                    Some(a) => (a.path.unwrap_or_else(|| path.to_string()), a.line),
                    None => (path.to_string(), None),
                };
                PostedComment {
                    id: c.id,
                    text: c.text,
                    path: anchor_path,
                    line,
                }
            })
            .collect())
    }

    async fn publish_comment(
        &self,
        id: &PullRequestId,
        text: &str,
        path: &str,
        line: u64,
        kind: SegmentKind,
    ) -> ReportResult<u64> {
        let url = format!("{}/comments", self.pr_url(id));
        let body = json!({
            "text": text,
            "anchor": {
                "path": path,
                "line": line,
                "lineType": kind.as_str(),
                "fileType": "TO",
            },
        });
        debug!("stash: inline comment path={} line={}", path, line);
        let created: CommentCreated = self
            .auth(self.http.post(url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(created.id)
    }

    async fn publish_general_comment(&self, id: &PullRequestId, text: &str) -> ReportResult<()> {
        let url = format!("{}/comments", self.pr_url(id));
        debug!("stash: general comment pr={}", id.id);
        self.auth(self.http.post(url))
            .json(&json!({ "text": text }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn publish_task(&self, comment_id: u64, text: &str) -> ReportResult<()> {
        let url = format!("{}/rest/api/1.0/tasks", self.base_url);
        let body = json!({
            "anchor": { "id": comment_id, "type": "COMMENT" },
            "text": text,
        });
        debug!("stash: task on comment={}", comment_id);
        self.auth(self.http.post(url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn approve(&self, id: &PullRequestId) -> ReportResult<()> {
        let url = format!("{}/approve", self.pr_url(id));
        debug!("stash: approve pr={}", id.id);
        self.auth(self.http.post(url)).send().await?.error_for_status()?;
        Ok(())
    }

    async fn reset_approval(&self, id: &PullRequestId) -> ReportResult<()> {
        let url = format!("{}/approve", self.pr_url(id));
        debug!("stash: reset approval pr={}", id.id);
        self.auth(self.http.delete(url)).send().await?.error_for_status()?;
        Ok(())
    }

    async fn get_pull_request(&self, id: &PullRequestId) -> ReportResult<PullRequestInfo> {
        let raw: RawPullRequest = self
            .auth(self.http.get(self.pr_url(id)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(PullRequestInfo {
            version: raw.version,
            reviewer_slugs: raw.reviewers.into_iter().map(|p| p.user.slug).collect(),
        })
    }

    async fn get_user(&self, slug: &str) -> ReportResult<UserInfo> {
        let url = format!(
            "{}/rest/api/1.0/users/{}",
            self.base_url,
            urlencoding::encode(slug)
        );
        let raw: RawUser = self
            .auth(self.http.get(url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(UserInfo {
            id: raw.id,
            name: raw.name,
            slug: raw.slug,
        })
    }

    async fn add_reviewer(
        &self,
        id: &PullRequestId,
        version: u64,
        user: &UserInfo,
    ) -> ReportResult<()> {
        // The pull-request update endpoint requires the current version for
        // optimistic locking.
        let body = json!({
            "version": version,
            "reviewers": [
                { "user": { "name": user.name }, "role": "REVIEWER" },
            ],
        });
        debug!("stash: add reviewer slug={} pr={}", user.slug, id.id);
        self.auth(self.http.put(self.pr_url(id)))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
