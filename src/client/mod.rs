//! Review-server capability surface, without async-trait or trait objects.
//!
//! The engine and the reporting policy are generic over [`ReviewServer`],
//! so tests substitute a recording double and production code plugs in the
//! reqwest-backed [`stash::StashClient`]. Plain `async fn` in the trait
//! keeps dispatch static.

pub mod stash;

pub use stash::{StashClient, StashConfig};

use serde::{Deserialize, Serialize};

use crate::comments::PostedComment;
use crate::diff::{FileDiff, SegmentKind};
use crate::errors::ReportResult;

/// A unique reference to a pull request on the review server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PullRequestId {
    /// Project key, e.g. "PROJ".
    pub project: String,
    /// Repository slug, e.g. "backend".
    pub repo: String,
    /// Numeric pull-request id.
    pub id: u64,
}

/// Minimal pull-request state used by reviewer management.
#[derive(Debug, Clone)]
pub struct PullRequestInfo {
    /// Optimistic-locking version required by mutation endpoints.
    pub version: u64,
    /// Slugs of the users currently listed as reviewers.
    pub reviewer_slugs: Vec<String>,
}

/// A server-side user identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

/// Remote operations the reporting pipeline depends on.
///
/// One implementation per server flavor; per-finding failures from the
/// publish methods are isolated by the engine, while `fetch_diff` failure
/// is fatal to the publication step.
#[allow(async_fn_in_trait)]
pub trait ReviewServer {
    /// Fetches the pull request's unified diff, split per file.
    async fn fetch_diff(&self, id: &PullRequestId) -> ReportResult<Vec<FileDiff>>;

    /// Lists inline comments anchored to one file of the pull request.
    async fn fetch_comments(
        &self,
        id: &PullRequestId,
        path: &str,
    ) -> ReportResult<Vec<PostedComment>>;

    /// Publishes an inline comment; returns the server-side comment id.
    async fn publish_comment(
        &self,
        id: &PullRequestId,
        text: &str,
        path: &str,
        line: u64,
        kind: SegmentKind,
    ) -> ReportResult<u64>;

    /// Publishes a pull-request-level (non-inline) comment.
    async fn publish_general_comment(&self, id: &PullRequestId, text: &str) -> ReportResult<()>;

    /// Attaches a task to an existing comment.
    async fn publish_task(&self, comment_id: u64, text: &str) -> ReportResult<()>;

    /// Approves the pull request as the configured reviewer identity.
    async fn approve(&self, id: &PullRequestId) -> ReportResult<()>;

    /// Revokes a prior approval ("needs work").
    async fn reset_approval(&self, id: &PullRequestId) -> ReportResult<()>;

    /// Fetches pull-request version and current reviewers.
    async fn get_pull_request(&self, id: &PullRequestId) -> ReportResult<PullRequestInfo>;

    /// Resolves a user by slug.
    async fn get_user(&self, slug: &str) -> ReportResult<UserInfo>;

    /// Adds a reviewer to the pull request at the given version.
    async fn add_reviewer(
        &self,
        id: &PullRequestId,
        version: u64,
        user: &UserInfo,
    ) -> ReportResult<()>;
}
