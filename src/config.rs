//! Reporting policy configuration.
//!
//! The configuration is an explicit immutable value passed into each entry
//! point (no ambient state), so unit tests can pin any scenario. `from_env`
//! mirrors how deployments feed the flags in.

use std::str::FromStr;

use crate::client::PullRequestId;
use crate::errors::{ConfigError, ReportResult};
use crate::findings::Severity;

/// Flags and thresholds driving one reporting run.
///
/// The comment and task severity thresholds are independent; no ordering
/// between them is assumed anywhere in the pipeline.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Master switch for comments, tasks, overview and summary.
    pub notify_enabled: bool,
    /// Publish the high-level overview comment.
    pub overview_enabled: bool,
    /// Publish the condensed summary comment.
    pub summary_enabled: bool,
    /// Drive pull-request approval from the finding count.
    pub approval_enabled: bool,
    /// Minimum severity for a finding to receive an inline comment.
    pub comment_severity_threshold: Severity,
    /// Minimum severity for a finding's comment to receive a task.
    pub task_severity_threshold: Severity,
    /// Aggregate finding-count gate: above this, per-finding publication
    /// is skipped for the whole run.
    pub issue_threshold: usize,
    /// Base URL of the analysis server, used when rendering comment bodies.
    pub base_url: String,
    /// Reviewer identity to keep present on the pull request, if any.
    pub reviewer: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            notify_enabled: true,
            overview_enabled: true,
            summary_enabled: false,
            approval_enabled: false,
            comment_severity_threshold: Severity::Info,
            task_severity_threshold: Severity::Info,
            issue_threshold: 100,
            base_url: String::new(),
            reviewer: None,
        }
    }
}

impl ReportConfig {
    /// Reads the policy from `PR_REPORTER_*` variables, falling back to
    /// [`Default`] per field. Malformed numeric or severity values are
    /// configuration errors, surfaced before any remote call.
    pub fn from_env() -> ReportResult<Self> {
        let d = Self::default();
        Ok(Self {
            notify_enabled: env_bool("PR_REPORTER_NOTIFY", d.notify_enabled),
            overview_enabled: env_bool("PR_REPORTER_OVERVIEW", d.overview_enabled),
            summary_enabled: env_bool("PR_REPORTER_SUMMARY", d.summary_enabled),
            approval_enabled: env_bool("PR_REPORTER_APPROVAL", d.approval_enabled),
            comment_severity_threshold: env_severity(
                "PR_REPORTER_COMMENT_SEVERITY",
                d.comment_severity_threshold,
            )?,
            task_severity_threshold: env_severity(
                "PR_REPORTER_TASK_SEVERITY",
                d.task_severity_threshold,
            )?,
            issue_threshold: env_threshold("PR_REPORTER_ISSUE_THRESHOLD", d.issue_threshold)?,
            base_url: std::env::var("PR_REPORTER_BASE_URL").unwrap_or(d.base_url),
            reviewer: std::env::var("PR_REPORTER_REVIEWER").ok(),
        })
    }
}

/// Resolves the pull-request identity from `PR_REPORTER_*` variables.
///
/// A missing or malformed pull-request id aborts the run before any remote
/// call.
pub fn pull_request_from_env() -> ReportResult<PullRequestId> {
    let project =
        std::env::var("PR_REPORTER_PROJECT").map_err(|_| ConfigError::MissingProject)?;
    let repo =
        std::env::var("PR_REPORTER_REPOSITORY").map_err(|_| ConfigError::MissingRepository)?;
    let id = std::env::var("PR_REPORTER_PULL_REQUEST_ID")
        .map_err(|_| ConfigError::MissingPullRequestId)?
        .parse()
        .map_err(|_| ConfigError::MissingPullRequestId)?;
    Ok(PullRequestId { project, repo, id })
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_threshold(key: &str, default: usize) -> ReportResult<usize> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidThreshold(v).into()),
        Err(_) => Ok(default),
    }
}

fn env_severity(key: &str, default: Severity) -> ReportResult<Severity> {
    match std::env::var(key) {
        Ok(v) => Ok(Severity::from_str(&v)?),
        Err(_) => Ok(default),
    }
}
