//! Publishes static-analysis findings onto a pull request.
//!
//! Pipeline for one pull request:
//!
//! 1) **Overview/summary** — at most one high-level overview comment and
//!    one condensed summary comment, each behind its own flag.
//! 2) **Correlation & publication** — each finding is resolved against the
//!    pull request's unified diff, deduplicated against comments already
//!    on the pull request, published as an inline comment when its
//!    severity meets the comment threshold, and escalated to a task when
//!    it meets the independent task threshold. One finding's remote
//!    failure never aborts the batch.
//! 3) **Approval** — zero findings approve the pull request, anything
//!    else resets a prior approval; never both.
//!
//! A master notify flag gates steps 1-2 as one unit; approval is gated by
//! its own flag. An aggregate issue-count threshold skips step 2 wholesale
//! on oversized runs so the overview alone communicates scale.
//!
//! The pipeline uses `tracing` for logging and avoids `async-trait` and
//! heap trait objects; remote dispatch is static over the [`ReviewServer`]
//! capability, with a reqwest-backed [`StashClient`] for Bitbucket-Server
//! style review servers.

pub mod client;
pub mod comments;
pub mod config;
pub mod diff;
pub mod errors;
pub mod findings;
pub mod publish;
pub mod render;
pub mod report;
pub mod reviewers;

#[cfg(test)]
pub(crate) mod testutil;

pub use client::{PullRequestId, ReviewServer, StashClient, StashConfig};
pub use config::ReportConfig;
pub use errors::{ConfigError, Error, ParseError, ReportResult, TransportError};
pub use findings::{Finding, FindingSet, Severity};
pub use publish::RunOutcome;
pub use render::{MarkdownRenderer, RenderFinding};
pub use report::{ApprovalAction, ReportSummary, run_report};
