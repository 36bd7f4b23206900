//! Top-level reporting policy for one pull request.
//!
//! Three independently gated steps, in order:
//! 1. Overview/summary comments (each behind its own flag).
//! 2. Per-finding correlation & publication, skipped wholesale when the
//!    aggregate finding count exceeds the issue threshold.
//! 3. Approval decision (approve or reset, never both), behind its own
//!    flag and evaluated regardless of the notify switch.
//!
//! The notify flag gates steps 1-2 as one unit. A fatal publication error
//! (diff fetch) is returned to the caller, but only after the approval
//! step has run, so the two policy axes stay independent. When the
//! approval call itself fails too, its error is returned and the earlier
//! publication failure is logged rather than dropped.

use tracing::{info, warn};

use crate::client::{PullRequestId, ReviewServer};
use crate::comments::CommentIndex;
use crate::config::ReportConfig;
use crate::diff::DiffIndex;
use crate::errors::{Error, ReportResult};
use crate::findings::FindingSet;
use crate::publish::{RunOutcome, publish_findings};
use crate::render::{RenderFinding, render_overview, render_summary};
use crate::reviewers::ensure_reviewer;

/// The approval call made for this run, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    Approved,
    Reset,
    Skipped,
}

/// What one reporting run did.
#[derive(Debug)]
pub struct ReportSummary {
    /// Per-finding outcome; `None` when the step did not run (notify off,
    /// aggregate threshold exceeded, or nothing to correlate).
    pub outcome: Option<RunOutcome>,
    pub overview_posted: bool,
    pub summary_posted: bool,
    pub approval: ApprovalAction,
}

/// Runs the full reporting policy for one pull request.
///
/// Configuration errors and the diff fetch failure propagate to the
/// caller; per-finding transport errors are aggregated into the summary.
pub async fn run_report<C, R>(
    client: &C,
    id: &PullRequestId,
    cfg: &ReportConfig,
    findings: &FindingSet,
    renderer: &R,
) -> ReportResult<ReportSummary>
where
    C: ReviewServer,
    R: RenderFinding,
{
    info!(
        "report: start pr={}/{}#{} findings={} notify={} approval={}",
        id.project,
        id.repo,
        id.id,
        findings.count(),
        cfg.notify_enabled,
        cfg.approval_enabled
    );

    if let Some(slug) = &cfg.reviewer {
        // Reviewer presence is a best-effort extension; never blocks reporting.
        if let Err(e) = ensure_reviewer(client, id, slug).await {
            warn!("report: ensure reviewer failed slug={}: {}", slug, e);
        }
    }

    let mut summary = ReportSummary {
        outcome: None,
        overview_posted: false,
        summary_posted: false,
        approval: ApprovalAction::Skipped,
    };

    let mut publication_err: Option<Error> = None;
    if cfg.notify_enabled {
        match notify(client, id, cfg, findings, renderer, &mut summary).await {
            Ok(()) => {}
            Err(e) => {
                warn!("report: publication step failed: {}", e);
                publication_err = Some(e);
            }
        }
    }

    if cfg.approval_enabled {
        let decision = if findings.count() == 0 {
            client.approve(id).await.map(|()| ApprovalAction::Approved)
        } else {
            client
                .reset_approval(id)
                .await
                .map(|()| ApprovalAction::Reset)
        };
        match decision {
            Ok(action) => {
                info!("report: approval decision {:?}", action);
                summary.approval = action;
            }
            Err(approval_err) => {
                // Keep the earlier publication failure visible instead of
                // letting the approval error shadow it silently.
                if let Some(e) = &publication_err {
                    warn!("report: publication step had already failed: {}", e);
                }
                return Err(approval_err);
            }
        }
    }

    match publication_err {
        Some(e) => Err(e),
        None => Ok(summary),
    }
}

/// Overview, summary and the per-finding step (notify-gated unit).
async fn notify<C, R>(
    client: &C,
    id: &PullRequestId,
    cfg: &ReportConfig,
    findings: &FindingSet,
    renderer: &R,
    summary: &mut ReportSummary,
) -> ReportResult<()>
where
    C: ReviewServer,
    R: RenderFinding,
{
    if cfg.overview_enabled {
        let text = render_overview(findings, &cfg.base_url, cfg.issue_threshold);
        client.publish_general_comment(id, &text).await?;
        summary.overview_posted = true;
    }
    if cfg.summary_enabled {
        let text = render_summary(findings, cfg.issue_threshold);
        client.publish_general_comment(id, &text).await?;
        summary.summary_posted = true;
    }

    if findings.count() > cfg.issue_threshold {
        info!(
            "report: {} findings exceed threshold {}, per-finding step skipped",
            findings.count(),
            cfg.issue_threshold
        );
        return Ok(());
    }
    if findings.is_empty() {
        return Ok(());
    }

    // Diff fetch failure is fatal to this step: nothing can be correlated
    // without the diff.
    let diff = DiffIndex::from_files(client.fetch_diff(id).await?);
    info!("report: diff index ready files={}", diff.file_count());

    let mut comments = CommentIndex::new();
    let outcome =
        publish_findings(client, id, cfg, findings, &diff, &mut comments, renderer).await;
    summary.outcome = Some(outcome);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::{Finding, Severity};
    use crate::render::MarkdownRenderer;
    use crate::testutil::{MockServer, three_findings};

    fn cfg() -> ReportConfig {
        ReportConfig {
            base_url: "http://sonar/url".to_string(),
            ..ReportConfig::default()
        }
    }

    async fn run(
        server: &MockServer,
        cfg: &ReportConfig,
        findings: &FindingSet,
    ) -> ReportResult<ReportSummary> {
        run_report(server, &MockServer::pr_id(), cfg, findings, &MarkdownRenderer).await
    }

    #[tokio::test]
    async fn notify_runs_overview_and_per_finding_step() {
        let server = MockServer::new();
        let summary = run(&server, &cfg(), &three_findings()).await.unwrap();

        assert!(summary.overview_posted);
        assert!(!summary.summary_posted);
        assert_eq!(summary.outcome.as_ref().unwrap().published, 3);
        assert_eq!(summary.approval, ApprovalAction::Skipped);

        let calls = server.calls();
        assert_eq!(calls.general_comments.len(), 1);
        assert_eq!(calls.fetch_diff, 1);
    }

    #[tokio::test]
    async fn notify_disabled_makes_zero_publication_calls() {
        let server = MockServer::new();
        let config = ReportConfig {
            notify_enabled: false,
            summary_enabled: true,
            ..cfg()
        };
        let summary = run(&server, &config, &three_findings()).await.unwrap();

        assert!(summary.outcome.is_none());
        assert!(!summary.overview_posted);
        assert!(!summary.summary_posted);
        let calls = server.calls();
        assert_eq!(calls.fetch_diff, 0);
        assert!(calls.general_comments.is_empty());
        assert!(calls.publish_comment.is_empty());
        assert!(calls.publish_task.is_empty());
    }

    #[tokio::test]
    async fn threshold_exceeded_skips_per_finding_but_not_overview() {
        let server = MockServer::new();
        let mut findings = FindingSet::new();
        for i in 0..101 {
            findings.add(Finding::new(Severity::Major, "r", "m", "path/to/file1", i));
        }
        let config = ReportConfig {
            issue_threshold: 100,
            summary_enabled: true,
            ..cfg()
        };
        let summary = run(&server, &config, &findings).await.unwrap();

        assert!(summary.outcome.is_none());
        assert!(summary.overview_posted);
        assert!(summary.summary_posted);
        let calls = server.calls();
        assert_eq!(calls.fetch_diff, 0);
        assert!(calls.publish_comment.is_empty());
        assert_eq!(calls.general_comments.len(), 2);
    }

    #[tokio::test]
    async fn overview_and_summary_flags_are_independent() {
        let server = MockServer::new();
        let config = ReportConfig {
            overview_enabled: false,
            summary_enabled: true,
            ..cfg()
        };
        let summary = run(&server, &config, &three_findings()).await.unwrap();

        assert!(!summary.overview_posted);
        assert!(summary.summary_posted);
        assert_eq!(server.calls().general_comments.len(), 1);
    }

    #[tokio::test]
    async fn no_findings_and_approval_enabled_approves_exactly_once() {
        let server = MockServer::new();
        let config = ReportConfig {
            approval_enabled: true,
            ..cfg()
        };
        let summary = run(&server, &config, &FindingSet::new()).await.unwrap();

        assert_eq!(summary.approval, ApprovalAction::Approved);
        let calls = server.calls();
        assert_eq!(calls.approve, 1);
        assert_eq!(calls.reset_approval, 0);
    }

    #[tokio::test]
    async fn findings_and_approval_enabled_resets_exactly_once() {
        let server = MockServer::new();
        let config = ReportConfig {
            approval_enabled: true,
            ..cfg()
        };
        let summary = run(&server, &config, &three_findings()).await.unwrap();

        assert_eq!(summary.approval, ApprovalAction::Reset);
        let calls = server.calls();
        assert_eq!(calls.approve, 0);
        assert_eq!(calls.reset_approval, 1);
    }

    #[tokio::test]
    async fn approval_disabled_makes_no_approval_calls() {
        let server = MockServer::new();
        let summary = run(&server, &cfg(), &FindingSet::new()).await.unwrap();

        assert_eq!(summary.approval, ApprovalAction::Skipped);
        let calls = server.calls();
        assert_eq!(calls.approve, 0);
        assert_eq!(calls.reset_approval, 0);
    }

    #[tokio::test]
    async fn approval_runs_even_when_notify_is_off() {
        let server = MockServer::new();
        let config = ReportConfig {
            notify_enabled: false,
            approval_enabled: true,
            ..cfg()
        };
        let summary = run(&server, &config, &three_findings()).await.unwrap();

        assert_eq!(summary.approval, ApprovalAction::Reset);
        assert!(server.calls().publish_comment.is_empty());
    }

    #[tokio::test]
    async fn diff_fetch_failure_is_fatal_but_approval_still_runs() {
        let server = MockServer::new();
        server.fail_diff();
        let config = ReportConfig {
            approval_enabled: true,
            overview_enabled: false,
            ..cfg()
        };
        let err = run(&server, &config, &three_findings()).await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        let calls = server.calls();
        assert_eq!(calls.reset_approval, 1);
        assert!(calls.publish_comment.is_empty());
    }

    #[tokio::test]
    async fn approval_failure_propagates() {
        let server = MockServer::new();
        server.fail_approval();
        let config = ReportConfig {
            notify_enabled: false,
            approval_enabled: true,
            ..cfg()
        };
        let err = run(&server, &config, &three_findings()).await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(server.calls().reset_approval, 1);
    }

    #[tokio::test]
    async fn failed_approval_after_failed_publication_still_errors() {
        // Both steps fail: the approval call is still attempted and the
        // run reports an error rather than a clean summary.
        let server = MockServer::new();
        server.fail_diff();
        server.fail_approval();
        let config = ReportConfig {
            approval_enabled: true,
            overview_enabled: false,
            ..cfg()
        };
        let err = run(&server, &config, &three_findings()).await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        let calls = server.calls();
        assert_eq!(calls.fetch_diff, 1);
        assert_eq!(calls.reset_approval, 1);
    }

    #[tokio::test]
    async fn reviewer_failure_does_not_block_reporting() {
        let server = MockServer::new();
        server.fail_pull_request();
        let config = ReportConfig {
            reviewer: Some("sonarqube".to_string()),
            ..cfg()
        };
        let summary = run(&server, &config, &three_findings()).await.unwrap();
        assert_eq!(summary.outcome.as_ref().unwrap().published, 3);
    }
}
