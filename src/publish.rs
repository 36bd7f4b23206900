//! Correlation & publication engine.
//!
//! For each finding, in discovery order:
//! 1. Resolve its diff position; findings outside the diff are skipped.
//! 2. Render the comment body.
//! 3. Deduplicate against the comment index (pre-run snapshot plus in-run
//!    bookkeeping); publish a new inline comment when severity meets the
//!    comment threshold.
//! 4. Attach a task to the comment (new or pre-existing) when severity
//!    meets the independent task threshold.
//!
//! Remote failures in steps 3-4 are recorded per finding and never abort
//! the batch. The caller provides the diff index (its fetch failure is
//! fatal upstream) and a comment index scoped to the run.

use tracing::{debug, warn};

use crate::client::{PullRequestId, ReviewServer};
use crate::comments::{CommentIndex, PostedComment};
use crate::config::ReportConfig;
use crate::diff::DiffIndex;
use crate::errors::Error;
use crate::findings::{Finding, FindingSet};
use crate::render::RenderFinding;

/// Per-run counters and diagnostics for the per-finding step.
#[derive(Debug, Default)]
pub struct RunOutcome {
    /// Inline comments created during this run.
    pub published: usize,
    /// Tasks attached during this run.
    pub tasks_published: usize,
    /// Findings whose location does not resolve inside the diff.
    pub skipped_outside_diff: usize,
    /// Findings whose rendered comment already exists on the pull request.
    pub skipped_duplicate: usize,
    /// Findings below the comment severity threshold (and without a
    /// pre-existing matching comment to attach a task to).
    pub below_threshold: usize,
    /// Per-finding remote failures, with the offending finding retained.
    pub errors: Vec<FindingError>,
}

/// One per-finding failure kept for diagnostics.
#[derive(Debug)]
pub struct FindingError {
    pub finding: Finding,
    pub error: Error,
}

/// Publishes comments and tasks for every finding in the set.
///
/// Never fails for per-finding transport errors; they are collected in the
/// returned [`RunOutcome`].
pub async fn publish_findings<C, R>(
    client: &C,
    id: &PullRequestId,
    cfg: &ReportConfig,
    findings: &FindingSet,
    diff: &DiffIndex,
    comments: &mut CommentIndex,
    renderer: &R,
) -> RunOutcome
where
    C: ReviewServer,
    R: RenderFinding,
{
    let mut outcome = RunOutcome::default();

    for finding in findings.iter() {
        let Some(position) = diff.resolve(&finding.path, finding.line) else {
            debug!(
                "publish: skip outside diff path={} line={}",
                finding.path, finding.line
            );
            outcome.skipped_outside_diff += 1;
            continue;
        };
        // resolve() succeeded, so the path is present in the diff.
        let path = diff
            .normalize_path(&finding.path)
            .unwrap_or(finding.path.as_str())
            .to_string();

        let text = renderer.render(finding, &cfg.base_url);

        let set = match comments.comments_for(client, id, &path).await {
            Ok(set) => set,
            Err(e) => {
                warn!("publish: comment fetch failed path={}: {}", path, e);
                outcome.errors.push(FindingError {
                    finding: finding.clone(),
                    error: e,
                });
                continue;
            }
        };

        let comment_id = if let Some(existing) = set.find(&text, &path, position.line) {
            debug!(
                "publish: duplicate path={} line={} comment={}",
                path, position.line, existing.id
            );
            outcome.skipped_duplicate += 1;
            Some(existing.id)
        } else if finding.severity >= cfg.comment_severity_threshold {
            match client
                .publish_comment(id, &text, &path, position.line, position.kind)
                .await
            {
                Ok(new_id) => {
                    outcome.published += 1;
                    set.insert(PostedComment {
                        id: new_id,
                        text: text.clone(),
                        path: path.clone(),
                        line: Some(position.line),
                    });
                    Some(new_id)
                }
                Err(e) => {
                    warn!(
                        "publish: comment failed path={} line={}: {}",
                        path, position.line, e
                    );
                    outcome.errors.push(FindingError {
                        finding: finding.clone(),
                        error: e,
                    });
                    continue;
                }
            }
        } else {
            // Below the comment threshold and nothing to attach a task to.
            outcome.below_threshold += 1;
            None
        };

        if let Some(comment_id) = comment_id {
            if finding.severity >= cfg.task_severity_threshold {
                match client.publish_task(comment_id, &finding.message).await {
                    Ok(()) => outcome.tasks_published += 1,
                    Err(e) => {
                        warn!("publish: task failed comment={}: {}", comment_id, e);
                        outcome.errors.push(FindingError {
                            finding: finding.clone(),
                            error: e,
                        });
                    }
                }
            }
        }
    }

    debug!(
        "publish: done published={} tasks={} outside={} duplicate={} below={} errors={}",
        outcome.published,
        outcome.tasks_published,
        outcome.skipped_outside_diff,
        outcome.skipped_duplicate,
        outcome.below_threshold,
        outcome.errors.len()
    );
    outcome
}
