//! Keeps a fixed reviewer identity present on the pull request.
//!
//! Idempotent: a no-op when the user is already a reviewer. Shares the
//! pull-request mutation shape with publishing but is otherwise uncoupled
//! from the correlation logic.

use tracing::{debug, info};

use crate::client::{PullRequestId, ReviewServer};
use crate::errors::ReportResult;

/// Ensures `slug` is listed as a reviewer; returns `true` when it had to
/// be added.
pub async fn ensure_reviewer<C: ReviewServer>(
    client: &C,
    id: &PullRequestId,
    slug: &str,
) -> ReportResult<bool> {
    let pr = client.get_pull_request(id).await?;
    if pr.reviewer_slugs.iter().any(|s| s == slug) {
        debug!("reviewers: {} already present on pr={}", slug, id.id);
        return Ok(false);
    }
    let user = client.get_user(slug).await?;
    client.add_reviewer(id, pr.version, &user).await?;
    info!("reviewers: added {} to pr={}", slug, id.id);
    Ok(true)
}
