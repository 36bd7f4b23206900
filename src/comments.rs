//! Inline comments already present on the pull request.
//!
//! The index is a per-run cache: each file's comments are fetched from the
//! review server on first access and never refetched mid-run. Comments the
//! engine publishes during the run are recorded locally via
//! [`CommentSet::insert`], so double-posting is prevented from the pre-run
//! snapshot plus the engine's own in-run bookkeeping.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::{PullRequestId, ReviewServer};
use crate::errors::ReportResult;

/// A comment attached to the pull request, pre-existing or just published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostedComment {
    pub id: u64,
    pub text: String,
    /// Repository-relative path the comment is anchored to.
    pub path: String,
    /// Diff-relative line the comment is anchored to, if inline.
    pub line: Option<u64>,
}

/// The set of posted comments for one file.
#[derive(Debug, Clone, Default)]
pub struct CommentSet {
    comments: Vec<PostedComment>,
}

impl CommentSet {
    pub fn from_vec(comments: Vec<PostedComment>) -> Self {
        Self { comments }
    }

    /// Exact three-way match on text, path and diff line (case-sensitive).
    pub fn contains(&self, text: &str, path: &str, line: u64) -> bool {
        self.find(text, path, line).is_some()
    }

    /// Like [`Self::contains`] but returns the matching comment, so a task
    /// can be attached to a pre-existing comment.
    pub fn find(&self, text: &str, path: &str, line: u64) -> Option<&PostedComment> {
        self.comments
            .iter()
            .find(|c| c.text == text && c.path == path && c.line == Some(line))
    }

    /// Records a comment published during the current run.
    pub fn insert(&mut self, comment: PostedComment) {
        self.comments.push(comment);
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

/// Lazy per-file cache over the review server's comment listing.
#[derive(Debug, Default)]
pub struct CommentIndex {
    cache: HashMap<String, CommentSet>,
}

impl CommentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the comment set for `path`, fetching it from the server on
    /// first access within the run. Staleness is accepted: the snapshot is
    /// never refetched mid-run.
    pub async fn comments_for<C: ReviewServer>(
        &mut self,
        client: &C,
        id: &PullRequestId,
        path: &str,
    ) -> ReportResult<&mut CommentSet> {
        match self.cache.entry(path.to_string()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(v) => {
                let comments = client.fetch_comments(id, path).await?;
                debug!("comment index: loaded path={} comments={}", path, comments.len());
                Ok(v.insert(CommentSet::from_vec(comments)))
            }
        }
    }

    /// Number of files loaded so far.
    pub fn loaded_files(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockServer;

    fn comment(id: u64, text: &str, path: &str, line: u64) -> PostedComment {
        PostedComment {
            id,
            text: text.to_string(),
            path: path.to_string(),
            line: Some(line),
        }
    }

    #[test]
    fn contains_requires_exact_three_way_match() {
        let set = CommentSet::from_vec(vec![comment(1, "msg", "a/b.rs", 3)]);
        assert!(set.contains("msg", "a/b.rs", 3));
        assert!(!set.contains("msg", "a/b.rs", 4));
        assert!(!set.contains("msg", "a/c.rs", 3));
        assert!(!set.contains("other", "a/b.rs", 3));
        // Case-sensitive on text and path.
        assert!(!set.contains("MSG", "a/b.rs", 3));
        assert!(!set.contains("msg", "A/B.RS", 3));
    }

    #[test]
    fn find_returns_the_matching_comment_id() {
        let set = CommentSet::from_vec(vec![comment(7, "msg", "a.rs", 1)]);
        assert_eq!(set.find("msg", "a.rs", 1).map(|c| c.id), Some(7));
        assert!(set.find("msg", "a.rs", 2).is_none());
    }

    #[test]
    fn insert_makes_in_run_comments_visible() {
        let mut set = CommentSet::default();
        assert!(!set.contains("msg", "a.rs", 1));
        set.insert(comment(9, "msg", "a.rs", 1));
        assert!(set.contains("msg", "a.rs", 1));
    }

    #[tokio::test]
    async fn index_fetches_once_per_file() {
        let server = MockServer::new();
        server.seed_comments("a.rs", vec![comment(1, "msg", "a.rs", 1)]);
        let id = MockServer::pr_id();

        let mut index = CommentIndex::new();
        let set = index.comments_for(&server, &id, "a.rs").await.unwrap();
        assert_eq!(set.len(), 1);
        let _ = index.comments_for(&server, &id, "a.rs").await.unwrap();
        let _ = index.comments_for(&server, &id, "b.rs").await.unwrap();

        let calls = server.calls();
        assert_eq!(calls.fetch_comments, vec!["a.rs".to_string(), "b.rs".to_string()]);
        assert_eq!(index.loaded_files(), 2);
    }
}
