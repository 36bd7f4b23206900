//! Test doubles shared across the crate's test modules.
//!
//! `MockServer` implements [`ReviewServer`] with interior mutability: it
//! records every remote call, serves seeded comments/reviewers and can be
//! told to fail specific operations to exercise partial-failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::client::{PullRequestId, PullRequestInfo, ReviewServer, UserInfo};
use crate::comments::PostedComment;
use crate::diff::{FileDiff, SegmentKind, parse_unified_diff};
use crate::errors::{ReportResult, TransportError};
use crate::findings::{Finding, FindingSet, Severity};

/// Unified diff with two files: `path/to/file1` (new lines 1-2) and
/// `path/to/file2` (new line 1).
pub fn two_file_diff() -> String {
    "\
diff --git a/path/to/file1 b/path/to/file1
--- a/path/to/file1
+++ b/path/to/file1
@@ -0,0 +1,2 @@
+line one
+line two
diff --git a/path/to/file2 b/path/to/file2
--- a/path/to/file2
+++ b/path/to/file2
@@ -0,0 +1,1 @@
+line one
"
    .to_string()
}

/// The canonical three-finding scenario: MAJOR and CRITICAL in file1
/// (lines 1 and 2), INFO in file2 (line 1) — all inside [`two_file_diff`].
pub fn three_findings() -> FindingSet {
    FindingSet::from_vec(vec![
        Finding::new(Severity::Major, "rule1", "message1", "path/to/file1", 1),
        Finding::new(Severity::Critical, "rule2", "message2", "path/to/file1", 2),
        Finding::new(Severity::Info, "rule3", "message3", "path/to/file2", 1),
    ])
}

/// One recorded inline-comment call.
#[derive(Debug, Clone)]
pub struct CommentCall {
    pub text: String,
    pub path: String,
    pub line: u64,
    pub kind: SegmentKind,
}

/// One recorded task call.
#[derive(Debug, Clone)]
pub struct TaskCall {
    pub comment_id: u64,
    pub text: String,
}

/// Snapshot of every remote call the mock has seen.
#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub fetch_diff: usize,
    pub fetch_comments: Vec<String>,
    pub publish_comment: Vec<CommentCall>,
    pub general_comments: Vec<String>,
    pub publish_task: Vec<TaskCall>,
    pub approve: usize,
    pub reset_approval: usize,
    pub get_pull_request: usize,
    pub get_user: usize,
    pub add_reviewer: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    calls: Calls,
    comments: HashMap<String, Vec<PostedComment>>,
    reviewers: Vec<String>,
    fail_comment_texts: HashSet<String>,
    fail_tasks: bool,
    fail_diff: bool,
    fail_approval: bool,
    fail_pull_request: bool,
    next_comment_id: u64,
}

/// Recording [`ReviewServer`] double.
#[derive(Debug, Default)]
pub struct MockServer {
    state: Mutex<State>,
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_comment_id: 1000,
                ..State::default()
            }),
        }
    }

    pub fn pr_id() -> PullRequestId {
        PullRequestId {
            project: "PROJ".to_string(),
            repo: "repo".to_string(),
            id: 1,
        }
    }

    pub fn seed_comments(&self, path: &str, comments: Vec<PostedComment>) {
        self.state
            .lock()
            .unwrap()
            .comments
            .insert(path.to_string(), comments);
    }

    pub fn seed_reviewer(&self, slug: &str) {
        self.state.lock().unwrap().reviewers.push(slug.to_string());
    }

    /// Makes `publish_comment` fail for this exact rendered text.
    pub fn fail_comment_with_text(&self, text: String) {
        self.state.lock().unwrap().fail_comment_texts.insert(text);
    }

    pub fn fail_tasks(&self) {
        self.state.lock().unwrap().fail_tasks = true;
    }

    pub fn fail_diff(&self) {
        self.state.lock().unwrap().fail_diff = true;
    }

    /// Makes both `approve` and `reset_approval` fail.
    pub fn fail_approval(&self) {
        self.state.lock().unwrap().fail_approval = true;
    }

    pub fn fail_pull_request(&self) {
        self.state.lock().unwrap().fail_pull_request = true;
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls.clone()
    }

    fn transport_error() -> crate::errors::Error {
        TransportError::Server(500).into()
    }
}

impl ReviewServer for MockServer {
    async fn fetch_diff(&self, _id: &PullRequestId) -> ReportResult<Vec<FileDiff>> {
        let mut state = self.state.lock().unwrap();
        state.calls.fetch_diff += 1;
        if state.fail_diff {
            return Err(Self::transport_error());
        }
        Ok(parse_unified_diff(&two_file_diff())?)
    }

    async fn fetch_comments(
        &self,
        _id: &PullRequestId,
        path: &str,
    ) -> ReportResult<Vec<PostedComment>> {
        let mut state = self.state.lock().unwrap();
        state.calls.fetch_comments.push(path.to_string());
        Ok(state.comments.get(path).cloned().unwrap_or_default())
    }

    async fn publish_comment(
        &self,
        _id: &PullRequestId,
        text: &str,
        path: &str,
        line: u64,
        kind: SegmentKind,
    ) -> ReportResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.calls.publish_comment.push(CommentCall {
            text: text.to_string(),
            path: path.to_string(),
            line,
            kind,
        });
        if state.fail_comment_texts.contains(text) {
            return Err(Self::transport_error());
        }
        state.next_comment_id += 1;
        Ok(state.next_comment_id)
    }

    async fn publish_general_comment(
        &self,
        _id: &PullRequestId,
        text: &str,
    ) -> ReportResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.general_comments.push(text.to_string());
        Ok(())
    }

    async fn publish_task(&self, comment_id: u64, text: &str) -> ReportResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.publish_task.push(TaskCall {
            comment_id,
            text: text.to_string(),
        });
        if state.fail_tasks {
            return Err(Self::transport_error());
        }
        Ok(())
    }

    async fn approve(&self, _id: &PullRequestId) -> ReportResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.approve += 1;
        if state.fail_approval {
            return Err(Self::transport_error());
        }
        Ok(())
    }

    async fn reset_approval(&self, _id: &PullRequestId) -> ReportResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.reset_approval += 1;
        if state.fail_approval {
            return Err(Self::transport_error());
        }
        Ok(())
    }

    async fn get_pull_request(&self, _id: &PullRequestId) -> ReportResult<PullRequestInfo> {
        let mut state = self.state.lock().unwrap();
        state.calls.get_pull_request += 1;
        if state.fail_pull_request {
            return Err(Self::transport_error());
        }
        Ok(PullRequestInfo {
            version: 1,
            reviewer_slugs: state.reviewers.clone(),
        })
    }

    async fn get_user(&self, slug: &str) -> ReportResult<UserInfo> {
        let mut state = self.state.lock().unwrap();
        state.calls.get_user += 1;
        Ok(UserInfo {
            id: 1,
            name: slug.to_string(),
            slug: slug.to_string(),
        })
    }

    async fn add_reviewer(
        &self,
        _id: &PullRequestId,
        _version: u64,
        user: &UserInfo,
    ) -> ReportResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.add_reviewer.push(user.slug.clone());
        state.reviewers.push(user.slug.clone());
        Ok(())
    }
}
