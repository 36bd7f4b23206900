//! Unified-diff parsing and the per-run diff index.
//!
//! Features:
//! - Tracks per-file headers (`diff --git`, `+++`) so one multi-file diff
//!   splits into `FileDiff` entries.
//! - Inside a hunk the declared line counts are authoritative: content
//!   lines are consumed until both counts are exhausted, so removed lines
//!   starting `--` or added lines starting `++` stay hunk content instead
//!   of being mistaken for file headers.
//! - Ignores `\ No newline at end of file` marker lines.
//! - Skips binary patches (`GIT binary patch`, `Binary files ... differ`).
//!
//! The index answers the one question the engine needs: does a
//! (file, source-line) pair fall inside the pull request's diff, and if so
//! on which diff-relative line and in which segment type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::ParseError;

/// Segment type of a diff line, mirrored in the review server's anchor API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SegmentKind {
    Context,
    Added,
    Removed,
}

impl SegmentKind {
    /// Wire name expected by the review server.
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentKind::Context => "CONTEXT",
            SegmentKind::Added => "ADDED",
            SegmentKind::Removed => "REMOVED",
        }
    }
}

/// One changed line inside a diff hunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DiffLine {
    Added {
        new_line: u64,
        content: String,
    },
    Removed {
        old_line: u64,
        content: String,
    },
    Context {
        old_line: u64,
        new_line: u64,
        content: String,
    },
}

/// A diff hunk (continuous block of changes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: u64,
    pub old_lines: u64,
    pub new_start: u64,
    pub new_lines: u64,
    pub lines: Vec<DiffLine>,
}

/// File-level change and its hunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileDiff {
    /// New-side path (repository-relative).
    pub path: String,
    pub hunks: Vec<DiffHunk>,
}

/// A resolved diff position for a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffPosition {
    /// Diff-relative line (destination numbering).
    pub line: u64,
    pub kind: SegmentKind,
}

/// Read-only mapping from file path to its diff hunks, built once per run.
#[derive(Debug, Clone, Default)]
pub struct DiffIndex {
    files: HashMap<String, Vec<DiffHunk>>,
}

impl DiffIndex {
    pub fn from_files(files: Vec<FileDiff>) -> Self {
        let mut map: HashMap<String, Vec<DiffHunk>> = HashMap::new();
        for f in files {
            map.entry(f.path).or_default().extend(f.hunks);
        }
        Self { files: map }
    }

    /// Resolves a (file, source-line) pair to its diff position.
    ///
    /// A source line is "in the diff" only when it falls inside a hunk of
    /// that exact file; added and context lines match on their new-side
    /// numbering. Removed lines have no new-side counterpart and never
    /// match a finding's source line.
    pub fn resolve(&self, path: &str, source_line: u64) -> Option<DiffPosition> {
        let hunks = self.files.get(self.normalize_path(path)?)?;
        for hunk in hunks {
            for line in &hunk.lines {
                match line {
                    DiffLine::Added { new_line, .. } if *new_line == source_line => {
                        return Some(DiffPosition {
                            line: *new_line,
                            kind: SegmentKind::Added,
                        });
                    }
                    DiffLine::Context { new_line, .. } if *new_line == source_line => {
                        return Some(DiffPosition {
                            line: *new_line,
                            kind: SegmentKind::Context,
                        });
                    }
                    _ => {}
                }
            }
        }
        None
    }

    /// Returns the diff's own path string for a finding's path, or `None`
    /// when the file is not part of the diff.
    ///
    /// Matching is exact (case-sensitive); a leading `./` on the finding
    /// side is tolerated since some engines report paths that way.
    pub fn normalize_path<'a>(&'a self, path: &str) -> Option<&'a str> {
        if let Some((key, _)) = self.files.get_key_value(path) {
            return Some(key.as_str());
        }
        let trimmed = path.strip_prefix("./")?;
        self.files.get_key_value(trimmed).map(|(k, _)| k.as_str())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Parses a multi-file unified diff into per-file hunks.
///
/// Robust to prelude noise between files; only `+++` headers and `@@`
/// hunk headers drive the state machine. A hunk header whose numbers do
/// not parse is an error: the counts are what delimits hunk content, so
/// a corrupt header would silently misattribute lines.
pub fn parse_unified_diff(s: &str) -> Result<Vec<FileDiff>, ParseError> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut cur_path: Option<String> = None;
    let mut cur_hunks: Vec<DiffHunk> = Vec::new();

    let mut cur_old_start = 0u64;
    let mut cur_old_lines = 0u64;
    let mut cur_new_start = 0u64;
    let mut cur_new_lines = 0u64;
    let mut lines_buf: Vec<DiffLine> = Vec::new();
    let mut old_line = 0u64;
    let mut new_line = 0u64;
    let mut remaining_old = 0u64;
    let mut remaining_new = 0u64;
    let mut in_hunk = false;

    macro_rules! flush_hunk {
        () => {
            if in_hunk && !lines_buf.is_empty() {
                cur_hunks.push(DiffHunk {
                    old_start: cur_old_start,
                    old_lines: cur_old_lines,
                    new_start: cur_new_start,
                    new_lines: cur_new_lines,
                    lines: std::mem::take(&mut lines_buf),
                });
            }
            in_hunk = false;
        };
    }
    macro_rules! flush_file {
        () => {
            flush_hunk!();
            match cur_path.take() {
                Some(path) if !cur_hunks.is_empty() => files.push(FileDiff {
                    path,
                    hunks: std::mem::take(&mut cur_hunks),
                }),
                // Hunks without a file header have nothing to attach to.
                _ => cur_hunks.clear(),
            }
        };
    }

    for line in s.lines() {
        if in_hunk && remaining_old == 0 && remaining_new == 0 {
            flush_hunk!();
        }

        if in_hunk {
            // Content until the counts run out; a leading '-'/'+' here is
            // always diff markup, never a file header.
            if line.starts_with('\\') {
                // "\ No newline at end of file" is not diff content.
                continue;
            }
            if let Some(rest) = line.strip_prefix('+') {
                lines_buf.push(DiffLine::Added {
                    new_line,
                    content: rest.to_string(),
                });
                new_line += 1;
                remaining_new = remaining_new.saturating_sub(1);
            } else if let Some(rest) = line.strip_prefix('-') {
                lines_buf.push(DiffLine::Removed {
                    old_line,
                    content: rest.to_string(),
                });
                old_line += 1;
                remaining_old = remaining_old.saturating_sub(1);
            } else {
                let content = line.strip_prefix(' ').unwrap_or(line);
                lines_buf.push(DiffLine::Context {
                    old_line,
                    new_line,
                    content: content.to_string(),
                });
                old_line += 1;
                new_line += 1;
                remaining_old = remaining_old.saturating_sub(1);
                remaining_new = remaining_new.saturating_sub(1);
            }
            continue;
        }

        if line.starts_with("diff --git ") || looks_like_binary_patch(line) {
            flush_file!();
            continue;
        }
        if let Some(rest) = line.strip_prefix("+++ ") {
            // New-side header names the file; "+++ /dev/null" means deleted.
            flush_file!();
            let p = rest.trim();
            if p != "/dev/null" {
                cur_path = Some(strip_diff_prefix(p).to_string());
            }
            continue;
        }
        if line.starts_with("@@") {
            // "@@ -12,7 +12,9 @@ optional section heading"
            let body = line.trim_start_matches('@');
            let body = body.split("@@").next().unwrap_or(body).trim();
            let (left, right) = body
                .split_once('+')
                .ok_or_else(|| ParseError::InvalidHunkHeader(line.to_string()))?;
            let (o_start, o_len) = split_nums(left.trim().trim_start_matches('-'))
                .ok_or_else(|| ParseError::InvalidHunkHeader(line.to_string()))?;
            let (n_start, n_len) = split_nums(right.trim())
                .ok_or_else(|| ParseError::InvalidHunkHeader(line.to_string()))?;
            cur_old_start = o_start;
            cur_old_lines = o_len;
            cur_new_start = n_start;
            cur_new_lines = n_len;
            old_line = o_start;
            new_line = n_start;
            remaining_old = o_len;
            remaining_new = n_len;
            in_hunk = true;
            continue;
        }
        // Prelude noise ("--- a/...", index lines, mode changes) until the
        // next header.
    }

    flush_file!();
    Ok(files)
}

/// Strips the conventional `a/`/`b/` prefix from a diff header path.
fn strip_diff_prefix(p: &str) -> &str {
    p.strip_prefix("a/")
        .or_else(|| p.strip_prefix("b/"))
        .unwrap_or(p)
}

/// Splits "12,7" into (start, len); a bare "12" means one line.
fn split_nums(s: &str) -> Option<(u64, u64)> {
    let s = s.trim();
    if let Some((a, b)) = s.split_once(',') {
        Some((a.parse().ok()?, b.parse().ok()?))
    } else {
        Some((s.parse().ok()?, 1))
    }
}

/// Simple heuristic to detect binary patches or messages in unified diff.
fn looks_like_binary_patch(s: &str) -> bool {
    s.contains("GIT binary patch")
        || s.starts_with("Binary files ")
        || (s.starts_with("Files ") && s.contains(" differ"))
}
