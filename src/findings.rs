//! Analysis findings as delivered by the external analysis engine.
//!
//! A `Finding` is immutable once constructed; the `FindingSet` keeps
//! discovery order so a run processes findings deterministically.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Ordered severity scale used by both the comment and the task gates.
///
/// The derived `Ord` follows declaration order: INFO < MINOR < MAJOR <
/// CRITICAL < BLOCKER.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Minor,
    Major,
    Critical,
    Blocker,
}

impl Severity {
    /// Canonical upper-case name as the analysis engine reports it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Minor => "MINOR",
            Severity::Major => "MAJOR",
            Severity::Critical => "CRITICAL",
            Severity::Blocker => "BLOCKER",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "MINOR" => Ok(Severity::Minor),
            "MAJOR" => Ok(Severity::Major),
            "CRITICAL" => Ok(Severity::Critical),
            "BLOCKER" => Ok(Severity::Blocker),
            other => Err(ConfigError::InvalidSeverity(other.to_string())),
        }
    }
}

/// One reported issue from the analysis engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    /// Rule identifier, e.g. "squid:S1135".
    pub rule: String,
    pub message: String,
    /// Repository-relative file path.
    pub path: String,
    /// 1-based line in the source file (new side of the change).
    pub line: u64,
}

impl Finding {
    pub fn new(
        severity: Severity,
        rule: impl Into<String>,
        message: impl Into<String>,
        path: impl Into<String>,
        line: u64,
    ) -> Self {
        Self {
            severity,
            rule: rule.into(),
            message: message.into(),
            path: path.into(),
            line,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {}:{} ({})",
            self.severity, self.message, self.path, self.line, self.rule
        )
    }
}

/// Ordered collection of findings for one analysis run.
///
/// Insertion order is discovery order; the set is read-only once handed
/// to the reporting entry points.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingSet {
    findings: Vec<Finding>,
}

impl FindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(findings: Vec<Finding>) -> Self {
        Self { findings }
    }

    pub fn add(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    /// Total number of findings in this run.
    pub fn count(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter()
    }

    /// Number of findings at exactly the given severity.
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }
}
