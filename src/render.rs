//! Markdown rendering for findings, overview and summary comments.
//!
//! Rendering is pure and deterministic; the engine depends on the
//! [`RenderFinding`] capability so alternative renderers can be substituted
//! without touching the correlation logic.

use crate::findings::{Finding, FindingSet, Severity};

/// Capability for turning one finding into a comment body.
pub trait RenderFinding {
    fn render(&self, finding: &Finding, base_url: &str) -> String;
}

/// Default renderer: severity, message and a link to the rule description.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl RenderFinding for MarkdownRenderer {
    fn render(&self, finding: &Finding, base_url: &str) -> String {
        format!(
            "*{}* - {} [[{}]]({}/coding_rules#rule_key={})",
            finding.severity,
            finding.message,
            finding.rule,
            base_url.trim_end_matches('/'),
            urlencoding::encode(&finding.rule)
        )
    }
}

const SEVERITIES_DESC: [Severity; 5] = [
    Severity::Blocker,
    Severity::Critical,
    Severity::Major,
    Severity::Minor,
    Severity::Info,
];

/// High-level overview comment: total count, threshold verdict and a
/// per-severity breakdown. Published at most once per run.
pub fn render_overview(findings: &FindingSet, base_url: &str, issue_threshold: usize) -> String {
    let total = findings.count();
    let mut out = String::new();
    out.push_str("## Code analysis overview\n\n");
    if total == 0 {
        out.push_str("No issue detected in this pull request.\n");
        return out;
    }
    out.push_str(&format!("**{} issue(s)** detected in this pull request.\n\n", total));
    if total > issue_threshold {
        out.push_str(&format!(
            "Issue count exceeds the configured threshold ({}); \
             per-issue comments were not posted for this run.\n\n",
            issue_threshold
        ));
    }
    out.push_str("| Severity | Count |\n|---|---|\n");
    for sev in SEVERITIES_DESC {
        let n = findings.count_by_severity(sev);
        if n > 0 {
            out.push_str(&format!("| {} | {} |\n", sev, n));
        }
    }
    out.push_str(&format!(
        "\nFull analysis available at {}\n",
        base_url.trim_end_matches('/')
    ));
    out
}

/// Condensed one-paragraph summary comment.
pub fn render_summary(findings: &FindingSet, issue_threshold: usize) -> String {
    let total = findings.count();
    if total == 0 {
        return "Code analysis: no issue detected.".to_string();
    }
    let worst = SEVERITIES_DESC
        .into_iter()
        .find(|s| findings.count_by_severity(*s) > 0)
        .unwrap_or(Severity::Info);
    format!(
        "Code analysis: {} issue(s), worst severity {}{}.",
        total,
        worst,
        if total > issue_threshold {
            " (threshold exceeded)"
        } else {
            ""
        }
    )
}
