//! Consistency verification report types.
//!
//! The verifier runs an ordered checklist over a run's artifacts and records
//! one `CheckOutcome` per item. Failures are accumulated so a single run
//! shows every problem; the verdict is `Valid` only if nothing failed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Failure classes, mirroring the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MissingArtifact,
    MalformedInput,
    HashMismatch,
    ChainBroken,
    PolicyViolation,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::MissingArtifact => "MissingArtifact",
            FailureKind::MalformedInput => "MalformedInput",
            FailureKind::HashMismatch => "HashMismatch",
            FailureKind::ChainBroken => "ChainBroken",
            FailureKind::PolicyViolation => "PolicyViolation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail { kind: FailureKind },
    /// The check could not apply (e.g. nothing tracked to compare against).
    Skip,
}

/// The result of one checklist item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Stable identifier, e.g. `manifest:evidence/r1.json`.
    pub check: String,
    #[serde(flatten)]
    pub status: CheckStatus,
    pub message: String,
}

impl CheckOutcome {
    pub fn pass(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            status: CheckStatus::Pass,
            message: message.into(),
        }
    }

    pub fn fail(check: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            status: CheckStatus::Fail { kind },
            message: message.into(),
        }
    }

    pub fn skip(check: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            status: CheckStatus::Skip,
            message: message.into(),
        }
    }

    pub fn failed(&self) -> bool {
        matches!(self.status, CheckStatus::Fail { .. })
    }

    /// One printable line: `OK   <check>: <message>` and friends.
    pub fn line(&self) -> String {
        match &self.status {
            CheckStatus::Pass => format!("OK   {}: {}", self.check, self.message),
            CheckStatus::Fail { kind } => {
                format!("FAIL {}: [{}] {}", self.check, kind, self.message)
            }
            CheckStatus::Skip => format!("SKIP {}: {}", self.check, self.message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Valid,
    Invalid,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Valid => f.write_str("VALID"),
            Verdict::Invalid => f.write_str("INVALID"),
        }
    }
}

/// The full result of verifying one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub run_id: String,
    pub checks: Vec<CheckOutcome>,
    pub verdict: Verdict,
}

impl VerificationReport {
    /// Derive the verdict from the accumulated checks.
    pub fn from_checks(run_id: impl Into<String>, checks: Vec<CheckOutcome>) -> Self {
        let verdict = if checks.iter().any(CheckOutcome::failed) {
            Verdict::Invalid
        } else {
            Verdict::Valid
        };
        Self {
            run_id: run_id.into(),
            checks,
            verdict,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.verdict == Verdict::Valid
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.checks.iter().filter(|c| c.failed())
    }

    /// Outcome of a named check, if it ran.
    pub fn check(&self, check: &str) -> Option<&CheckOutcome> {
        self.checks.iter().find(|c| c.check == check)
    }

    /// Every printable line, ending with the verdict.
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.checks.len() + 3);
        lines.push("AIGOV VERIFICATION REPORT".to_string());
        lines.push(format!("run_id: {}", self.run_id));
        lines.extend(self.checks.iter().map(CheckOutcome::line));
        lines.push(format!("VERDICT {}", self.verdict));
        lines
    }
}
