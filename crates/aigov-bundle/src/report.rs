//! Human-readable run report.
//!
//! The report is Markdown whose header block echoes the bundle fingerprint
//! and policy version. The fingerprint is computed from the evidence alone,
//! so the report can be written before the audit record exists and export
//! then hashes a report that is already correct.

use std::path::PathBuf;

use serde_json::Value;
use tracing::info;

use aigov_contracts::{
    error::{AigovError, AigovResult},
    event::{Event, EvidenceLog},
    layout::{validate_run_id, ArtifactLayout},
    mode::ExecutionMode,
    report::{header_block, split_header_line, ReportHeader},
};
use aigov_core::fsio::{read_artifact, write_atomic};

use crate::fingerprint::{bundle_fingerprint, FingerprintInputs};

/// Header key recording the mode the report was generated under. Not bound
/// by verification.
pub const HEADER_MODE: &str = "aigov_mode";

fn md_escape(s: &str) -> String {
    s.replace('|', "\\|")
}

fn field(event: Option<&Event>, key: &str) -> String {
    match event.and_then(|e| e.payload.get(key)) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn code(s: &str) -> String {
    format!("`{}`", md_escape(s))
}

/// Render a complete report for `log`.
pub fn render_report(log: &EvidenceLog, header: &ReportHeader, mode: ExecutionMode) -> String {
    let data = log.latest_of_type("data_registered");
    let evaluation = log.latest_of_type("evaluation_reported");
    let approval = log.latest_of_type("human_approved");
    let promotion = log.latest_of_type("model_promoted");
    let first = log.events.first();

    let mut out: Vec<String> = vec![
        format!("# Audit report for run `{}`", header.run_id),
        String::new(),
    ];
    out.extend(header.lines());
    out.push(format!("{HEADER_MODE}={mode}"));
    out.push(String::new());

    out.push("## Summary".to_string());
    out.push(String::new());
    out.push(format!("- System: {}", code(first.map_or("", |e| e.system.as_str()))));
    out.push(format!("- Actor: {}", code(first.map_or("", |e| e.actor.as_str()))));
    out.push(format!("- Policy version: {}", code(&header.policy_version)));
    out.push(format!("- Execution mode: {}", code(mode.as_str())));
    out.push(format!(
        "- Evidence log: {}",
        code(&ArtifactLayout::evidence_rel(&header.run_id))
    ));
    out.push(format!(
        "- Evidence chain head: {}",
        code(log.head().unwrap_or("none"))
    ));
    out.push(format!("- Events recorded: {}", log.events.len()));
    out.push(String::new());

    out.push("## Data traceability".to_string());
    out.push(String::new());
    out.push("| Item | Value |".to_string());
    out.push("|---|---|".to_string());
    for (label, key) in [
        ("Dataset", "dataset"),
        ("Dataset fingerprint", "dataset_fingerprint"),
        ("Rows", "n_rows"),
        ("Features", "n_features"),
    ] {
        out.push(format!("| {label} | {} |", code(&field(data, key))));
    }
    out.push(String::new());

    out.push("## Evaluation gate".to_string());
    out.push(String::new());
    out.push("| Metric | Value | Threshold | Passed |".to_string());
    out.push("|---|---:|---:|---|".to_string());
    out.push(format!(
        "| {} | {} | {} | {} |",
        code(&field(evaluation, "metric")),
        code(&field(evaluation, "value")),
        code(&field(evaluation, "threshold")),
        code(&field(evaluation, "passed")),
    ));
    out.push(String::new());

    out.push("## Human approval gate".to_string());
    out.push(String::new());
    out.push("| Scope | Decision | Approver | Justification |".to_string());
    out.push("|---|---|---|---|".to_string());
    out.push(format!(
        "| {} | {} | {} | {} |",
        code(&field(approval, "scope")),
        code(&field(approval, "decision")),
        code(&field(approval, "approver")),
        code(&field(approval, "justification")),
    ));
    out.push(String::new());

    out.push("## Promotion".to_string());
    out.push(String::new());
    if promotion.is_some() {
        out.push(format!(
            "- Promotion reason: {}",
            code(&field(promotion, "promotion_reason"))
        ));
        let artifact = field(promotion, "artifact_path");
        if !artifact.is_empty() {
            out.push(format!("- Artifact path: {}", code(&artifact)));
        }
    } else {
        out.push("- Not promoted.".to_string());
    }
    out.push(String::new());

    out.push("## Event timeline".to_string());
    out.push(String::new());
    out.push("| # | Time (UTC) | Event | Event id | Source |".to_string());
    out.push("|---:|---|---|---|---|".to_string());
    for (i, e) in log.events.iter().enumerate() {
        out.push(format!(
            "| {i} | {} | {} | {} | {} |",
            code(&e.ts_utc),
            code(&e.event_type),
            code(&e.id),
            code(e.source_label()),
        ));
    }
    out.push(String::new());

    out.join("\n")
}

/// Rewrite the binding header lines of an existing report, keeping
/// everything else.
///
/// Keys already in the header block are replaced in place, missing keys are
/// appended to the block, and a report with no header block gets one
/// inserted at the top.
pub fn fill_header(text: &str, header: &ReportHeader) -> String {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    let borrowed: Vec<&str> = text.lines().collect();

    match header_block(&borrowed) {
        Some(block) => {
            let mut missing = Vec::new();
            for (key, value) in header.pairs() {
                let existing = block
                    .clone()
                    .find(|&i| split_header_line(&lines[i]).is_some_and(|(k, _)| k == key));
                match existing {
                    Some(i) => lines[i] = format!("{key}={value}"),
                    None => missing.push(format!("{key}={value}")),
                }
            }
            let tail = lines.split_off(block.end);
            lines.extend(missing);
            lines.extend(tail);
        }
        None => {
            let mut filled: Vec<String> = header.lines().to_vec();
            filled.push(String::new());
            filled.append(&mut lines);
            lines = filled;
        }
    }

    let mut out = lines.join("\n");
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Result of writing a report.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub path: PathBuf,
    pub header: ReportHeader,
}

/// Writes `reports/<run_id>.md` from the run's evidence.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    layout: ArtifactLayout,
    mode: ExecutionMode,
}

impl ReportWriter {
    pub fn new(layout: ArtifactLayout, mode: ExecutionMode) -> Self {
        Self { layout, mode }
    }

    /// The header a report for `run_id` must carry given the current
    /// evidence, along with the parsed log.
    pub fn header_for(&self, run_id: &str) -> AigovResult<(ReportHeader, EvidenceLog)> {
        validate_run_id(run_id)?;
        let path = self.layout.evidence_path(run_id);
        let bytes = read_artifact(&path)?;
        let (inputs, log) = FingerprintInputs::from_evidence_bytes(run_id, &path, &bytes)?;
        let header = ReportHeader {
            run_id: run_id.to_string(),
            bundle_sha256: bundle_fingerprint(&inputs),
            policy_version: inputs.policy_version,
        };
        Ok((header, log))
    }

    /// Render a fresh report, or with `fill` only rewrite the header of the
    /// existing one. A missing report under `fill` is `MissingArtifact`.
    pub fn write(&self, run_id: &str, fill: bool) -> AigovResult<ReportOutcome> {
        let (header, log) = self.header_for(run_id)?;
        let path = self.layout.report_path(run_id);

        let text = if fill {
            let existing = read_artifact(&path)?;
            let existing = String::from_utf8(existing).map_err(|e| {
                AigovError::malformed(
                    path.display().to_string(),
                    format!("report is not UTF-8: {e}"),
                )
            })?;
            fill_header(&existing, &header)
        } else {
            render_report(&log, &header, self.mode)
        };
        write_atomic(&path, text.as_bytes())?;

        info!(
            run_id = %run_id,
            bundle_sha256 = %header.bundle_sha256,
            policy_version = %header.policy_version,
            fill,
            "report written"
        );
        Ok(ReportOutcome { path, header })
    }
}
