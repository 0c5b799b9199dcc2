//! # aigov-verify
//!
//! Independent consistency verification of a run's audit bundle.
//!
//! [`ConsistencyVerifier`] reads the evidence log, audit record, report and
//! manifest of a run from disk and produces a
//! [`VerificationReport`](aigov_contracts::verify::VerificationReport): one
//! OK/FAIL/SKIP outcome per check and a final `VALID`/`INVALID` verdict.
//! It shares no state with the writers, so it can run in CI against a
//! checked-out docs tree.
//!
//! ```rust,ignore
//! let verifier = ConsistencyVerifier::new(ArtifactLayout::new("docs"))
//!     .with_policy(Box::new(TomlPolicy::builtin()?))
//!     .with_mode(ExecutionMode::Prod);
//! let report = verifier.verify("r1")?;
//! for line in report.render_lines() {
//!     println!("{line}");
//! }
//! ```

pub mod engine;

pub use engine::ConsistencyVerifier;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::{json, Value};
    use tempfile::TempDir;

    use aigov_audit::{EvidenceLedger, FsEvidenceStore};
    use aigov_bundle::{BundleExporter, ReportWriter};
    use aigov_contracts::{
        event::NewEvent,
        layout::ArtifactLayout,
        mode::ExecutionMode,
        verify::{CheckStatus, FailureKind, VerificationReport},
    };
    use aigov_policy::TomlPolicy;

    use crate::ConsistencyVerifier;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn new_event(event_type: &str, p: Value) -> NewEvent {
        NewEvent {
            run_id: "r1".to_string(),
            event_type: event_type.to_string(),
            actor: "system".to_string(),
            system: "aigov_poc".to_string(),
            payload: p.as_object().cloned().expect("payload must be an object"),
            event_id: None,
            ts_utc: Some("2026-10-15T12:00:00.000000Z".to_string()),
        }
    }

    /// Record a full promotion workflow for `r1`, write its report and
    /// export its bundle. `evaluation_extra` is merged into the evaluation
    /// payload.
    fn governed_run(policy_version: Option<&str>, evaluation_extra: Value) -> (TempDir, ArtifactLayout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        let ledger = EvidenceLedger::new(FsEvidenceStore::new(layout.clone()))
            .with_policy(Box::new(TomlPolicy::builtin().unwrap()))
            .with_policy_version(policy_version.map(str::to_string));

        let mut evaluation = json!({
            "metric": "accuracy",
            "value": 0.9,
            "threshold": 0.8,
            "passed": true
        });
        if let (Some(target), Some(extra)) = (evaluation.as_object_mut(), evaluation_extra.as_object()) {
            target.extend(extra.clone());
        }

        ledger
            .append(new_event(
                "data_registered",
                json!({"dataset": "iris", "dataset_fingerprint": "9f2c", "n_rows": 150}),
            ))
            .unwrap();
        ledger
            .append(new_event("model_trained", json!({"model": "logreg"})))
            .unwrap();
        ledger
            .append(new_event("evaluation_reported", evaluation))
            .unwrap();
        ledger
            .append(new_event(
                "human_approved",
                json!({
                    "scope": "model_promoted",
                    "decision": "approve",
                    "approver": "compliance_officer",
                    "justification": "accuracy above threshold"
                }),
            ))
            .unwrap();

        ReportWriter::new(layout.clone(), ExecutionMode::Ci)
            .write("r1", false)
            .unwrap();
        BundleExporter::new(layout.clone()).export("r1").unwrap();
        (dir, layout)
    }

    fn verifier(layout: &ArtifactLayout, mode: ExecutionMode) -> ConsistencyVerifier {
        ConsistencyVerifier::new(layout.clone())
            .with_policy(Box::new(TomlPolicy::builtin().unwrap()))
            .with_mode(mode)
    }

    fn failure_kind(report: &VerificationReport, check: &str) -> Option<FailureKind> {
        match &report.check(check)?.status {
            CheckStatus::Fail { kind } => Some(*kind),
            _ => None,
        }
    }

    // ── 1. valid bundle ───────────────────────────────────────────────────────

    /// A freshly exported bundle verifies in both modes.
    #[test]
    fn test_valid_bundle() {
        let (_dir, layout) = governed_run(Some("v0.4_human_approval"), json!({}));

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert!(report.is_valid(), "{:#?}", report.render_lines());
        assert_eq!(report.check("audit_self_hash").unwrap().status, CheckStatus::Pass);
        assert_eq!(report.check("policy:ci").unwrap().status, CheckStatus::Pass);

        let report = verifier(&layout, ExecutionMode::Prod).verify("r1").unwrap();
        assert!(report.is_valid(), "{:#?}", report.render_lines());

        let lines = report.render_lines();
        assert_eq!(lines.first().unwrap(), "AIGOV VERIFICATION REPORT");
        assert_eq!(lines.last().unwrap(), "VERDICT VALID");
    }

    /// Three events, report, export: valid. Then the evaluation value is
    /// edited in place without rehashing: the chain check fails.
    #[test]
    fn test_end_to_end_three_event_run() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(dir.path());
        let ledger = EvidenceLedger::new(FsEvidenceStore::new(layout.clone()))
            .with_policy(Box::new(TomlPolicy::builtin().unwrap()))
            .with_policy_version(Some("v0.4_human_approval".to_string()));
        for (event_type, payload) in [
            (
                "data_registered",
                json!({"dataset": "iris", "dataset_fingerprint": "9f2c"}),
            ),
            (
                "evaluation_reported",
                json!({"metric": "accuracy", "value": 0.9, "threshold": 0.8, "passed": true}),
            ),
            (
                "human_approved",
                json!({
                    "scope": "model_promoted",
                    "decision": "approve",
                    "approver": "compliance_officer",
                    "justification": "metrics reviewed"
                }),
            ),
        ] {
            ledger.append(new_event(event_type, payload)).unwrap();
        }
        ReportWriter::new(layout.clone(), ExecutionMode::Ci)
            .write("r1", false)
            .unwrap();
        BundleExporter::new(layout.clone()).export("r1").unwrap();

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert_eq!(report.render_lines().last().unwrap(), "VERDICT VALID");

        let path = layout.evidence_path("r1");
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"value\": 0.9"));
        fs::write(&path, text.replacen("\"value\": 0.9", "\"value\": 0.1", 1)).unwrap();

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert_eq!(failure_kind(&report, "chain:integrity"), Some(FailureKind::ChainBroken));
        assert!(report
            .render_lines()
            .iter()
            .any(|l| l.starts_with("FAIL chain:integrity: [ChainBroken] event 1 ")));
        assert_eq!(report.render_lines().last().unwrap(), "VERDICT INVALID");
    }

    /// Without a policy gate the policy check is skipped, not failed.
    #[test]
    fn test_no_policy_is_skip() {
        let (_dir, layout) = governed_run(Some("v1"), json!({}));
        let report = ConsistencyVerifier::new(layout).verify("r1").unwrap();
        assert!(report.is_valid());
        assert_eq!(report.check("policy:ci").unwrap().status, CheckStatus::Skip);
    }

    // ── 2. tampering ──────────────────────────────────────────────────────────

    /// Editing an evaluation value after export breaks the chain and every
    /// hash binding of the evidence.
    #[test]
    fn test_tampered_evidence_is_invalid() {
        let (_dir, layout) = governed_run(Some("v1"), json!({}));
        let path = layout.evidence_path("r1");
        let mut doc: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        doc["events"][2]["payload"]["value"] = json!(0.1);
        fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.render_lines().last().unwrap(), "VERDICT INVALID");

        assert_eq!(failure_kind(&report, "chain:integrity"), Some(FailureKind::ChainBroken));
        assert!(report.check("chain:integrity").unwrap().message.contains("event 2"));
        assert_eq!(
            failure_kind(&report, "audit:evidence_sha256"),
            Some(FailureKind::HashMismatch)
        );
        assert_eq!(
            failure_kind(&report, "manifest:evidence/r1.json"),
            Some(FailureKind::HashMismatch)
        );
        assert_eq!(
            failure_kind(&report, "audit:bundle_sha256"),
            Some(FailureKind::HashMismatch)
        );
        // Unrelated artifacts still check out.
        assert_eq!(
            report.check("manifest:reports/r1.md").unwrap().status,
            CheckStatus::Pass
        );
    }

    /// A report whose header no longer echoes the fingerprint is caught
    /// both by the header comparison and by the recorded report hash.
    #[test]
    fn test_edited_report_header_is_invalid() {
        let (_dir, layout) = governed_run(Some("v1"), json!({}));
        let path = layout.report_path("r1");
        let text = fs::read_to_string(&path).unwrap();
        let edited: String = text
            .lines()
            .map(|l| {
                if l.starts_with("bundle_sha256=") {
                    format!("bundle_sha256={}", "0".repeat(64))
                } else {
                    l.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(&path, edited).unwrap();

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert!(!report.is_valid());
        assert_eq!(
            failure_kind(&report, "report_header:bundle_sha256"),
            Some(FailureKind::HashMismatch)
        );
        assert_eq!(
            report.check("report_header:run_id").unwrap().status,
            CheckStatus::Pass
        );
        assert_eq!(
            failure_kind(&report, "audit:report_sha256"),
            Some(FailureKind::HashMismatch)
        );
        assert_eq!(report.check("chain:integrity").unwrap().status, CheckStatus::Pass);
    }

    /// Editing the audit record is caught by its sidecar.
    #[test]
    fn test_edited_audit_record_fails_self_hash() {
        let (_dir, layout) = governed_run(Some("v1"), json!({}));
        let path = layout.audit_path("r1");
        let mut doc: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        doc["generated_ts_utc"] = json!("2020-01-01T00:00:00Z");
        fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert_eq!(
            failure_kind(&report, "audit_self_hash"),
            Some(FailureKind::HashMismatch)
        );
        assert_eq!(
            failure_kind(&report, "manifest:audit/r1.json"),
            Some(FailureKind::HashMismatch)
        );
    }

    /// Recorded hashes that are not hex digests are malformed, not mismatched.
    #[test]
    fn test_recorded_hashes_must_be_digests() {
        let (_dir, layout) = governed_run(Some("v1"), json!({}));
        let path = layout.audit_path("r1");
        let mut doc: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        doc["hashes"]["evidence_sha256"] = json!("not-a-digest");
        let edited = serde_json::to_vec_pretty(&doc).unwrap();
        fs::write(&path, &edited).unwrap();
        fs::write(layout.audit_sha_path("r1"), "ZZZ  r1.json\n").unwrap();

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert_eq!(
            failure_kind(&report, "audit:evidence_sha256"),
            Some(FailureKind::MalformedInput)
        );
        assert_eq!(
            failure_kind(&report, "audit_self_hash"),
            Some(FailureKind::MalformedInput)
        );
        assert_eq!(report.check("audit:report_sha256").unwrap().status, CheckStatus::Pass);
        assert!(!report.is_valid());
    }

    /// A missing sidecar is a skip; the rest of the bundle still decides.
    #[test]
    fn test_missing_sidecar_is_skip() {
        let (_dir, layout) = governed_run(Some("v1"), json!({}));
        fs::remove_file(layout.audit_sha_path("r1")).unwrap();
        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert_eq!(report.check("audit_self_hash").unwrap().status, CheckStatus::Skip);
        assert!(report.is_valid());
    }

    // ── 3. structural failures ────────────────────────────────────────────────

    /// A missing artifact stops verification after the presence checks.
    #[test]
    fn test_missing_manifest_short_circuits() {
        let (_dir, layout) = governed_run(Some("v1"), json!({}));
        fs::remove_file(layout.manifest_path("r1")).unwrap();

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert!(!report.is_valid());
        assert_eq!(
            failure_kind(&report, "presence:manifest"),
            Some(FailureKind::MissingArtifact)
        );
        assert!(report.checks.iter().all(|c| c.check.starts_with("presence:")));
        assert_eq!(report.checks.len(), 4);
    }

    /// Nothing on disk: one failure per required artifact.
    #[test]
    fn test_empty_docs_root() {
        let dir = tempfile::tempdir().unwrap();
        let report = ConsistencyVerifier::new(ArtifactLayout::new(dir.path()))
            .verify("r1")
            .unwrap();
        assert_eq!(report.failures().count(), 4);
    }

    /// An unparsable audit record fails parsing and skips what depends on it.
    #[test]
    fn test_malformed_audit_record() {
        let (_dir, layout) = governed_run(Some("v1"), json!({}));
        fs::write(layout.audit_path("r1"), "{ not json").unwrap();

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert_eq!(failure_kind(&report, "parse:audit"), Some(FailureKind::MalformedInput));
        assert_eq!(report.check("audit").unwrap().status, CheckStatus::Skip);
        assert_eq!(report.check("report_header").unwrap().status, CheckStatus::Skip);
        assert_eq!(report.check("chain:integrity").unwrap().status, CheckStatus::Pass);
    }

    /// Manifest entries may not point outside the docs root.
    #[test]
    fn test_manifest_path_escape() {
        let (_dir, layout) = governed_run(Some("v1"), json!({}));
        let path = layout.manifest_path("r1");
        let mut doc: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        doc["files"]["../outside.txt"] = json!("0".repeat(64));
        fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert_eq!(
            failure_kind(&report, "manifest:../outside.txt"),
            Some(FailureKind::MalformedInput)
        );
    }

    /// Dropping an artifact from the manifest is a coverage failure.
    #[test]
    fn test_manifest_coverage() {
        let (_dir, layout) = governed_run(Some("v1"), json!({}));
        let path = layout.manifest_path("r1");
        let mut doc: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        doc["files"].as_object_mut().unwrap().remove("reports/r1.md");
        fs::write(&path, serde_json::to_vec_pretty(&doc).unwrap()).unwrap();

        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert_eq!(
            failure_kind(&report, "manifest:coverage"),
            Some(FailureKind::MissingArtifact)
        );
        assert!(report.check("manifest:coverage").unwrap().message.contains("reports/r1.md"));
    }

    // ── 4. policy ─────────────────────────────────────────────────────────────

    /// An unknown policy version never verifies.
    #[test]
    fn test_unknown_policy_version_is_invalid() {
        let (_dir, layout) = governed_run(None, json!({}));
        let report = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert!(!report.is_valid());
        assert_eq!(
            failure_kind(&report, "audit:policy_version"),
            Some(FailureKind::PolicyViolation)
        );
        // Everything else is consistent.
        assert_eq!(report.failures().count(), 1);
    }

    /// Fallback evidence passes in ci and fails in prod.
    #[test]
    fn test_prod_rejects_fallback_evidence() {
        let (_dir, layout) = governed_run(Some("v1"), json!({"evidence_source": "ci_fallback"}));

        let ci = verifier(&layout, ExecutionMode::Ci).verify("r1").unwrap();
        assert!(ci.is_valid(), "{:#?}", ci.render_lines());

        let prod = verifier(&layout, ExecutionMode::Prod).verify("r1").unwrap();
        assert!(!prod.is_valid());
        let failure = prod.failures().next().unwrap();
        assert_eq!(failure.check, "policy:prod");
        assert!(failure.message.contains("ci_fallback"));
        assert!(failure.line().starts_with("FAIL policy:prod: [PolicyViolation]"));
    }

    /// A run id that could escape the docs root is rejected outright.
    #[test]
    fn test_unsafe_run_id() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConsistencyVerifier::new(ArtifactLayout::new(dir.path()))
            .verify("../r1")
            .unwrap_err();
        assert!(err.is_usage());
    }
}
