//! Cross-artifact consistency verifier.
//!
//! `ConsistencyVerifier` checks one run's artifacts against each other and
//! against their own recorded hashes. The checklist runs in a fixed order:
//!
//! 1. **Presence**: evidence log, audit record, report and manifest exist.
//! 2. **Parse**: each JSON artifact parses into its type.
//! 3. **Audit self-hash**: the audit record matches its `.sha256` sidecar.
//! 4. **Manifest**: every listed file is inside the docs root and rehashes
//!    to the recorded value; the three bundle artifacts are covered.
//! 5. **Audit bindings**: the record's hashes, chain head copy, fingerprint
//!    and policy version agree with the evidence and the report.
//! 6. **Report header**: the report echoes the record's run id,
//!    fingerprint and policy version exactly.
//! 7. **Chain integrity**: the evidence chain recomputes cleanly and every
//!    event belongs to the run.
//! 8. **Policy**: the configured `PolicyGate` reviews the log for the
//!    execution mode.
//!
//! Only a presence failure stops the run early. Every other failure is
//! recorded and the remaining checks still run, skipping those whose input
//! could not be parsed.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use aigov_audit::rebuild_and_validate;
use aigov_bundle::{
    bundle_fingerprint, export::parse_sidecar, policy_version_of, FingerprintInputs,
    UNKNOWN_POLICY_VERSION,
};
use aigov_contracts::{
    audit::{AuditRecord, Manifest},
    error::{AigovError, AigovResult},
    event::{EvidenceLog, CHAIN_ALGORITHM},
    layout::{validate_run_id, ArtifactLayout},
    mode::ExecutionMode,
    report::ReportHeader,
    verify::{CheckOutcome, FailureKind, VerificationReport},
};
use aigov_core::{
    digest::{is_sha256_hex, sha256_file, sha256_hex},
    fsio::{parse_json, read_artifact},
    traits::PolicyGate,
};

/// Raw bytes of the four required artifacts.
struct Artifacts {
    evidence: Vec<u8>,
    audit: Vec<u8>,
    report: Vec<u8>,
    manifest: Vec<u8>,
}

/// Verifies the audit bundle of a run under one docs root.
pub struct ConsistencyVerifier {
    layout: ArtifactLayout,
    policy: Option<Box<dyn PolicyGate>>,
    mode: ExecutionMode,
}

impl ConsistencyVerifier {
    /// A verifier with no policy gate, in `ci` mode.
    pub fn new(layout: ArtifactLayout) -> Self {
        Self {
            layout,
            policy: None,
            mode: ExecutionMode::default(),
        }
    }

    pub fn with_policy(mut self, policy: Box<dyn PolicyGate>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run the full checklist for `run_id`.
    ///
    /// Artifact problems never surface as `Err`; they are FAIL lines in the
    /// returned report. `Err` is reserved for an unusable run id.
    pub fn verify(&self, run_id: &str) -> AigovResult<VerificationReport> {
        validate_run_id(run_id)?;
        let mut checks: Vec<CheckOutcome> = Vec::new();

        // ── 1. presence ──────────────────────────────────────────────────────
        let Some(artifacts) = self.check_presence(run_id, &mut checks) else {
            warn!(run_id = %run_id, "required artifacts missing, verification stopped");
            return Ok(VerificationReport::from_checks(run_id, checks));
        };

        // ── 2. parse ─────────────────────────────────────────────────────────
        let log: Option<EvidenceLog> = parse_check(
            "parse:evidence",
            &self.layout.evidence_path(run_id),
            &artifacts.evidence,
            &mut checks,
        );
        let record: Option<AuditRecord> = parse_check(
            "parse:audit",
            &self.layout.audit_path(run_id),
            &artifacts.audit,
            &mut checks,
        );
        let manifest: Option<Manifest> = parse_check(
            "parse:manifest",
            &self.layout.manifest_path(run_id),
            &artifacts.manifest,
            &mut checks,
        );

        // ── 3. audit self-hash ───────────────────────────────────────────────
        self.check_audit_self_hash(run_id, &artifacts.audit, &mut checks);

        // ── 4. manifest ──────────────────────────────────────────────────────
        match &manifest {
            Some(manifest) => self.check_manifest(run_id, manifest, &mut checks),
            None => checks.push(CheckOutcome::skip("manifest", "manifest did not parse")),
        }

        // ── 5. audit bindings ────────────────────────────────────────────────
        match &record {
            Some(record) => {
                check_audit_bindings(run_id, record, log.as_ref(), &artifacts, &mut checks)
            }
            None => checks.push(CheckOutcome::skip("audit", "audit record did not parse")),
        }

        // ── 6. report header ─────────────────────────────────────────────────
        match &record {
            Some(record) => check_report_header(record, &artifacts.report, &mut checks),
            None => checks.push(CheckOutcome::skip(
                "report_header",
                "no audit record to compare against",
            )),
        }

        // ── 7. chain integrity ───────────────────────────────────────────────
        match &log {
            Some(log) => check_chain(run_id, log, &mut checks),
            None => checks.push(CheckOutcome::skip("chain", "evidence log did not parse")),
        }

        // ── 8. policy ────────────────────────────────────────────────────────
        self.check_policy(log.as_ref(), &mut checks);

        let report = VerificationReport::from_checks(run_id, checks);
        info!(
            run_id = %run_id,
            verdict = %report.verdict,
            failures = report.failures().count(),
            mode = %self.mode,
            "verification finished"
        );
        Ok(report)
    }

    fn check_presence(&self, run_id: &str, checks: &mut Vec<CheckOutcome>) -> Option<Artifacts> {
        let mut read = |name: &str, path: PathBuf| -> Option<Vec<u8>> {
            let check = format!("presence:{name}");
            match read_artifact(&path) {
                Ok(bytes) => {
                    checks.push(CheckOutcome::pass(check, path.display().to_string()));
                    Some(bytes)
                }
                Err(e) => {
                    checks.push(CheckOutcome::fail(
                        check,
                        FailureKind::MissingArtifact,
                        e.to_string(),
                    ));
                    None
                }
            }
        };

        let evidence = read("evidence", self.layout.evidence_path(run_id));
        let audit = read("audit", self.layout.audit_path(run_id));
        let report = read("report", self.layout.report_path(run_id));
        let manifest = read("manifest", self.layout.manifest_path(run_id));

        Some(Artifacts {
            evidence: evidence?,
            audit: audit?,
            report: report?,
            manifest: manifest?,
        })
    }

    fn check_audit_self_hash(&self, run_id: &str, audit: &[u8], checks: &mut Vec<CheckOutcome>) {
        const CHECK: &str = "audit_self_hash";
        let sidecar_path = self.layout.audit_sha_path(run_id);
        let bytes = match read_artifact(&sidecar_path) {
            Ok(bytes) => bytes,
            Err(AigovError::MissingArtifact { .. }) => {
                checks.push(CheckOutcome::skip(CHECK, "no self-hash sidecar tracked"));
                return;
            }
            Err(e) => {
                checks.push(CheckOutcome::fail(CHECK, FailureKind::MalformedInput, e.to_string()));
                return;
            }
        };

        let text = String::from_utf8_lossy(&bytes);
        let actual = sha256_hex(audit);
        match parse_sidecar(&text) {
            None => checks.push(CheckOutcome::fail(
                CHECK,
                FailureKind::MalformedInput,
                format!("{} is empty", sidecar_path.display()),
            )),
            Some(expected) if !is_sha256_hex(expected) => checks.push(CheckOutcome::fail(
                CHECK,
                FailureKind::MalformedInput,
                format!("{} does not hold a SHA-256 digest", sidecar_path.display()),
            )),
            Some(expected) if expected == actual => {
                checks.push(CheckOutcome::pass(CHECK, actual));
            }
            Some(expected) => checks.push(CheckOutcome::fail(
                CHECK,
                FailureKind::HashMismatch,
                format!("audit record hashes to {actual}, sidecar records {expected}"),
            )),
        }
    }

    fn check_manifest(&self, run_id: &str, manifest: &Manifest, checks: &mut Vec<CheckOutcome>) {
        if manifest.run_id == run_id {
            checks.push(CheckOutcome::pass("manifest:run_id", run_id));
        } else {
            checks.push(CheckOutcome::fail(
                "manifest:run_id",
                FailureKind::MalformedInput,
                format!("manifest declares run_id '{}'", manifest.run_id),
            ));
        }

        let required = [
            ArtifactLayout::evidence_rel(run_id),
            ArtifactLayout::report_rel(run_id),
            ArtifactLayout::audit_rel(run_id),
        ];
        let uncovered: Vec<&str> = required
            .iter()
            .filter(|rel| !manifest.files.contains_key(rel.as_str()))
            .map(String::as_str)
            .collect();
        if uncovered.is_empty() {
            checks.push(CheckOutcome::pass(
                "manifest:coverage",
                format!("{} files listed", manifest.files.len()),
            ));
        } else {
            checks.push(CheckOutcome::fail(
                "manifest:coverage",
                FailureKind::MissingArtifact,
                format!("manifest does not cover {}", uncovered.join(", ")),
            ));
        }

        for (rel, expected) in &manifest.files {
            let check = format!("manifest:{rel}");
            let Some(path) = self.layout.checked_resolve(rel) else {
                checks.push(CheckOutcome::fail(
                    check,
                    FailureKind::MalformedInput,
                    "path must be relative and stay inside the docs root",
                ));
                continue;
            };
            match sha256_file(&path) {
                Ok(actual) if &actual == expected => checks.push(CheckOutcome::pass(check, actual)),
                Ok(actual) => checks.push(CheckOutcome::fail(
                    check,
                    FailureKind::HashMismatch,
                    format!("expected {expected}, found {actual}"),
                )),
                Err(AigovError::MissingArtifact { .. }) => checks.push(CheckOutcome::fail(
                    check,
                    FailureKind::MissingArtifact,
                    format!("{} does not exist", path.display()),
                )),
                Err(e) => checks.push(CheckOutcome::fail(
                    check,
                    FailureKind::MalformedInput,
                    e.to_string(),
                )),
            }
        }
    }

    fn check_policy(&self, log: Option<&EvidenceLog>, checks: &mut Vec<CheckOutcome>) {
        let check = format!("policy:{}", self.mode);
        let Some(policy) = &self.policy else {
            checks.push(CheckOutcome::skip(check, "no policy configured"));
            return;
        };
        let Some(log) = log else {
            checks.push(CheckOutcome::skip(check, "evidence log did not parse"));
            return;
        };

        let violations = policy.review(log, self.mode);
        if violations.is_empty() {
            checks.push(CheckOutcome::pass(
                check,
                format!("{} events satisfy {} policy", log.events.len(), self.mode),
            ));
            return;
        }
        for violation in violations {
            debug!(mode = %self.mode, %violation, "policy violation");
            checks.push(CheckOutcome::fail(
                check.clone(),
                FailureKind::PolicyViolation,
                violation,
            ));
        }
    }
}

/// Parse `bytes` as `T`, recording one parse outcome.
fn parse_check<T: serde::de::DeserializeOwned>(
    check: &str,
    path: &Path,
    bytes: &[u8],
    checks: &mut Vec<CheckOutcome>,
) -> Option<T> {
    match parse_json::<T>(path, bytes) {
        Ok(value) => {
            checks.push(CheckOutcome::pass(check, "parsed"));
            Some(value)
        }
        Err(e) => {
            checks.push(CheckOutcome::fail(check, FailureKind::MalformedInput, e.to_string()));
            None
        }
    }
}

fn compare(
    checks: &mut Vec<CheckOutcome>,
    check: &str,
    kind: FailureKind,
    recorded: &str,
    actual: &str,
) {
    if recorded == actual {
        checks.push(CheckOutcome::pass(check, actual));
    } else {
        checks.push(CheckOutcome::fail(
            check,
            kind,
            format!("recorded {recorded}, found {actual}"),
        ));
    }
}

/// Like [`compare`], but a recorded value that is not a SHA-256 digest is
/// malformed rather than a mismatch.
fn compare_digest(checks: &mut Vec<CheckOutcome>, check: &str, recorded: &str, actual: &str) {
    if is_sha256_hex(recorded) {
        compare(checks, check, FailureKind::HashMismatch, recorded, actual);
    } else {
        checks.push(CheckOutcome::fail(
            check,
            FailureKind::MalformedInput,
            format!("recorded value {recorded:?} is not a SHA-256 digest"),
        ));
    }
}

fn check_audit_bindings(
    run_id: &str,
    record: &AuditRecord,
    log: Option<&EvidenceLog>,
    artifacts: &Artifacts,
    checks: &mut Vec<CheckOutcome>,
) {
    compare(checks, "audit:run_id", FailureKind::MalformedInput, &record.run_id, run_id);

    let evidence_sha256 = sha256_hex(&artifacts.evidence);
    compare_digest(
        checks,
        "audit:evidence_sha256",
        &record.hashes.evidence_sha256,
        &evidence_sha256,
    );
    compare_digest(
        checks,
        "audit:report_sha256",
        &record.hashes.report_sha256,
        &sha256_hex(&artifacts.report),
    );

    match log {
        Some(log) => {
            compare(
                checks,
                "audit:chain_head",
                FailureKind::HashMismatch,
                record.evidence_chain_head_sha256.as_deref().unwrap_or("null"),
                log.head().unwrap_or("null"),
            );
            let inputs = FingerprintInputs {
                run_id: run_id.to_string(),
                policy_version: policy_version_of(log),
                evidence_sha256,
                evidence_chain_head_sha256: log.chain.head_sha256.clone(),
            };
            compare_digest(
                checks,
                "audit:bundle_sha256",
                &record.bundle_sha256,
                &bundle_fingerprint(&inputs),
            );
        }
        None => {
            checks.push(CheckOutcome::skip("audit:chain_head", "evidence log did not parse"));
            checks.push(CheckOutcome::skip("audit:bundle_sha256", "evidence log did not parse"));
        }
    }

    let version = record.policy_version.trim();
    if version.is_empty() || version == UNKNOWN_POLICY_VERSION {
        checks.push(CheckOutcome::fail(
            "audit:policy_version",
            FailureKind::PolicyViolation,
            "policy version is unknown",
        ));
    } else {
        checks.push(CheckOutcome::pass("audit:policy_version", version));
    }
}

fn check_report_header(record: &AuditRecord, report: &[u8], checks: &mut Vec<CheckOutcome>) {
    let text = match std::str::from_utf8(report) {
        Ok(text) => text,
        Err(e) => {
            checks.push(CheckOutcome::fail(
                "report_header",
                FailureKind::MalformedInput,
                format!("report is not UTF-8: {e}"),
            ));
            return;
        }
    };
    let header = match ReportHeader::parse(text) {
        Ok(header) => header,
        Err(e) => {
            checks.push(CheckOutcome::fail(
                "report_header",
                FailureKind::MalformedInput,
                e.to_string(),
            ));
            return;
        }
    };

    let expected = ReportHeader {
        run_id: record.run_id.clone(),
        bundle_sha256: record.bundle_sha256.clone(),
        policy_version: record.policy_version.clone(),
    };
    for ((key, recorded), (_, found)) in expected.pairs().into_iter().zip(header.pairs()) {
        compare(
            checks,
            &format!("report_header:{key}"),
            FailureKind::HashMismatch,
            recorded,
            found,
        );
    }
}

fn check_chain(run_id: &str, log: &EvidenceLog, checks: &mut Vec<CheckOutcome>) {
    if log.chain.algorithm != CHAIN_ALGORITHM {
        checks.push(CheckOutcome::fail(
            "chain:algorithm",
            FailureKind::MalformedInput,
            format!("unsupported chain algorithm '{}'", log.chain.algorithm),
        ));
    }

    let validation = rebuild_and_validate(log);
    match validation.first_divergence {
        None => checks.push(CheckOutcome::pass(
            "chain:integrity",
            format!(
                "{} events, head {}",
                log.events.len(),
                validation.recomputed_head.as_deref().unwrap_or("null")
            ),
        )),
        Some(divergence) => checks.push(CheckOutcome::fail(
            "chain:integrity",
            FailureKind::ChainBroken,
            divergence.describe(),
        )),
    }

    let strays: Vec<String> = log
        .events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.run_id != run_id)
        .map(|(i, e)| format!("event {i} (id={}) has run_id '{}'", e.id, e.run_id))
        .collect();
    if log.run_id != run_id {
        checks.push(CheckOutcome::fail(
            "chain:run_id",
            FailureKind::MalformedInput,
            format!("log declares run_id '{}'", log.run_id),
        ));
    } else if !strays.is_empty() {
        checks.push(CheckOutcome::fail(
            "chain:run_id",
            FailureKind::MalformedInput,
            strays.join("; "),
        ));
    } else {
        checks.push(CheckOutcome::pass("chain:run_id", run_id));
    }
}
