//! Audit record, self-hash sidecar and manifest for a run.
//!
//! Export requires the evidence log and the report to exist. It hashes both,
//! recomputes the bundle fingerprint from the evidence, and writes three
//! files atomically:
//!
//! ```text
//! audit/<run_id>.json            AuditRecord, pretty JSON
//! audit/<run_id>.sha256          "<hex>  <run_id>.json", sha256sum format
//! audit/<run_id>.manifest.json   Manifest over evidence, report, audit record
//! ```
//!
//! Re-exporting unchanged inputs rewrites byte-identical files: when the
//! stored record differs only in `generated_ts_utc`, the stored timestamp is
//! kept.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use aigov_audit::utc_now;
use aigov_contracts::{
    audit::{ArtifactHashes, ArtifactPaths, AuditRecord, Manifest},
    error::{AigovError, AigovResult},
    layout::{validate_run_id, ArtifactLayout},
};
use aigov_core::{
    digest::{sha256_file, sha256_hex},
    fsio::{parse_json, read_artifact, write_atomic, write_json_atomic},
};

use crate::fingerprint::{bundle_fingerprint, FingerprintInputs, UNKNOWN_POLICY_VERSION};

/// Paths written by an export and the record they hold.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub audit_path: PathBuf,
    pub audit_sha_path: PathBuf,
    pub manifest_path: PathBuf,
    pub record: AuditRecord,
    /// True when an identical earlier record's timestamp was kept.
    pub unchanged: bool,
}

impl ExportOutcome {
    /// False when neither the log nor any payload names a policy version.
    /// Such a bundle is written but never verifies.
    pub fn policy_version_known(&self) -> bool {
        self.record.policy_version != UNKNOWN_POLICY_VERSION
    }
}

/// Line stored in the audit self-hash sidecar.
pub fn sidecar_line(audit_sha256: &str, run_id: &str) -> String {
    format!("{audit_sha256}  {run_id}.json\n")
}

/// First whitespace-separated token of a sidecar file, if any.
pub fn parse_sidecar(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

/// Builds the audit record and manifest for runs under one docs root.
#[derive(Debug, Clone)]
pub struct BundleExporter {
    layout: ArtifactLayout,
}

impl BundleExporter {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    /// Export the audit bundle for `run_id`.
    ///
    /// Errors:
    /// - `MissingArtifact` when the evidence log or the report is absent
    /// - `MalformedInput` when the evidence log does not parse or names
    ///   another run
    pub fn export(&self, run_id: &str) -> AigovResult<ExportOutcome> {
        validate_run_id(run_id)?;

        let evidence_path = self.layout.evidence_path(run_id);
        let report_path = self.layout.report_path(run_id);
        let audit_path = self.layout.audit_path(run_id);
        let audit_sha_path = self.layout.audit_sha_path(run_id);
        let manifest_path = self.layout.manifest_path(run_id);

        let evidence_bytes = read_artifact(&evidence_path)?;
        let report_sha256 = sha256_file(&report_path)?;

        let (inputs, log) =
            FingerprintInputs::from_evidence_bytes(run_id, &evidence_path, &evidence_bytes)?;
        if log.run_id != run_id {
            return Err(AigovError::malformed(
                evidence_path.display().to_string(),
                format!("log declares run_id '{}', expected '{run_id}'", log.run_id),
            ));
        }

        if inputs.policy_version == UNKNOWN_POLICY_VERSION {
            warn!(
                run_id = %run_id,
                "no policy version in evidence log or payloads; the exported bundle will not verify"
            );
        }

        let mut record = AuditRecord {
            run_id: run_id.to_string(),
            bundle_sha256: bundle_fingerprint(&inputs),
            policy_version: inputs.policy_version.clone(),
            generated_ts_utc: utc_now(),
            evidence_chain_head_sha256: inputs.evidence_chain_head_sha256.clone(),
            hashes: ArtifactHashes {
                evidence_sha256: inputs.evidence_sha256.clone(),
                report_sha256,
            },
            paths: ArtifactPaths {
                evidence_json: ArtifactLayout::evidence_rel(run_id),
                report_md: ArtifactLayout::report_rel(run_id),
            },
        };

        let unchanged = match self.previous_record(&audit_path) {
            Some(previous) if previous.same_content(&record) => {
                record.generated_ts_utc = previous.generated_ts_utc;
                true
            }
            _ => false,
        };

        let audit_bytes = serde_json::to_vec_pretty(&record)
            .map_err(|e| AigovError::malformed(audit_path.display().to_string(), e))?;
        let audit_sha256 = sha256_hex(&audit_bytes);
        write_atomic(&audit_path, &audit_bytes)?;
        write_atomic(&audit_sha_path, sidecar_line(&audit_sha256, run_id).as_bytes())?;

        let files: BTreeMap<String, String> = [
            (ArtifactLayout::evidence_rel(run_id), record.hashes.evidence_sha256.clone()),
            (ArtifactLayout::report_rel(run_id), record.hashes.report_sha256.clone()),
            (ArtifactLayout::audit_rel(run_id), audit_sha256),
        ]
        .into_iter()
        .collect();
        let manifest = Manifest {
            run_id: run_id.to_string(),
            files,
        };
        write_json_atomic(&manifest_path, &manifest)?;

        info!(
            run_id = %run_id,
            bundle_sha256 = %record.bundle_sha256,
            policy_version = %record.policy_version,
            unchanged,
            "audit bundle exported"
        );

        Ok(ExportOutcome {
            audit_path,
            audit_sha_path,
            manifest_path,
            record,
            unchanged,
        })
    }

    /// A readable earlier record, if there is one. Anything unreadable is
    /// simply replaced.
    fn previous_record(&self, audit_path: &Path) -> Option<AuditRecord> {
        let bytes = read_artifact(audit_path).ok()?;
        match parse_json::<AuditRecord>(audit_path, &bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!(error = %e, "ignoring unreadable previous audit record");
                None
            }
        }
    }
}
