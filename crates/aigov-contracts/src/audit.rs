//! Audit record and manifest types.
//!
//! The audit record snapshots a run's artifacts at export time: the bundle
//! fingerprint, the policy version, and the content hashes of the evidence
//! log and report. The manifest maps artifact paths (relative to the docs
//! root) to their content hashes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Content hashes captured when the audit record was built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHashes {
    pub evidence_sha256: String,
    pub report_sha256: String,
}

/// Repository-relative locations of the hashed artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub evidence_json: String,
    pub report_md: String,
}

/// One audit record per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub run_id: String,

    /// The bundle fingerprint. Independent of the report bytes.
    pub bundle_sha256: String,

    pub policy_version: String,

    pub generated_ts_utc: String,

    /// Copy of the evidence chain head for independent cross-checking.
    /// `None` when the log had no events.
    pub evidence_chain_head_sha256: Option<String>,

    pub hashes: ArtifactHashes,

    pub paths: ArtifactPaths,
}

impl AuditRecord {
    /// True when both records agree on everything except the generation time.
    pub fn same_content(&self, other: &AuditRecord) -> bool {
        self.run_id == other.run_id
            && self.bundle_sha256 == other.bundle_sha256
            && self.policy_version == other.policy_version
            && self.evidence_chain_head_sha256 == other.evidence_chain_head_sha256
            && self.hashes == other.hashes
            && self.paths == other.paths
    }
}

/// Artifact path → SHA-256 hex map. `BTreeMap` keeps serialization ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub run_id: String,
    pub files: BTreeMap<String, String>,
}
