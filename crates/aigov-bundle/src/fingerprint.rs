//! Bundle fingerprint.
//!
//! The fingerprint binds a run id, a policy version, the content hash of the
//! evidence log file and the chain head. It never reads the report, so a
//! report can carry the fingerprint in its own header.

use std::path::Path;

use serde_json::json;

use aigov_contracts::{error::AigovResult, event::EvidenceLog};
use aigov_core::{canonical, digest::sha256_hex, fsio::parse_json};

/// Marker used when no policy version can be found. Verification treats it
/// as a failure.
pub const UNKNOWN_POLICY_VERSION: &str = "unknown";

/// The policy version governing `log`.
///
/// The log's own `policy_version` wins; otherwise the most recent event
/// payload carrying a non-blank `policy_version` string; otherwise
/// [`UNKNOWN_POLICY_VERSION`].
pub fn policy_version_of(log: &EvidenceLog) -> String {
    if let Some(v) = log.policy_version.as_deref().map(str::trim) {
        if !v.is_empty() {
            return v.to_string();
        }
    }
    log.events
        .iter()
        .rev()
        .filter_map(|e| e.payload.get("policy_version").and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or(UNKNOWN_POLICY_VERSION)
        .to_string()
}

/// Exactly the four values the fingerprint commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintInputs {
    pub run_id: String,
    pub policy_version: String,
    pub evidence_sha256: String,
    pub evidence_chain_head_sha256: Option<String>,
}

impl FingerprintInputs {
    /// Derive inputs from the raw bytes of an evidence log file.
    ///
    /// The bytes are hashed as stored; the parsed log supplies the policy
    /// version and chain head. Returns the parsed log too, since every
    /// caller needs it next.
    pub fn from_evidence_bytes(
        run_id: &str,
        path: &Path,
        bytes: &[u8],
    ) -> AigovResult<(Self, EvidenceLog)> {
        let log: EvidenceLog = parse_json(path, bytes)?;
        let inputs = Self {
            run_id: run_id.to_string(),
            policy_version: policy_version_of(&log),
            evidence_sha256: sha256_hex(bytes),
            evidence_chain_head_sha256: log.chain.head_sha256.clone(),
        };
        Ok((inputs, log))
    }
}

/// SHA-256 over the canonical encoding of the four inputs.
pub fn bundle_fingerprint(inputs: &FingerprintInputs) -> String {
    let tuple = json!({
        "run_id": inputs.run_id,
        "policy_version": inputs.policy_version,
        "evidence_sha256": inputs.evidence_sha256,
        "evidence_chain_head_sha256": inputs.evidence_chain_head_sha256,
    });
    sha256_hex(&canonical::encode(&tuple))
}
