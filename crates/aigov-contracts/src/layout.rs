//! On-disk layout of a run's artifacts.
//!
//! Everything lives under one docs root:
//!
//! ```text
//! <docs>/evidence/<run_id>.json          evidence log
//! <docs>/reports/<run_id>.md             human-readable report
//! <docs>/audit/<run_id>.json             audit record
//! <docs>/audit/<run_id>.sha256           audit record self-hash
//! <docs>/audit/<run_id>.manifest.json    manifest
//! ```

use std::path::{Path, PathBuf};

use crate::error::{AigovError, AigovResult};

/// Resolves artifact paths for runs under a docs root.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    docs_root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(docs_root: impl Into<PathBuf>) -> Self {
        Self {
            docs_root: docs_root.into(),
        }
    }

    pub fn docs_root(&self) -> &Path {
        &self.docs_root
    }

    pub fn evidence_rel(run_id: &str) -> String {
        format!("evidence/{run_id}.json")
    }

    pub fn report_rel(run_id: &str) -> String {
        format!("reports/{run_id}.md")
    }

    pub fn audit_rel(run_id: &str) -> String {
        format!("audit/{run_id}.json")
    }

    pub fn audit_sha_rel(run_id: &str) -> String {
        format!("audit/{run_id}.sha256")
    }

    pub fn manifest_rel(run_id: &str) -> String {
        format!("audit/{run_id}.manifest.json")
    }

    pub fn evidence_path(&self, run_id: &str) -> PathBuf {
        self.resolve(&Self::evidence_rel(run_id))
    }

    pub fn report_path(&self, run_id: &str) -> PathBuf {
        self.resolve(&Self::report_rel(run_id))
    }

    pub fn audit_path(&self, run_id: &str) -> PathBuf {
        self.resolve(&Self::audit_rel(run_id))
    }

    pub fn audit_sha_path(&self, run_id: &str) -> PathBuf {
        self.resolve(&Self::audit_sha_rel(run_id))
    }

    pub fn manifest_path(&self, run_id: &str) -> PathBuf {
        self.resolve(&Self::manifest_rel(run_id))
    }

    /// Join a relative artifact path onto the docs root.
    ///
    /// Callers that take the relative path from an untrusted file must run
    /// it through `checked_resolve` instead.
    pub fn resolve(&self, rel: &str) -> PathBuf {
        rel.split('/').fold(self.docs_root.clone(), |p, seg| p.join(seg))
    }

    /// Like `resolve`, but rejects absolute paths and `..`/`.` segments so a
    /// manifest cannot point outside the docs root.
    pub fn checked_resolve(&self, rel: &str) -> Option<PathBuf> {
        if rel.is_empty() || rel.starts_with('/') || rel.contains('\\') {
            return None;
        }
        let bad_segment = rel
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..");
        if bad_segment {
            return None;
        }
        Some(self.resolve(rel))
    }
}

/// Validate a run id before it is used to build file names.
pub fn validate_run_id(run_id: &str) -> AigovResult<()> {
    if run_id.trim().is_empty() {
        return Err(AigovError::InvalidArgument {
            reason: "run_id is required".to_string(),
        });
    }
    if run_id.chars().any(char::is_control) {
        return Err(AigovError::InvalidArgument {
            reason: format!("run_id {run_id:?} contains control characters"),
        });
    }
    if run_id != run_id.trim() {
        return Err(AigovError::InvalidArgument {
            reason: format!("run_id '{run_id}' has leading or trailing whitespace"),
        });
    }
    if run_id == "." || run_id == ".." || run_id.contains(['/', '\\']) {
        return Err(AigovError::InvalidArgument {
            reason: format!("run_id '{run_id}' is not a valid file name"),
        });
    }
    Ok(())
}
