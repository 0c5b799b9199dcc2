//! Error types for the aigov evidence pipeline.
//!
//! Every fallible operation returns `AigovResult<T>`. The first six variants
//! are the governance taxonomy (missing, malformed, duplicate, hash, chain,
//! policy); the rest are ambient failures surfaced at the CLI boundary.

use std::path::PathBuf;

use thiserror::Error;

/// The unified error type for aigov.
#[derive(Debug, Error)]
pub enum AigovError {
    /// A required artifact file does not exist.
    #[error("missing artifact: {}", path.display())]
    MissingArtifact { path: PathBuf },

    /// A file exists but does not parse as the expected shape.
    #[error("malformed input in {source_name}: {reason}")]
    MalformedInput { source_name: String, reason: String },

    /// An append collided with an event id already present in the run.
    #[error("duplicate event_id '{event_id}' for run_id '{run_id}'")]
    DuplicateEventId { event_id: String, run_id: String },

    /// A recomputed content hash differs from the stored one.
    #[error("hash mismatch for {artifact}: expected {expected}, found {actual}")]
    HashMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },

    /// Chain recomputation diverged from the stored links or head.
    #[error("evidence chain broken for run_id '{run_id}': {reason}")]
    ChainBroken { run_id: String, reason: String },

    /// A policy rule rejected the evidence.
    #[error("policy violation: {reason}")]
    PolicyViolation { reason: String },

    /// Caller-supplied arguments are unusable (empty run id, bad payload JSON).
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Filesystem failure while reading or writing an artifact.
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The evidence store cannot serve requests (e.g. a poisoned lock).
    #[error("evidence store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// Configuration or policy file could not be loaded.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl AigovError {
    /// Wrap an I/O error, promoting `NotFound` to `MissingArtifact`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            AigovError::MissingArtifact { path }
        } else {
            AigovError::Io { path, source }
        }
    }

    /// Build a `MalformedInput` from anything displayable.
    pub fn malformed(source_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        AigovError::MalformedInput {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors caused by how the tool was invoked rather than by
    /// the artifacts. The CLI maps these to exit code 2.
    pub fn is_usage(&self) -> bool {
        matches!(self, AigovError::InvalidArgument { .. })
    }
}

/// Convenience alias used throughout the aigov crates.
pub type AigovResult<T> = Result<T, AigovError>;
