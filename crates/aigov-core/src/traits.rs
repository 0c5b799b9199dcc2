//! Seam traits for the aigov pipeline.
//!
//! - `EvidenceStore`: where a run's evidence log lives (file, memory, ...)
//! - `PolicyGate`: governance rules applied on append and on review
//!
//! The chain logic only ever talks to these traits, so the backing store or
//! rule set can change without touching hashing or verification.

use aigov_contracts::{
    error::AigovResult,
    event::{Event, EvidenceLog},
    mode::ExecutionMode,
};

/// Persistence for evidence logs, one per run id.
///
/// `save` must be atomic: a concurrent reader sees either the previous log
/// or the new one, never a partial write. Implementations are not required
/// to serialise concurrent writers for the same run; callers must.
pub trait EvidenceStore: Send + Sync {
    /// Load the log for `run_id`. `Ok(None)` means no log exists yet.
    ///
    /// A log that exists but cannot be parsed is `MalformedInput`, never
    /// `None`: evidence is not silently replaced.
    fn load(&self, run_id: &str) -> AigovResult<Option<EvidenceLog>>;

    /// Replace the stored log for `log.run_id` atomically.
    fn save(&self, log: &EvidenceLog) -> AigovResult<()>;
}

/// Governance rules over evidence.
pub trait PolicyGate: Send + Sync {
    /// Decide whether `candidate` may be appended after `history`.
    ///
    /// Returns `PolicyViolation` listing every rule the candidate breaks.
    fn admit(&self, history: &[Event], candidate: &Event) -> AigovResult<()>;

    /// Review a whole log under an execution mode.
    ///
    /// Returns one human-readable message per violation; empty means the
    /// log satisfies the policy.
    fn review(&self, log: &EvidenceLog, mode: ExecutionMode) -> Vec<String>;
}
