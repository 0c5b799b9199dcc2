//! Hash-chain primitives: event hashing, validation, and explicit relinking.
//!
//! Hash input is the canonical JSON encoding of exactly these fields:
//!
//! ```text
//! { id, type, ts_utc, actor, system, run_id, payload, prev_sha256 }
//! ```
//!
//! `sha256` is not in the list, so an event never hashes itself, and
//! `prev_sha256` is always set explicitly (JSON `null` for the first event)
//! before hashing.

use serde_json::{json, Value};

use aigov_contracts::event::{Event, EvidenceLog};
use aigov_core::{canonical, digest};

/// Compute the SHA-256 hash for one event with the given link.
///
/// Any `prev_sha256` or `sha256` already on `event` is ignored; the
/// caller-provided `prev_sha256` is used instead.
pub fn hash_event(event: &Event, prev_sha256: Option<&str>) -> String {
    digest::sha256_hex(&canonical::encode(&hash_input(event, prev_sha256)))
}

/// The exact value whose canonical encoding is hashed.
pub fn hash_input(event: &Event, prev_sha256: Option<&str>) -> Value {
    json!({
        "id": event.id,
        "type": event.event_type,
        "ts_utc": event.ts_utc,
        "actor": event.actor,
        "system": event.system,
        "run_id": event.run_id,
        "payload": Value::Object(event.payload.clone()),
        "prev_sha256": prev_sha256,
    })
}

/// Where a stored chain first disagrees with its recomputation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainDivergence {
    /// The stored `prev_sha256` is not the previous event's recomputed hash.
    PrevLink {
        index: usize,
        event_id: String,
        expected: Option<String>,
        found: Option<String>,
    },
    /// The stored `sha256` does not match the recomputed one.
    EventHash {
        index: usize,
        event_id: String,
        expected: String,
        found: String,
    },
    /// Every event checks out but the stored head does not.
    Head {
        expected: Option<String>,
        found: Option<String>,
    },
}

impl ChainDivergence {
    /// Index of the first bad event; `None` for a head-only divergence.
    pub fn index(&self) -> Option<usize> {
        match self {
            ChainDivergence::PrevLink { index, .. } | ChainDivergence::EventHash { index, .. } => {
                Some(*index)
            }
            ChainDivergence::Head { .. } => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ChainDivergence::PrevLink {
                index,
                event_id,
                expected,
                found,
            } => format!(
                "event {index} (id={event_id}) prev_sha256 is {}, expected {}",
                show(found.as_deref()),
                show(expected.as_deref())
            ),
            ChainDivergence::EventHash {
                index,
                event_id,
                expected,
                found,
            } => format!(
                "event {index} (id={event_id}) sha256 is {found}, recomputed {expected}"
            ),
            ChainDivergence::Head { expected, found } => format!(
                "chain head is {}, recomputed {}",
                show(found.as_deref()),
                show(expected.as_deref())
            ),
        }
    }
}

fn show(h: Option<&str>) -> &str {
    h.unwrap_or("null")
}

/// Result of recomputing a chain from scratch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainValidation {
    pub valid: bool,
    /// Head implied by the events' content. `None` for an empty log.
    pub recomputed_head: Option<String>,
    pub first_divergence: Option<ChainDivergence>,
}

/// Recompute every link and hash of `log` and compare with what is stored.
///
/// Read-only: the caller's log is never modified. Checks, in order, for
/// each event: the stored link equals the recomputed hash of its
/// predecessor, then the stored hash equals the recomputed hash. Finally the
/// stored head must equal the recomputed head. Stops at the first
/// divergence but always finishes computing `recomputed_head`.
pub fn rebuild_and_validate(log: &EvidenceLog) -> ChainValidation {
    let mut prev: Option<String> = None;
    let mut first_divergence: Option<ChainDivergence> = None;

    for (index, event) in log.events.iter().enumerate() {
        if first_divergence.is_none() && event.prev_sha256 != prev {
            first_divergence = Some(ChainDivergence::PrevLink {
                index,
                event_id: event.id.clone(),
                expected: prev.clone(),
                found: event.prev_sha256.clone(),
            });
        }

        let recomputed = hash_event(event, prev.as_deref());
        if first_divergence.is_none() && event.sha256 != recomputed {
            first_divergence = Some(ChainDivergence::EventHash {
                index,
                event_id: event.id.clone(),
                expected: recomputed.clone(),
                found: event.sha256.clone(),
            });
        }

        prev = Some(recomputed);
    }

    if first_divergence.is_none() && log.chain.head_sha256 != prev {
        first_divergence = Some(ChainDivergence::Head {
            expected: prev.clone(),
            found: log.chain.head_sha256.clone(),
        });
    }

    ChainValidation {
        valid: first_divergence.is_none(),
        recomputed_head: prev,
        first_divergence,
    }
}

/// Return a copy of `log` with every link, hash, and the head recomputed.
///
/// This is an explicit repair step, never run implicitly: it makes a
/// tampered log look consistent again, so callers must only use it when a
/// human has decided the current event content is authoritative.
pub fn rebuild_chain(log: &EvidenceLog, ts_utc: &str) -> EvidenceLog {
    let mut out = log.clone();
    let mut prev: Option<String> = None;
    for event in out.events.iter_mut() {
        event.prev_sha256 = prev.clone();
        event.sha256 = hash_event(event, prev.as_deref());
        prev = Some(event.sha256.clone());
    }
    out.chain.algorithm = aigov_contracts::event::CHAIN_ALGORITHM.to_string();
    out.chain.head_sha256 = prev;
    out.chain.ts_utc = ts_utc.to_string();
    out
}
