//! Evidence event and log types.
//!
//! An `Event` is one governance fact about a run. An `EvidenceLog` holds the
//! ordered, hash-linked events for one run and is persisted as a single JSON
//! document. The payload is opaque: nothing in the chain logic reads it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifier of the only chain scheme this workspace writes or accepts.
pub const CHAIN_ALGORITHM: &str = "event_hash_chain_v1";

/// Open-ended event payload.
pub type Payload = Map<String, Value>;

/// A single entry of a run's evidence chain.
///
/// `sha256` commits to every other field, including `prev_sha256`, so any
/// edit to a stored event, or any reordering, is visible on recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Event {
    /// Unique within the run.
    pub id: String,

    /// Event tag, e.g. `evaluation_reported`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// ISO-8601 UTC timestamp.
    pub ts_utc: String,

    pub actor: String,
    pub system: String,
    pub run_id: String,

    pub payload: Payload,

    /// Hash of the previous event, `None` for the first one.
    pub prev_sha256: Option<String>,

    /// Lowercase hex SHA-256 over the canonical encoding of every field above.
    pub sha256: String,
}

impl Event {
    /// The label of the generator that produced this event.
    ///
    /// A string `evidence_source` in the payload wins; otherwise the
    /// producing `system` is used.
    pub fn source_label(&self) -> &str {
        self.payload
            .get("evidence_source")
            .and_then(Value::as_str)
            .unwrap_or(&self.system)
    }
}

/// Caller input for an append. Hash fields are never supplied by callers.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub run_id: String,
    pub event_type: String,
    pub actor: String,
    pub system: String,
    pub payload: Payload,
    /// Generated when absent.
    pub event_id: Option<String>,
    /// Defaults to the current UTC time.
    pub ts_utc: Option<String>,
}

/// Chain summary stored next to the events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainInfo {
    pub algorithm: String,

    /// `sha256` of the last event. `None` means the log has no events yet,
    /// which is distinct from any hash value.
    pub head_sha256: Option<String>,

    /// When the head was last moved.
    pub ts_utc: String,
}

/// The append-only evidence log for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvidenceLog {
    pub run_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_ts_utc: Option<String>,

    /// Policy version the run is governed by, if stamped at creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_version: Option<String>,

    /// Label of the evidence generator for the whole log (e.g. `ci_fallback`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Insertion order is chain order.
    pub events: Vec<Event>,

    pub chain: ChainInfo,
}

impl EvidenceLog {
    /// A fresh log with no events and the empty-head sentinel.
    pub fn empty(run_id: impl Into<String>, ts_utc: impl Into<String>) -> Self {
        let ts_utc = ts_utc.into();
        Self {
            run_id: run_id.into(),
            created_ts_utc: Some(ts_utc.clone()),
            policy_version: None,
            source: None,
            events: Vec::new(),
            chain: ChainInfo {
                algorithm: CHAIN_ALGORITHM.to_string(),
                head_sha256: None,
                ts_utc,
            },
        }
    }

    /// The stored chain head.
    pub fn head(&self) -> Option<&str> {
        self.chain.head_sha256.as_deref()
    }

    pub fn contains_event_id(&self, event_id: &str) -> bool {
        self.events.iter().any(|e| e.id == event_id)
    }

    /// Most recent event of the given type.
    pub fn latest_of_type(&self, event_type: &str) -> Option<&Event> {
        self.events.iter().rev().find(|e| e.event_type == event_type)
    }
}
