//! Policy rule types and configuration schema.
//!
//! A `PolicyConfig` is deserialized from TOML and holds two ordered lists:
//! event rules, applied to every candidate event, and mode policies,
//! applied when a whole log is reviewed for an execution mode.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use aigov_contracts::{event::Event, mode::ExecutionMode};

/// A requirement on events already in the log when a candidate arrives.
///
/// `select` narrows which prior events of `event_type` are considered;
/// `expect` is what those events must show. With `latest = true` only the
/// most recent selected event is judged, so a later `reject` overrides an
/// earlier `approve`.
///
/// Example in TOML:
/// ```toml
/// [[events.requires]]
/// event_type = "human_approved"
/// select = { scope = "model_promoted" }
/// expect = { decision = "approve" }
/// latest = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorRequirement {
    pub event_type: String,

    #[serde(default)]
    pub select: BTreeMap<String, Value>,

    #[serde(default)]
    pub expect: BTreeMap<String, Value>,

    #[serde(default)]
    pub latest: bool,
}

impl PriorRequirement {
    fn selects(&self, event: &Event) -> bool {
        event.event_type == self.event_type && payload_matches(event, &self.select)
    }

    /// True if `history` satisfies this requirement.
    pub fn satisfied_by(&self, history: &[Event]) -> bool {
        let mut selected = history.iter().filter(|e| self.selects(e));
        if self.latest {
            selected
                .next_back()
                .is_some_and(|e| payload_matches(e, &self.expect))
        } else {
            selected.any(|e| payload_matches(e, &self.expect))
        }
    }

    /// One-line description used in violation messages.
    pub fn describe(&self) -> String {
        let mut s = format!("prior {}", self.event_type);
        if !self.select.is_empty() {
            s.push_str(&format!(" with {}", kv_list(&self.select)));
        }
        if !self.expect.is_empty() {
            let which = if self.latest { "latest one" } else { "one" };
            s.push_str(&format!(" ({which} must have {})", kv_list(&self.expect)));
        }
        s
    }
}

fn payload_matches(event: &Event, pairs: &BTreeMap<String, Value>) -> bool {
    pairs
        .iter()
        .all(|(k, v)| event.payload.get(k).is_some_and(|actual| actual == v))
}

fn kv_list(pairs: &BTreeMap<String, Value>) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A rule applied to each candidate event whose type matches.
///
/// `event_type = "*"` matches every event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRule {
    /// Stable identifier used in violation messages.
    pub id: String,

    pub description: String,

    pub event_type: String,

    /// JSON Schema the payload must satisfy.
    #[serde(default)]
    pub payload_schema: Option<Value>,

    /// Prior events that must already be in the log.
    #[serde(default)]
    pub requires: Vec<PriorRequirement>,
}

impl EventRule {
    pub fn matches(&self, event_type: &str) -> bool {
        self.event_type == "*" || self.event_type == event_type
    }
}

/// Constraints that apply to a whole log under one execution mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModePolicy {
    pub mode: ExecutionMode,

    /// Evidence source labels that may not appear in the log.
    #[serde(default)]
    pub forbidden_sources: Vec<String>,

    /// Event types that must each appear at least once.
    #[serde(default)]
    pub required_event_types: Vec<String>,
}

/// The top-level structure deserialized from a TOML policy file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub events: Vec<EventRule>,

    #[serde(default)]
    pub modes: Vec<ModePolicy>,
}
