//! TOML-driven policy implementation.
//!
//! `TomlPolicy` loads a `PolicyConfig` from a TOML string or file and
//! implements the `PolicyGate` trait from aigov-core.
//!
//! Admission algorithm for a candidate event:
//!
//! 1. Select every rule whose `event_type` matches (or is `"*"`).
//! 2. Validate the payload against each rule's `payload_schema`.
//! 3. Check each rule's `requires` against the events already in the log.
//! 4. Collect every failure; any failure rejects the event.
//!
//! Review of a whole log under a mode re-runs admission for every event
//! against its own history, then applies the mode's source and coverage
//! constraints.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use aigov_contracts::{
    error::{AigovError, AigovResult},
    event::{Event, EvidenceLog},
    mode::ExecutionMode,
};
use aigov_core::traits::PolicyGate;

use crate::rule::{EventRule, PolicyConfig};

/// The policy shipped with aigov, used when no policy file is configured.
pub const BUILTIN_POLICY: &str = include_str!("../policies/default.toml");

/// A `PolicyGate` implementation that reads rules from a TOML document.
#[derive(Debug, Clone)]
pub struct TomlPolicy {
    config: PolicyConfig,
}

impl TomlPolicy {
    /// Parse `s` as TOML and build a `TomlPolicy`.
    ///
    /// Every payload schema is compiled once here so a broken schema is a
    /// `ConfigError` at load time rather than a surprise on first use.
    pub fn from_toml_str(s: &str) -> AigovResult<Self> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| AigovError::ConfigError {
            reason: format!("failed to parse policy TOML: {e}"),
        })?;
        for rule in &config.events {
            if let Some(schema) = &rule.payload_schema {
                jsonschema::validator_for(schema).map_err(|e| AigovError::ConfigError {
                    reason: format!("rule '{}' has an invalid payload_schema: {e}", rule.id),
                })?;
            }
        }
        Ok(Self { config })
    }

    /// Read the file at `path` and parse it as TOML policy configuration.
    pub fn from_file(path: &Path) -> AigovResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| AigovError::ConfigError {
            reason: format!("failed to read policy file '{}': {e}", path.display()),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The embedded default policy.
    pub fn builtin() -> AigovResult<Self> {
        Self::from_toml_str(BUILTIN_POLICY)
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Every rule violation for `candidate` given `history`.
    pub fn violations(&self, history: &[Event], candidate: &Event) -> Vec<String> {
        let mut out = Vec::new();
        for rule in self.config.events.iter().filter(|r| r.matches(&candidate.event_type)) {
            debug!(rule_id = %rule.id, event_type = %candidate.event_type, "applying event rule");
            check_payload(rule, candidate, &mut out);
            for req in &rule.requires {
                if !req.satisfied_by(history) {
                    out.push(format!(
                        "rule '{}': {} requires {}",
                        rule.id,
                        candidate.event_type,
                        req.describe()
                    ));
                }
            }
        }
        out
    }
}

fn check_payload(rule: &EventRule, candidate: &Event, out: &mut Vec<String>) {
    let Some(schema) = &rule.payload_schema else {
        return;
    };
    let payload = Value::Object(candidate.payload.clone());
    match jsonschema::validator_for(schema) {
        Ok(validator) => {
            for error in validator.iter_errors(&payload) {
                out.push(format!(
                    "rule '{}': payload violation at '{}': {}",
                    rule.id, error.instance_path, error
                ));
            }
        }
        Err(e) => out.push(format!("rule '{}': invalid payload_schema: {e}", rule.id)),
    }
}

impl PolicyGate for TomlPolicy {
    fn admit(&self, history: &[Event], candidate: &Event) -> AigovResult<()> {
        let violations = self.violations(history, candidate);
        if violations.is_empty() {
            return Ok(());
        }
        warn!(
            event_id = %candidate.id,
            event_type = %candidate.event_type,
            count = violations.len(),
            "event rejected by policy"
        );
        Err(AigovError::PolicyViolation {
            reason: violations.join("; "),
        })
    }

    fn review(&self, log: &EvidenceLog, mode: ExecutionMode) -> Vec<String> {
        let mut out = Vec::new();

        for (index, event) in log.events.iter().enumerate() {
            for v in self.violations(&log.events[..index], event) {
                out.push(format!("event {index} (id={}): {v}", event.id));
            }
        }

        let Some(mode_policy) = self.config.modes.iter().find(|m| m.mode == mode) else {
            debug!(%mode, "no mode policy configured");
            return out;
        };

        if let Some(source) = &log.source {
            if mode_policy.forbidden_sources.iter().any(|f| f == source) {
                out.push(format!(
                    "evidence log produced by source '{source}', which is forbidden in {mode} mode"
                ));
            }
        }

        for (index, event) in log.events.iter().enumerate() {
            let label = event.source_label();
            if mode_policy.forbidden_sources.iter().any(|f| f == label) {
                out.push(format!(
                    "event {index} (id={}) produced by source '{label}', which is forbidden in {mode} mode",
                    event.id
                ));
            }
        }

        for required in &mode_policy.required_event_types {
            if !log.events.iter().any(|e| &e.event_type == required) {
                out.push(format!("{mode} mode requires a {required} event"));
            }
        }

        out
    }
}
