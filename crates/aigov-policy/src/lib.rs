//! # aigov-policy
//!
//! A TOML-driven governance policy for aigov evidence.
//!
//! ## Overview
//!
//! This crate provides [`TomlPolicy`], which implements the
//! [`PolicyGate`](aigov_core::traits::PolicyGate) trait. Rules are declared
//! in TOML and come in two kinds:
//!
//! - `[[events]]` rules gate each event at append time: a JSON Schema for
//!   the payload and a list of prior events that must already be logged.
//! - `[[modes]]` constraints apply when a whole log is reviewed under an
//!   execution mode, e.g. `prod` forbidding fallback evidence.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use aigov_policy::TomlPolicy;
//!
//! let policy = TomlPolicy::builtin()?;
//! let ledger = EvidenceLedger::new(store).with_policy(Box::new(policy));
//! ```
//!
//! Unlike the chain checks, policy is advisory about *meaning*: every rule
//! violation is collected and reported, none of them short-circuits.

pub mod engine;
pub mod rule;

pub use engine::{TomlPolicy, BUILTIN_POLICY};
pub use rule::{EventRule, ModePolicy, PolicyConfig, PriorRequirement};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use aigov_contracts::{
        error::AigovError,
        event::{Event, EvidenceLog},
        mode::ExecutionMode,
    };
    use aigov_core::traits::PolicyGate;

    use crate::TomlPolicy;

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// An event with the given type and payload. Hash fields are not
    /// consulted by policy, so they are left as placeholders.
    fn event(id: &str, event_type: &str, payload: Value) -> Event {
        Event {
            id: id.to_string(),
            event_type: event_type.to_string(),
            ts_utc: "2026-10-15T12:00:00.000000Z".to_string(),
            actor: "tester".to_string(),
            system: "aigov_poc".to_string(),
            run_id: "r1".to_string(),
            payload: payload.as_object().cloned().expect("payload must be an object"),
            prev_sha256: None,
            sha256: "0".repeat(64),
        }
    }

    fn data() -> Event {
        event(
            "e-data",
            "data_registered",
            json!({"dataset": "iris", "dataset_fingerprint": "abc123"}),
        )
    }

    fn trained() -> Event {
        event("e-train", "model_trained", json!({"model": "logreg"}))
    }

    fn evaluation(passed: bool) -> Event {
        event(
            "e-eval",
            "evaluation_reported",
            json!({"metric": "accuracy", "value": 0.9, "threshold": 0.8, "passed": passed}),
        )
    }

    fn approval(id: &str, decision: &str) -> Event {
        event(
            id,
            "human_approved",
            json!({
                "scope": "model_promoted",
                "decision": decision,
                "approver": "compliance_officer",
                "justification": "metrics reviewed"
            }),
        )
    }

    fn log_of(events: Vec<Event>) -> EvidenceLog {
        let mut log = EvidenceLog::empty("r1", "2026-10-15T12:00:00.000000Z");
        log.events = events;
        log
    }

    fn builtin() -> TomlPolicy {
        TomlPolicy::builtin().unwrap()
    }

    fn reason_of(err: AigovError) -> String {
        match err {
            AigovError::PolicyViolation { reason } => reason,
            other => panic!("expected PolicyViolation, got {other:?}"),
        }
    }

    // ── 1. loading ────────────────────────────────────────────────────────────

    /// The embedded policy parses and declares both modes.
    #[test]
    fn test_builtin_policy_loads() {
        let policy = builtin();
        assert!(!policy.config().events.is_empty());
        let modes: Vec<_> = policy.config().modes.iter().map(|m| m.mode).collect();
        assert!(modes.contains(&ExecutionMode::Ci));
        assert!(modes.contains(&ExecutionMode::Prod));
    }

    /// An empty document is a valid policy that admits everything.
    #[test]
    fn test_empty_policy_admits_everything() {
        let policy = TomlPolicy::from_toml_str("").unwrap();
        policy
            .admit(&[], &event("e1", "anything", json!({})))
            .unwrap();
        assert!(policy.review(&log_of(vec![]), ExecutionMode::Prod).is_empty());
    }

    /// Malformed TOML is a configuration error, not a panic.
    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = TomlPolicy::from_toml_str("[[events]\nid = ").unwrap_err();
        assert!(matches!(err, AigovError::ConfigError { .. }), "got {err:?}");
    }

    /// A schema that is not valid JSON Schema is rejected at load time.
    #[test]
    fn test_invalid_schema_rejected_at_load() {
        let toml = r#"
            [[events]]
            id = "broken"
            description = "schema with a bad type keyword"
            event_type = "data_registered"
            payload_schema = { type = 12 }
        "#;
        let err = TomlPolicy::from_toml_str(toml).unwrap_err();
        match err {
            AigovError::ConfigError { reason } => assert!(reason.contains("broken"), "{reason}"),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    /// Loading from a path that does not exist names the path.
    #[test]
    fn test_from_file_missing_path() {
        let err = TomlPolicy::from_file(std::path::Path::new("/nonexistent/policy.toml"))
            .unwrap_err();
        match err {
            AigovError::ConfigError { reason } => {
                assert!(reason.contains("/nonexistent/policy.toml"), "{reason}")
            }
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    // ── 2. payload schemas ────────────────────────────────────────────────────

    /// A complete data registration is admitted.
    #[test]
    fn test_valid_data_registration_admitted() {
        builtin().admit(&[], &data()).unwrap();
    }

    /// A data registration without a fingerprint is rejected and the rule
    /// id appears in the reason.
    #[test]
    fn test_missing_payload_field_rejected() {
        let candidate = event("e1", "data_registered", json!({"dataset": "iris"}));
        let reason = reason_of(builtin().admit(&[], &candidate).unwrap_err());
        assert!(reason.contains("data-registered-payload"), "{reason}");
        assert!(reason.contains("dataset_fingerprint"), "{reason}");
    }

    /// Wrong value types are reported with their payload location.
    #[test]
    fn test_wrong_types_reported_with_path() {
        let candidate = event(
            "e1",
            "evaluation_reported",
            json!({"metric": "accuracy", "value": "high", "threshold": 0.8, "passed": "yes"}),
        );
        let reason = reason_of(builtin().admit(&[], &candidate).unwrap_err());
        assert!(reason.contains("/value"), "{reason}");
        assert!(reason.contains("/passed"), "{reason}");
    }

    /// A human approval must carry a known decision.
    #[test]
    fn test_unknown_decision_rejected() {
        let reason = reason_of(builtin().admit(&[], &approval("a1", "maybe")).unwrap_err());
        assert!(reason.contains("/decision"), "{reason}");
    }

    /// Events with no matching rule are admitted.
    #[test]
    fn test_unruled_event_type_admitted() {
        builtin()
            .admit(&[], &event("e1", "note_added", json!({"text": "hello"})))
            .unwrap();
    }

    // ── 3. prior-event requirements ───────────────────────────────────────────

    /// Training before any data registration is rejected.
    #[test]
    fn test_training_requires_data() {
        let reason = reason_of(builtin().admit(&[], &trained()).unwrap_err());
        assert!(reason.contains("train-after-data"), "{reason}");

        builtin().admit(&[data()], &trained()).unwrap();
    }

    /// Promotion needs a passing evaluation and an approving human decision.
    #[test]
    fn test_promotion_gate() {
        let promote = event("e-promo", "model_promoted", json!({"model_version": "v1"}));
        let policy = builtin();

        let history = vec![data(), trained(), evaluation(true), approval("a1", "approve")];
        policy.admit(&history, &promote).unwrap();

        let failed_eval = vec![data(), trained(), evaluation(false), approval("a1", "approve")];
        let reason = reason_of(policy.admit(&failed_eval, &promote).unwrap_err());
        assert!(reason.contains("promote-after-passed-evaluation"), "{reason}");

        let no_approval = vec![data(), trained(), evaluation(true)];
        let reason = reason_of(policy.admit(&no_approval, &promote).unwrap_err());
        assert!(reason.contains("promote-after-approval"), "{reason}");
    }

    /// Only the most recent approval counts: a later reject overrides an
    /// earlier approve.
    #[test]
    fn test_latest_approval_wins() {
        let promote = event("e-promo", "model_promoted", json!({}));
        let policy = builtin();

        let history = vec![
            evaluation(true),
            approval("a1", "approve"),
            approval("a2", "reject"),
        ];
        let reason = reason_of(policy.admit(&history, &promote).unwrap_err());
        assert!(reason.contains("promote-after-approval"), "{reason}");

        let history = vec![
            evaluation(true),
            approval("a1", "reject"),
            approval("a2", "approve"),
        ];
        policy.admit(&history, &promote).unwrap();
    }

    /// Every violated rule is reported, not just the first.
    #[test]
    fn test_all_violations_collected() {
        let promote = event("e-promo", "model_promoted", json!({}));
        let reason = reason_of(builtin().admit(&[], &promote).unwrap_err());
        assert!(reason.contains("promote-after-passed-evaluation"), "{reason}");
        assert!(reason.contains("promote-after-approval"), "{reason}");
    }

    // ── 4. mode review ────────────────────────────────────────────────────────

    /// A complete, clean log passes review in both modes.
    #[test]
    fn test_complete_log_passes_prod() {
        let log = log_of(vec![data(), trained(), evaluation(true), approval("a1", "approve")]);
        let policy = builtin();
        assert!(policy.review(&log, ExecutionMode::Ci).is_empty());
        assert!(policy.review(&log, ExecutionMode::Prod).is_empty());
    }

    /// Prod rejects events produced by a fallback generator; ci does not.
    #[test]
    fn test_prod_rejects_fallback_events() {
        let mut eval = evaluation(true);
        eval.payload
            .insert("evidence_source".to_string(), json!("ci_fallback"));
        let log = log_of(vec![data(), trained(), eval, approval("a1", "approve")]);
        let policy = builtin();

        assert!(policy.review(&log, ExecutionMode::Ci).is_empty());

        let violations = policy.review(&log, ExecutionMode::Prod);
        assert_eq!(violations.len(), 1, "{violations:?}");
        assert!(violations[0].contains("ci_fallback"));
        assert!(violations[0].contains("e-eval"));
    }

    /// The producing system counts as the source when the payload has none.
    #[test]
    fn test_system_is_fallback_source_label() {
        let mut stub_data = data();
        stub_data.system = "stub".to_string();
        let log = log_of(vec![stub_data, trained(), evaluation(true), approval("a1", "approve")]);
        let violations = builtin().review(&log, ExecutionMode::Prod);
        assert!(violations.iter().any(|v| v.contains("'stub'")), "{violations:?}");
    }

    /// A log-level source label is checked too.
    #[test]
    fn test_prod_rejects_fallback_log_source() {
        let mut log = log_of(vec![data(), trained(), evaluation(true), approval("a1", "approve")]);
        log.source = Some("fallback".to_string());
        let violations = builtin().review(&log, ExecutionMode::Prod);
        assert!(
            violations.iter().any(|v| v.contains("evidence log produced by source 'fallback'")),
            "{violations:?}"
        );
    }

    /// Prod requires each promotion event type to be present.
    #[test]
    fn test_prod_requires_event_coverage() {
        let log = log_of(vec![data(), evaluation(true)]);
        let violations = builtin().review(&log, ExecutionMode::Prod);
        assert!(violations.iter().any(|v| v.contains("model_trained")), "{violations:?}");
        assert!(violations.iter().any(|v| v.contains("human_approved")), "{violations:?}");
        assert!(builtin().review(&log, ExecutionMode::Ci).is_empty());
    }

    /// Review re-applies admission rules to events already in the log, so a
    /// log assembled without the gate is still judged.
    #[test]
    fn test_review_replays_event_rules() {
        let log = log_of(vec![trained()]);
        let violations = builtin().review(&log, ExecutionMode::Ci);
        assert_eq!(violations.len(), 1, "{violations:?}");
        assert!(violations[0].starts_with("event 0 (id=e-train)"));
    }
}
