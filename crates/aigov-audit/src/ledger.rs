//! Strict-append access to a run's evidence log.
//!
//! `EvidenceLedger` is the only writer of evidence. Each append loads the
//! log through an `EvidenceStore`, checks the stored chain, applies the
//! policy gate, links and hashes the new event, and saves the whole log
//! atomically.
//!
//! Append is load → mutate copy → save. Two writers appending to the same
//! run id at once can lose an event; callers must serialise writers per run.

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use aigov_contracts::{
    error::{AigovError, AigovResult},
    event::{Event, EvidenceLog, NewEvent},
    layout::validate_run_id,
};
use aigov_core::traits::{EvidenceStore, PolicyGate};

use crate::chain::{hash_event, rebuild_and_validate, rebuild_chain};

/// Current UTC time in the format stored in evidence.
pub fn utc_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Append-only writer over an `EvidenceStore`.
pub struct EvidenceLedger<S: EvidenceStore> {
    store: S,
    policy: Option<Box<dyn PolicyGate>>,
    policy_version: Option<String>,
}

impl<S: EvidenceStore> EvidenceLedger<S> {
    /// A ledger with no policy gate and no policy version stamping.
    pub fn new(store: S) -> Self {
        Self {
            store,
            policy: None,
            policy_version: None,
        }
    }

    /// Run every candidate event through `policy` before it is appended.
    pub fn with_policy(mut self, policy: Box<dyn PolicyGate>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Stamp `version` onto logs this ledger creates.
    pub fn with_policy_version(mut self, version: Option<String>) -> Self {
        self.policy_version = version.filter(|v| !v.trim().is_empty());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load the log for `run_id`; `None` when the run has no log yet.
    pub fn load(&self, run_id: &str) -> AigovResult<Option<EvidenceLog>> {
        validate_run_id(run_id)?;
        self.store.load(run_id)
    }

    /// Create and persist an empty log for `run_id` if none exists.
    ///
    /// Returns the existing log untouched when there is one.
    pub fn ensure_log(&self, run_id: &str) -> AigovResult<EvidenceLog> {
        validate_run_id(run_id)?;
        if let Some(existing) = self.store.load(run_id)? {
            return Ok(existing);
        }
        let log = self.new_log(run_id);
        self.store.save(&log)?;
        info!(run_id = %run_id, "evidence log created");
        Ok(log)
    }

    /// Append one event and return it with its computed links.
    ///
    /// Errors:
    /// - `InvalidArgument` for an empty or unusable run id or event type
    /// - `DuplicateEventId` when `event_id` is already in the log
    /// - `ChainBroken` when the stored log no longer validates
    /// - `PolicyViolation` when the configured gate rejects the event
    ///
    /// On any error the stored log is left as it was.
    pub fn append(&self, new: NewEvent) -> AigovResult<Event> {
        let run_id = new.run_id.trim().to_string();
        validate_run_id(&run_id)?;

        let event_type = new.event_type.trim().to_string();
        if event_type.is_empty() {
            return Err(AigovError::InvalidArgument {
                reason: "event type is required".to_string(),
            });
        }

        let mut log = match self.store.load(&run_id)? {
            Some(log) => log,
            None => self.new_log(&run_id),
        };

        if log.run_id != run_id {
            return Err(AigovError::malformed(
                format!("evidence log for '{run_id}'"),
                format!("log declares run_id '{}'", log.run_id),
            ));
        }

        let validation = rebuild_and_validate(&log);
        if let Some(divergence) = validation.first_divergence {
            warn!(run_id = %run_id, divergence = %divergence.describe(), "refusing to append to broken chain");
            return Err(AigovError::ChainBroken {
                run_id,
                reason: divergence.describe(),
            });
        }

        let event_id = match new.event_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            Some(_) => {
                return Err(AigovError::InvalidArgument {
                    reason: "event_id must not be blank".to_string(),
                })
            }
            None => generate_event_id(&event_type, &run_id),
        };

        if log.contains_event_id(&event_id) {
            return Err(AigovError::DuplicateEventId { event_id, run_id });
        }

        let prev_sha256 = log.chain.head_sha256.clone();
        let mut event = Event {
            id: event_id,
            event_type,
            ts_utc: new.ts_utc.unwrap_or_else(utc_now),
            actor: new.actor,
            system: new.system,
            run_id: run_id.clone(),
            payload: new.payload,
            prev_sha256,
            sha256: String::new(),
        };
        event.sha256 = hash_event(&event, event.prev_sha256.as_deref());

        if let Some(policy) = &self.policy {
            policy.admit(&log.events, &event)?;
        }

        log.events.push(event.clone());
        log.chain.head_sha256 = Some(event.sha256.clone());
        log.chain.ts_utc = utc_now();
        self.store.save(&log)?;

        info!(
            run_id = %event.run_id,
            event_id = %event.id,
            event_type = %event.event_type,
            sha256 = %event.sha256,
            event_count = log.events.len(),
            "evidence event appended"
        );

        Ok(event)
    }

    /// Explicitly relink and rehash a stored log, then save it.
    ///
    /// Returns the number of events whose stored link or hash changed.
    pub fn rebuild(&self, run_id: &str) -> AigovResult<usize> {
        validate_run_id(run_id)?;
        let log = self.store.load(run_id)?.ok_or_else(|| AigovError::InvalidArgument {
            reason: format!("no evidence log for run_id '{run_id}'"),
        })?;

        let rebuilt = rebuild_chain(&log, &utc_now());
        let changed = log
            .events
            .iter()
            .zip(&rebuilt.events)
            .filter(|(old, new)| old.sha256 != new.sha256 || old.prev_sha256 != new.prev_sha256)
            .count();

        self.store.save(&rebuilt)?;
        warn!(
            run_id = %run_id,
            changed,
            head = ?rebuilt.chain.head_sha256,
            "evidence chain rebuilt on request"
        );
        Ok(changed)
    }

    fn new_log(&self, run_id: &str) -> EvidenceLog {
        let mut log = EvidenceLog::empty(run_id, utc_now());
        log.policy_version = self.policy_version.clone();
        debug!(run_id = %run_id, "starting new evidence log");
        log
    }
}

/// `<type>_<run_id>_<uuid v4>`: unique within a run without coordination.
pub fn generate_event_id(event_type: &str, run_id: &str) -> String {
    format!("{event_type}_{run_id}_{}", Uuid::new_v4())
}
