//! In-memory implementation of `EvidenceStore`.
//!
//! `InMemoryEvidenceStore` keeps logs in a map behind a `Mutex`. Saves
//! replace the whole log, matching the file store's atomic-replace
//! semantics. Used by tests and by callers that export to another backend
//! themselves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use aigov_contracts::{
    error::{AigovError, AigovResult},
    event::EvidenceLog,
};
use aigov_core::traits::EvidenceStore;

#[derive(Clone, Default)]
pub struct InMemoryEvidenceStore {
    pub(crate) logs: Arc<Mutex<HashMap<String, EvidenceLog>>>,
}

impl InMemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a stored log without any checks, for fixtures.
    pub fn insert_raw(&self, log: EvidenceLog) -> AigovResult<()> {
        let mut logs = self.lock()?;
        logs.insert(log.run_id.clone(), log);
        Ok(())
    }

    fn lock(&self) -> AigovResult<std::sync::MutexGuard<'_, HashMap<String, EvidenceLog>>> {
        self.logs.lock().map_err(|e| AigovError::StoreUnavailable {
            reason: format!("evidence store lock poisoned: {e}"),
        })
    }
}

impl EvidenceStore for InMemoryEvidenceStore {
    fn load(&self, run_id: &str) -> AigovResult<Option<EvidenceLog>> {
        Ok(self.lock()?.get(run_id).cloned())
    }

    fn save(&self, log: &EvidenceLog) -> AigovResult<()> {
        self.lock()?.insert(log.run_id.clone(), log.clone());
        Ok(())
    }
}
