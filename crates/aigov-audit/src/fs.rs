//! File-backed `EvidenceStore`.
//!
//! One pretty-printed JSON document per run at
//! `<docs>/evidence/<run_id>.json`, replaced atomically on every save.

use tracing::debug;

use aigov_contracts::{
    error::{AigovError, AigovResult},
    event::EvidenceLog,
    layout::{validate_run_id, ArtifactLayout},
};
use aigov_core::{fsio, traits::EvidenceStore};

pub struct FsEvidenceStore {
    layout: ArtifactLayout,
}

impl FsEvidenceStore {
    pub fn new(layout: ArtifactLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }
}

impl EvidenceStore for FsEvidenceStore {
    fn load(&self, run_id: &str) -> AigovResult<Option<EvidenceLog>> {
        validate_run_id(run_id)?;
        let path = self.layout.evidence_path(run_id);
        let bytes = match fsio::read_artifact(&path) {
            Ok(bytes) => bytes,
            Err(AigovError::MissingArtifact { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        let log: EvidenceLog = fsio::parse_json(&path, &bytes)?;
        debug!(run_id = %run_id, events = log.events.len(), "evidence log loaded");
        Ok(Some(log))
    }

    fn save(&self, log: &EvidenceLog) -> AigovResult<()> {
        validate_run_id(&log.run_id)?;
        fsio::write_json_atomic(&self.layout.evidence_path(&log.run_id), log)
    }
}
