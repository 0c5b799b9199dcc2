//! # aigov-audit
//!
//! Append-only, SHA-256 hash-chained evidence log for aigov runs.
//!
//! ## Overview
//!
//! Every governance event appended through `EvidenceLedger` links to the
//! previous event via its hash. Editing any field of any stored event, or
//! reordering or deleting events, changes the recomputed chain and is
//! detected by `rebuild_and_validate`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aigov_audit::{EvidenceLedger, FsEvidenceStore};
//! use aigov_contracts::layout::ArtifactLayout;
//!
//! let ledger = EvidenceLedger::new(FsEvidenceStore::new(ArtifactLayout::new("docs")));
//! let event = ledger.append(new_event)?;
//! let log = ledger.load("r1")?.unwrap();
//! assert!(aigov_audit::rebuild_and_validate(&log).valid);
//! ```

pub mod chain;
pub mod fs;
pub mod ledger;
pub mod memory;

pub use chain::{hash_event, rebuild_and_validate, rebuild_chain, ChainDivergence, ChainValidation};
pub use fs::FsEvidenceStore;
pub use ledger::{generate_event_id, utc_now, EvidenceLedger};
pub use memory::InMemoryEvidenceStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
