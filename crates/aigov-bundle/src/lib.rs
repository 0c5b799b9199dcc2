//! # aigov-bundle
//!
//! Derives the fingerprinted audit bundle for a run.
//!
//! ## Overview
//!
//! - [`fingerprint`] computes the bundle fingerprint from the evidence log
//!   bytes, its chain head, the run id and the policy version.
//! - [`report`] renders the Markdown report whose header echoes the
//!   fingerprint, or refreshes the header of an existing report.
//! - [`export`] writes the audit record, its self-hash sidecar and the
//!   manifest.
//!
//! The usual sequence for a run is report, then export:
//!
//! ```rust,ignore
//! let layout = ArtifactLayout::new("docs");
//! ReportWriter::new(layout.clone(), ExecutionMode::Ci).write("r1", false)?;
//! let outcome = BundleExporter::new(layout).export("r1")?;
//! println!("bundle_sha256={}", outcome.record.bundle_sha256);
//! ```

pub mod export;
pub mod fingerprint;
pub mod report;

pub use export::{BundleExporter, ExportOutcome};
pub use fingerprint::{bundle_fingerprint, policy_version_of, FingerprintInputs, UNKNOWN_POLICY_VERSION};
pub use report::{fill_header, render_report, ReportOutcome, ReportWriter};

// ── Tests ─────────────────────────────────────────────────────────────────────
