//! # aigov-core
//!
//! Hashing substrate and trust seams for aigov.
//!
//! This crate provides:
//! - the canonical JSON encoder every hash is computed over
//! - SHA-256 helpers for bytes and files
//! - atomic (temp file + rename) artifact writes
//! - the `EvidenceStore` and `PolicyGate` traits
//!
//! ## Usage
//!
//! ```rust,ignore
//! use aigov_core::{canonical, digest};
//!
//! let hash = digest::sha256_hex(&canonical::encode(&value));
//! ```

pub mod canonical;
pub mod digest;
pub mod fsio;
pub mod traits;

pub use traits::{EvidenceStore, PolicyGate};
