//! # aigov-contracts
//!
//! Shared types, artifact layout, and error taxonomy for aigov.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, path conventions, and error types.

pub mod audit;
pub mod error;
pub mod event;
pub mod layout;
pub mod mode;
pub mod report;
pub mod verify;
