//! UUID and sharded-path utilities.
//!
//! Reports are stored under sharded directories derived from their identifier. To keep path
//! derivation deterministic, storage identifiers use a *canonical* UUID representation:
//! **32 lowercase hexadecimal characters** (no hyphens).
//!
//! This crate provides:
//! - [`ShardableUuid`], a wrapper that guarantees the canonical format once constructed.
//! - [`MonotonicClock`], which hands out strictly increasing creation timestamps.
//!
//! ## Sharded directory layout
//! For a canonical UUID `u`, data lives under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `anc_data/reports/55/0e/550e8400e29b41d4a716446655440000/`
//!
//! This keeps the fan-out of any single directory small.

mod service;

pub use service::{MonotonicClock, ShardableUuid};

/// Error type for UUID operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for UUID operations.
pub type UuidResult<T> = Result<T, UuidError>;
