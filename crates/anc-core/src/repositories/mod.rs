//! Record stores.
//!
//! Each store is an async trait (the seam the workflow depends on) plus a filesystem-backed
//! implementation that keeps one JSON document per record.

pub mod registrations;
pub mod reports;
pub(crate) mod shared;
