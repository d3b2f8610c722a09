//! # API Shared
//!
//! Shared wire types and services for the ANC APIs.
//!
//! Contains:
//! - Request/response bodies (`wire` module) with OpenAPI schemas
//! - Shared services like `HealthService`
//!
//! Used by `anc-core` for conversions and by `anc-api-rest` for handlers.

pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
