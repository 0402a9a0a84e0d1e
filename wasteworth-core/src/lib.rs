//! Core types and service wiring for the wasteworth collection marketplace.

/// Great-circle distance and bounding-box helpers.
pub mod geo;
/// Domain models and identifiers shared by all directory backends.
pub mod model;
/// Registry and helpers for plugging directory backends into the service.
pub mod plugin;
/// Traits describing the directory and request ledger interfaces.
pub mod ports;
/// Nearby-collector query parsing, filtering, and ranking.
pub mod proximity;
/// High-level service facade used by the HTTP layer.
pub mod service;

pub use model::*;
pub use plugin::*;
pub use ports::*;
pub use proximity::*;
pub use service::*;
