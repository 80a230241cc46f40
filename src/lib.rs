//! VitiBrasil API — authenticated HTTP access to Embrapa vitivinicultural
//! statistics, shielded from upstream unreliability by a multi-tier
//! cache/fallback resolution engine.
//!
//! Resolution order is freshness-first: short-TTL cache, live scrape,
//! long-TTL cache, static CSV snapshot. Every response carries the
//! provenance of the tier that served it, and only exhaustion of all
//! four tiers surfaces as an error.

pub mod api;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod fallback;
pub mod record;
pub mod scrape;

pub use error::{Result, VitiError};
