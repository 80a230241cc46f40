//! Multi-tier cache resolution: key derivation, volatile store access,
//! per-tier metrics, and the coordinator that orders them.

pub mod key;
pub mod metrics;
pub mod tiers;
pub mod volatile;

pub use key::build_key;
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use tiers::{Tier, TierAttempt, TieredCache, Unavailable, FALLBACK_PREFIX, SHORT_PREFIX};
pub use volatile::{RedisStore, StoreUnavailable, VolatileStore};
