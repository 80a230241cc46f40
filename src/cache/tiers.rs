//! Tiered cache coordinator.
//!
//! Resolution consults four sources in strict freshness-first order:
//! short-TTL tier, live fetch, long-TTL tier, static CSV fallback. The
//! first hit wins and is tagged with its provenance; a cheap static
//! answer is never preferred over a fresher one. Every tier's absence is
//! non-fatal — only exhaustion of all four surfaces to the caller, as a
//! typed [`Unavailable`] carrying the per-tier trace.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::key::build_key;
use crate::cache::metrics::CacheMetrics;
use crate::cache::volatile::{StoreUnavailable, VolatileStore};
use crate::endpoint::{Endpoint, Params};
use crate::fallback::StaticFallbackStore;
use crate::record::{CacheEntry, CachedPayload, Provenance};
use crate::scrape::LiveFetcher;

/// Key prefix of the short-TTL (burst-absorbing) tier.
pub const SHORT_PREFIX: &str = "short:";
/// Key prefix of the long-TTL (outage-surviving) tier.
pub const FALLBACK_PREFIX: &str = "fallback:";

/// The ordered data sources consulted during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    ShortTerm,
    LiveFetch,
    LongTerm,
    StaticFallback,
}

/// One consulted-and-missed tier, with the reason it produced nothing.
#[derive(Debug, Clone, Serialize)]
pub struct TierAttempt {
    pub tier: Tier,
    pub outcome: String,
}

/// Every tier was consulted and none produced a payload.
///
/// The only resolution failure callers ever see; the attempt trace feeds
/// the 503 diagnostic body.
#[derive(Debug, Clone, thiserror::Error)]
#[error("all data sources exhausted")]
pub struct Unavailable {
    pub attempts: Vec<TierAttempt>,
}

/// Outcome of reading one volatile tier.
enum TierRead {
    Hit(CachedPayload),
    Miss(String),
}

/// Coordinates resolution across the volatile tiers, the live fetch
/// collaborator, and the static fallback store.
///
/// Stateless per call apart from the injected metrics and the fallback
/// store's bounded result cache; safe to share across request workers.
pub struct TieredCache {
    store: Arc<dyn VolatileStore>,
    fallback: Arc<StaticFallbackStore>,
    metrics: Arc<CacheMetrics>,
    short_ttl: Duration,
    long_ttl: Duration,
}

impl TieredCache {
    pub fn new(
        store: Arc<dyn VolatileStore>,
        fallback: Arc<StaticFallbackStore>,
        metrics: Arc<CacheMetrics>,
        short_ttl: Duration,
        long_ttl: Duration,
    ) -> Self {
        Self {
            store,
            fallback,
            metrics,
            short_ttl,
            long_ttl,
        }
    }

    /// Resolve one request through the tier chain.
    pub async fn resolve(
        &self,
        endpoint: Endpoint,
        params: &Params,
        fetcher: &dyn LiveFetcher,
    ) -> Result<CacheEntry, Unavailable> {
        let key = build_key(endpoint, params);
        let mut attempts = Vec::with_capacity(4);

        // Tier 1: short-term cache. Absorbs request bursts within the
        // freshness window without touching the live source.
        match self.read_tier(SHORT_PREFIX, &key).await {
            TierRead::Hit(payload) => {
                self.metrics.record_short_hit();
                info!(%endpoint, "Short-term cache hit");
                return Ok(CacheEntry {
                    record: payload.data,
                    provenance: Provenance::ShortTerm,
                    stored_at: payload.stored_at,
                });
            }
            TierRead::Miss(outcome) => {
                self.metrics.record_short_miss();
                debug!(%endpoint, outcome, "Short-term cache miss");
                attempts.push(TierAttempt {
                    tier: Tier::ShortTerm,
                    outcome,
                });
            }
        }

        // Tier 2: live fetch. On success, warm both volatile tiers —
        // best-effort; a failed write never fails the request.
        match fetcher.fetch(endpoint, params).await {
            Ok(record) => {
                self.metrics.record_fresh_fetch();
                let payload = CachedPayload::new(record);
                self.warm_tiers(&key, &payload).await;
                info!(%endpoint, "Serving fresh data");
                return Ok(CacheEntry {
                    record: payload.data,
                    provenance: Provenance::Fresh,
                    stored_at: payload.stored_at,
                });
            }
            Err(e) => {
                // Expected steady-state: the live source is unreliable.
                self.metrics.record_fetch_failure();
                warn!(%endpoint, "Live fetch failed: {e}");
                attempts.push(TierAttempt {
                    tier: Tier::LiveFetch,
                    outcome: e.to_string(),
                });
            }
        }

        // Tier 3: long-term cache. Survives extended source outages
        // while the volatile store itself stays healthy.
        match self.read_tier(FALLBACK_PREFIX, &key).await {
            TierRead::Hit(payload) => {
                self.metrics.record_long_hit();
                warn!(%endpoint, "Serving long-term cache after fetch failure");
                return Ok(CacheEntry {
                    record: payload.data,
                    provenance: Provenance::LongTerm,
                    stored_at: payload.stored_at,
                });
            }
            TierRead::Miss(outcome) => {
                self.metrics.record_long_miss();
                debug!(%endpoint, outcome, "Long-term cache miss");
                attempts.push(TierAttempt {
                    tier: Tier::LongTerm,
                    outcome,
                });
            }
        }

        // Tier 4: static fallback. Survives simultaneous failure of the
        // live source and the volatile store.
        let sub_option = params.get("sub_option").map(String::as_str);
        match self.fallback.lookup(endpoint, sub_option) {
            Some(record) => {
                self.metrics.record_static_hit();
                warn!(%endpoint, "Serving static fallback data");
                return Ok(CacheEntry {
                    record: (*record).clone(),
                    provenance: Provenance::StaticFallback,
                    stored_at: Utc::now(),
                });
            }
            None => {
                self.metrics.record_static_miss();
                attempts.push(TierAttempt {
                    tier: Tier::StaticFallback,
                    outcome: "no static source".to_string(),
                });
            }
        }

        self.metrics.record_exhaustion();
        warn!(%endpoint, ?attempts, "All data sources exhausted");
        Err(Unavailable { attempts })
    }

    /// Read one volatile tier. Store outages and corrupt entries both
    /// collapse into misses — only the trace wording differs.
    async fn read_tier(&self, prefix: &str, key: &str) -> TierRead {
        match self.store.get(&format!("{prefix}{key}")).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<CachedPayload>(&bytes) {
                Ok(payload) => TierRead::Hit(payload),
                Err(e) => {
                    warn!(key, "Discarding corrupt cache entry: {e}");
                    TierRead::Miss(format!("corrupt entry: {e}"))
                }
            },
            Ok(None) => TierRead::Miss("miss".to_string()),
            Err(StoreUnavailable) => TierRead::Miss("store unavailable".to_string()),
        }
    }

    /// Opportunistic cache warming after a successful fetch.
    async fn warm_tiers(&self, key: &str, payload: &CachedPayload) {
        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, "Cache payload failed to serialize: {e}");
                return;
            }
        };
        if !self
            .store
            .set(&format!("{SHORT_PREFIX}{key}"), &bytes, self.short_ttl)
            .await
        {
            debug!(key, "Short-term warm write failed");
        }
        if !self
            .store
            .set(&format!("{FALLBACK_PREFIX}{key}"), &bytes, self.long_ttl)
            .await
        {
            debug!(key, "Long-term warm write failed");
        }
    }
}
