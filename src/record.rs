//! Structured table records and cache provenance.
//!
//! The record shape mirrors the upstream Embrapa table layout: header
//! rows, body rows grouped into items with optional sub-items, and footer
//! (totals) rows. The same shape is produced by the live scraper and the
//! CSV fallback so callers cannot tell tiers apart by structure — only by
//! the provenance tag.

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// One body group: an item row plus the sub-item rows indented under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyGroup {
    /// Cell values of the item row. Empty for the default group that
    /// collects ungrouped rows.
    pub item_data: Vec<String>,
    /// Cell values of each sub-item row belonging to this item.
    pub sub_items: Vec<Vec<String>>,
}

/// A parsed data table: header rows, grouped body, footer rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRecord {
    pub header: Vec<Vec<String>>,
    pub body: Vec<BodyGroup>,
    pub footer: Vec<Vec<String>>,
}

impl TableRecord {
    /// True when no section holds any row.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.body.is_empty() && self.footer.is_empty()
    }
}

/// Which tier ultimately supplied a response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Live fetch succeeded; the payload was scraped moments ago.
    Fresh,
    /// Served from the short-TTL volatile tier.
    ShortTerm,
    /// Served from the long-TTL volatile tier after a fetch failure.
    LongTerm,
    /// Served from the local CSV fallback store.
    StaticFallback,
}

impl Provenance {
    /// Identifier used in the `cache_info.active_cache_layer` field.
    pub fn layer_name(&self) -> &'static str {
        match self {
            Provenance::Fresh => "fresh_data",
            Provenance::ShortTerm => "short_term",
            Provenance::LongTerm => "fallback",
            Provenance::StaticFallback => "csv_fallback",
        }
    }

    /// Human-readable description of the serving layer.
    pub fn layer_description(&self) -> &'static str {
        match self {
            Provenance::Fresh => "Real-time web scraping",
            Provenance::ShortTerm => "Fast cache (5 minutes)",
            Provenance::LongTerm => "Backup cache (30 days)",
            Provenance::StaticFallback => "Local file fallback",
        }
    }

    /// Value of the top-level `data_source` response field.
    pub fn data_source(&self) -> &'static str {
        match self {
            Provenance::Fresh => "Fresh web scraping",
            Provenance::ShortTerm => "Redis short_term cache",
            Provenance::LongTerm => "Redis fallback cache",
            Provenance::StaticFallback => "Local CSV files (Redis unavailable)",
        }
    }

    /// Value of the top-level `freshness` response field.
    pub fn freshness(&self) -> &'static str {
        match self {
            Provenance::Fresh => "Real-time data",
            Provenance::ShortTerm | Provenance::LongTerm => "Cached data",
            Provenance::StaticFallback => "Static data from local files",
        }
    }
}

/// Wire encoding of the `cached` response field:
/// `false | "short_term" | "fallback" | "csv_fallback"`.
impl Serialize for Provenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Provenance::Fresh => serializer.serialize_bool(false),
            Provenance::ShortTerm => serializer.serialize_str("short_term"),
            Provenance::LongTerm => serializer.serialize_str("fallback"),
            Provenance::StaticFallback => serializer.serialize_str("csv_fallback"),
        }
    }
}

/// The JSON value stored in the volatile tiers.
///
/// Provenance is deliberately absent — it is a property of the tier an
/// entry is read from, not of the entry itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPayload {
    pub data: TableRecord,
    pub stored_at: DateTime<Utc>,
}

impl CachedPayload {
    pub fn new(data: TableRecord) -> Self {
        Self {
            data,
            stored_at: Utc::now(),
        }
    }
}

/// A resolved response: payload plus where it came from.
///
/// Created by the coordinator, immutable afterwards.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub record: TableRecord,
    pub provenance: Provenance,
    pub stored_at: DateTime<Utc>,
}

impl Serialize for CacheEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("CacheEntry", 3)?;
        s.serialize_field("data", &self.record)?;
        s.serialize_field("cached", &self.provenance)?;
        s.serialize_field("stored_at", &self.stored_at)?;
        s.end()
    }
}
