//! Live fetch collaborator: scrape one endpoint page into a record.
//!
//! The upstream site is assumed unreliable; every failure mode is a typed
//! [`FetchError`] the coordinator feeds into its degradation chain, never
//! an exception. A timed-out fetch is indistinguishable from any other
//! failure downstream.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::endpoint::{Endpoint, Params};
use crate::error::{Result, VitiError};
use crate::record::TableRecord;

use super::parse;

/// Upstream page serving every data table.
pub const BASE_URL: &str = "http://vitibrasil.cnpuv.embrapa.br/index.php";

/// Why a live fetch produced no record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("page could not be parsed: {0}")]
    Parse(String),
    #[error("request failed: {0}")]
    Request(String),
}

/// A source of freshly scraped records.
///
/// The coordinator depends on this seam instead of [`SiteClient`] so
/// tests can script successes and failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LiveFetcher: Send + Sync {
    async fn fetch(&self, endpoint: Endpoint, params: &Params) -> std::result::Result<TableRecord, FetchError>;
}

/// HTTP client for the upstream statistics site.
pub struct SiteClient {
    http: reqwest::Client,
    base_url: String,
}

impl SiteClient {
    /// Build a client with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(timeout, BASE_URL)
    }

    /// Build a client against an alternative base URL (tests, mirrors).
    pub fn with_base_url(timeout: Duration, base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| VitiError::Config(format!("HTTP client construction failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

/// Query pairs for an endpoint request: the `opcao` code plus optional
/// `ano` and `subopcao` passthroughs.
pub fn query_pairs(endpoint: Endpoint, params: &Params) -> Vec<(&'static str, String)> {
    let mut pairs = vec![("opcao", endpoint.opcao().to_string())];
    if let Some(year) = params.get("year") {
        pairs.push(("ano", year.clone()));
    }
    if let Some(sub_option) = params.get("sub_option") {
        pairs.push(("subopcao", sub_option.clone()));
    }
    pairs
}

fn classify(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_connect() {
        FetchError::Connect(error.to_string())
    } else {
        FetchError::Request(error.to_string())
    }
}

#[async_trait]
impl LiveFetcher for SiteClient {
    async fn fetch(&self, endpoint: Endpoint, params: &Params) -> std::result::Result<TableRecord, FetchError> {
        let pairs = query_pairs(endpoint, params);
        debug!(%endpoint, ?pairs, "Fetching upstream page");

        let response = self
            .http
            .get(&self.base_url)
            .query(&pairs)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = response.text().await.map_err(classify)?;
        let record = parse::parse_page(&html)
            .ok_or_else(|| FetchError::Parse("data table not found in page".to_string()))?;

        info!(%endpoint, rows = record.body.len(), "Scraped fresh record");
        Ok(record)
    }
}
