//! Static fallback store: pre-baked CSV snapshots served as the last
//! resort when both the live source and the volatile store are down.
//!
//! Lookups resolve (endpoint, sub_option) to a file through a fixed
//! mapping, go through the bounded result cache, and convert every file
//! defect into a clean miss. Only the inventory validation report — an
//! operational surface, never the request path — sees the defects.

mod bounded;
mod table;

pub use bounded::{BoundedCacheStats, BoundedResultCache};
pub use table::TableError;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::record::TableRecord;

/// Static sources for one endpoint: the default file plus per-sub-option
/// overrides.
#[derive(Debug, Clone, Copy)]
pub struct SourceMap {
    pub default: &'static str,
    pub sub_options: &'static [(&'static str, &'static str)],
}

/// Endpoint-to-file mapping. Loaded once, never mutated.
static ENDPOINT_CSV_MAP: Lazy<HashMap<Endpoint, SourceMap>> = Lazy::new(|| {
    HashMap::from([
        (
            Endpoint::Producao,
            SourceMap {
                default: "Producao.csv",
                sub_options: &[
                    ("VINHO DE MESA", "Producao.csv"),
                    ("VINHO FINO DE MESA (VINIFERA)", "Producao.csv"),
                    ("SUCO DE UVA", "Producao.csv"),
                    ("DERIVADOS", "Producao.csv"),
                ],
            },
        ),
        (
            Endpoint::Processamento,
            SourceMap {
                default: "ProcessaViniferas.csv",
                sub_options: &[
                    ("viniferas", "ProcessaViniferas.csv"),
                    ("americanas", "ProcessaAmericanas.csv"),
                    ("mesa", "ProcessaMesa.csv"),
                    ("semclass", "ProcessaSemclass.csv"),
                ],
            },
        ),
        (
            Endpoint::Comercializacao,
            SourceMap {
                default: "Comercio.csv",
                sub_options: &[
                    ("VINHO DE MESA", "Comercio.csv"),
                    ("ESPUMANTES", "Comercio.csv"),
                    ("UVAS FRESCAS", "Comercio.csv"),
                    ("SUCO DE UVA", "Comercio.csv"),
                ],
            },
        ),
        (
            Endpoint::Importacao,
            SourceMap {
                default: "ImpVinhos.csv",
                sub_options: &[
                    ("vinhos", "ImpVinhos.csv"),
                    ("espumantes", "ImpEspumantes.csv"),
                    ("frescas", "ImpFrescas.csv"),
                    ("passas", "ImpPassas.csv"),
                    ("suco", "ImpSuco.csv"),
                ],
            },
        ),
        (
            Endpoint::Exportacao,
            SourceMap {
                default: "ExpVinho.csv",
                sub_options: &[
                    ("vinho", "ExpVinho.csv"),
                    ("uva", "ExpUva.csv"),
                    ("espumantes", "ExpEspumantes.csv"),
                    ("suco", "ExpSuco.csv"),
                ],
            },
        ),
    ])
});

/// Resolve the backing file for an endpoint and optional sub-option.
///
/// Unknown or absent sub-options fall back to the endpoint default.
pub fn source_file(endpoint: Endpoint, sub_option: Option<&str>) -> &'static str {
    let sources = &ENDPOINT_CSV_MAP[&endpoint];
    sub_option
        .and_then(|wanted| {
            sources
                .sub_options
                .iter()
                .find(|(name, _)| *name == wanted)
                .map(|(_, file)| *file)
        })
        .unwrap_or(sources.default)
}

/// Read-only store over the fallback CSV directory.
#[derive(Debug)]
pub struct StaticFallbackStore {
    dir: PathBuf,
    cache: BoundedResultCache,
}

impl StaticFallbackStore {
    pub fn new(dir: impl Into<PathBuf>, cache_capacity: usize, cache_ttl: Duration) -> Self {
        let dir = dir.into();
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Fallback directory missing; static tier will miss");
        }
        Self {
            dir,
            cache: BoundedResultCache::new(cache_capacity, cache_ttl),
        }
    }

    /// Fetch the static record for (endpoint, sub_option).
    ///
    /// Missing, unreadable, malformed, and empty files all yield `None`
    /// so the coordinator sees a clean tier miss.
    pub fn lookup(&self, endpoint: Endpoint, sub_option: Option<&str>) -> Option<Arc<TableRecord>> {
        let file = source_file(endpoint, sub_option);

        if let Some(record) = self.cache.get(file) {
            debug!(%endpoint, file, "Static fallback served from result cache");
            return Some(record);
        }

        match table::load_table(&self.dir.join(file)) {
            Ok(record) if record.is_empty() => {
                warn!(%endpoint, file, "Static source parsed to an empty record");
                None
            }
            Ok(record) => Some(self.cache.insert(file.to_string(), record)),
            Err(e) => {
                warn!(%endpoint, file, "Static source unavailable: {e}");
                None
            }
        }
    }

    /// Whether the backing directory exists at all.
    pub fn is_available(&self) -> bool {
        self.dir.is_dir()
    }

    /// Result-cache counters for the stats surface.
    pub fn cache_stats(&self) -> BoundedCacheStats {
        self.cache.stats()
    }

    /// Check every mapped (endpoint, sub_option) pair against the files
    /// on disk. Operational reporting only; bypasses the result cache so
    /// the report reflects the disk, not the cache.
    pub fn validate_inventory(&self) -> InventoryReport {
        let mut entries = Vec::new();
        for endpoint in Endpoint::ALL {
            let sources = &ENDPOINT_CSV_MAP[&endpoint];
            entries.push(self.check_source(endpoint, None, sources.default));
            for &(sub_option, file) in sources.sub_options {
                entries.push(self.check_source(endpoint, Some(sub_option), file));
            }
        }
        let issues = entries.iter().filter(|e| e.status != "ok").count();
        InventoryReport {
            overall_status: match issues {
                0 => "ok",
                n if n == entries.len() => "unavailable",
                _ => "degraded",
            },
            checked: entries.len(),
            issues,
            entries,
        }
    }

    fn check_source(
        &self,
        endpoint: Endpoint,
        sub_option: Option<&str>,
        file: &str,
    ) -> InventoryEntry {
        let path = self.dir.join(file);
        let (status, detail) = inspect_source(&path);
        InventoryEntry {
            endpoint: endpoint.as_str().to_string(),
            sub_option: sub_option.map(str::to_string),
            file: file.to_string(),
            status,
            detail,
        }
    }
}

fn inspect_source(path: &Path) -> (&'static str, Option<String>) {
    if !path.is_file() {
        return ("missing", None);
    }
    match table::load_table(path) {
        Ok(record) if record.is_empty() => ("empty", None),
        Ok(_) => ("ok", None),
        Err(e) => ("unparseable", Some(e.to_string())),
    }
}

/// Health report over the whole static inventory.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryReport {
    pub overall_status: &'static str,
    pub checked: usize,
    pub issues: usize,
    pub entries: Vec<InventoryEntry>,
}

/// One (endpoint, sub_option) → file check.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryEntry {
    pub endpoint: String,
    pub sub_option: Option<String>,
    pub file: String,
    pub status: &'static str,
    pub detail: Option<String>,
}
