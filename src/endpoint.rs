//! The closed set of data endpoints and their validation tables.
//!
//! Each endpoint maps to an `opcao` code on the upstream Embrapa site and
//! carries a closed list of accepted `sub_option` values. Parameter
//! validation messages are kept in Portuguese, matching the upstream data
//! domain.

use std::collections::BTreeMap;
use std::fmt;

/// Normalized request parameters: lowercase keys, sorted by key.
///
/// Built by the routing layer from the raw query string. The sorted map
/// keeps cache key derivation order-independent for free.
pub type Params = BTreeMap<String, String>;

/// Inclusive year bounds accepted by every endpoint.
pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 2024;

/// One of the five fixed data endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Producao,
    Processamento,
    Comercializacao,
    Importacao,
    Exportacao,
}

impl Endpoint {
    /// All endpoints, in route-registration order.
    pub const ALL: [Endpoint; 5] = [
        Endpoint::Producao,
        Endpoint::Processamento,
        Endpoint::Comercializacao,
        Endpoint::Importacao,
        Endpoint::Exportacao,
    ];

    /// The route segment and cache-key namespace for this endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Producao => "producao",
            Endpoint::Processamento => "processamento",
            Endpoint::Comercializacao => "comercializacao",
            Endpoint::Importacao => "importacao",
            Endpoint::Exportacao => "exportacao",
        }
    }

    /// The `opcao` query value the upstream site expects for this endpoint.
    pub fn opcao(&self) -> &'static str {
        match self {
            Endpoint::Producao => "opt_02",
            Endpoint::Processamento => "opt_03",
            Endpoint::Comercializacao => "opt_04",
            Endpoint::Importacao => "opt_05",
            Endpoint::Exportacao => "opt_06",
        }
    }

    /// Closed list of accepted `sub_option` values for this endpoint.
    pub fn sub_options(&self) -> &'static [&'static str] {
        match self {
            Endpoint::Producao => &[
                "VINHO DE MESA",
                "VINHO FINO DE MESA (VINIFERA)",
                "SUCO DE UVA",
                "DERIVADOS",
            ],
            Endpoint::Processamento => &["viniferas", "americanas", "mesa", "semclass"],
            Endpoint::Comercializacao => &[
                "VINHO DE MESA",
                "ESPUMANTES",
                "UVAS FRESCAS",
                "SUCO DE UVA",
            ],
            Endpoint::Importacao => &["vinhos", "espumantes", "frescas", "passas", "suco"],
            Endpoint::Exportacao => &["vinho", "uva", "espumantes", "suco"],
        }
    }

    /// Whether `value` is an accepted `sub_option` for this endpoint.
    pub fn accepts_sub_option(&self, value: &str) -> bool {
        self.sub_options().contains(&value)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a normalized [`Params`] map from raw query pairs.
///
/// Keys are lowercased; empty values are dropped so `?year=` behaves like
/// an absent parameter.
pub fn normalize_params<I, K, V>(raw: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    raw.into_iter()
        .filter_map(|(k, v)| {
            let value: String = v.into();
            if value.is_empty() {
                None
            } else {
                Some((k.as_ref().to_ascii_lowercase(), value))
            }
        })
        .collect()
}

/// Validate `year` and `sub_option` against the endpoint's accepted values.
///
/// Returns the first violation as a user-facing message. Domain
/// correctness only — unknown extra parameters are ignored here and
/// excluded from cache keys by the key builder's allow-list.
pub fn validate_params(endpoint: Endpoint, params: &Params) -> std::result::Result<(), String> {
    if let Some(year) = params.get("year") {
        match year.parse::<i32>() {
            Ok(y) if (MIN_YEAR..=MAX_YEAR).contains(&y) => {}
            Ok(_) => {
                return Err(format!(
                    "Ano inválido. Deve estar entre {MIN_YEAR} e {MAX_YEAR}."
                ))
            }
            Err(_) => return Err("Ano deve ser um número inteiro válido.".to_string()),
        }
    }

    if let Some(sub_option) = params.get("sub_option") {
        if !endpoint.accepts_sub_option(sub_option) {
            return Err(format!(
                "Sub-opção inválida para {endpoint}. Opções válidas: {}",
                endpoint.sub_options().join(", ")
            ));
        }
    }

    Ok(())
}
