//! Deterministic cache key derivation.
//!
//! A key is `<endpoint>:<sha256 hex>` over the endpoint name and the
//! allow-listed parameters in lexicographic key order. Length-prefixed
//! encoding prevents separator collisions (e.g. a value of `"a:b"` vs two
//! adjacent values `"a"`, `"b"`). Tier prefixes are prepended by the
//! coordinator; the key itself is tier-agnostic.

use sha2::{Digest, Sha256};

use crate::endpoint::{Endpoint, Params};

/// Parameters that participate in key derivation.
///
/// Anything else a caller sends is irrelevant to the cached payload and
/// must not fragment the key space.
const KEY_PARAMS: &[&str] = &["sub_option", "year"];

/// Derive the cache key for a request.
pub fn build_key(endpoint: Endpoint, params: &Params) -> String {
    let mut hasher = Sha256::new();
    hash_component(&mut hasher, endpoint.as_str());

    // `Params` is a BTreeMap, so iteration is already in lexicographic
    // key order; keys are lowercased defensively in case a caller built
    // the map by hand.
    for (key, value) in params {
        let key = key.to_ascii_lowercase();
        if !KEY_PARAMS.contains(&key.as_str()) {
            continue;
        }
        hash_component(&mut hasher, &key);
        hash_component(&mut hasher, value);
    }

    format!("{}:{:x}", endpoint.as_str(), hasher.finalize())
}

fn hash_component(hasher: &mut Sha256, component: &str) {
    hasher.update((component.len() as u64).to_le_bytes());
    hasher.update(component.as_bytes());
}
