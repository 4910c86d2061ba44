//! NIP-05: mapping `name@domain` identifiers to public keys.
//!
//! Lookups go through an injected [`HttpFetch`]; every failure (transport,
//! status, malformed document) resolves to "not found".

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::fetch::HttpFetch;
use crate::nip19::ProfilePointer;

/// Resolves NIP-05 identifiers against `https://<domain>/.well-known/nostr.json`.
#[derive(Debug, Clone)]
pub struct Nip05Resolver<F> {
    fetch: F,
}

impl<F: HttpFetch> Nip05Resolver<F> {
    pub fn new(fetch: F) -> Self {
        Self { fetch }
    }

    /// Names published by `domain`, optionally narrowed by `query`.
    /// Returns an empty map when the lookup fails.
    pub async fn search_domain(&self, domain: &str, query: &str) -> BTreeMap<String, String> {
        let Some(json) = self.well_known(domain, query).await else {
            return BTreeMap::new();
        };
        json.get("names")
            .and_then(Value::as_object)
            .map(|names| {
                names
                    .iter()
                    .filter_map(|(name, pubkey)| Some((name.clone(), pubkey.as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve `name@domain`, or a bare `domain` as `_@domain`.
    pub async fn query_profile(&self, fullname: &str) -> Option<ProfilePointer> {
        let (name, domain) = split_identifier(fullname)?;
        let json = self.well_known(domain, name).await?;

        let pubkey = json
            .get("names")
            .and_then(|names| names.get(name))
            .and_then(Value::as_str)
            .filter(|pubkey| !pubkey.is_empty())?
            .to_string();

        let relays = json
            .get("relays")
            .and_then(|relays| relays.get(&pubkey))
            .and_then(Value::as_array)
            .map(|relays| {
                relays
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();

        Some(ProfilePointer { pubkey, relays })
    }

    async fn well_known(&self, domain: &str, name: &str) -> Option<Value> {
        let url = format!(
            "https://{domain}/.well-known/nostr.json?name={}",
            urlencoding::encode(name)
        );
        match self.fetch.get_json(&url).await {
            Ok(json) => Some(json),
            Err(error) => {
                debug!(%url, %error, "nip05 lookup failed");
                None
            }
        }
    }
}

/// Split into `(name, domain)`, validating both parts.
fn split_identifier(fullname: &str) -> Option<(&str, &str)> {
    let mut parts = fullname.split('@');
    let first = parts.next()?;
    let (name, domain) = match parts.next() {
        Some(domain) if !domain.is_empty() => (first, domain),
        _ => ("_", first),
    };

    let valid_name = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !valid_name || !domain.contains('.') {
        return None;
    }
    Some((name, domain))
}
