//! NIP-39: external identity proofs.

use tracing::debug;

use crate::fetch::HttpFetch;

/// Check a GitHub gist proof. Any fetch failure counts as unverified.
pub async fn validate_github<F: HttpFetch + ?Sized>(
    fetch: &F,
    pubkey: &str,
    username: &str,
    proof: &str,
) -> bool {
    let url = format!("https://gist.github.com/{username}/{proof}/raw");
    match fetch.get_text(&url).await {
        Ok(text) => text == github_proof_text(pubkey),
        Err(error) => {
            debug!(%url, %error, "github proof fetch failed");
            false
        }
    }
}

/// The exact gist body a GitHub proof must contain.
pub fn github_proof_text(pubkey: &str) -> String {
    format!("Verifying that I control the following Nostr public key: {pubkey}")
}
