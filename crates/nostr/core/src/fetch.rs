//! HTTP fetch capability injected into the identity lookups (NIP-05, NIP-39).

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {message}")]
    Request { message: String },

    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    #[error("json decode failed: {message}")]
    Decode { message: String },
}

/// Minimal GET capability. Implementations decide transport, TLS and timeouts.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// GET `url` and return the body of a successful response.
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).map_err(|error| FetchError::Decode {
            message: error.to_string(),
        })
    }
}

#[cfg(feature = "http")]
pub use reqwest_fetch::ReqwestFetch;

#[cfg(feature = "http")]
mod reqwest_fetch {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{FetchError, HttpFetch};

    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// [`HttpFetch`] over a shared `reqwest::Client`.
    #[derive(Debug, Clone)]
    pub struct ReqwestFetch {
        http: reqwest::Client,
        timeout: Duration,
    }

    impl ReqwestFetch {
        pub fn new() -> Self {
            Self::with_client(reqwest::Client::new())
        }

        pub fn with_client(http: reqwest::Client) -> Self {
            Self {
                http,
                timeout: DEFAULT_TIMEOUT,
            }
        }

        pub fn timeout(mut self, timeout: Duration) -> Self {
            self.timeout = timeout;
            self
        }
    }

    impl Default for ReqwestFetch {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl HttpFetch for ReqwestFetch {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            let response = self
                .http
                .get(url)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|error| FetchError::Request {
                    message: error.to_string(),
                })?;

            let status = response.status();
            let body = response.text().await.map_err(|error| FetchError::Request {
                message: error.to_string(),
            })?;

            if !status.is_success() {
                return Err(FetchError::Http {
                    status: status.as_u16(),
                    body,
                });
            }
            Ok(body)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{FetchError, HttpFetch};

    /// Canned responses keyed by URL. Unknown URLs answer 404.
    #[derive(Default)]
    pub(crate) struct StaticFetch {
        responses: HashMap<String, String>,
        pub(crate) requested: Mutex<Vec<String>>,
    }

    impl StaticFetch {
        pub(crate) fn with(mut self, url: &str, body: &str) -> Self {
            self.responses.insert(url.to_string(), body.to_string());
            self
        }

        pub(crate) fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpFetch for StaticFetch {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Http {
                    status: 404,
                    body: String::new(),
                })
        }
    }
}
