//! User-data retrieval from a metadata service with endpoint failover.

use std::time::Duration;

use etch_common::{EtchError, EtchResult};
use reqwest::Url;

/// Metadata API version the user-data lives under.
pub const USER_DATA_VERSION: &str = "2009-04-04";

/// Per-endpoint request bound.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Build `<endpoint>/2009-04-04/user-data`, keeping any base path.
pub fn user_data_url(endpoint: &str) -> EtchResult<Url> {
    let invalid = |reason: String| EtchError::Network {
        message: format!("invalid metadata url {endpoint}: {reason}"),
    };

    let mut url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }

    url.path_segments_mut()
        .map_err(|()| invalid("cannot be a base".to_string()))?
        .pop_if_empty()
        .extend([USER_DATA_VERSION, "user-data"]);

    Ok(url)
}

/// HTTP client for metadata endpoints.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    http: reqwest::Client,
}

impl MetadataClient {
    /// Client with the default per-request timeout.
    pub fn new() -> EtchResult<Self> {
        Self::with_timeout(REQUEST_TIMEOUT)
    }

    /// Client with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> EtchResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EtchError::Network {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http })
    }

    /// Fetch user-data from the first endpoint that answers.
    ///
    /// Endpoints are tried in order, once each. An endpoint fails when its
    /// URL does not parse, the request cannot be completed or the body cannot
    /// be read; it is then logged and skipped. Any HTTP response counts as an
    /// answer, error statuses included.
    ///
    /// # Errors
    ///
    /// Returns [`EtchError::MetadataExhausted`] when no endpoint succeeded.
    pub async fn fetch_user_data(&self, endpoints: &[String]) -> EtchResult<Vec<u8>> {
        for endpoint in endpoints {
            match self.fetch_one(endpoint).await {
                Ok(body) => {
                    tracing::info!(endpoint = %endpoint, bytes = body.len(), "Fetched user-data");
                    return Ok(body);
                }
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "Metadata endpoint failed");
                }
            }
        }

        Err(EtchError::MetadataExhausted {
            endpoints: endpoints.join(","),
        })
    }

    async fn fetch_one(&self, endpoint: &str) -> EtchResult<Vec<u8>> {
        let url = user_data_url(endpoint)?;
        tracing::debug!(%url, "Requesting user-data");

        let network = |e: reqwest::Error| EtchError::Network {
            message: e.to_string(),
        };

        let response = self.http.get(url).send().await.map_err(network)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(endpoint, %status, "Metadata endpoint returned non-success status");
        }

        let body = response.bytes().await.map_err(network)?;
        Ok(body.to_vec())
    }
}
