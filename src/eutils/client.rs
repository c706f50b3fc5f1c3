//! HTTP transport shared by all E-utility requests

use std::fmt;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::{debug, instrument, warn};

use super::request::QueryParams;
use crate::config::ClientConfig;
use crate::error::{EutilsError, Result};
use crate::rate_limit::RateLimiter;

/// Fixed E-utilities endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ESearch,
    ELink,
    EFetch,
    EPost,
    ESummary,
    EInfo,
    ESpell,
    EGQuery,
    ECitMatch,
}

impl Endpoint {
    /// Path of the endpoint below the base URL
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::ESearch => "esearch.fcgi",
            Endpoint::ELink => "elink.fcgi",
            Endpoint::EFetch => "efetch.fcgi",
            Endpoint::EPost => "epost.fcgi",
            Endpoint::ESummary => "esummary.fcgi",
            Endpoint::EInfo => "einfo.fcgi",
            Endpoint::ESpell => "espell.fcgi",
            Endpoint::EGQuery => "egquery.fcgi",
            Endpoint::ECitMatch => "ecitmatch.cgi",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Client for the NCBI E-utilities
///
/// Cheap to clone; clones share the HTTP connection pool and the rate limiter.
///
/// # Example
///
/// ```no_run
/// use entrez_client_rs::{ESearch, ESearchParams, Eutility, EutilsClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = EutilsClient::new();
///     let mut search = ESearch::new(&client, ESearchParams::new("asthma[mesh]"))?;
///     println!("{}", search.results().await);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct EutilsClient {
    client: Client,
    base_url: String,
    rate_limiter: RateLimiter,
    config: ClientConfig,
}

impl EutilsClient {
    /// Create a client with default configuration
    ///
    /// Uses default NCBI rate limiting (3 requests/second) and no API key.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::new())
    }

    /// Create a client with custom configuration
    ///
    /// # Example
    ///
    /// ```
    /// use entrez_client_rs::{ClientConfig, EutilsClient};
    ///
    /// let config = ClientConfig::new()
    ///     .with_api_key("your_api_key_here")
    ///     .with_email("researcher@university.edu");
    ///
    /// let client = EutilsClient::with_config(config);
    /// ```
    pub fn with_config(config: ClientConfig) -> Self {
        let client = Client::builder()
            .user_agent(config.effective_user_agent())
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|err| {
                warn!("Falling back to default HTTP client: {}", err);
                Client::new()
            });

        Self::with_client_and_config(client, config)
    }

    /// Create a client around an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self::with_client_and_config(client, ClientConfig::new())
    }

    fn with_client_and_config(client: Client, config: ClientConfig) -> Self {
        Self {
            client,
            base_url: config.effective_base_url().to_string(),
            rate_limiter: config.create_rate_limiter(),
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    /// Issue one request and return the response body
    ///
    /// Identification parameters (api_key, email, tool) are appended to the
    /// payload. Any non-success status is reported as [`EutilsError::ApiError`].
    #[instrument(skip(self, params), fields(endpoint = %endpoint, method = ?method))]
    pub(crate) async fn execute(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
        method: HttpMethod,
    ) -> Result<String> {
        let mut payload = params.clone();
        payload.extend(self.config.build_api_params());
        let query = payload.to_query_string();
        let url = self.endpoint_url(endpoint);

        self.rate_limiter.acquire().await;

        let response = match method {
            HttpMethod::Get => {
                debug!("Making API request to: {}?{}", url, query);
                self.client.get(format!("{}?{}", url, query)).send().await?
            }
            HttpMethod::Post => {
                debug!(payload_len = query.len(), "Making POST request to: {}", url);
                self.client
                    .post(&url)
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(query)
                    .send()
                    .await?
            }
        };

        Self::read_body(response).await
    }

    async fn read_body(response: Response) -> Result<String> {
        let status = response.status();

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown error");
            // NCBI usually explains the failure in the body
            let detail = response.text().await.unwrap_or_default();
            let detail = detail.replace('\n', " ");
            warn!(status = status.as_u16(), "API request failed: {}", detail.trim());
            return Err(EutilsError::ApiError {
                status: status.as_u16(),
                message: if detail.trim().is_empty() {
                    reason.to_string()
                } else {
                    format!("{}: {}", reason, detail.trim())
                },
            });
        }

        Ok(response.text().await?)
    }
}

impl Default for EutilsClient {
    fn default() -> Self {
        Self::new()
    }
}
