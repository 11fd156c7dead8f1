//! HTTP client for the scraping gateway's realtime endpoint.

use std::time::Duration;

use reqwest::Client;

use crate::error::ScraperError;
use crate::parse::extract_host;
use crate::recipe::ParsingRecipe;
use crate::retry::{retry_request, RetryPolicy};
use crate::types::{GatewayRequest, GatewayResponse, ParsedContent};

/// Connection settings for the scraping gateway.
///
/// Built explicitly by the caller (usually from `AppConfig`); the client never
/// reads credentials from the environment itself.
#[derive(Clone)]
pub struct GatewayConfig {
    pub endpoint: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("endpoint", &self.endpoint)
            .field("username", &"[redacted]")
            .field("password", &"[redacted]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Client for the scraping gateway.
///
/// Each call is one POST carrying the target URL and a [`ParsingRecipe`].
/// Gateway throttling (429) and server errors are reported as transient
/// errors so [`retry_request`] can try again; target-site 404/410 becomes
/// [`ScraperError::NotFound`].
pub struct GatewayClient {
    client: Client,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Creates a `GatewayClient` with the configured request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ScraperError::InvalidUrl`] if the
    /// endpoint is not a valid URL.
    pub fn new(config: GatewayConfig) -> Result<Self, ScraperError> {
        reqwest::Url::parse(&config.endpoint).map_err(|e| ScraperError::InvalidUrl {
            url: config.endpoint.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    /// Scrapes one page through the gateway, with no retry.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`]: gateway answered 429.
    /// - [`ScraperError::UnexpectedStatus`]: gateway or target answered a
    ///   non-2xx status other than 404/410/429.
    /// - [`ScraperError::NotFound`]: target answered 404 or 410.
    /// - [`ScraperError::EmptyResult`]: gateway returned no results.
    /// - [`ScraperError::Deserialize`]: response body is not the expected JSON.
    /// - [`ScraperError::Http`]: network or TLS failure.
    pub async fn fetch(
        &self,
        url: &str,
        recipe: &ParsingRecipe,
    ) -> Result<ParsedContent, ScraperError> {
        let body = GatewayRequest {
            source: "universal",
            url,
            render: "html",
            parse: true,
            parsing_instructions: recipe.to_instructions(),
        };

        tracing::debug!(url, host = %extract_host(url), "requesting page from gateway");

        let response = self
            .client
            .post(&self.config.endpoint)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(ScraperError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.config.endpoint.clone(),
            });
        }

        let text = response.text().await?;
        content_from_body(url, &text)
    }

    /// Scrapes one page, retrying connection-class failures per `policy`.
    ///
    /// # Errors
    ///
    /// Returns the last error once `policy.max_attempts` is exhausted, or the
    /// first non-transient error; see [`Self::fetch`].
    pub async fn fetch_with_retry(
        &self,
        url: &str,
        recipe: &ParsingRecipe,
        policy: &RetryPolicy,
    ) -> Result<ParsedContent, ScraperError> {
        retry_request(policy, || self.fetch(url, recipe)).await
    }
}

/// Interprets a gateway response body for the page at `url`.
///
/// # Errors
///
/// See [`GatewayClient::fetch`].
pub(crate) fn content_from_body(url: &str, body: &str) -> Result<ParsedContent, ScraperError> {
    let parsed =
        serde_json::from_str::<GatewayResponse>(body).map_err(|e| ScraperError::Deserialize {
            context: format!("gateway response for {url}"),
            source: e,
        })?;

    let Some(result) = parsed.results.into_iter().next() else {
        return Err(ScraperError::EmptyResult {
            url: url.to_owned(),
        });
    };

    match result.status_code {
        Some(404 | 410) => Err(ScraperError::NotFound {
            url: url.to_owned(),
        }),
        Some(status) if !(200..300).contains(&status) => Err(ScraperError::UnexpectedStatus {
            status,
            url: url.to_owned(),
        }),
        _ => Ok(ParsedContent::from_value(result.content)),
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
