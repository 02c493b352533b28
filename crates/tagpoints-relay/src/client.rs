//! HTTP client for the points backend.
//!
//! Two bearer-authenticated endpoints: `POST /points/add` credits a purchase
//! and `GET /points` reads the current balance. Both answer `{ "points": n }`.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Url};
use tagpoints_core::AppConfig;

use crate::error::RelayError;
use crate::types::{AddPointsRequest, PointsBalance};

/// Client for the points backend.
///
/// Use [`PointsClient::new`] with the loaded [`AppConfig`] or
/// [`PointsClient::with_base_url`] to point at a mock server in tests.
pub struct PointsClient {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl PointsClient {
    /// Creates a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RelayError::InvalidUrl`] if the configured
    /// base URL does not parse.
    pub fn new(config: &AppConfig, auth_token: Option<String>) -> Result<Self, RelayError> {
        Self::with_base_url(
            &config.api_base,
            auth_token,
            config.request_timeout_secs,
            &config.user_agent,
        )
    }

    /// Creates a client with an explicit base URL.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RelayError::InvalidUrl`] if `base_url`
    /// is not a valid URL.
    pub fn with_base_url(
        base_url: &str,
        auth_token: Option<String>,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Trailing slash so `join("points")` appends instead of replacing the
        // last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .map_err(|e| RelayError::InvalidUrl(format!("'{base_url}': {e}")))?;

        Ok(Self {
            client,
            base_url,
            auth_token: auth_token.filter(|t| !t.trim().is_empty()),
        })
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.auth_token.is_some()
    }

    /// Credits `request.points` to the authenticated user.
    ///
    /// # Errors
    ///
    /// - [`RelayError::MissingToken`] if no auth token is configured.
    /// - [`RelayError::Http`] on network failure.
    /// - [`RelayError::Status`] on a non-2xx response.
    /// - [`RelayError::Deserialize`] if the body is not `{ "points": n }`.
    pub async fn add_points(&self, request: &AddPointsRequest) -> Result<PointsBalance, RelayError> {
        let url = self.endpoint("points/add")?;
        let builder = self.authorized(Method::POST, url.clone())?.json(request);
        Self::send_json(builder, &url).await
    }

    /// Reads the authenticated user's balance.
    ///
    /// # Errors
    ///
    /// Same as [`PointsClient::add_points`].
    pub async fn fetch_points(&self) -> Result<PointsBalance, RelayError> {
        let url = self.endpoint("points")?;
        let builder = self.authorized(Method::GET, url.clone())?;
        Self::send_json(builder, &url).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, RelayError> {
        self.base_url
            .join(path)
            .map_err(|e| RelayError::InvalidUrl(format!("'{}{path}': {e}", self.base_url)))
    }

    fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder, RelayError> {
        let token = self.auth_token.as_deref().ok_or(RelayError::MissingToken)?;
        Ok(self.client.request(method, url).bearer_auth(token))
    }

    async fn send_json(builder: RequestBuilder, url: &Url) -> Result<PointsBalance, RelayError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| RelayError::Deserialize {
            context: url.to_string(),
            source: e,
        })
    }
}
