use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const REST_BASE_URL: &str = "https://api.polygon.io";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RestDefaults;

impl RestDefaults {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
}

#[derive(Clone, Debug)]
pub struct RestClientOptions {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for RestClientOptions {
    fn default() -> Self {
        Self {
            base_url: REST_BASE_URL.to_string(),
            connect_timeout: RestDefaults::CONNECT_TIMEOUT,
            request_timeout: RestDefaults::REQUEST_TIMEOUT,
        }
    }
}

/// HTTP client for the market-data REST API.
///
/// Every request is a single `GET` with the API key appended as the `apiKey`
/// query parameter. Failed requests are not retried.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    api_key: SecretString,
    base_url: String,
    request_timeout: Duration,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum RestError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    /// Non-2xx response. `message` is the raw response body.
    #[error("{status}: {message}")]
    HttpStatus { status: StatusCode, message: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl RestError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl RestClient {
    pub fn new(api_key: SecretString) -> Result<Self, RestError> {
        Self::with_options(api_key, RestClientOptions::default())
    }

    pub fn with_options(
        api_key: SecretString,
        options: RestClientOptions,
    ) -> Result<Self, RestError> {
        let http = Client::builder()
            .connect_timeout(options.connect_timeout)
            .build()
            .map_err(RestError::Transport)?;

        Ok(Self {
            http,
            api_key,
            base_url: options.base_url,
            request_timeout: options.request_timeout,
        })
    }

    /// Points the client at another host, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches `segments` and decodes the body as JSON.
    pub async fn get_json<T, Q>(
        &self,
        segments: &[&str],
        query: Option<&Q>,
    ) -> Result<T, RestError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let body = self.get_bytes(segments, query).await?;
        decode(&body)
    }

    /// Fetches `segments` and returns the raw body of a successful response.
    pub async fn get_bytes<Q>(
        &self,
        segments: &[&str],
        query: Option<&Q>,
    ) -> Result<Vec<u8>, RestError>
    where
        Q: Serialize + ?Sized,
    {
        let url = self.endpoint_url(segments)?;
        debug!(event = "rest_request", path = %url.path());

        let mut builder = self
            .http
            .get(url)
            .timeout(self.request_timeout)
            .query(&[("apiKey", self.api_key.expose_secret().as_str())]);
        if let Some(query) = query {
            builder = builder.query(query);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            debug!(event = "rest_status_error", status = status.as_u16());
            return Err(RestError::HttpStatus {
                status,
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body.to_vec())
    }

    pub(crate) async fn fetch<T>(&self, segments: &[&str]) -> Result<T, RestError>
    where
        T: DeserializeOwned,
    {
        self.get_json::<T, NoQuery>(segments, None).await
    }

    pub(crate) async fn fetch_bytes(&self, segments: &[&str]) -> Result<Vec<u8>, RestError> {
        self.get_bytes::<NoQuery>(segments, None).await
    }

    /// Joins the base URL with escaped path segments.
    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, RestError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|err| RestError::InvalidUrl(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| RestError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[derive(Serialize)]
struct NoQuery;

/// Decodes a body fetched with [`RestClient::get_bytes`].
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, RestError> {
    serde_json::from_slice(body).map_err(RestError::Decode)
}

/// Formats a date as the `YYYY-MM-DD` path segment the API expects.
pub(crate) fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
