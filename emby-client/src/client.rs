use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, FetchError};
use crate::models::SystemInfoResponse;
use crate::query::{QueryKind, DEFAULT_ACTIVITY_LIMIT};

/// Default Emby HTTP port
pub const DEFAULT_PORT: u16 = 8096;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Header carrying the API key
const TOKEN_HEADER: &str = "X-Emby-Token";

/// Connection settings for one Emby server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Hostname or IP, without scheme
    pub host: String,
    pub port: u16,
    pub api_key: String,
    /// Use HTTPS instead of HTTP
    pub use_tls: bool,
    /// Accept self-signed certificates when `use_tls` is set
    pub accept_invalid_certs: bool,
    /// Upper bound for a single request
    pub request_timeout: Duration,
    /// Number of activity log entries requested per tick
    pub activity_limit: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            api_key: String::new(),
            use_tls: false,
            accept_invalid_certs: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            activity_limit: DEFAULT_ACTIVITY_LIMIT,
        }
    }
}

impl ConnectionConfig {
    /// Create a config for `host` with the given API key and default settings
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Check host, port and key without touching the network
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.host.trim().is_empty() {
            return Err(ClientError::InvalidConfig("host must not be empty".to_string()));
        }
        if self.host.contains("://") {
            return Err(ClientError::InvalidConfig(format!(
                "host '{}' must not include a scheme, use use_tls instead",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(ClientError::InvalidConfig("port must be in 1-65535".to_string()));
        }
        if self.api_key.trim().is_empty() {
            return Err(ClientError::InvalidConfig("api_key must not be empty".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "request_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the server, e.g. `http://emby.local:8096`
    pub fn base_url(&self) -> Result<Url, ClientError> {
        let scheme = if self.use_tls { "https" } else { "http" };
        Ok(Url::parse(&format!("{}://{}:{}", scheme, self.host, self.port))?)
    }
}

/// The upstream query seam
///
/// The aggregator only talks to this trait, so tests substitute a scripted
/// implementation for the HTTP client.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// Run one query and return the raw JSON body
    async fn fetch(&self, query: QueryKind) -> Result<serde_json::Value, FetchError>;
}

/// Decode a raw query body into a wire type
pub fn decode<T: DeserializeOwned>(
    query: QueryKind,
    value: serde_json::Value,
) -> Result<T, FetchError> {
    serde_json::from_value(value).map_err(|e| FetchError::malformed(query, e.to_string()))
}

/// HTTP client for the Emby API
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct EmbyClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    request_timeout: Duration,
    activity_limit: u32,
}

impl EmbyClient {
    /// Create a client from validated connection settings
    pub fn new(config: &ConnectionConfig) -> Result<Self, ClientError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.use_tls && config.accept_invalid_certs)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url()?,
            api_key: config.api_key.clone(),
            request_timeout: config.request_timeout,
            activity_limit: config.activity_limit,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Fetch and decode `/System/Info`
    ///
    /// Used as the connection test: it is authenticated, so a wrong API key
    /// fails here instead of looking like a healthy server.
    pub async fn system_info(&self) -> Result<SystemInfoResponse, FetchError> {
        let value = self.fetch(QueryKind::SystemInfo).await?;
        decode(QueryKind::SystemInfo, value)
    }

    fn url_for(&self, query: QueryKind) -> Result<Url, FetchError> {
        self.base_url
            .join(query.endpoint())
            .map_err(|e| FetchError::unreachable(query, format!("Invalid URL: {}", e)))
    }
}

#[async_trait]
impl UpstreamApi for EmbyClient {
    async fn fetch(&self, query: QueryKind) -> Result<serde_json::Value, FetchError> {
        let url = self.url_for(query)?;
        debug!(query = %query, url = %url, "Sending request");

        let response = self
            .http
            .get(url)
            .header(TOKEN_HEADER, &self.api_key)
            .header(ACCEPT, "application/json")
            .query(&query.params(self.activity_limit))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(query, &e))?;

        let status = response.status();
        debug!(query = %query, status = %status, "Response received");

        if !status.is_success() {
            let error = FetchError::from_status(query, status);
            warn!(query = %query, status = %status, "Request rejected: {}", error.kind);
            return Err(error);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(query, &e))?;

        serde_json::from_slice(&body)
            .map_err(|e| FetchError::malformed(query, format!("Invalid JSON body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_scheme() {
        let mut config = ConnectionConfig::new("emby.local", "key");
        assert_eq!(config.base_url().unwrap().as_str(), "http://emby.local:8096/");

        config.use_tls = true;
        config.port = 8920;
        assert_eq!(config.base_url().unwrap().as_str(), "https://emby.local:8920/");
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        assert!(ConnectionConfig::new("", "key").validate().is_err());
        assert!(ConnectionConfig::new("emby.local", " ").validate().is_err());
        assert!(ConnectionConfig::new("http://emby.local", "key").validate().is_err());

        let mut config = ConnectionConfig::new("emby.local", "key");
        config.port = 0;
        assert!(config.validate().is_err());

        let config = ConnectionConfig::new("emby.local", "key");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_decode_maps_shape_errors() {
        let value = serde_json::json!({ "Items": "not-a-list" });
        let result: Result<crate::models::QueryResultResponse<crate::models::DeviceResponse>, _> =
            decode(QueryKind::Devices, value);
        let error = result.unwrap_err();
        assert_eq!(error.kind, crate::FetchErrorKind::MalformedResponse);
        assert_eq!(error.query, QueryKind::Devices);
    }

    #[test]
    fn test_client_url_for_endpoint() {
        let client = EmbyClient::new(&ConnectionConfig::new("10.0.0.5", "key")).unwrap();
        let url = client.url_for(QueryKind::ActivityLog).unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8096/System/ActivityLog/Entries");
    }
}
