//! HTTP-backed [`RideDurationProvider`].

use std::time::Duration;

use async_trait::async_trait;
use geo::Coord;
use log::{debug, info};
use reqwest::Client;
use rideplan_core::{RideDurationError, RideDurationMatrix, RideDurationProvider};
use thiserror::Error;
use url::Url;

use super::wire::{RideDurationsRequest, RideDurationsResponse, error_message};

/// Default user agent for ride duration requests.
pub const DEFAULT_USER_AGENT: &str = "rideplan/0.1";

/// Default endpoint path below the base URL.
pub const DEFAULT_PATH: &str = "/api/ride-durations";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised while constructing an [`HttpRideDurationProvider`].
#[derive(Debug, Error)]
pub enum ProviderBuildError {
    /// Base URL and path do not form a valid URL.
    #[error("invalid ride duration endpoint {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Configuration for [`HttpRideDurationProvider`].
#[derive(Debug, Clone)]
pub struct HttpRideDurationProviderConfig {
    /// Service root, e.g. `"http://localhost:8080"`.
    pub base_url: String,
    /// Endpoint path appended to `base_url`.
    pub path: String,
    /// Connect and request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpRideDurationProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_owned(),
            path: DEFAULT_PATH.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpRideDurationProviderConfig {
    /// Configuration for the service at `base_url` with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the endpoint path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn endpoint(&self) -> Result<Url, ProviderBuildError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        );
        Url::parse(&url).map_err(|source| ProviderBuildError::InvalidUrl { url, source })
    }
}

/// Ride duration provider speaking JSON over HTTP.
///
/// One `POST` per refresh; the service answers with a dense matrix aligned to
/// the request order.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use geo::Coord;
/// use rideplan_core::RideDurationProvider;
/// use rideplan_data::routing::{HttpRideDurationProvider, HttpRideDurationProviderConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = HttpRideDurationProviderConfig::new("http://localhost:8080")
///     .with_timeout(Duration::from_secs(10));
/// let provider = HttpRideDurationProvider::with_config(config)?;
/// let home = Coord { x: -0.55, y: 47.47 };
/// let bakery = Coord { x: -0.54, y: 47.48 };
/// let matrix = provider.ride_durations(&[home], &[bakery]).await?;
/// println!("{:?}", matrix[0][0]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct HttpRideDurationProvider {
    client: Client,
    endpoint: Url,
    timeout: Duration,
}

impl HttpRideDurationProvider {
    /// Provider for the service at `base_url` with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderBuildError> {
        Self::with_config(HttpRideDurationProviderConfig::new(base_url))
    }

    /// Provider with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to build.
    pub fn with_config(config: HttpRideDurationProviderConfig) -> Result<Self, ProviderBuildError> {
        let endpoint = config.endpoint()?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            timeout: config.timeout,
        })
    }

    /// Endpoint every request is sent to.
    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error) -> RideDurationError {
        let url = self.endpoint.to_string();
        if error.is_timeout() {
            return RideDurationError::Timeout {
                url,
                timeout_secs: self.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return RideDurationError::HttpError {
                url,
                status: status.as_u16(),
                message: error.to_string(),
            };
        }
        RideDurationError::NetworkError {
            url,
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl RideDurationProvider for HttpRideDurationProvider {
    async fn ride_durations(
        &self,
        origins: &[Coord<f64>],
        destinations: &[Coord<f64>],
    ) -> Result<RideDurationMatrix, RideDurationError> {
        if origins.is_empty() || destinations.is_empty() {
            return Err(RideDurationError::EmptyInput);
        }
        info!(
            "requesting {}x{} ride durations from {}",
            origins.len(),
            destinations.len(),
            self.endpoint
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RideDurationsRequest::new(origins, destinations))
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;

        if !status.is_success() {
            debug!("ride duration service answered {status}");
            return Err(RideDurationError::HttpError {
                url: self.endpoint.to_string(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed: RideDurationsResponse =
            serde_json::from_str(&body).map_err(|err| RideDurationError::ParseError {
                message: err.to_string(),
            })?;
        let matrix = parsed
            .into_matrix()
            .map_err(|message| RideDurationError::ParseError { message })?;
        check_shape(&matrix, origins.len(), destinations.len())?;
        Ok(matrix)
    }
}

fn check_shape(
    matrix: &RideDurationMatrix,
    rows: usize,
    columns: usize,
) -> Result<(), RideDurationError> {
    if matrix.len() == rows && matrix.iter().all(|row| row.len() == columns) {
        Ok(())
    } else {
        Err(RideDurationError::ShapeMismatch {
            expected_rows: rows,
            expected_columns: columns,
        })
    }
}
