//! Reading Transmission
//!
//! Forwards a [`SensorReading`] to the collector as a single JSON POST.
//!
//! Each call builds its own HTTP client and drops it before returning, so no
//! connection outlives the request. Any HTTP status the server answers with
//! counts as a completed transmission; only transport problems are errors.

mod error;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use std::fmt;
use std::time::Duration;

use crate::link::ConnectionStatus;
use crate::reading::SensorReading;

pub use error::TransmitError;

/// Default request timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("vitals-bridge/", env!("CARGO_PKG_VERSION"));

/// HTTP status code returned by the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HttpStatus(u16);

impl HttpStatus {
    /// Wrap a raw status code
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    /// Numeric status code
    pub fn code(&self) -> u16 {
        self.0
    }

    /// Whether the code is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }
}

impl From<StatusCode> for HttpStatus {
    fn from(status: StatusCode) -> Self {
        Self(status.as_u16())
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sends readings to a fixed collector endpoint
#[derive(Debug, Clone)]
pub struct Transmitter {
    endpoint: Url,
    timeout: Duration,
}

impl Transmitter {
    /// Create a transmitter for `endpoint` with a per-request time limit
    pub fn new(endpoint: Url, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    /// Collector URL
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Time limit applied to connect and response
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST one reading
    ///
    /// Fails with [`TransmitError::NotConnected`] without touching the
    /// network when `link` is down.
    pub fn transmit(
        &self,
        reading: &SensorReading,
        link: &dyn ConnectionStatus,
    ) -> Result<HttpStatus, TransmitError> {
        if !link.is_connected() {
            return Err(TransmitError::NotConnected);
        }

        let body = reading.to_json()?;
        tracing::info!("Sending to server: {body}");

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .no_proxy()
            .build()?;

        let response = client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()?;

        let status = HttpStatus::from(response.status());
        tracing::info!("HTTP Response code: {status}");
        Ok(status)
    }
}

/// One-shot transmission without keeping a [`Transmitter`] around
pub fn transmit(
    reading: &SensorReading,
    endpoint: &Url,
    link: &dyn ConnectionStatus,
    timeout: Duration,
) -> Result<HttpStatus, TransmitError> {
    Transmitter::new(endpoint.clone(), timeout).transmit(reading, link)
}
