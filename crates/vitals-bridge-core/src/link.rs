//! Network link status
//!
//! The bridge never manages the network interface itself. Whatever owns the
//! link (a Wi-Fi supervisor, the host OS, a test) exposes it through
//! [`ConnectionStatus`] and the transmitter only asks whether it is up.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors raised while bringing up or probing the network link
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Network link not up after {0:?}")]
    Timeout(Duration),

    #[error("Cannot probe endpoint '{0}': no host")]
    NoHost(String),
}

/// Read-only view of the network link
pub trait ConnectionStatus {
    /// Whether the link is currently usable
    fn is_connected(&self) -> bool;
}

impl<T: ConnectionStatus + ?Sized> ConnectionStatus for &T {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

impl<T: ConnectionStatus + ?Sized> ConnectionStatus for Box<T> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Link that is always reported as up
///
/// Suitable when the host is already on the collector's network.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConnected;

impl ConnectionStatus for AlwaysConnected {
    fn is_connected(&self) -> bool {
        true
    }
}

/// Shared connectivity flag owned by the network layer
///
/// Clones share the same flag. The bridge holds one clone and only reads it.
#[derive(Debug, Clone, Default)]
pub struct LinkFlag(Arc<AtomicBool>);

impl LinkFlag {
    /// Create a flag with the given initial state
    pub fn new(connected: bool) -> Self {
        Self(Arc::new(AtomicBool::new(connected)))
    }

    /// Update the link state (network layer side)
    pub fn set_connected(&self, connected: bool) {
        self.0.store(connected, Ordering::Release);
    }
}

impl ConnectionStatus for LinkFlag {
    fn is_connected(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Reports the link as up when the endpoint accepts a TCP connection
#[derive(Debug, Clone)]
pub struct ReachabilityProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ReachabilityProbe {
    /// Probe `host:port` with the given connect timeout
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Probe the host and port (or scheme default port) of an endpoint URL
    pub fn for_endpoint(endpoint: &Url, timeout: Duration) -> Result<Self, LinkError> {
        // IPv6 literals come back bracketed ("[::1]"), which the resolver rejects
        let host = endpoint
            .host_str()
            .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
            .ok_or_else(|| LinkError::NoHost(endpoint.to_string()))?;
        let port = endpoint
            .port_or_known_default()
            .ok_or_else(|| LinkError::NoHost(endpoint.to_string()))?;
        Ok(Self::new(host, port, timeout))
    }
}

impl ConnectionStatus for ReachabilityProbe {
    fn is_connected(&self) -> bool {
        let addrs = match (self.host.as_str(), self.port).to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                tracing::debug!("probe: cannot resolve {}: {e}", self.host);
                return false;
            }
        };

        for addr in addrs {
            // Connection is dropped immediately; only reachability matters
            if TcpStream::connect_timeout(&addr, self.timeout).is_ok() {
                return true;
            }
        }
        tracing::debug!("probe: {}:{} unreachable", self.host, self.port);
        false
    }
}

/// Credentials for joining the network
///
/// Carried from configuration to whatever owns the link. The secret is never
/// printed.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkCredentials {
    /// Network name (SSID or equivalent)
    pub identity: String,

    /// Network passphrase
    #[serde(default)]
    pub secret: String,
}

impl fmt::Debug for NetworkCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredentials")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Block until `status` reports the link as up
///
/// Polls every `poll_interval`, logging progress. With `max_wait` set,
/// gives up with [`LinkError::Timeout`] once it has elapsed.
pub fn wait_until_connected(
    status: &dyn ConnectionStatus,
    poll_interval: Duration,
    max_wait: Option<Duration>,
) -> Result<(), LinkError> {
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        if status.is_connected() {
            tracing::info!("Network link up after {:?}", started.elapsed());
            return Ok(());
        }

        attempts += 1;
        if attempts == 1 {
            tracing::info!("Waiting for network link...");
        } else {
            tracing::debug!("network link still down (attempt {attempts})");
        }

        if let Some(limit) = max_wait {
            if started.elapsed() >= limit {
                return Err(LinkError::Timeout(limit));
            }
        }
        std::thread::sleep(poll_interval);
    }
}
