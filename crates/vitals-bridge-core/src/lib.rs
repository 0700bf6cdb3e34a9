//! # Vitals Bridge Core Library
//!
//! Core functionality for forwarding wearable sensor readings from a serial
//! peer to an HTTP collector.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Line parsing of comma-separated sensor records
//! - JSON transmission of readings over HTTP
//! - Network link status observation
//! - Serial port discovery and setup
//! - Bridge configuration loading
//!
//! ## Example
//!
//! ```rust,ignore
//! use vitals_bridge_core::prelude::*;
//!
//! let config = BridgeConfig::load("config.json")?;
//! let transmitter = Transmitter::new(config.endpoint()?, config.request_timeout());
//! let bridge = Bridge::new(LineParser::new(config.numeric_policy), transmitter, AlwaysConnected);
//!
//! let status = bridge.handle_line("36.6,72,98,Normal,1500,120,80")?;
//! println!("HTTP response code: {:?}", status);
//! ```

pub mod bridge;
pub mod config;
pub mod link;
pub mod reading;
pub mod serial;
pub mod transmit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bridge::{Bridge, RecordError};
    pub use crate::config::{BridgeConfig, ConfigError, LinkMode};
    pub use crate::link::{
        wait_until_connected, AlwaysConnected, ConnectionStatus, LinkFlag, NetworkCredentials,
        ReachabilityProbe,
    };
    pub use crate::reading::{LineParser, NumericPolicy, ParseError, SensorReading};
    pub use crate::transmit::{HttpStatus, TransmitError, Transmitter};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
