//! HTTP client library for Nettigo Air Monitor sensors.
//!
//! This crate polls a Nettigo Air Monitor (NAM) over its local HTTP
//! interface and turns the firmware's raw readings into a typed snapshot.
//!
//! # Features
//!
//! - **Capability check**: detects basic auth and harvests the device MAC
//! - **Retry with backoff**: rides out a device that is briefly unreachable
//! - **Cached fallback**: optionally serves the last good payload for a bounded number of failures
//! - **Normalization**: reconciles key names and units across firmware revisions
//! - **CAQI**: attaches the Common Air Quality Index per particulate sensor
//! - **Pluggable transport**: bring your own `reqwest::Client` or any [`HttpTransport`]
//!
//! # Endpoints
//!
//! | Method | Path | Used by |
//! |--------|------|---------|
//! | GET | `/config.json` | [`NettigoAirMonitor::create`] |
//! | GET | `/data.json` | [`NettigoAirMonitor::async_update`] |
//! | GET | `/values` | [`NettigoAirMonitor::async_get_mac_address`] |
//! | POST | `/reset` | [`NettigoAirMonitor::async_restart`] |
//! | POST | `/ota` | [`NettigoAirMonitor::async_ota_update`] |
//!
//! # Quick Start
//!
//! ```no_run
//! use nam_core::{ConnectionOptions, NettigoAirMonitor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let http = reqwest::Client::new();
//!     let options = ConnectionOptions::new("192.168.172.12");
//!
//!     let nam = NettigoAirMonitor::connect(http, options).await?;
//!     let snapshot = nam.async_update().await?;
//!
//!     println!("Firmware: {}", snapshot.software_version);
//!     if let Some(pm25) = snapshot.sensors.sds011_p2 {
//!         println!("PM2.5: {pm25} µg/m³");
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod caqi;
pub mod client;
pub mod error;
pub mod mac;
pub mod mock;
pub mod normalize;
pub mod options;
pub mod retry;
pub mod transport;

// Core exports
pub use client::{ClientStateKind, NettigoAirMonitor};
pub use error::{Error, ErrorKind, Result};
pub use options::{
    CacheFallback, ClientConfig, ConnectionOptions, ConnectionOptionsBuilder, Endpoint,
};
pub use transport::{
    BasicAuth, HttpMethod, HttpResponse, HttpTransport, ReqwestTransport, TransportError,
};

/// Type alias for a shared client.
///
/// `NettigoAirMonitor` is not `Clone`; wrap it in an `Arc` to poll from
/// several tasks.
pub type SharedMonitor = std::sync::Arc<NettigoAirMonitor>;

pub use caqi::{AirQualityIndex, Caqi};
pub use mac::MacAddress;
pub use mock::{MockResponse, MockTransport, RecordedRequest};
pub use normalize::{SensorValues, normalize};
pub use retry::{RetryConfig, with_retry};

// Re-export from nam-types
pub use nam_types::{
    CaqiLevel, CaqiReading, DeviceSnapshot, Geolocation, NamSensors, ParseError,
    ParticulateSensor, RawReading, SensorKey,
};
