//! Platform-agnostic types for Nettigo Air Monitor sensors.
//!
//! This crate provides the data model shared by the HTTP client in
//! `nam-core` and anything that stores or displays its results.
//!
//! # Features
//!
//! - Canonical sensor keys across firmware dialects
//! - Fixed-schema snapshot record with optional fields
//! - CAQI levels and readings
//! - Error types for payload parsing
//!
//! # Example
//!
//! ```
//! use nam_types::{CaqiLevel, CaqiReading};
//!
//! let caqi = CaqiReading::from_index(42);
//! assert_eq!(caqi.level, CaqiLevel::Low);
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    CaqiLevel, CaqiReading, DeviceSnapshot, Geolocation, NamSensors, ParticulateSensor,
    RawReading, SensorKey,
};
