//! Error types for nam-core.
//!
//! This module defines every error that can surface while talking to a
//! Nettigo Air Monitor over HTTP.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::NotResponding`] | Retried inside `async_update` | Device busy or rebooting |
//! | [`Error::Api`] | Do not retry | Device rejected the request, or retries ran out |
//! | [`Error::AuthFailed`] | Do not retry | Fix credentials |
//! | [`Error::AuthRequired`] | Do not retry | Supply credentials |
//! | [`Error::InvalidSensorData`] | Do not retry | Firmware sent a payload we cannot read |
//! | [`Error::CannotGetMac`] | Do not retry | Firmware does not expose a MAC token |
//! | [`Error::InvalidConfig`] | Do not retry | Fix configuration and restart |
//! | [`Error::Timeout`] | Caller decides | Caller-imposed deadline elapsed |
//!
//! `NotResponding` never leaves the client on its own: once retries are
//! exhausted it is escalated into [`Error::Api`] (see [`Error::escalate`]),
//! unless a cached payload is served instead.
//!
//! Callers that prefer to branch on a flat tag can use [`Error::kind`]:
//!
//! ```
//! use nam_core::{Error, ErrorKind};
//!
//! let err = Error::invalid_response("192.168.172.12", 404);
//! assert_eq!(err.kind(), ErrorKind::Api);
//! assert_eq!(err.to_string(), "Invalid response from device 192.168.172.12: 404");
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur when communicating with a Nettigo Air Monitor.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The device rejected the supplied credentials (HTTP 401).
    #[error("Authorization has failed")]
    AuthFailed,

    /// The device requires credentials but none were supplied.
    #[error("Authorization is required")]
    AuthRequired,

    /// The request timed out or the connection could not be established.
    #[error("The device {host} is not responding")]
    NotResponding {
        /// Host the request was sent to.
        host: String,
        /// Endpoint path, e.g. `/data.json`.
        endpoint: Option<String>,
        /// What went wrong at the transport level.
        #[source]
        reason: TransportError,
    },

    /// The device answered with an unexpected status, or the request failed
    /// for good.
    #[error("{message}")]
    Api {
        /// Host the request was sent to.
        host: String,
        /// Endpoint path, e.g. `/data.json`.
        endpoint: Option<String>,
        /// HTTP status, when the device answered at all.
        status: Option<u16>,
        /// Human readable description.
        message: String,
        /// Transport failure behind the error, when the device never answered.
        #[source]
        reason: Option<TransportError>,
    },

    /// The data payload is missing fields or carries unparseable values.
    #[error("Invalid sensor data: {0}")]
    InvalidSensorData(String),

    /// No MAC address token was found in the response.
    #[error("{0}")]
    CannotGetMac(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A caller-imposed deadline elapsed.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline.
        duration: Duration,
    },
}

/// Flat discriminator of [`Error`], for callers that switch on the kind
/// without caring about the context fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// See [`Error::AuthFailed`].
    AuthFailed,
    /// See [`Error::AuthRequired`].
    AuthRequired,
    /// See [`Error::NotResponding`].
    NotResponding,
    /// See [`Error::Api`].
    Api,
    /// See [`Error::InvalidSensorData`].
    InvalidSensorData,
    /// See [`Error::CannotGetMac`].
    CannotGetMac,
    /// See [`Error::InvalidConfig`].
    InvalidConfig,
    /// See [`Error::Timeout`].
    Timeout,
}

impl Error {
    /// The kind tag of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AuthFailed => ErrorKind::AuthFailed,
            Error::AuthRequired => ErrorKind::AuthRequired,
            Error::NotResponding { .. } => ErrorKind::NotResponding,
            Error::Api { .. } => ErrorKind::Api,
            Error::InvalidSensorData(_) => ErrorKind::InvalidSensorData,
            Error::CannotGetMac(_) => ErrorKind::CannotGetMac,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Whether the update loop should try the request again.
    ///
    /// Only transport-level failures qualify. A device that answered, even
    /// with an error status, is not asked again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::NotResponding { .. })
    }

    /// Create a not-responding error from a transport failure.
    pub fn not_responding(host: impl Into<String>, reason: TransportError) -> Self {
        Self::NotResponding {
            host: host.into(),
            endpoint: None,
            reason,
        }
    }

    /// Create an API error for a non-success status code.
    pub fn invalid_response(host: impl Into<String>, status: u16) -> Self {
        let host = host.into();
        Self::Api {
            message: format!("Invalid response from device {host}: {status}"),
            host,
            endpoint: None,
            status: Some(status),
            reason: None,
        }
    }

    /// Create an API error without a status code.
    pub fn api(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            host: host.into(),
            endpoint: None,
            status: None,
            message: message.into(),
            reason: None,
        }
    }

    /// Attach the endpoint path to a request-level error.
    ///
    /// Only [`Error::NotResponding`] and [`Error::Api`] carry an endpoint;
    /// other variants are returned unchanged.
    #[must_use]
    pub fn at_endpoint(mut self, path: impl Into<String>) -> Self {
        if let Error::NotResponding { endpoint, .. } | Error::Api { endpoint, .. } = &mut self {
            *endpoint = Some(path.into());
        }
        self
    }

    /// Endpoint path the failed request went to, if known.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Error::NotResponding { endpoint, .. } | Error::Api { endpoint, .. } => {
                endpoint.as_deref()
            }
            _ => None,
        }
    }

    /// Transport failure behind this error, if the device never answered.
    pub fn transport_reason(&self) -> Option<&TransportError> {
        match self {
            Error::NotResponding { reason, .. } => Some(reason),
            Error::Api { reason, .. } => reason.as_ref(),
            _ => None,
        }
    }

    /// Create an invalid sensor data error.
    pub fn invalid_sensor_data(message: impl Into<String>) -> Self {
        Self::InvalidSensorData(message.into())
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Turn a transport failure into the fatal [`Error::Api`] callers see.
    ///
    /// Host, endpoint and the transport reason are kept. Every other
    /// variant is returned unchanged.
    pub fn escalate(self) -> Self {
        match self {
            Error::NotResponding {
                host,
                endpoint,
                reason,
            } => Error::Api {
                message: format!("The device {host} is not responding"),
                host,
                endpoint,
                status: None,
                reason: Some(reason),
            },
            other => other,
        }
    }
}

impl From<nam_types::ParseError> for Error {
    fn from(err: nam_types::ParseError) -> Self {
        Error::InvalidSensorData(err.to_string())
    }
}

/// Result type alias using nam-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
