//! Connection options and client configuration.
//!
//! [`ConnectionOptions`] says *where* the device is and how to
//! authenticate; it is validated once at construction and immutable
//! afterwards. [`ClientConfig`] tunes *how* the client behaves: the retry
//! schedule, whether stale data may be served, and an optional overall
//! deadline for updates.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use nam_core::{CacheFallback, ClientConfig, ConnectionOptions};
//!
//! let options = ConnectionOptions::builder("192.168.172.12")
//!     .username("user")
//!     .password("pass")
//!     .build()
//!     .unwrap();
//! assert!(options.auth().is_some());
//!
//! let config = ClientConfig::default()
//!     .cache_fallback(CacheFallback::bounded(3))
//!     .update_deadline(Duration::from_secs(120));
//! ```

use std::fmt;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use crate::transport::BasicAuth;

/// Device endpoints, relative to `http://{host}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Capability check (`/config.json`).
    Config,
    /// Sensor data (`/data.json`).
    Data,
    /// Legacy MAC-bearing page (`/values`).
    Values,
    /// Restart (`/reset`).
    Restart,
    /// Firmware update (`/ota`).
    Ota,
}

impl Endpoint {
    /// Path component of the endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Config => "/config.json",
            Endpoint::Data => "/data.json",
            Endpoint::Values => "/values",
            Endpoint::Restart => "/reset",
            Endpoint::Ota => "/ota",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Where the device lives and how to authenticate against it.
///
/// Credentials are checked when the value is built: a username without a
/// password (or the other way round) is rejected.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    host: String,
    auth: Option<BasicAuth>,
}

impl ConnectionOptions {
    /// Options for a device without authentication.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            auth: None,
        }
    }

    /// Options with optional credentials.
    ///
    /// Fails with [`Error::InvalidConfig`] unless both or neither of
    /// `username` and `password` are given.
    pub fn with_credentials(
        host: impl Into<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let mut builder = Self::builder(host);
        builder.username = username;
        builder.password = password.map(SecretString::from);
        builder.build()
    }

    /// Start building options for a host.
    pub fn builder(host: impl Into<String>) -> ConnectionOptionsBuilder {
        ConnectionOptionsBuilder {
            host: host.into(),
            username: None,
            password: None,
        }
    }

    /// Host name or address, optionally with a port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Credentials, if any were supplied.
    pub fn auth(&self) -> Option<&BasicAuth> {
        self.auth.as_ref()
    }

    /// Full URL of an endpoint on this device.
    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("http://{}{}", self.host, endpoint.path())
    }
}

/// Builder for [`ConnectionOptions`].
#[derive(Debug)]
pub struct ConnectionOptionsBuilder {
    host: String,
    username: Option<String>,
    password: Option<SecretString>,
}

impl ConnectionOptionsBuilder {
    /// Set the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Validate and build the options.
    pub fn build(self) -> Result<ConnectionOptions> {
        let host = self.host.trim().to_string();
        if host.is_empty() {
            return Err(Error::invalid_config("Host must not be empty"));
        }

        let auth = match (self.username, self.password) {
            (Some(username), Some(password)) => Some(BasicAuth::new(username, password)),
            (None, None) => None,
            _ => return Err(Error::invalid_config("Supply both username and password")),
        };

        Ok(ConnectionOptions { host, auth })
    }
}

/// What to do when the device stops responding during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CacheFallback {
    /// Fail as soon as the retries are exhausted.
    #[default]
    Disabled,
    /// Serve the last good payload for up to `max_consecutive_failures`
    /// updates in a row before failing.
    Bounded {
        /// Number of consecutive updates that may be answered from cache.
        max_consecutive_failures: u32,
    },
}

impl CacheFallback {
    /// Allow up to `max_consecutive_failures` cached answers in a row.
    pub fn bounded(max_consecutive_failures: u32) -> Self {
        Self::Bounded {
            max_consecutive_failures,
        }
    }

    /// Whether a cached payload may be served after `failures` consecutive
    /// failed updates.
    pub fn allows(&self, failures: u32) -> bool {
        match self {
            CacheFallback::Disabled => false,
            CacheFallback::Bounded {
                max_consecutive_failures,
            } => failures < *max_consecutive_failures,
        }
    }
}

/// Behavior of a [`NettigoAirMonitor`](crate::NettigoAirMonitor).
///
/// Can be loaded from TOML; durations are whole seconds:
///
/// ```
/// use nam_core::{CacheFallback, ClientConfig};
///
/// let config = ClientConfig::from_toml_str(r#"
///     update_deadline = 90
///
///     [retry]
///     max_retries = 2
///
///     [cache_fallback]
///     mode = "bounded"
///     max_consecutive_failures = 3
/// "#).unwrap();
///
/// assert_eq!(config.retry.max_retries, 2);
/// assert_eq!(config.cache_fallback, CacheFallback::bounded(3));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Upper bound for a whole update, backoff included.
    #[serde(with = "serde_secs_opt", skip_serializing_if = "Option::is_none")]
    pub update_deadline: Option<Duration>,
    /// Retry schedule for the data request.
    pub retry: RetryConfig,
    /// Stale-data policy once the retries are used up.
    pub cache_fallback: CacheFallback,
}

impl ClientConfig {
    /// Parse a configuration from TOML.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::invalid_config(e.to_string()))
    }

    /// Serialize the configuration to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::invalid_config(e.to_string()))
    }

    /// Set the retry schedule.
    #[must_use]
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the stale-data policy.
    #[must_use]
    pub fn cache_fallback(mut self, policy: CacheFallback) -> Self {
        self.cache_fallback = policy;
        self
    }

    /// Bound every update by a deadline.
    #[must_use]
    pub fn update_deadline(mut self, deadline: Duration) -> Self {
        self.update_deadline = Some(deadline);
        self
    }
}

/// Serde helpers for durations expressed in whole seconds.
pub(crate) mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

pub(crate) mod serde_secs_opt {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|secs| secs.map(Duration::from_secs))
    }
}
