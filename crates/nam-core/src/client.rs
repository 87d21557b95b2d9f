//! Nettigo Air Monitor client.
//!
//! [`NettigoAirMonitor`] checks the device configuration once on creation,
//! then serves [`DeviceSnapshot`]s from [`async_update`](NettigoAirMonitor::async_update).
//! Transport failures during an update are retried on the configured
//! schedule. Once the retries are used up the client either answers from
//! the last good payload (see [`CacheFallback`]) or fails for good.
//!
//! # States
//!
//! | State | Meaning |
//! |-------|---------|
//! | [`ClientStateKind::Ready`] | Last update reached the device |
//! | [`ClientStateKind::DegradedCached`] | Last update was answered from cache |
//! | [`ClientStateKind::Failed`] | Retries ran out; every later update fails without I/O |
//!
//! Recovering from `Failed` takes a new client from
//! [`create`](NettigoAirMonitor::create).

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use nam_types::{DeviceSnapshot, Geolocation, NamSensors, ParseError, ParticulateSensor};

use crate::caqi::{AirQualityIndex, Caqi};
use crate::error::{Error, Result};
use crate::mac::MacAddress;
use crate::normalize::{GPS_HEIGHT, GPS_LATITUDE, GPS_LONGITUDE, normalize, readings_from_json};
use crate::options::{ClientConfig, ConnectionOptions, Endpoint};
use crate::retry::with_retry;
use crate::transport::{HttpMethod, HttpResponse, HttpTransport, ReqwestTransport, TransportError};

/// Health of a client as seen by its last update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientStateKind {
    /// The device answered.
    Ready,
    /// The device did not answer and a cached payload was served.
    DegradedCached,
    /// The device did not answer and nothing could be served.
    Failed,
}

/// State shared with readers; never held across an await point.
#[derive(Debug)]
struct Observed {
    mac: Option<MacAddress>,
    software_version: Option<String>,
    consecutive_failures: u32,
    state: ClientStateKind,
}

/// State owned by the update path.
#[derive(Debug, Default)]
struct UpdateState {
    consecutive_failures: u32,
    last_payload: Option<Value>,
    location: Option<Geolocation>,
}

/// Client for one Nettigo Air Monitor.
///
/// The HTTP transport belongs to the caller and may be shared between
/// clients. Concurrent updates on one client are serialized.
pub struct NettigoAirMonitor {
    transport: Arc<dyn HttpTransport>,
    options: ConnectionOptions,
    config: ClientConfig,
    air_quality: Arc<dyn AirQualityIndex>,
    auth_enabled: bool,
    update: Mutex<UpdateState>,
    observed: RwLock<Observed>,
}

impl fmt::Debug for NettigoAirMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NettigoAirMonitor")
            .field("host", &self.options.host())
            .field("auth_enabled", &self.auth_enabled)
            .field("state", &self.state())
            .finish()
    }
}

impl NettigoAirMonitor {
    /// Check the device configuration and create a client with the default configuration.
    pub async fn create(
        transport: Arc<dyn HttpTransport>,
        options: ConnectionOptions,
    ) -> Result<Self> {
        Self::create_with_config(transport, options, ClientConfig::default()).await
    }

    /// Check the device configuration and create a client.
    ///
    /// The check is a single request to `/config.json` and is never
    /// retried.
    pub async fn create_with_config(
        transport: Arc<dyn HttpTransport>,
        options: ConnectionOptions,
        config: ClientConfig,
    ) -> Result<Self> {
        let host = options.host().to_string();
        debug!("Probing device {}", host);

        let response = send(transport.as_ref(), &options, HttpMethod::Get, Endpoint::Config)
            .await
            .map_err(Error::escalate)?;

        let reports_auth = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|body| body.get("www_basicauth_enabled").and_then(Value::as_bool))
            .unwrap_or(false);

        if reports_auth && options.auth().is_none() {
            return Err(Error::AuthRequired);
        }

        let auth_enabled = reports_auth || options.auth().is_some();
        let mac = MacAddress::find_in(&response.body);
        info!(
            "Connected to device {} (auth: {}, mac: {})",
            host,
            auth_enabled,
            mac.map_or_else(|| "unknown".to_string(), |m| m.to_string())
        );

        Ok(Self {
            transport,
            options,
            config,
            air_quality: Arc::new(Caqi),
            auth_enabled,
            update: Mutex::new(UpdateState::default()),
            observed: RwLock::new(Observed {
                mac,
                software_version: None,
                consecutive_failures: 0,
                state: ClientStateKind::Ready,
            }),
        })
    }

    /// Connect to the device over a shared `reqwest` client.
    pub async fn connect(client: reqwest::Client, options: ConnectionOptions) -> Result<Self> {
        Self::create(Arc::new(ReqwestTransport::new(client)), options).await
    }

    /// Use another index function for the CAQI fields.
    #[must_use]
    pub fn with_air_quality_index(mut self, index: impl AirQualityIndex + 'static) -> Self {
        self.air_quality = Arc::new(index);
        self
    }

    /// Host this client talks to.
    pub fn host(&self) -> &str {
        self.options.host()
    }

    /// Whether requests carry basic auth, or the device asked for it.
    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    /// Client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// MAC address, if the configuration check or [`async_get_mac_address`](Self::async_get_mac_address)
    /// found one.
    pub fn mac(&self) -> Option<MacAddress> {
        self.read_observed().mac
    }

    /// Firmware version from the last successful update.
    pub fn software_version(&self) -> Option<String> {
        self.read_observed().software_version.clone()
    }

    /// Number of updates in a row that did not reach the device.
    pub fn consecutive_failures(&self) -> u32 {
        self.read_observed().consecutive_failures
    }

    /// Current state.
    pub fn state(&self) -> ClientStateKind {
        self.read_observed().state
    }

    /// Fetch, normalize and enrich the current sensor data.
    ///
    /// Bounded by [`ClientConfig::update_deadline`] when one is set.
    pub async fn async_update(&self) -> Result<DeviceSnapshot> {
        match self.config.update_deadline {
            Some(deadline) => tokio::time::timeout(deadline, self.update_inner())
                .await
                .map_err(|_| Error::timeout("async_update", deadline))?,
            None => self.update_inner().await,
        }
    }

    /// Read the MAC address from the `/values` page.
    ///
    /// The address is returned in lowercase colon form and remembered by
    /// the client.
    pub async fn async_get_mac_address(&self) -> Result<String> {
        let response = self
            .request(HttpMethod::Get, Endpoint::Values)
            .await
            .map_err(Error::escalate)?;

        let mac = MacAddress::find_in(&response.body).ok_or_else(|| {
            Error::CannotGetMac("Cannot get MAC address from device".to_string())
        })?;

        self.write_observed(|observed| observed.mac = Some(mac));
        Ok(mac.to_string())
    }

    /// Restart the device.
    pub async fn async_restart(&self) -> Result<()> {
        self.request(HttpMethod::Post, Endpoint::Restart)
            .await
            .map_err(Error::escalate)?;
        info!("Restart requested for device {}", self.host());
        Ok(())
    }

    /// Trigger a firmware update on the device.
    pub async fn async_ota_update(&self) -> Result<()> {
        self.request(HttpMethod::Post, Endpoint::Ota)
            .await
            .map_err(Error::escalate)?;
        info!("Firmware update requested for device {}", self.host());
        Ok(())
    }

    async fn update_inner(&self) -> Result<DeviceSnapshot> {
        let mut state = self.update.lock().await;

        if self.state() == ClientStateKind::Failed {
            return Err(self.not_responding().at_endpoint(Endpoint::Data.path()));
        }

        let fetched = with_retry(&self.config.retry, "async_update", Error::is_retryable, || {
            self.fetch_payload()
        })
        .await;

        let payload = match fetched {
            Ok(payload) => payload,
            Err(err) if err.is_retryable() => return self.fall_back(&mut state, err),
            Err(err) => return Err(err),
        };

        state.consecutive_failures = 0;
        self.write_observed(|observed| {
            observed.consecutive_failures = 0;
            observed.state = ClientStateKind::Ready;
        });

        let snapshot = self.build_snapshot(&payload, &mut state)?;
        state.last_payload = Some(payload);
        self.write_observed(|observed| {
            observed.software_version = Some(snapshot.software_version.clone());
        });

        Ok(snapshot)
    }

    async fn fetch_payload(&self) -> Result<Value> {
        let response = self.request(HttpMethod::Get, Endpoint::Data).await?;
        serde_json::from_str(&response.body)
            .map_err(|e| Error::invalid_sensor_data(format!("Payload is not JSON: {e}")))
    }

    fn fall_back(&self, state: &mut UpdateState, err: Error) -> Result<DeviceSnapshot> {
        let failures = state.consecutive_failures;

        if self.config.cache_fallback.allows(failures) {
            if let Some(cached) = state.last_payload.clone() {
                warn!(
                    "Device {} is not responding, serving cached data ({} consecutive failures)",
                    self.host(),
                    failures + 1
                );
                let snapshot = self.build_snapshot(&cached, state)?;
                state.consecutive_failures = failures + 1;
                self.write_observed(|observed| {
                    observed.consecutive_failures = failures + 1;
                    observed.state = ClientStateKind::DegradedCached;
                });
                return Ok(snapshot);
            }
        }

        warn!(
            "Device {} is not responding, giving up after {} attempts",
            self.host(),
            self.config.retry.max_attempts()
        );
        state.consecutive_failures = failures.saturating_add(1);
        self.write_observed(|observed| {
            observed.consecutive_failures = failures.saturating_add(1);
            observed.state = ClientStateKind::Failed;
        });
        Err(err.escalate())
    }

    fn build_snapshot(&self, payload: &Value, state: &mut UpdateState) -> Result<DeviceSnapshot> {
        let software_version = payload
            .get("software_version")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseError::missing_field("software_version"))?
            .to_string();

        let raw = payload
            .get("sensordatavalues")
            .ok_or_else(|| ParseError::missing_field("sensordatavalues"))?;
        let mut values = normalize(&readings_from_json(raw)?)?;

        let latitude = values.remove(GPS_LATITUDE);
        let longitude = values.remove(GPS_LONGITUDE);
        let altitude = values.remove(GPS_HEIGHT);

        let uptime = parse_uptime(payload.get("uptime"))?;

        let mut sensors = NamSensors::from_values(values);
        if let Some(uptime) = uptime {
            sensors = sensors.with_uptime(uptime);
        }
        for family in ParticulateSensor::ALL {
            let pm10 = sensors.get(family.pm10_key());
            let pm25 = sensors.get(family.pm25_key());
            if let Some(caqi) = self.air_quality.compute(pm10, pm25) {
                sensors = sensors.with_caqi(family, caqi);
            }
        }

        if state.location.is_none() {
            if let (Some(latitude), Some(longitude)) = (latitude, longitude) {
                debug!("Captured location of device {}", self.host());
                state.location = Some(Geolocation {
                    latitude,
                    longitude,
                    altitude,
                });
            }
        }

        Ok(DeviceSnapshot {
            software_version,
            location: state.location,
            sensors,
        })
    }

    async fn request(&self, method: HttpMethod, endpoint: Endpoint) -> Result<HttpResponse> {
        send(self.transport.as_ref(), &self.options, method, endpoint).await
    }

    fn not_responding(&self) -> Error {
        Error::api(
            self.host(),
            format!("The device {} is not responding", self.host()),
        )
    }

    fn read_observed(&self) -> std::sync::RwLockReadGuard<'_, Observed> {
        self.observed.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_observed(&self, update: impl FnOnce(&mut Observed)) {
        let mut observed = self.observed.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut observed);
    }
}

/// One request with status classification.
///
/// 401 becomes [`Error::AuthFailed`], any other non-2xx an [`Error::Api`].
/// Timeouts and refused connections come back as the retryable
/// [`Error::NotResponding`].
async fn send(
    transport: &dyn HttpTransport,
    options: &ConnectionOptions,
    method: HttpMethod,
    endpoint: Endpoint,
) -> Result<HttpResponse> {
    let host = options.host();
    let url = options.url(endpoint);

    let response = match transport.send(method, &url, options.auth()).await {
        Ok(response) => response,
        Err(reason @ (TransportError::Timeout | TransportError::Connect(_))) => {
            debug!("{} {} failed: {}", method, url, reason);
            return Err(Error::not_responding(host, reason).at_endpoint(endpoint.path()));
        }
        Err(reason) => {
            return Err(Error::Api {
                host: host.to_string(),
                endpoint: Some(endpoint.path().to_string()),
                status: None,
                message: format!("Request to device {host} failed: {reason}"),
                reason: Some(reason),
            });
        }
    };

    debug!("{} {} from {}, status: {}", method, endpoint, host, response.status);

    match response.status {
        401 => Err(Error::AuthFailed),
        status if !response.is_success() => {
            Err(Error::invalid_response(host, status).at_endpoint(endpoint.path()))
        }
        _ => Ok(response),
    }
}

fn parse_uptime(value: Option<&Value>) -> Result<Option<u64>> {
    let invalid = |v: &Value| ParseError::invalid_value("uptime", v.to_string());

    let seconds = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(number)) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|s| *s >= 0.0).map(|s| s as u64)),
        Some(Value::String(text)) => {
            let text = text.trim();
            text.parse::<u64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s >= 0.0)
                    .map(|s| s as u64)
            })
        }
        Some(other) => return Err(invalid(other).into()),
    };

    match (seconds, value) {
        (Some(seconds), _) => Ok(Some(seconds)),
        (None, Some(v)) => Err(invalid(v).into()),
        (None, None) => Ok(None),
    }
}
