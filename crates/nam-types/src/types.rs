//! Core types for Nettigo Air Monitor sensor data.

use core::fmt;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Canonical identifier of a numeric sensor field.
///
/// Different firmware revisions report the same physical sensor under
/// different raw names; after normalization every known reading is keyed
/// by one of these variants. Raw keys that match none of them are kept in
/// [`NamSensors::other`].
///
/// This enum is marked `#[non_exhaustive]` to allow adding new sensors
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[non_exhaustive]
pub enum SensorKey {
    /// BH1750 ambient light, lux.
    Bh1750Illuminance,
    /// BME280 relative humidity, %.
    Bme280Humidity,
    /// BME280 pressure, hPa.
    Bme280Pressure,
    /// BME280 temperature, °C.
    Bme280Temperature,
    /// BMP180 pressure, hPa.
    Bmp180Pressure,
    /// BMP180 temperature, °C.
    Bmp180Temperature,
    /// BMP280 pressure, hPa.
    Bmp280Pressure,
    /// BMP280 temperature, °C.
    Bmp280Temperature,
    /// DHT22 relative humidity, %.
    Dht22Humidity,
    /// DHT22 temperature, °C.
    Dht22Temperature,
    /// DS18B20 temperature, °C.
    Ds18b20Temperature,
    /// HECA relative humidity, %.
    HecaHumidity,
    /// HECA temperature, °C.
    HecaTemperature,
    /// MH-Z14A CO₂ concentration, ppm.
    Mhz14aCarbonDioxide,
    /// PMS PM1.0, µg/m³.
    PmsP0,
    /// PMS PM10, µg/m³.
    PmsP1,
    /// PMS PM2.5, µg/m³.
    PmsP2,
    /// SDS011 PM10, µg/m³.
    Sds011P1,
    /// SDS011 PM2.5, µg/m³.
    Sds011P2,
    /// SHT3x relative humidity, %.
    Sht3xHumidity,
    /// SHT3x temperature, °C.
    Sht3xTemperature,
    /// WiFi signal strength, dBm.
    Signal,
    /// SPS30 PM1.0, µg/m³.
    Sps30P0,
    /// SPS30 PM10, µg/m³.
    Sps30P1,
    /// SPS30 PM2.5, µg/m³.
    Sps30P2,
    /// SPS30 PM4.0, µg/m³.
    Sps30P4,
}

impl SensorKey {
    /// Every canonical key, in alphabetical order of its string form.
    pub const ALL: [SensorKey; 26] = [
        SensorKey::Bh1750Illuminance,
        SensorKey::Bme280Humidity,
        SensorKey::Bme280Pressure,
        SensorKey::Bme280Temperature,
        SensorKey::Bmp180Pressure,
        SensorKey::Bmp180Temperature,
        SensorKey::Bmp280Pressure,
        SensorKey::Bmp280Temperature,
        SensorKey::Dht22Humidity,
        SensorKey::Dht22Temperature,
        SensorKey::Ds18b20Temperature,
        SensorKey::HecaHumidity,
        SensorKey::HecaTemperature,
        SensorKey::Mhz14aCarbonDioxide,
        SensorKey::PmsP0,
        SensorKey::PmsP1,
        SensorKey::PmsP2,
        SensorKey::Sds011P1,
        SensorKey::Sds011P2,
        SensorKey::Sht3xHumidity,
        SensorKey::Sht3xTemperature,
        SensorKey::Signal,
        SensorKey::Sps30P0,
        SensorKey::Sps30P1,
        SensorKey::Sps30P2,
        SensorKey::Sps30P4,
    ];

    /// The canonical key as it appears in a normalized value map.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKey::Bh1750Illuminance => "bh1750_illuminance",
            SensorKey::Bme280Humidity => "bme280_humidity",
            SensorKey::Bme280Pressure => "bme280_pressure",
            SensorKey::Bme280Temperature => "bme280_temperature",
            SensorKey::Bmp180Pressure => "bmp180_pressure",
            SensorKey::Bmp180Temperature => "bmp180_temperature",
            SensorKey::Bmp280Pressure => "bmp280_pressure",
            SensorKey::Bmp280Temperature => "bmp280_temperature",
            SensorKey::Dht22Humidity => "dht22_humidity",
            SensorKey::Dht22Temperature => "dht22_temperature",
            SensorKey::Ds18b20Temperature => "ds18b20_temperature",
            SensorKey::HecaHumidity => "heca_humidity",
            SensorKey::HecaTemperature => "heca_temperature",
            SensorKey::Mhz14aCarbonDioxide => "mhz14a_carbon_dioxide",
            SensorKey::PmsP0 => "pms_p0",
            SensorKey::PmsP1 => "pms_p1",
            SensorKey::PmsP2 => "pms_p2",
            SensorKey::Sds011P1 => "sds011_p1",
            SensorKey::Sds011P2 => "sds011_p2",
            SensorKey::Sht3xHumidity => "sht3x_humidity",
            SensorKey::Sht3xTemperature => "sht3x_temperature",
            SensorKey::Signal => "signal",
            SensorKey::Sps30P0 => "sps30_p0",
            SensorKey::Sps30P1 => "sps30_p1",
            SensorKey::Sps30P2 => "sps30_p2",
            SensorKey::Sps30P4 => "sps30_p4",
        }
    }

    /// Look up a canonical key by its string form.
    ///
    /// Matching is exact: callers are expected to pass already lower-cased
    /// keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use nam_types::SensorKey;
    ///
    /// assert_eq!(SensorKey::from_key("sds011_p1"), Some(SensorKey::Sds011P1));
    /// assert_eq!(SensorKey::from_key("sds_p1"), None);
    /// ```
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == key)
    }
}

impl fmt::Display for SensorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for SensorKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| ParseError::InvalidData(format!("Unknown sensor key: {s}")))
    }
}

/// Common Air Quality Index level.
///
/// Ordered by severity, so threshold comparisons such as
/// `level >= CaqiLevel::High` work as expected.
///
/// ```
/// use nam_types::CaqiLevel;
///
/// assert!(CaqiLevel::VeryHigh > CaqiLevel::Medium);
/// assert_eq!(CaqiLevel::VeryLow.to_string(), "very_low");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CaqiLevel {
    /// Index below 25.
    VeryLow,
    /// Index 25 to 49.
    Low,
    /// Index 50 to 74.
    Medium,
    /// Index 75 to 100.
    High,
    /// Index above 100.
    VeryHigh,
}

impl CaqiLevel {
    /// Classify a CAQI index value.
    #[must_use]
    pub fn from_index(index: u16) -> Self {
        match index {
            0..=24 => CaqiLevel::VeryLow,
            25..=49 => CaqiLevel::Low,
            50..=74 => CaqiLevel::Medium,
            75..=100 => CaqiLevel::High,
            _ => CaqiLevel::VeryHigh,
        }
    }

    /// The level label used by the device dashboards.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CaqiLevel::VeryLow => "very_low",
            CaqiLevel::Low => "low",
            CaqiLevel::Medium => "medium",
            CaqiLevel::High => "high",
            CaqiLevel::VeryHigh => "very_high",
        }
    }
}

impl fmt::Display for CaqiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CAQI index together with its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CaqiReading {
    /// Numeric index, 0 and up.
    pub index: u16,
    /// Level derived from the index.
    pub level: CaqiLevel,
}

impl CaqiReading {
    /// Build a reading from an index, deriving the level.
    #[must_use]
    pub fn from_index(index: u16) -> Self {
        Self {
            index,
            level: CaqiLevel::from_index(index),
        }
    }
}

/// Particulate matter sensor family that gets a CAQI attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ParticulateSensor {
    /// Nova Fitness SDS011.
    Sds011,
    /// Sensirion SPS30.
    Sps30,
    /// Plantower PMS series.
    Pms,
}

impl ParticulateSensor {
    /// All particulate families, in the order CAQI is computed.
    pub const ALL: [ParticulateSensor; 3] = [
        ParticulateSensor::Sds011,
        ParticulateSensor::Sps30,
        ParticulateSensor::Pms,
    ];

    /// Key carrying this family's PM10 reading.
    #[must_use]
    pub fn pm10_key(&self) -> SensorKey {
        match self {
            ParticulateSensor::Sds011 => SensorKey::Sds011P1,
            ParticulateSensor::Sps30 => SensorKey::Sps30P1,
            ParticulateSensor::Pms => SensorKey::PmsP1,
        }
    }

    /// Key carrying this family's PM2.5 reading.
    #[must_use]
    pub fn pm25_key(&self) -> SensorKey {
        match self {
            ParticulateSensor::Sds011 => SensorKey::Sds011P2,
            ParticulateSensor::Sps30 => SensorKey::Sps30P2,
            ParticulateSensor::Pms => SensorKey::PmsP2,
        }
    }

    /// Prefix used for the derived `<prefix>_caqi` fields.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            ParticulateSensor::Sds011 => "sds011",
            ParticulateSensor::Sps30 => "sps30",
            ParticulateSensor::Pms => "pms",
        }
    }
}

/// A single reading as delivered in `sensordatavalues`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawReading {
    /// Raw sensor key, in whatever case the firmware uses.
    pub value_type: String,
    /// Textual value.
    pub value: String,
}

impl RawReading {
    /// Create a raw reading.
    pub fn new(value_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value_type: value_type.into(),
            value: value.into(),
        }
    }
}

/// Device position reported by a GPS module.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Geolocation {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Altitude in metres, when the module reports it.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub altitude: Option<f64>,
}

/// Normalized sensor values of a Nettigo Air Monitor.
///
/// Every canonical field is optional: a device reports only the sensors it
/// has attached. Derived CAQI fields are present only when the family's
/// PM10 and PM2.5 readings were both available.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NamSensors {
    pub bh1750_illuminance: Option<f64>,
    pub bme280_humidity: Option<f64>,
    pub bme280_pressure: Option<f64>,
    pub bme280_temperature: Option<f64>,
    pub bmp180_pressure: Option<f64>,
    pub bmp180_temperature: Option<f64>,
    pub bmp280_pressure: Option<f64>,
    pub bmp280_temperature: Option<f64>,
    pub dht22_humidity: Option<f64>,
    pub dht22_temperature: Option<f64>,
    pub ds18b20_temperature: Option<f64>,
    pub heca_humidity: Option<f64>,
    pub heca_temperature: Option<f64>,
    pub mhz14a_carbon_dioxide: Option<f64>,
    pub pms_caqi: Option<u16>,
    pub pms_caqi_level: Option<CaqiLevel>,
    pub pms_p0: Option<f64>,
    pub pms_p1: Option<f64>,
    pub pms_p2: Option<f64>,
    pub sds011_caqi: Option<u16>,
    pub sds011_caqi_level: Option<CaqiLevel>,
    pub sds011_p1: Option<f64>,
    pub sds011_p2: Option<f64>,
    pub sht3x_humidity: Option<f64>,
    pub sht3x_temperature: Option<f64>,
    pub signal: Option<f64>,
    pub sps30_caqi: Option<u16>,
    pub sps30_caqi_level: Option<CaqiLevel>,
    pub sps30_p0: Option<f64>,
    pub sps30_p1: Option<f64>,
    pub sps30_p2: Option<f64>,
    pub sps30_p4: Option<f64>,
    /// Device uptime in seconds.
    pub uptime: Option<u64>,
    /// Readings under keys no firmware mapping knows about.
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "BTreeMap::is_empty"))]
    pub other: BTreeMap<String, f64>,
}

impl NamSensors {
    /// Build the record from a normalized key/value map.
    ///
    /// Canonical keys fill their field; everything else lands in
    /// [`NamSensors::other`].
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use nam_types::{NamSensors, SensorKey};
    ///
    /// let mut values = BTreeMap::new();
    /// values.insert("sds011_p1".to_string(), 12.0);
    /// values.insert("co_ppb".to_string(), 301.0);
    ///
    /// let sensors = NamSensors::from_values(values);
    /// assert_eq!(sensors.get(SensorKey::Sds011P1), Some(12.0));
    /// assert_eq!(sensors.other.get("co_ppb"), Some(&301.0));
    /// ```
    #[must_use]
    pub fn from_values(values: BTreeMap<String, f64>) -> Self {
        let mut sensors = Self::default();
        for (key, value) in values {
            match SensorKey::from_key(&key) {
                Some(known) => *sensors.slot_mut(known) = Some(value),
                None => {
                    sensors.other.insert(key, value);
                }
            }
        }
        sensors
    }

    /// Attach the device uptime.
    #[must_use]
    pub fn with_uptime(mut self, uptime: u64) -> Self {
        self.uptime = Some(uptime);
        self
    }

    /// Attach a CAQI result to a particulate family.
    #[must_use]
    pub fn with_caqi(mut self, sensor: ParticulateSensor, caqi: CaqiReading) -> Self {
        let (index, level) = match sensor {
            ParticulateSensor::Sds011 => (&mut self.sds011_caqi, &mut self.sds011_caqi_level),
            ParticulateSensor::Sps30 => (&mut self.sps30_caqi, &mut self.sps30_caqi_level),
            ParticulateSensor::Pms => (&mut self.pms_caqi, &mut self.pms_caqi_level),
        };
        *index = Some(caqi.index);
        *level = Some(caqi.level);
        self
    }

    /// CAQI attached to a particulate family, if any.
    #[must_use]
    pub fn caqi(&self, sensor: ParticulateSensor) -> Option<CaqiReading> {
        let (index, level) = match sensor {
            ParticulateSensor::Sds011 => (self.sds011_caqi, self.sds011_caqi_level),
            ParticulateSensor::Sps30 => (self.sps30_caqi, self.sps30_caqi_level),
            ParticulateSensor::Pms => (self.pms_caqi, self.pms_caqi_level),
        };
        Some(CaqiReading {
            index: index?,
            level: level?,
        })
    }

    /// Value of a canonical sensor field.
    #[must_use]
    pub fn get(&self, key: SensorKey) -> Option<f64> {
        match key {
            SensorKey::Bh1750Illuminance => self.bh1750_illuminance,
            SensorKey::Bme280Humidity => self.bme280_humidity,
            SensorKey::Bme280Pressure => self.bme280_pressure,
            SensorKey::Bme280Temperature => self.bme280_temperature,
            SensorKey::Bmp180Pressure => self.bmp180_pressure,
            SensorKey::Bmp180Temperature => self.bmp180_temperature,
            SensorKey::Bmp280Pressure => self.bmp280_pressure,
            SensorKey::Bmp280Temperature => self.bmp280_temperature,
            SensorKey::Dht22Humidity => self.dht22_humidity,
            SensorKey::Dht22Temperature => self.dht22_temperature,
            SensorKey::Ds18b20Temperature => self.ds18b20_temperature,
            SensorKey::HecaHumidity => self.heca_humidity,
            SensorKey::HecaTemperature => self.heca_temperature,
            SensorKey::Mhz14aCarbonDioxide => self.mhz14a_carbon_dioxide,
            SensorKey::PmsP0 => self.pms_p0,
            SensorKey::PmsP1 => self.pms_p1,
            SensorKey::PmsP2 => self.pms_p2,
            SensorKey::Sds011P1 => self.sds011_p1,
            SensorKey::Sds011P2 => self.sds011_p2,
            SensorKey::Sht3xHumidity => self.sht3x_humidity,
            SensorKey::Sht3xTemperature => self.sht3x_temperature,
            SensorKey::Signal => self.signal,
            SensorKey::Sps30P0 => self.sps30_p0,
            SensorKey::Sps30P1 => self.sps30_p1,
            SensorKey::Sps30P2 => self.sps30_p2,
            SensorKey::Sps30P4 => self.sps30_p4,
        }
    }

    fn slot_mut(&mut self, key: SensorKey) -> &mut Option<f64> {
        match key {
            SensorKey::Bh1750Illuminance => &mut self.bh1750_illuminance,
            SensorKey::Bme280Humidity => &mut self.bme280_humidity,
            SensorKey::Bme280Pressure => &mut self.bme280_pressure,
            SensorKey::Bme280Temperature => &mut self.bme280_temperature,
            SensorKey::Bmp180Pressure => &mut self.bmp180_pressure,
            SensorKey::Bmp180Temperature => &mut self.bmp180_temperature,
            SensorKey::Bmp280Pressure => &mut self.bmp280_pressure,
            SensorKey::Bmp280Temperature => &mut self.bmp280_temperature,
            SensorKey::Dht22Humidity => &mut self.dht22_humidity,
            SensorKey::Dht22Temperature => &mut self.dht22_temperature,
            SensorKey::Ds18b20Temperature => &mut self.ds18b20_temperature,
            SensorKey::HecaHumidity => &mut self.heca_humidity,
            SensorKey::HecaTemperature => &mut self.heca_temperature,
            SensorKey::Mhz14aCarbonDioxide => &mut self.mhz14a_carbon_dioxide,
            SensorKey::PmsP0 => &mut self.pms_p0,
            SensorKey::PmsP1 => &mut self.pms_p1,
            SensorKey::PmsP2 => &mut self.pms_p2,
            SensorKey::Sds011P1 => &mut self.sds011_p1,
            SensorKey::Sds011P2 => &mut self.sds011_p2,
            SensorKey::Sht3xHumidity => &mut self.sht3x_humidity,
            SensorKey::Sht3xTemperature => &mut self.sht3x_temperature,
            SensorKey::Signal => &mut self.signal,
            SensorKey::Sps30P0 => &mut self.sps30_p0,
            SensorKey::Sps30P1 => &mut self.sps30_p1,
            SensorKey::Sps30P2 => &mut self.sps30_p2,
            SensorKey::Sps30P4 => &mut self.sps30_p4,
        }
    }
}

/// One poll result: firmware version, position and sensor values.
///
/// Snapshots are produced fresh by every update and are never modified
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceSnapshot {
    /// Firmware version string, e.g. `NAMF-2020-36`.
    pub software_version: String,
    /// Position captured from the first successful read.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub location: Option<Geolocation>,
    /// Normalized sensor values.
    pub sensors: NamSensors,
}
