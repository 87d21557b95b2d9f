//! Sensor data normalization.
//!
//! Firmware revisions report the same physical sensor under different
//! names and units. Normalization runs in two pure phases:
//!
//! 1. [`parse_raw`] lower-cases keys, parses values, drops the illuminance
//!    "no sensor" marker and converts raw device units (pressure arrives in
//!    Pa and is turned into hPa).
//! 2. [`canonicalize`] rounds, drops housekeeping values and renames legacy
//!    keys. It is idempotent: running it on its own output
//!    changes nothing.
//!
//! [`normalize`] chains both.
//!
//! # Example
//!
//! ```
//! use nam_core::normalize::normalize;
//! use nam_types::RawReading;
//!
//! let values = normalize(&[
//!     RawReading::new("SDS_P1", "12.34"),
//!     RawReading::new("BME280_pressure", "98930.00"),
//!     RawReading::new("ambient_light", "-1"),
//! ])
//! .unwrap();
//!
//! assert_eq!(values.get("sds011_p1"), Some(&12.0));
//! assert_eq!(values.get("bme280_pressure"), Some(&989.3));
//! assert!(!values.contains_key("bh1750_illuminance"));
//! ```

use std::collections::BTreeMap;

use nam_types::{ParseError, ParseResult, RawReading};
use serde_json::Value;

/// Normalized key/value map.
pub type SensorValues = BTreeMap<String, f64>;

/// GPS latitude key.
pub const GPS_LATITUDE: &str = "gps_lat";
/// GPS longitude key.
pub const GPS_LONGITUDE: &str = "gps_lon";
/// GPS altitude key.
pub const GPS_HEIGHT: &str = "gps_height";

/// Keys rounded to whole numbers.
const ROUND_TO_INTEGER: [&str; 11] = [
    "conc_co2_ppm",
    "mhz14a_carbon_dioxide",
    "sds_p1",
    "sds_p2",
    "sds011_p1",
    "sds011_p2",
    "sps30_p0",
    "sps30_p1",
    "sps30_p2",
    "sps30_p4",
    "signal",
];

/// Keys whose precision is kept as delivered.
const KEEP_PRECISION: [&str; 3] = [GPS_LATITUDE, GPS_LONGITUDE, GPS_HEIGHT];

/// Legacy key renames, applied in order.
const RENAMES: [(&str, &str); 8] = [
    ("bmp_pressure", "bmp180_pressure"),
    ("bmp_temperature", "bmp180_temperature"),
    ("conc_co2_ppm", "mhz14a_carbon_dioxide"),
    ("humidity", "dht22_humidity"),
    ("sds_p1", "sds011_p1"),
    ("sds_p2", "sds011_p2"),
    ("temperature", "dht22_temperature"),
    ("ambient_light", "bh1750_illuminance"),
];

/// Housekeeping keys without sensor meaning.
const IGNORED: [&str; 2] = ["gps_date", "gps_time"];

/// Illuminance keys that use `-1` for "no sensor".
const ILLUMINANCE: [&str; 2] = ["ambient_light", "bh1750_illuminance"];

const ILLUMINANCE_ABSENT: f64 = -1.0;

/// Parse raw readings into a lower-cased key/value map in device-neutral
/// units.
///
/// Later duplicates of a key overwrite earlier ones. A value that is not a
/// finite number fails the whole batch. An illuminance reading of exactly
/// `-1` means no sensor is fitted and is left out.
pub fn parse_raw(readings: &[RawReading]) -> ParseResult<SensorValues> {
    let mut values = SensorValues::new();

    for reading in readings {
        let key = reading.value_type.trim().to_lowercase();
        if key.is_empty() {
            return Err(ParseError::missing_field("value_type"));
        }

        let value = reading
            .value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseError::invalid_value(&key, &reading.value))?;

        if ILLUMINANCE.contains(&key.as_str()) && value == ILLUMINANCE_ABSENT {
            continue;
        }

        let value = if key.contains("pressure") {
            value / 100.0
        } else {
            value
        };

        values.insert(key, value);
    }

    Ok(values)
}

/// Round, filter and rename a parsed map.
#[must_use]
pub fn canonicalize(values: SensorValues) -> SensorValues {
    let mut result: SensorValues = values
        .into_iter()
        .filter(|(key, _)| !IGNORED.contains(&key.as_str()))
        .map(|(key, value)| {
            let rounded = round_for(&key, value);
            (key, rounded)
        })
        .collect();

    for (from, to) in RENAMES {
        if let Some(value) = result.remove(from) {
            result.insert(to.to_string(), value);
        }
    }

    result
}

/// Full normalization: [`parse_raw`] followed by [`canonicalize`].
pub fn normalize(readings: &[RawReading]) -> ParseResult<SensorValues> {
    parse_raw(readings).map(canonicalize)
}

/// Read `sensordatavalues` from a decoded JSON payload.
///
/// Each entry needs a string `value_type` and a `value` that is either a
/// string or a number.
pub fn readings_from_json(value: &Value) -> ParseResult<Vec<RawReading>> {
    let entries = value
        .as_array()
        .ok_or_else(|| ParseError::InvalidData("sensordatavalues is not a list".to_string()))?;

    entries
        .iter()
        .map(|entry| {
            let value_type = entry
                .get("value_type")
                .and_then(Value::as_str)
                .ok_or_else(|| ParseError::missing_field("value_type"))?;

            let value = match entry.get("value") {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Number(number)) => number.to_string(),
                Some(other) => return Err(ParseError::invalid_value(value_type, other.to_string())),
                None => return Err(ParseError::missing_field("value")),
            };

            Ok(RawReading::new(value_type, value))
        })
        .collect()
}

fn round_for(key: &str, value: f64) -> f64 {
    // Past ~1.8e307 scaling by ten overflows; such values have no fraction left.
    if KEEP_PRECISION.contains(&key) || !(value * 10.0).is_finite() {
        value
    } else if ROUND_TO_INTEGER.contains(&key) {
        value.round()
    } else {
        (value * 10.0).round() / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(pairs: &[(&str, &str)]) -> Vec<RawReading> {
        pairs.iter().map(|(k, v)| RawReading::new(*k, *v)).collect()
    }

    #[test]
    fn test_keys_are_lowercased() {
        let values = normalize(&raw(&[("BME280_Temperature", "21.34")])).unwrap();
        assert_eq!(values.get("bme280_temperature"), Some(&21.3));
    }

    #[test]
    fn test_pressure_converted_to_hpa() {
        let values = parse_raw(&raw(&[
            ("BME280_pressure", "100012.34"),
            ("bmp_pressure", "98000"),
        ]))
        .unwrap();

        assert!((values["bme280_pressure"] - 1000.1234).abs() < 1e-9);
        assert!((values["bmp_pressure"] - 980.0).abs() < 1e-9);
    }

    #[test]
    fn test_integer_rounding_allowlist() {
        let values = normalize(&raw(&[
            ("SDS_P1", "12.54"),
            ("sps30_P4", "3.4"),
            ("signal", "-85.6"),
            ("conc_co2_ppm", "865.5"),
            ("heca_humidity", "45.67"),
        ]))
        .unwrap();

        assert_eq!(values["sds011_p1"], 13.0);
        assert_eq!(values["sps30_p4"], 3.0);
        assert_eq!(values["signal"], -86.0);
        assert_eq!(values["mhz14a_carbon_dioxide"], 866.0);
        assert_eq!(values["heca_humidity"], 45.7);
    }

    #[test]
    fn test_gps_keeps_precision() {
        let values = normalize(&raw(&[
            ("gps_lat", "52.2297701"),
            ("gps_lon", "21.0117801"),
            ("gps_height", "112.45"),
        ]))
        .unwrap();

        assert_eq!(values[GPS_LATITUDE], 52.2297701);
        assert_eq!(values[GPS_LONGITUDE], 21.0117801);
        assert_eq!(values[GPS_HEIGHT], 112.45);
    }

    #[test]
    fn test_legacy_keys_renamed() {
        let values = normalize(&raw(&[
            ("temperature", "6.3"),
            ("humidity", "90.1"),
            ("sds_p2", "4.5"),
            ("bmp_temperature", "7.2"),
            ("ambient_light", "120"),
        ]))
        .unwrap();

        assert_eq!(values["dht22_temperature"], 6.3);
        assert_eq!(values["dht22_humidity"], 90.1);
        assert_eq!(values["sds011_p2"], 5.0);
        assert_eq!(values["bmp180_temperature"], 7.2);
        assert_eq!(values["bh1750_illuminance"], 120.0);
        for (from, _) in RENAMES {
            assert!(!values.contains_key(from));
        }
    }

    #[test]
    fn test_illuminance_sentinel_dropped() {
        let values = normalize(&raw(&[("ambient_light", "-1")])).unwrap();
        assert!(values.is_empty());

        let values = normalize(&raw(&[("BH1750_illuminance", "-1.00")])).unwrap();
        assert!(values.is_empty());
    }

    #[test]
    fn test_illuminance_near_marker_kept() {
        for value in ["-1.04", "-0.96", "-1.0499"] {
            let values = normalize(&raw(&[("ambient_light", value)])).unwrap();
            assert_eq!(values.get("bh1750_illuminance"), Some(&-1.0), "{value}");
        }
    }

    #[test]
    fn test_huge_values_stay_finite() {
        let values = normalize(&raw(&[
            ("co_ppb", "1e308"),
            ("signal", "-1.7e308"),
            ("BME280_pressure", "1e308"),
        ]))
        .unwrap();

        assert_eq!(values["co_ppb"], 1e308);
        assert_eq!(values["signal"], -1.7e308);
        assert!(values["bme280_pressure"].is_finite());
    }

    #[test]
    fn test_illuminance_other_values_kept() {
        for value in ["0", "-2", "1", "5432.1"] {
            let values = normalize(&raw(&[("ambient_light", value)])).unwrap();
            assert!(values.contains_key("bh1750_illuminance"), "{value} dropped");
        }
    }

    #[test]
    fn test_housekeeping_keys_dropped() {
        let values = normalize(&raw(&[
            ("GPS_date", "20201212"),
            ("gps_time", "101010"),
            ("pms_P0", "1"),
        ]))
        .unwrap();

        assert_eq!(values.len(), 1);
        assert_eq!(values["pms_p0"], 1.0);
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let values = normalize(&raw(&[("pms_p1", "1"), ("PMS_P1", "2")])).unwrap();
        assert_eq!(values["pms_p1"], 2.0);
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let values = normalize(&raw(&[("CO_ppb", "301.25")])).unwrap();
        assert_eq!(values["co_ppb"], 301.3);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let err = normalize(&raw(&[("sds_p1", "abc")])).unwrap_err();
        assert_eq!(err, ParseError::invalid_value("sds_p1", "abc"));

        assert!(normalize(&raw(&[("sds_p1", "")])).is_err());
        assert!(normalize(&raw(&[("sds_p1", "NaN")])).is_err());
        assert!(normalize(&raw(&[("sds_p1", "inf")])).is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = normalize(&raw(&[("", "1")])).unwrap_err();
        assert_eq!(err, ParseError::missing_field("value_type"));
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_readings_from_json() {
        let readings = readings_from_json(&json!([
            {"value_type": "SDS_P1", "value": "12.1"},
            {"value_type": "signal", "value": -85},
        ]))
        .unwrap();

        assert_eq!(
            readings,
            vec![
                RawReading::new("SDS_P1", "12.1"),
                RawReading::new("signal", "-85"),
            ]
        );
    }

    #[test]
    fn test_readings_from_json_missing_value_type() {
        let err = readings_from_json(&json!([{"value": "12.1"}])).unwrap_err();
        assert_eq!(err, ParseError::missing_field("value_type"));
    }

    #[test]
    fn test_readings_from_json_missing_value() {
        let err = readings_from_json(&json!([{"value_type": "sds_p1"}])).unwrap_err();
        assert_eq!(err, ParseError::missing_field("value"));
    }

    #[test]
    fn test_readings_from_json_not_a_list() {
        assert!(readings_from_json(&json!({"value_type": "x"})).is_err());
    }
}
