//! Common Air Quality Index (CAQI).
//!
//! The client attaches a CAQI to every particulate sensor family whose
//! PM10 and PM2.5 readings are both present. The index function is a
//! trait so callers can plug in another grid.
//!
//! # Example
//!
//! ```
//! use nam_core::{AirQualityIndex, Caqi};
//! use nam_types::CaqiLevel;
//!
//! let caqi = Caqi::default().compute(Some(19.0), Some(12.0)).unwrap();
//! assert_eq!(caqi.index, 20);
//! assert_eq!(caqi.level, CaqiLevel::VeryLow);
//!
//! assert!(Caqi::default().compute(None, Some(12.0)).is_none());
//! ```

use nam_types::CaqiReading;

/// Turns PM10 and PM2.5 concentrations into an air quality index.
pub trait AirQualityIndex: Send + Sync {
    /// Raw index for hourly PM10 and PM2.5 averages in µg/m³.
    ///
    /// May be negative for out-of-range input.
    fn index(&self, pm10: f64, pm25: f64) -> i32;

    /// Index and level, or `None` when either input is missing or the
    /// index is negative.
    fn compute(&self, pm10: Option<f64>, pm25: Option<f64>) -> Option<CaqiReading> {
        let index = self.index(pm10?, pm25?);
        u16::try_from(index).ok().map(CaqiReading::from_index)
    }
}

/// Index values at the grid breakpoints.
const INDEX_GRID: [f64; 5] = [0.0, 25.0, 50.0, 75.0, 100.0];

/// Hourly PM10 breakpoints, µg/m³.
const PM10_GRID: [f64; 5] = [0.0, 25.0, 50.0, 90.0, 180.0];

/// Hourly PM2.5 breakpoints, µg/m³.
const PM25_GRID: [f64; 5] = [0.0, 15.0, 30.0, 55.0, 110.0];

/// European hourly CAQI for background stations.
///
/// Each pollutant is mapped onto the index grid by linear interpolation
/// between breakpoints, extrapolating the last segment above 100. The
/// result is the larger sub-index, rounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Caqi;

impl Caqi {
    fn sub_index(concentration: f64, grid: &[f64; 5]) -> f64 {
        // Segment containing the value; the outer segments extrapolate.
        let segment = grid
            .windows(2)
            .position(|w| concentration < w[1])
            .unwrap_or(grid.len() - 2);

        let (c_lo, c_hi) = (grid[segment], grid[segment + 1]);
        let (i_lo, i_hi) = (INDEX_GRID[segment], INDEX_GRID[segment + 1]);

        i_lo + (concentration - c_lo) * (i_hi - i_lo) / (c_hi - c_lo)
    }
}

impl AirQualityIndex for Caqi {
    fn index(&self, pm10: f64, pm25: f64) -> i32 {
        let index = Self::sub_index(pm10, &PM10_GRID).max(Self::sub_index(pm25, &PM25_GRID));
        index.round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nam_types::CaqiLevel;

    #[test]
    fn test_breakpoints_map_to_grid() {
        let caqi = Caqi;
        assert_eq!(caqi.index(0.0, 0.0), 0);
        assert_eq!(caqi.index(25.0, 0.0), 25);
        assert_eq!(caqi.index(50.0, 0.0), 50);
        assert_eq!(caqi.index(90.0, 0.0), 75);
        assert_eq!(caqi.index(180.0, 0.0), 100);
        assert_eq!(caqi.index(0.0, 15.0), 25);
        assert_eq!(caqi.index(0.0, 30.0), 50);
        assert_eq!(caqi.index(0.0, 55.0), 75);
        assert_eq!(caqi.index(0.0, 110.0), 100);
    }

    #[test]
    fn test_interpolation() {
        // PM10 70 sits halfway between 50 and 90.
        assert_eq!(Caqi.index(70.0, 0.0), 63);
        // PM2.5 22.5 sits halfway between 15 and 30.
        assert_eq!(Caqi.index(0.0, 22.5), 38);
    }

    #[test]
    fn test_worst_pollutant_wins() {
        assert_eq!(Caqi.index(10.0, 40.0), 60);
        assert_eq!(Caqi.index(40.0, 5.0), 40);
    }

    #[test]
    fn test_extrapolates_above_grid() {
        let reading = Caqi.compute(Some(270.0), Some(10.0)).unwrap();
        assert_eq!(reading.index, 125);
        assert_eq!(reading.level, CaqiLevel::VeryHigh);
    }

    #[test]
    fn test_missing_input_gives_none() {
        assert!(Caqi.compute(None, None).is_none());
        assert!(Caqi.compute(Some(10.0), None).is_none());
        assert!(Caqi.compute(None, Some(10.0)).is_none());
    }

    #[test]
    fn test_negative_index_gives_none() {
        assert!(Caqi.index(-20.0, -20.0) < 0);
        assert!(Caqi.compute(Some(-20.0), Some(-20.0)).is_none());
    }

    #[test]
    fn test_levels() {
        assert_eq!(
            Caqi.compute(Some(5.0), Some(2.0)).unwrap().level,
            CaqiLevel::VeryLow
        );
        assert_eq!(
            Caqi.compute(Some(30.0), Some(2.0)).unwrap().level,
            CaqiLevel::Low
        );
        assert_eq!(
            Caqi.compute(Some(60.0), Some(2.0)).unwrap().level,
            CaqiLevel::Medium
        );
        assert_eq!(
            Caqi.compute(Some(150.0), Some(2.0)).unwrap().level,
            CaqiLevel::High
        );
    }

    #[test]
    fn test_custom_index_function() {
        struct Fixed(i32);

        impl AirQualityIndex for Fixed {
            fn index(&self, _pm10: f64, _pm25: f64) -> i32 {
                self.0
            }
        }

        assert_eq!(
            Fixed(42).compute(Some(1.0), Some(1.0)),
            Some(CaqiReading::from_index(42))
        );
        assert!(Fixed(-1).compute(Some(1.0), Some(1.0)).is_none());
    }
}
