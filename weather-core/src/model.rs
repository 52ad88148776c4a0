use serde::{Deserialize, Serialize};

/// Normalized snapshot of one successful lookup. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city: String,
    pub country: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub description: String,
    /// 0–100 expected; passed through from the service unvalidated.
    pub humidity_pct: u8,
    /// Derived from the service's km/h reading as `kph / 3.6`, unrounded.
    pub wind_speed_mps: f64,
    /// Service-provided observation time, seconds since the Unix epoch.
    pub observed_at_epoch: i64,
    /// Opaque reference to a condition icon; absence is valid.
    pub icon_url: Option<String>,
}
