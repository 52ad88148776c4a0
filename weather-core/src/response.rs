use serde::Deserialize;
use thiserror::Error;

use crate::model::WeatherRecord;

/// Failure to turn a raw `current.json` body into a [`WeatherRecord`].
///
/// Both variants surface to users under the same "data" category; they
/// stay distinct so diagnostics can tell a garbled body apart from a
/// response the service reshaped.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Received invalid data from the weather service: {0}")]
    Malformed(serde_json::Error),

    /// Also covers mistyped fields (e.g. a string where a number is
    /// expected); serde_json reports both under the same category.
    #[error("Weather data is missing expected information: {0}")]
    MissingField(serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    feelslike_c: f64,
    humidity: u8,
    wind_kph: f64,
    condition: WaCondition,
    last_updated_epoch: i64,
}

#[derive(Debug, Deserialize)]
struct WaResponse {
    location: WaLocation,
    current: WaCurrent,
}

/// Parse a WeatherAPI `current.json` body into a normalized record.
///
/// Wind speed is converted from km/h to m/s here, exact; rounding is the
/// presentation layer's concern. The icon reference is carried verbatim
/// and never fetched.
pub fn parse_current(body: &str) -> Result<WeatherRecord, ParseError> {
    let parsed: WaResponse = serde_json::from_str(body).map_err(|err| match err.classify() {
        // serde_json reports absent/mistyped fields as `Data`; anything
        // else means the body was not the expected JSON shape at all.
        serde_json::error::Category::Data => ParseError::MissingField(err),
        _ => ParseError::Malformed(err),
    })?;

    Ok(WeatherRecord {
        city: parsed.location.name,
        country: parsed.location.country,
        temperature_c: parsed.current.temp_c,
        feels_like_c: parsed.current.feelslike_c,
        description: parsed.current.condition.text,
        humidity_pct: parsed.current.humidity,
        wind_speed_mps: parsed.current.wind_kph / 3.6,
        observed_at_epoch: parsed.current.last_updated_epoch,
        icon_url: parsed.current.condition.icon,
    })
}
