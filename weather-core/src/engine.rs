use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    config::ConfigError,
    history::History,
    model::WeatherRecord,
    response::{self, ParseError},
};

/// WeatherAPI.com current-conditions endpoint.
const CURRENT_ENDPOINT: &str = "http://api.weatherapi.com/v1/current.json";

/// Transport timeout. Timeouts are surfaced to callers, never retried.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Status WeatherAPI returns for an unknown location.
const STATUS_UNKNOWN_LOCATION: StatusCode = StatusCode::BAD_REQUEST;

/// Closed set of user-facing failure categories for [`WeatherEngine::fetch`].
///
/// Every failure reachable from a fetch lands in exactly one variant;
/// nothing propagates unclassified. The display strings are the fixed
/// message templates shown to users.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to connect to the weather service. Please check your internet connection.")]
    Connection(#[source] reqwest::Error),

    #[error("Request timed out. The weather service may be experiencing high traffic.")]
    Timeout(#[source] reqwest::Error),

    #[error("City '{city}' not found. Please check the spelling and try again.")]
    Search { city: String },

    #[error("Weather service returned an error: status {status}: {detail}")]
    Http { status: StatusCode, detail: String },

    #[error(transparent)]
    Data(#[from] ParseError),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(#[source] reqwest::Error),
}

impl FetchError {
    /// Short banner label for presentation layers.
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::Connection(_) => "CONNECTION",
            FetchError::Timeout(_) => "TIMEOUT",
            FetchError::Search { .. } => "SEARCH",
            FetchError::Http { .. } => "HTTP",
            FetchError::Data(_) => "DATA",
            FetchError::Unexpected(_) => "UNEXPECTED",
        }
    }
}

/// Weather retrieval engine: one fixed endpoint, one credential, and a
/// bounded history of successful lookups.
///
/// Each instance owns its history outright; front ends only read it.
/// The engine assumes at most one in-flight fetch per instance and does
/// no internal locking.
#[derive(Debug)]
pub struct WeatherEngine {
    api_key: String,
    base_url: String,
    http: Client,
    history: History,
}

impl WeatherEngine {
    /// Build an engine against the fixed WeatherAPI endpoint.
    ///
    /// An empty credential is a construction-time error; it is never
    /// deferred to fetch time.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ConfigError> {
        Self::with_base_url(api_key, CURRENT_ENDPOINT)
    }

    /// Build an engine against an alternate endpoint, e.g. a local mock
    /// server in tests.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Self::build(api_key.into(), base_url.into(), HTTP_TIMEOUT)
    }

    fn build(api_key: String, base_url: String, timeout: Duration) -> Result<Self, ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self { api_key, base_url, http, history: History::new() })
    }

    /// Fetch current conditions for `city`.
    ///
    /// Exactly one network exchange per call, no retries. Only a
    /// successful fetch appends to the history; failures leave it
    /// untouched.
    pub async fn fetch(&mut self, city: &str) -> Result<WeatherRecord, FetchError> {
        let city = city.trim();

        // Front ends reject empty input before calling. If an empty
        // city reaches this layer anyway it behaves like an unknown
        // location rather than crashing.
        if city.is_empty() {
            return Err(FetchError::Search { city: city.to_string() });
        }

        debug!(city, "fetching current weather");

        let res = self
            .http
            .get(&self.base_url)
            .query(&[("q", city), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(classify_transport)?;

        if status == STATUS_UNKNOWN_LOCATION {
            warn!(city, "weather service does not know this location");
            return Err(FetchError::Search { city: city.to_string() });
        }

        if !status.is_success() {
            warn!(%status, "weather service returned an error status");
            return Err(FetchError::Http { status, detail: truncate_body(&body) });
        }

        let record = response::parse_current(&body)?;
        self.history.record(record.clone());

        Ok(record)
    }

    /// Recent successful lookups, most recent first.
    pub fn recent_history(&self) -> Vec<WeatherRecord> {
        self.history.recent().into_iter().cloned().collect()
    }
}

/// Total mapping of transport failures onto the user-facing taxonomy.
fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err)
    } else if err.is_connect() {
        FetchError::Connection(err)
    } else {
        FetchError::Unexpected(err)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    // Floor the cut to a char boundary; byte 200 can fall inside a
    // multibyte character.
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    const PATH: &str = "/v1/current.json";

    fn body_for(city: &str) -> String {
        format!(
            r#"{{
                "location": {{ "name": "{city}", "country": "France" }},
                "current": {{
                    "temp_c": 18.0,
                    "feelslike_c": 17.0,
                    "condition": {{ "text": "Clear", "icon": "//cdn.weatherapi.com/weather/64x64/day/113.png" }},
                    "humidity": 60,
                    "wind_kph": 10.8,
                    "last_updated_epoch": 1700000000
                }}
            }}"#
        )
    }

    fn engine_for(server: &Server) -> WeatherEngine {
        WeatherEngine::with_base_url("test-key", format!("{}{PATH}", server.url()))
            .expect("key is non-empty")
    }

    #[test]
    fn empty_api_key_fails_at_construction() {
        let err = WeatherEngine::new("  ").unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[tokio::test]
    async fn successful_fetch_returns_record_and_records_history() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", PATH)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "Paris".into()),
                Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_body(body_for("Paris"))
            .create_async()
            .await;

        let mut engine = engine_for(&server);
        let record = engine.fetch("Paris").await.expect("service answered with a full body");

        mock.assert_async().await;
        assert_eq!(record.city, "Paris");
        assert_eq!(record.temperature_c, 18.0);
        assert_eq!(record.feels_like_c, 17.0);
        assert_eq!(record.description, "Clear");
        assert_eq!(record.humidity_pct, 60);
        assert!((record.wind_speed_mps - 3.0).abs() < 1e-9);
        assert_eq!(record.observed_at_epoch, 1_700_000_000);

        let history = engine.recent_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], record);
    }

    #[tokio::test]
    async fn surrounding_whitespace_is_trimmed_from_the_city() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::UrlEncoded("q".into(), "Paris".into()))
            .with_status(200)
            .with_body(body_for("Paris"))
            .create_async()
            .await;

        let mut engine = engine_for(&server);
        let record = engine.fetch("  Paris  ").await.unwrap();
        assert_eq!(record.city, "Paris");
    }

    #[tokio::test]
    async fn bad_request_is_a_search_error_naming_the_city() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"code":1006,"message":"No matching location found."}}"#)
            .create_async()
            .await;

        let mut engine = engine_for(&server);
        let err = engine.fetch("Nowhereville").await.unwrap_err();

        assert!(matches!(err, FetchError::Search { .. }));
        assert_eq!(err.category(), "SEARCH");
        assert!(err.to_string().contains("Nowhereville"));
        assert!(engine.recent_history().is_empty());
    }

    #[tokio::test]
    async fn other_error_status_is_an_http_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("internal error")
            .create_async()
            .await;

        let mut engine = engine_for(&server);
        let err = engine.fetch("Paris").await.unwrap_err();

        match err {
            FetchError::Http { status, ref detail } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(detail.contains("internal error"));
            }
            other => panic!("expected Http, got {other:?}"),
        }
        assert!(engine.recent_history().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_a_data_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let mut engine = engine_for(&server);
        let err = engine.fetch("Paris").await.unwrap_err();

        assert!(matches!(err, FetchError::Data(ParseError::Malformed(_))));
        assert_eq!(err.category(), "DATA");
    }

    #[tokio::test]
    async fn missing_field_is_a_data_error_and_history_is_untouched() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body_for("Paris").replace(r#""humidity": 60,"#, ""))
            .create_async()
            .await;

        let mut engine = engine_for(&server);
        let before = engine.recent_history();
        let err = engine.fetch("Paris").await.unwrap_err();

        assert!(matches!(err, FetchError::Data(ParseError::MissingField(_))));
        assert!(err.to_string().contains("humidity"));
        assert_eq!(engine.recent_history(), before);
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        // 199 ASCII bytes, then a 3-byte char spanning bytes 199..202.
        let body = format!("{}€€", "x".repeat(199));

        let truncated = truncate_body(&body);
        assert_eq!(truncated, format!("{}...", "x".repeat(199)));
    }

    #[tokio::test]
    async fn long_multibyte_error_body_still_classifies_as_http() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body(format!("{}€€€", "x".repeat(199)))
            .create_async()
            .await;

        let mut engine = engine_for(&server);
        let err = engine.fetch("Paris").await.unwrap_err();

        match err {
            FetchError::Http { status, ref detail } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(detail.ends_with("..."));
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_failure_is_classified() {
        // Reserve a local port, then drop the listener so the connect
        // is deterministically refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut engine =
            WeatherEngine::with_base_url("test-key", format!("http://{addr}/v1/current.json"))
                .unwrap();

        let err = engine.fetch("Paris").await.unwrap_err();
        assert!(matches!(err, FetchError::Connection(_)));
        assert_eq!(err.category(), "CONNECTION");
        assert!(engine.recent_history().is_empty());
    }

    #[tokio::test]
    async fn slow_response_is_classified_as_timeout() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", PATH)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_chunked_body(|writer| {
                std::thread::sleep(Duration::from_millis(500));
                writer.write_all(b"{}")
            })
            .create_async()
            .await;

        let mut engine = WeatherEngine::build(
            "test-key".to_string(),
            format!("{}{PATH}", server.url()),
            Duration::from_millis(50),
        )
        .unwrap();

        let err = engine.fetch("Paris").await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
        assert_eq!(err.category(), "TIMEOUT");
    }

    #[tokio::test]
    async fn empty_city_reaching_the_engine_acts_like_not_found() {
        let mut engine = WeatherEngine::new("test-key").unwrap();

        let err = engine.fetch("   ").await.unwrap_err();
        assert!(matches!(err, FetchError::Search { .. }));
        assert!(engine.recent_history().is_empty());
    }

    #[tokio::test]
    async fn history_keeps_the_last_five_lookups_most_recent_first() {
        let mut server = Server::new_async().await;
        let cities = ["A", "B", "C", "D", "E", "F"];
        for city in cities {
            server
                .mock("GET", PATH)
                .match_query(Matcher::UrlEncoded("q".into(), city.into()))
                .with_status(200)
                .with_body(body_for(city))
                .create_async()
                .await;
        }

        let mut engine = engine_for(&server);
        for city in cities {
            engine.fetch(city).await.expect("every city resolves");
        }

        let recent: Vec<String> =
            engine.recent_history().into_iter().map(|r| r.city).collect();
        assert_eq!(recent, ["F", "E", "D", "C", "B"]);
    }
}
