//! Core library for the `weather` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The weather engine: fetching current conditions from WeatherAPI.com
//! - Response parsing and the user-facing error taxonomy
//! - A bounded history of recent successful lookups
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod engine;
pub mod history;
pub mod model;
pub mod response;

pub use config::{Config, ConfigError};
pub use engine::{FetchError, WeatherEngine};
pub use history::History;
pub use model::WeatherRecord;
pub use response::ParseError;
