use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Text};
use weather_core::{Config, FetchError, WeatherEngine, WeatherRecord};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com API key.
    Configure,

    /// Show current weather for a city and exit.
    Show {
        /// City name, e.g. "Paris".
        city: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Some(Command::Configure) => configure(),
            Some(Command::Show { city }) => show_once(&city).await,
            None => interactive().await,
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let key = Text::new("WeatherAPI.com API key:").prompt()?;
    config.set_api_key(key.trim().to_string());
    config.save()?;

    println!("Saved API key to {}", Config::config_file_path()?.display());
    Ok(())
}

fn engine_from_config() -> Result<WeatherEngine> {
    let config = Config::load()?;
    let api_key = config.resolve_api_key()?;

    Ok(WeatherEngine::new(api_key)?)
}

async fn show_once(city: &str) -> Result<()> {
    let mut engine = engine_from_config()?;

    match engine.fetch(city).await {
        Ok(record) => {
            print!("{}", format_record(&record));
            Ok(())
        }
        Err(err) => {
            print_error_banner(&err);
            anyhow::bail!("weather lookup failed ({})", err.category())
        }
    }
}

async fn interactive() -> Result<()> {
    // Resolve credentials before showing anything; a missing key aborts
    // startup rather than failing on the first lookup.
    let mut engine = engine_from_config()?;

    print_welcome_banner();
    println!("Type 'history' to see recent searches or 'quit' to exit.\n");

    loop {
        let input = match Text::new("Enter city name:").prompt() {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(err) => return Err(err.into()),
        };

        let input = input.trim();
        if input.is_empty() {
            println!("Please enter a city name.");
            continue;
        }
        if input.eq_ignore_ascii_case("quit") {
            break;
        }
        if input.eq_ignore_ascii_case("history") {
            print_history(&engine.recent_history());
            continue;
        }

        println!("\nFetching weather data for {input}...\n");
        match engine.fetch(input).await {
            Ok(record) => print!("{}", format_record(&record)),
            Err(err) => print_error_banner(&err),
        }
    }

    println!("\nThank you for using the Weather App. Goodbye!");
    Ok(())
}

fn print_welcome_banner() {
    println!(
        "\
╔════════════════════════════════════════════════════╗
║                                                    ║
║               WEATHER INFORMATION APP              ║
║                                                    ║
║            Get real-time weather updates           ║
║              for any city in the world             ║
║                                                    ║
╚════════════════════════════════════════════════════╝"
    );
}

fn format_record(record: &WeatherRecord) -> String {
    let observed = DateTime::from_timestamp(record.observed_at_epoch, 0)
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown time".to_string());

    format!(
        "\nWeather in {}, {} at {}:\n\
         Temperature: {}°C (Feels like: {}°C)\n\
         Conditions: {}\n\
         Humidity: {}%\n\
         Wind Speed: {:.1} m/s\n",
        record.city,
        record.country,
        observed,
        record.temperature_c,
        record.feels_like_c,
        record.description,
        record.humidity_pct,
        record.wind_speed_mps,
    )
}

fn print_error_banner(err: &FetchError) {
    println!("\n⚠️  {} ERROR  ⚠️", err.category());
    println!("{}", "-".repeat(40));
    println!("{err}");
    println!("{}", "-".repeat(40));
}

fn print_history(records: &[WeatherRecord]) {
    if records.is_empty() {
        println!("\nNo recent searches.");
        return;
    }

    println!("\n===== RECENT SEARCHES =====");
    for (i, record) in records.iter().enumerate() {
        println!(
            "{}. {}, {}: {}°C, {}",
            i + 1,
            record.city,
            record.country,
            record.temperature_c,
            record.description
        );
    }
    println!("===========================");
}
