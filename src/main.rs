use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wealthbook::config::{default_config_path, ResolvedConfig};
use wealthbook::engine::RateInput;
use wealthbook::format::format_minor_units;
use wealthbook::fx::parse_scaled_rate;
use wealthbook::models::{Actor, CurrencyCode, Money, Role};
use wealthbook::storage::JsonFileStorage;
use wealthbook::valuation::Dimension;
use wealthbook::Engine;

#[derive(Parser)]
#[command(name = "wealthbook")]
#[command(about = "Multi-currency portfolio valuation")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Role the command runs as.
    #[arg(long, default_value = "admin")]
    role: Role,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show current configuration
    Config,
    /// Exchange rate observations
    Rates {
        #[command(subcommand)]
        command: RatesCommand,
    },
    /// Convert an amount between currencies
    Convert {
        /// Amount in major units (e.g. "1000.500")
        amount: String,
        from: CurrencyCode,
        to: CurrencyCode,
        /// Conversion date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Portfolio totals and allocation
    Summary {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Exposure by geography, currency or sector
    Exposure {
        dimension: Dimension,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Unit occupancy and rent outstanding
    Occupancy,
}

#[derive(Subcommand)]
enum RatesCommand {
    /// Set a manual rate override
    Set {
        from: CurrencyCode,
        to: CurrencyCode,
        date: NaiveDate,
        /// Decimal rate, up to eight places (e.g. "3.25")
        rate: String,
    },
    /// Load a JSON array of observations from a named feed
    Ingest { source: String, file: PathBuf },
    /// Latest observations quoted from a base currency
    List {
        /// Defaults to the configured base currency
        #[arg(long)]
        base: Option<CurrencyCode>,
        /// Only observations on exactly this date
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Resolve the rate for a pair
    Resolve {
        from: CurrencyCode,
        to: CurrencyCode,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn config_output(config_path: &Path, config: &ResolvedConfig) -> serde_json::Value {
    let settings = &config.settings;
    serde_json::json!({
        "config_file": config_path.display().to_string(),
        "data_directory": config.data_dir.display().to_string(),
        "base_currency": settings.base_currency(),
        "supported_currencies": settings.supported_currencies(),
        "timezone": settings.timezone().name(),
        "valuation": {
            "stale_after": wealthbook::duration::format_duration(settings.stale_after())
        },
        "equity": {
            "allow_short_sales": settings.equity_policy().allow_short_sales
        },
        "display": {
            "currency_grouping": config.display.currency_grouping
        }
    })
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .init();

    let cli = Cli::parse();
    let config = ResolvedConfig::load_or_default(&cli.config)?;

    let storage = Arc::new(JsonFileStorage::new(&config.data_dir));
    let engine = Engine::new(storage, config.settings.clone());
    let actor = Actor::new("cli", cli.role);
    let today = engine.today();

    match cli.command {
        Command::Config => print_json(&config_output(&cli.config, &config)),
        Command::Rates { command } => match command {
            RatesCommand::Set {
                from,
                to,
                date,
                rate,
            } => {
                let rate = parse_scaled_rate(&rate)?;
                let stored = engine
                    .upsert_manual_rate(&actor, &from, &to, date, rate)
                    .await?;
                print_json(&stored)
            }
            RatesCommand::Ingest { source, file } => {
                let raw = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let rates: Vec<RateInput> = serde_json::from_str(&raw)
                    .with_context(|| format!("Failed to parse {}", file.display()))?;
                let report = engine.ingest_rates(&actor, &source, rates).await?;
                print_json(&report)
            }
            RatesCommand::List { base, date } => {
                let base = base.unwrap_or_else(|| engine.settings().base_currency().clone());
                print_json(&engine.latest_rates(&base, date).await?)
            }
            RatesCommand::Resolve { from, to, date } => {
                let rate = engine.resolve_rate(&from, &to, date.unwrap_or(today)).await?;
                print_json(&serde_json::json!({
                    "from": rate.from,
                    "to": rate.to,
                    "rate": rate.to_decimal()?.to_string(),
                    "origin": rate.origin,
                }))
            }
        },
        Command::Convert {
            amount,
            from,
            to,
            date,
        } => {
            let amount = Money::parse_major(&amount, from)?;
            let converted = engine.convert(&amount, &to, date.unwrap_or(today)).await?;
            let display = format_minor_units(
                converted.amount,
                converted.currency.minor_unit_scale(),
                config.display.currency_grouping,
            );
            print_json(&serde_json::json!({
                "amount": amount,
                "converted": converted,
                "display": format!("{display} {}", converted.currency),
            }))
        }
        Command::Summary { date } => print_json(&engine.summarize(date.unwrap_or(today)).await?),
        Command::Exposure { dimension, date } => {
            print_json(&engine.exposure_by(dimension, date.unwrap_or(today)).await?)
        }
        Command::Occupancy => print_json(&engine.occupancy_report(today).await?),
    }
}
