//! Ticker snapshot
//!
//! Usage: cargo run --bin ticker_snapshot -- [popular | all <CUR> | one <exchange> <CUR>]
//!
//! Prints normalized tickers as pretty JSON. Defaults to `popular`.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use coinbridge::client::{BinanceClient, CoinoneClient};
use coinbridge::config::AppConfig;
use coinbridge::{logging, Exchange, NormalizedTicker, TickerAggregator};
use tracing::info;

enum Command {
    Popular,
    All(String),
    One(Exchange, String),
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args {
        [] => Ok(Command::Popular),
        [cmd] if cmd == "popular" => Ok(Command::Popular),
        [cmd, currency] if cmd == "all" => Ok(Command::All(currency.to_ascii_uppercase())),
        [cmd, exchange, currency] if cmd == "one" => {
            let exchange = Exchange::from_str(exchange)
                .with_context(|| format!("Unknown exchange: {}", exchange))?;
            Ok(Command::One(exchange, currency.to_ascii_uppercase()))
        }
        _ => bail!("usage: ticker_snapshot [popular | all <CUR> | one <exchange> <CUR>]"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    logging::init(&config.logging)?;
    info!(config = %config, "Configuration loaded");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let aggregator = TickerAggregator::new(
        Arc::new(CoinoneClient::new(&config.coinone)?),
        Arc::new(BinanceClient::new(&config.binance)?),
    );

    let tickers: Vec<NormalizedTicker> = match command {
        Command::Popular => aggregator.fetch_popular().await?,
        Command::All(currency) => aggregator.fetch_all_exchanges(&currency).await?,
        Command::One(exchange, currency) => {
            vec![aggregator.fetch_normalized(exchange, &currency).await?]
        }
    };

    info!(count = tickers.len(), "Tickers fetched");
    println!("{}", serde_json::to_string_pretty(&tickers)?);
    Ok(())
}
