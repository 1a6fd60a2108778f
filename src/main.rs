use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Cli, Command, DatasetArgs, ServeArgs};
use datastore::WeatherStation;
use manager::StationManager;
use web::RouterHandle;

mod config;
mod datastore;
mod error;
mod manager;
mod segment;
mod web;

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_station(args: &DatasetArgs) -> Result<WeatherStation> {
    let readings = datastore::load_readings(&args.data)
        .with_context(|| format!("failed to load readings from {}", args.data.display()))?;
    Ok(WeatherStation::new(&readings))
}

async fn serve(args: ServeArgs) -> Result<()> {
    let station = load_station(&args.dataset)?;
    let station_manager = StationManager::new(station, args.channel_capacity);
    let app = web::router(RouterHandle::new(station_manager.station_tx.clone()));

    tokio::spawn(station_manager.run());

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(addr = %args.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
        .context("server error")?;
    Ok(())
}

fn report(args: DatasetArgs) -> Result<()> {
    let mut station = load_station(&args)?;
    let output = json!({
        "days": station.days(),
        "extremes": station.extremes(),
        "summary": station.summary(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Report(args) => report(args),
    }
}
