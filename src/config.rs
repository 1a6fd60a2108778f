use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Yearly temperature range analytics", long_about = None)]
pub struct Cli {
    /// Log level or tracing filter directive (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", env = "WEATHER_LOG")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load the readings and serve the analytics API over HTTP
    Serve(ServeArgs),
    /// Print the yearly extremes and climate summary as JSON, then exit
    Report(DatasetArgs),
}

#[derive(Args, Debug)]
pub struct DatasetArgs {
    /// CSV file with a header line and one integer temperature per row
    #[arg(
        short,
        long,
        default_value = "yearly_weather_data.csv",
        env = "WEATHER_DATA"
    )]
    pub data: PathBuf,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Address the HTTP server listens on
    #[arg(short, long, default_value = "0.0.0.0:3000", env = "WEATHER_BIND")]
    pub bind: SocketAddr,

    /// Number of requests that may queue for the station task
    #[arg(long, default_value_t = 100, env = "WEATHER_CHANNEL_CAPACITY")]
    pub channel_capacity: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_arguments() {
        let cli = Cli::try_parse_from([
            "weather-range-stats",
            "serve",
            "--data",
            "temps.csv",
            "--bind",
            "127.0.0.1:8080",
            "--channel-capacity",
            "4",
        ])
        .unwrap();

        match cli.command {
            Command::Serve(args) => {
                assert_eq!(args.dataset.data, PathBuf::from("temps.csv"));
                assert_eq!(args.bind, "127.0.0.1:8080".parse().unwrap());
                assert_eq!(args.channel_capacity, 4);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_report_rejects_unknown_flag() {
        assert!(Cli::try_parse_from(["weather-range-stats", "report", "--bind", "x"]).is_err());
    }
}
