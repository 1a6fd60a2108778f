use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::datastore::{
    Alerts, DailyReport, Extremes, RangeStats, Summary, ThresholdMode, WeatherStation,
};
use crate::error::RequestError;

pub type Reply<T> = mpsc::Sender<T>;

// StationCommand is an enum that represents the requests the station task can serve.
#[derive(Debug)]
pub enum StationCommand {
    Readings {
        resp: Reply<Vec<Option<f64>>>,
    },
    DailyReport {
        day: usize,
        resp: Reply<Result<DailyReport, RequestError>>,
    },
    Record {
        day: usize,
        temperature: f64,
        resp: Reply<Result<DailyReport, RequestError>>,
    },
    Remove {
        day: usize,
        resp: Reply<Result<DailyReport, RequestError>>,
    },
    Extremes {
        resp: Reply<Extremes>,
    },
    Summary {
        resp: Reply<Summary>,
    },
    RangeStats {
        start: usize,
        end: usize,
        resp: Reply<Result<RangeStats, RequestError>>,
    },
    AdjustRange {
        start: usize,
        end: usize,
        delta: f64,
        resp: Reply<Result<RangeStats, RequestError>>,
    },
    Alerts {
        threshold: f64,
        mode: ThresholdMode,
        resp: Reply<Alerts>,
    },
    MovingAverages {
        k: usize,
        resp: Reply<Vec<f64>>,
    },
}

// StationManager owns the station; every read and write goes through its single task,
// which keeps the tree's multi-step updates serialized.
pub struct StationManager {
    pub station_tx: mpsc::Sender<StationCommand>,
    station_rx: mpsc::Receiver<StationCommand>,
    station: WeatherStation,
}

impl StationManager {
    pub fn new(station: WeatherStation, capacity: usize) -> Self {
        let (station_tx, station_rx) = mpsc::channel(capacity.max(1));
        StationManager {
            station_tx,
            station_rx,
            station,
        }
    }

    pub async fn run(self) {
        let StationManager {
            station_tx,
            mut station_rx,
            mut station,
        } = self;
        info!(days = station.days(), "weather station task started");
        // Drop our own sender so the loop ends once every handle is gone.
        drop(station_tx);
        while let Some(command) = station_rx.recv().await {
            Self::handle(&mut station, command).await;
        }
        info!("weather station task stopped");
    }

    async fn handle(station: &mut WeatherStation, command: StationCommand) {
        let delivered = match command {
            StationCommand::Readings { resp } => resp.send(station.readings()).await.is_ok(),
            StationCommand::DailyReport { day, resp } => {
                resp.send(station.daily_report(day)).await.is_ok()
            }
            StationCommand::Record {
                day,
                temperature,
                resp,
            } => {
                let result = station.record(day, temperature);
                if result.is_ok() {
                    info!(day, temperature, "day updated");
                }
                resp.send(result).await.is_ok()
            }
            StationCommand::Remove { day, resp } => {
                let result = station.remove(day);
                if result.is_ok() {
                    info!(day, "day removed");
                }
                resp.send(result).await.is_ok()
            }
            StationCommand::Extremes { resp } => resp.send(station.extremes()).await.is_ok(),
            StationCommand::Summary { resp } => resp.send(station.summary()).await.is_ok(),
            StationCommand::RangeStats { start, end, resp } => {
                resp.send(station.range_stats(start, end)).await.is_ok()
            }
            StationCommand::AdjustRange {
                start,
                end,
                delta,
                resp,
            } => {
                let result = station.adjust_range(start, end, delta);
                if result.is_ok() {
                    info!(start, end, delta, "range adjusted");
                }
                resp.send(result).await.is_ok()
            }
            StationCommand::Alerts {
                threshold,
                mode,
                resp,
            } => resp
                .send(station.threshold_alerts(threshold, mode))
                .await
                .is_ok(),
            StationCommand::MovingAverages { k, resp } => {
                resp.send(station.moving_averages(k)).await.is_ok()
            }
        };

        if !delivered {
            warn!("requester went away before the reply was sent");
        }
    }
}
