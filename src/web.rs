use axum::extract::{Json, Path, Query};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::datastore::{Alerts, DailyReport, Extremes, RangeStats, Summary, ThresholdMode};
use crate::error::RequestError;
use crate::manager::{Reply, StationCommand};

// RecordRequest is the body of PUT /days/:day.
#[derive(Deserialize)]
pub struct RecordRequest {
    pub temperature: f64,
}

// RangeRequest holds the query parameters of GET /range.
#[derive(Deserialize)]
pub struct RangeRequest {
    pub start: usize,
    pub end: usize,
}

// AdjustRangeRequest is the body of POST /range/adjust.
#[derive(Deserialize)]
pub struct AdjustRangeRequest {
    pub start: usize,
    pub end: usize,
    pub delta: f64,
}

#[derive(Deserialize)]
pub struct AlertsRequest {
    pub threshold: f64,
    pub mode: ThresholdMode,
}

#[derive(Deserialize)]
pub struct MovingAverageRequest {
    pub k: usize,
}

#[derive(Serialize)]
pub struct ReadingsResponse {
    pub days: usize,
    pub temperatures: Vec<Option<f64>>,
}

#[derive(Serialize)]
pub struct MovingAverageResponse {
    pub k: usize,
    pub averages: Vec<f64>,
}

type ApiResult<T> = Result<Json<T>, RequestError>;

// RouterHandle is a struct that holds the station_tx sender and forwards requests to the station.
#[derive(Clone)]
pub struct RouterHandle {
    pub station_tx: mpsc::Sender<StationCommand>,
}

impl RouterHandle {
    pub fn new(station_tx: mpsc::Sender<StationCommand>) -> Self {
        RouterHandle { station_tx }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> StationCommand,
    ) -> Result<T, RequestError> {
        let (resp_tx, mut resp_rx) = mpsc::channel(1);
        self.station_tx
            .send(command(resp_tx))
            .await
            .map_err(|_| RequestError::StationUnavailable)?;
        resp_rx.recv().await.ok_or(RequestError::StationUnavailable)
    }

    pub async fn handle_readings(self) -> ApiResult<ReadingsResponse> {
        let temperatures = self
            .request(|resp| StationCommand::Readings { resp })
            .await?;
        Ok(Json(ReadingsResponse {
            days: temperatures.len(),
            temperatures,
        }))
    }

    pub async fn handle_daily_report(self, Path(day): Path<usize>) -> ApiResult<DailyReport> {
        self.request(|resp| StationCommand::DailyReport { day, resp })
            .await?
            .map(Json)
    }

    pub async fn handle_record(
        self,
        Path(day): Path<usize>,
        Json(payload): Json<RecordRequest>,
    ) -> ApiResult<DailyReport> {
        self.request(|resp| StationCommand::Record {
            day,
            temperature: payload.temperature,
            resp,
        })
        .await?
        .map(Json)
    }

    pub async fn handle_remove(self, Path(day): Path<usize>) -> ApiResult<DailyReport> {
        self.request(|resp| StationCommand::Remove { day, resp })
            .await?
            .map(Json)
    }

    pub async fn handle_extremes(self) -> ApiResult<Extremes> {
        self.request(|resp| StationCommand::Extremes { resp })
            .await
            .map(Json)
    }

    pub async fn handle_summary(self) -> ApiResult<Summary> {
        self.request(|resp| StationCommand::Summary { resp })
            .await
            .map(Json)
    }

    pub async fn handle_range(self, Query(params): Query<RangeRequest>) -> ApiResult<RangeStats> {
        self.request(|resp| StationCommand::RangeStats {
            start: params.start,
            end: params.end,
            resp,
        })
        .await?
        .map(Json)
    }

    pub async fn handle_adjust_range(
        self,
        Json(payload): Json<AdjustRangeRequest>,
    ) -> ApiResult<RangeStats> {
        self.request(|resp| StationCommand::AdjustRange {
            start: payload.start,
            end: payload.end,
            delta: payload.delta,
            resp,
        })
        .await?
        .map(Json)
    }

    pub async fn handle_alerts(self, Query(params): Query<AlertsRequest>) -> ApiResult<Alerts> {
        self.request(|resp| StationCommand::Alerts {
            threshold: params.threshold,
            mode: params.mode,
            resp,
        })
        .await
        .map(Json)
    }

    pub async fn handle_moving_average(
        self,
        Query(params): Query<MovingAverageRequest>,
    ) -> ApiResult<MovingAverageResponse> {
        let k = params.k;
        let averages = self
            .request(|resp| StationCommand::MovingAverages { k, resp })
            .await?;
        Ok(Json(MovingAverageResponse { k, averages }))
    }
}

pub fn router(handle: RouterHandle) -> Router {
    let readings = handle.clone();
    let report = handle.clone();
    let record = handle.clone();
    let remove = handle.clone();
    let extremes = handle.clone();
    let summary = handle.clone();
    let range = handle.clone();
    let adjust = handle.clone();
    let alerts = handle.clone();
    let moving_average = handle;

    Router::new()
        .route("/days", get(move || readings.handle_readings()))
        .route(
            "/days/:day",
            get(move |day| report.handle_daily_report(day))
                .put(move |day, body| record.handle_record(day, body))
                .delete(move |day| remove.handle_remove(day)),
        )
        .route("/extremes", get(move || extremes.handle_extremes()))
        .route("/summary", get(move || summary.handle_summary()))
        .route("/range", get(move |req| range.handle_range(req)))
        .route(
            "/range/adjust",
            post(move |req| adjust.handle_adjust_range(req)),
        )
        .route("/alerts", get(move |req| alerts.handle_alerts(req)))
        .route(
            "/moving_average",
            get(move |req| moving_average.handle_moving_average(req)),
        )
}
