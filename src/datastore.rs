use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DatasetError, RequestError};
use crate::segment::{Aggregate, RangeAggregateTree};

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DayReading {
    pub day: usize,
    pub temperature: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DailyReport {
    pub day: usize,
    pub temperature: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Extremes {
    pub hottest: Option<DayReading>,
    pub coldest: Option<DayReading>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub average: Option<f64>,
    pub count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RangeStats {
    pub start: usize,
    pub end: usize,
    pub max: Option<DayReading>,
    pub min: Option<DayReading>,
    pub average: Option<f64>,
    pub count: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    Above,
    Below,
}

impl ThresholdMode {
    fn matches(&self, temperature: f64, threshold: f64) -> bool {
        match self {
            Self::Above => temperature > threshold,
            Self::Below => temperature < threshold,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Alerts {
    pub threshold: f64,
    pub mode: ThresholdMode,
    pub days: Vec<DayReading>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(aggregate: &Aggregate) -> Option<f64> {
    (!aggregate.is_empty()).then(|| round2(aggregate.sum / aggregate.count as f64))
}

fn extreme(value: f64, index: Option<usize>) -> Option<DayReading> {
    index.map(|day| DayReading {
        day,
        temperature: value,
    })
}

/// Reads one integer temperature per row, skipping the header line.
pub fn parse_readings<R: Read>(reader: R) -> Result<Vec<Option<f64>>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut readings = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let field = record.get(0).map(str::trim).unwrap_or_default();
        if field.is_empty() {
            return Err(DatasetError::MissingValue { line });
        }
        let value: i64 = field.parse().map_err(|_| DatasetError::InvalidReading {
            line,
            value: field.to_string(),
        })?;
        readings.push(Some(value as f64));
    }

    if readings.is_empty() {
        return Err(DatasetError::Empty);
    }
    Ok(readings)
}

pub fn load_readings(path: &Path) -> Result<Vec<Option<f64>>, DatasetError> {
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let readings = parse_readings(file)?;
    info!(path = %path.display(), days = readings.len(), "loaded temperature readings");
    Ok(readings)
}

// WeatherStation validates day numbers and turns tree aggregates into reports.
pub struct WeatherStation {
    tree: RangeAggregateTree,
}

impl WeatherStation {
    pub fn new(readings: &[Option<f64>]) -> Self {
        WeatherStation {
            tree: RangeAggregateTree::build(readings),
        }
    }

    pub fn days(&self) -> usize {
        self.tree.len()
    }

    fn check_day(&self, day: usize) -> Result<(), RequestError> {
        if day < self.days() {
            Ok(())
        } else {
            Err(RequestError::InvalidDay {
                day,
                days: self.days(),
            })
        }
    }

    fn check_range(&self, start: usize, end: usize) -> Result<(), RequestError> {
        if start <= end && end < self.days() {
            Ok(())
        } else {
            Err(RequestError::InvalidRange {
                start,
                end,
                days: self.days(),
            })
        }
    }

    pub fn record(&mut self, day: usize, temperature: f64) -> Result<DailyReport, RequestError> {
        self.check_day(day)?;
        self.tree.update_point(day, Some(temperature));
        debug!(day, temperature, "recorded reading");
        self.daily_report(day)
    }

    pub fn remove(&mut self, day: usize) -> Result<DailyReport, RequestError> {
        self.check_day(day)?;
        self.tree.update_point(day, None);
        debug!(day, "removed reading");
        self.daily_report(day)
    }

    pub fn daily_report(&self, day: usize) -> Result<DailyReport, RequestError> {
        self.check_day(day)?;
        Ok(DailyReport {
            day,
            temperature: self.tree.get(day),
        })
    }

    pub fn readings(&self) -> Vec<Option<f64>> {
        self.tree.values()
    }

    fn whole_year(&mut self) -> Aggregate {
        if self.tree.is_empty() {
            return Aggregate::empty();
        }
        let last = self.days() - 1;
        self.tree.query(0, last)
    }

    pub fn extremes(&mut self) -> Extremes {
        let year = self.whole_year();
        Extremes {
            hottest: extreme(year.max_value, year.max_index),
            coldest: extreme(year.min_value, year.min_index),
        }
    }

    pub fn summary(&mut self) -> Summary {
        let year = self.whole_year();
        Summary {
            average: average(&year),
            count: year.count,
        }
    }

    pub fn range_stats(&mut self, start: usize, end: usize) -> Result<RangeStats, RequestError> {
        self.check_range(start, end)?;
        let result = self.tree.query(start, end);
        Ok(RangeStats {
            start,
            end,
            max: extreme(result.max_value, result.max_index),
            min: extreme(result.min_value, result.min_index),
            average: average(&result),
            count: result.count,
        })
    }

    pub fn adjust_range(
        &mut self,
        start: usize,
        end: usize,
        delta: f64,
    ) -> Result<RangeStats, RequestError> {
        self.check_range(start, end)?;
        self.tree.update_range_add(start, end, delta);
        debug!(start, end, delta, "adjusted range");
        self.range_stats(start, end)
    }

    /// Days strictly above or below `threshold`, in day order. Absent days never match.
    pub fn threshold_alerts(&self, threshold: f64, mode: ThresholdMode) -> Alerts {
        let days = self
            .readings()
            .into_iter()
            .enumerate()
            .filter_map(|(day, temperature)| {
                temperature
                    .filter(|t| mode.matches(*t, threshold))
                    .map(|temperature| DayReading { day, temperature })
            })
            .collect();
        Alerts {
            threshold,
            mode,
            days,
        }
    }

    /// Centered moving average over `[day - k, day + k]`, clipped to the year.
    /// Windows without any reading report 0.
    pub fn moving_averages(&mut self, k: usize) -> Vec<f64> {
        let days = self.days();
        (0..days)
            .map(|day| {
                let start = day.saturating_sub(k);
                let end = day.saturating_add(k).min(days - 1);
                average(&self.tree.query(start, end)).unwrap_or(0.0)
            })
            .collect()
    }
}
