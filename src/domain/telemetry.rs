// Chart data domain models
use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub time_ms: i64,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }

    pub fn at(time: NaiveDateTime, value: f64) -> Self {
        Self::new(time.and_utc().timestamp_millis(), value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesData {
    pub id: String,
    pub name: String,
    pub points: Vec<TimeSeriesPoint>,
}

impl SeriesData {
    pub fn new(id: String, name: String, points: Vec<TimeSeriesPoint>) -> Self {
        Self { id, name, points }
    }
}

/// Line chart for one metric of the selected key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub id: String,
    pub title: String,
    pub unit: Option<String>,
    pub series: Vec<SeriesData>,
}

impl ChartData {
    pub fn new(id: String, title: String, unit: Option<String>, series: Vec<SeriesData>) -> Self {
        Self {
            id,
            title,
            unit,
            series,
        }
    }
}
