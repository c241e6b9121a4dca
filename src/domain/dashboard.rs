// Derived view domain models
use super::error::TelemetryError;
use super::telemetry::ChartData;
use serde::Serialize;

/// Output of one projection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViewOutput<R> {
    Text { text: String },
    Table { rows: Vec<R> },
    Chart(ChartData),
}

/// What a sink should display for a view
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState<R> {
    Ready { output: ViewOutput<R> },
    /// Nothing published yet
    Waiting,
    NoData { key: String },
}

impl<R> ViewState<R> {
    /// Maps reader-side errors to explicit display states. Internal faults
    /// have no display state and are returned unchanged.
    pub fn from_error(err: TelemetryError) -> Result<Self, TelemetryError> {
        match err {
            TelemetryError::NotInitialized => Ok(Self::Waiting),
            TelemetryError::NoDataForKey { key } => Ok(Self::NoData { key }),
            other => Err(other),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// One named view as delivered to a sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedView<R> {
    pub name: String,
    pub selection: String,
    /// Snapshot version the view was computed from, if any
    pub version: Option<u64>,
    pub state: ViewState<R>,
    /// Set when served from the last good snapshot after a parse failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

/// Every declared view of a session at one refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard<R> {
    pub session_id: u64,
    pub selection: String,
    pub version: Option<u64>,
    pub views: Vec<RenderedView<R>>,
}
