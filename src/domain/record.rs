// Typed snapshot rows shared by every sampled domain
use chrono::{NaiveDateTime, SubsecRound};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Format of the `Time` column in persisted snapshots
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A chartable numeric column of a record type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSpec {
    pub name: &'static str,
    pub title: &'static str,
    pub unit: &'static str,
}

/// One immutable sample row. Implemented once per domain (weather, stock).
pub trait SeriesRecord:
    Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + Sync + 'static
{
    /// Header row, in serialization order
    const COLUMNS: &'static [&'static str];

    /// Columns whose absence makes a snapshot unreadable
    const REQUIRED_COLUMNS: &'static [&'static str];

    /// Metrics that can back a chart or summary line
    const METRICS: &'static [MetricSpec];

    fn key(&self) -> &str;

    fn time(&self) -> NaiveDateTime;

    /// Value of a metric column, `None` when unknown or not recorded
    fn metric(&self, name: &str) -> Option<f64>;

    /// Human readable "current conditions" text
    fn summary_text(&self) -> String;

    fn metric_spec(name: &str) -> Option<&'static MetricSpec> {
        Self::METRICS.iter().find(|m| m.name == name)
    }
}

/// serde adapter for the `Time` column
pub mod time_format {
    use super::TIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Local wall-clock time truncated to whole seconds, as stored in `Time`
pub fn sample_time() -> NaiveDateTime {
    chrono::Local::now().naive_local().trunc_subsecs(0)
}

/// Formats an optional reading for summary lines
pub(crate) fn display_or_dash(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v}"))
}
