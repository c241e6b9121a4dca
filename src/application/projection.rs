// Projection engine - Pure views of a parsed snapshot for one selected key
use crate::domain::error::{Result, TelemetryError};
use crate::domain::record::SeriesRecord;
use crate::domain::telemetry::{ChartData, SeriesData, TimeSeriesPoint};
use std::collections::HashSet;

/// Row with the latest timestamp for `selection`. Ties go to the row
/// inserted last.
pub fn latest<'a, R: SeriesRecord>(rows: &'a [R], selection: &str) -> Result<&'a R> {
    rows.iter()
        .filter(|r| r.key() == selection)
        .max_by_key(|r| r.time())
        .ok_or_else(|| TelemetryError::no_data(selection))
}

/// "Current conditions" text for the selected key
pub fn summary<R: SeriesRecord>(rows: &[R], selection: &str) -> Result<String> {
    latest(rows, selection).map(|r| r.summary_text())
}

/// All rows for `selection` in table order, which is insertion order and
/// therefore ascending by timestamp.
pub fn filtered_rows<R: SeriesRecord>(rows: &[R], selection: &str) -> Vec<R> {
    rows.iter()
        .filter(|r| r.key() == selection)
        .cloned()
        .collect()
}

/// Most recent row of every key, newest first
pub fn latest_per_key<R: SeriesRecord>(rows: &[R]) -> Vec<R> {
    let mut newest_first: Vec<&R> = rows.iter().collect();
    // reversed first so the stable sort favours later insertions on ties
    newest_first.reverse();
    newest_first.sort_by(|a, b| b.time().cmp(&a.time()));

    let mut seen = HashSet::new();
    newest_first
        .into_iter()
        .filter(|r| seen.insert(r.key().to_string()))
        .cloned()
        .collect()
}

/// `(timestamp, value)` pairs of one metric for `selection`, ascending by
/// timestamp. Rows without a value for the metric are skipped.
pub fn series<R: SeriesRecord>(rows: &[R], selection: &str, metric: &str) -> Vec<TimeSeriesPoint> {
    let mut points: Vec<(chrono::NaiveDateTime, f64)> = rows
        .iter()
        .filter(|r| r.key() == selection)
        .filter_map(|r| r.metric(metric).map(|v| (r.time(), v)))
        .collect();
    points.sort_by_key(|(time, _)| *time);
    points
        .into_iter()
        .map(|(time, value)| TimeSeriesPoint::at(time, value))
        .collect()
}

/// Line chart of one metric. Fails with `NoDataForKey` when the key has no
/// rows at all.
pub fn chart<R: SeriesRecord>(rows: &[R], selection: &str, metric: &str) -> Result<ChartData> {
    if !rows.iter().any(|r| r.key() == selection) {
        return Err(TelemetryError::no_data(selection));
    }
    let spec = R::metric_spec(metric)
        .ok_or_else(|| TelemetryError::Config(format!("unknown metric {metric}")))?;

    let points = series(rows, selection, metric);
    Ok(ChartData::new(
        metric.to_string(),
        format!("Continuous {} ({})", spec.title, spec.unit),
        Some(spec.unit.to_string()),
        vec![SeriesData::new(
            selection.to_string(),
            selection.to_string(),
            points,
        )],
    ))
}

/// Chart caption; depends on the selection only
pub fn caption<R: SeriesRecord>(selection: &str, metric: &str) -> Result<String> {
    let spec = R::metric_spec(metric)
        .ok_or_else(|| TelemetryError::Config(format!("unknown metric {metric}")))?;
    Ok(format!(
        "Recent {} ({}) for {}.\nUpdated once per polling interval.\nKeeps the most recent readings only.",
        spec.title, spec.unit, selection
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ingestor::tests::minute;
    use crate::domain::stock::StockQuote;

    fn row(key: &str, t: u32, v: f64) -> StockQuote {
        StockQuote::new(key, &key.to_uppercase(), v, minute(t))
    }

    fn table() -> Vec<StockQuote> {
        vec![row("A", 1, 10.0), row("A", 2, 20.0), row("B", 1, 5.0)]
    }

    #[test]
    fn test_filtered_rows_and_summary() {
        let rows = filtered_rows(&table(), "A");
        assert_eq!(rows, vec![row("A", 1, 10.0), row("A", 2, 20.0)]);

        let table = table();
        let newest = latest(&table, "A").unwrap();
        assert_eq!(newest.time, minute(2));
        assert_eq!(newest.regular_market_price, 20.0);
        assert!(summary(&table, "A").unwrap().contains("$20.00"));
    }

    #[test]
    fn test_summary_without_rows() {
        assert_eq!(
            summary(&table(), "C").unwrap_err(),
            TelemetryError::no_data("C")
        );
        assert!(filtered_rows(&table(), "C").is_empty());
    }

    #[test]
    fn test_latest_uses_max_timestamp_not_position() {
        let rows = vec![row("A", 5, 50.0), row("A", 3, 30.0)];
        assert_eq!(latest(&rows, "A").unwrap().regular_market_price, 50.0);
    }

    #[test]
    fn test_series_sorted_ascending() {
        let rows = vec![row("A", 4, 4.0), row("B", 1, 9.0), row("A", 2, 2.0)];
        let points = series(&rows, "A", "RegularMarketPrice");
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![2.0, 4.0]);
        assert!(points[0].time_ms < points[1].time_ms);
        assert!(series(&rows, "A", "Humidity").is_empty());
    }

    #[test]
    fn test_latest_per_key() {
        let rows = vec![row("A", 1, 1.0), row("B", 2, 2.0), row("A", 3, 3.0)];
        assert_eq!(latest_per_key(&rows), vec![row("A", 3, 3.0), row("B", 2, 2.0)]);
    }

    #[test]
    fn test_chart_and_caption() {
        let chart = chart(&table(), "A", "RegularMarketPrice").unwrap();
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].points.len(), 2);
        assert_eq!(chart.title, "Continuous Regular Market Price (USD)");

        assert!(matches!(
            super::chart(&table(), "Z", "RegularMarketPrice"),
            Err(TelemetryError::NoDataForKey { .. })
        ));
        assert!(
            caption::<StockQuote>("A", "RegularMarketPrice")
                .unwrap()
                .starts_with("Recent Regular Market Price (USD) for A.")
        );
    }
}
