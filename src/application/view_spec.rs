// View declarations - Which projection a view runs and which inputs trigger it
use crate::application::projection;
use crate::domain::dashboard::ViewOutput;
use crate::domain::error::{Result, TelemetryError};
use crate::domain::record::SeriesRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reactive input a view can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewInput {
    Snapshot,
    Selection,
}

/// One declared view as written in configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ViewConfig {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<ViewInput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Summary,
    Table,
    /// Latest row of every key
    Latest,
    Chart { metric: String },
    Caption { metric: String },
}

impl Projection {
    /// Inputs the projection actually reads
    pub fn reads(&self) -> &'static [ViewInput] {
        match self {
            Self::Summary | Self::Table | Self::Chart { .. } => {
                &[ViewInput::Snapshot, ViewInput::Selection]
            }
            Self::Latest => &[ViewInput::Snapshot],
            Self::Caption { .. } => &[ViewInput::Selection],
        }
    }

    fn metric(&self) -> Option<&str> {
        match self {
            Self::Chart { metric } | Self::Caption { metric } => Some(metric),
            _ => None,
        }
    }
}

/// A named view with its declared dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSpec {
    name: String,
    projection: Projection,
    depends_on: Vec<ViewInput>,
}

impl ViewSpec {
    /// Rejects declarations whose inputs differ from what the projection
    /// reads, and metrics the record type does not have.
    pub fn new<R: SeriesRecord>(
        name: &str,
        projection: Projection,
        depends_on: &[ViewInput],
    ) -> Result<Self> {
        let mut declared = depends_on.to_vec();
        declared.sort();
        declared.dedup();

        if declared.as_slice() != projection.reads() {
            return Err(TelemetryError::Config(format!(
                "view {name}: declared inputs {declared:?} but projection reads {:?}",
                projection.reads()
            )));
        }
        if let Some(metric) = projection.metric() {
            if R::metric_spec(metric).is_none() {
                return Err(TelemetryError::Config(format!(
                    "view {name}: unknown metric {metric}"
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            projection,
            depends_on: declared,
        })
    }

    pub fn from_config<R: SeriesRecord>(config: &ViewConfig) -> Result<Self> {
        let metric = || {
            config.metric.clone().ok_or_else(|| {
                TelemetryError::Config(format!("view {}: {} needs a metric", config.name, config.kind))
            })
        };
        let projection = match config.kind.as_str() {
            "summary" => Projection::Summary,
            "table" => Projection::Table,
            "latest" => Projection::Latest,
            "chart" => Projection::Chart { metric: metric()? },
            "caption" => Projection::Caption { metric: metric()? },
            other => {
                return Err(TelemetryError::Config(format!(
                    "view {}: unknown kind {other}",
                    config.name
                )));
            }
        };
        Self::new::<R>(&config.name, projection, &config.depends_on)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depends_on(&self, input: ViewInput) -> bool {
        self.depends_on.contains(&input)
    }

    /// Run the projection. `rows` is ignored by selection-only views.
    pub fn render<R: SeriesRecord>(&self, rows: &[R], selection: &str) -> Result<ViewOutput<R>> {
        Ok(match &self.projection {
            Projection::Summary => ViewOutput::Text {
                text: projection::summary(rows, selection)?,
            },
            Projection::Table => {
                let rows = projection::filtered_rows(rows, selection);
                if rows.is_empty() {
                    return Err(TelemetryError::no_data(selection));
                }
                ViewOutput::Table { rows }
            }
            Projection::Latest => ViewOutput::Table {
                rows: projection::latest_per_key(rows),
            },
            Projection::Chart { metric } => {
                ViewOutput::Chart(projection::chart(rows, selection, metric)?)
            }
            Projection::Caption { metric } => ViewOutput::Text {
                text: projection::caption::<R>(selection, metric)?,
            },
        })
    }
}

/// Build all configured views, rejecting duplicate names
pub fn build_views<R: SeriesRecord>(configs: &[ViewConfig]) -> Result<Vec<ViewSpec>> {
    let mut names = HashSet::new();
    configs
        .iter()
        .map(|config| {
            if !names.insert(config.name.as_str()) {
                return Err(TelemetryError::Config(format!(
                    "duplicate view name {}",
                    config.name
                )));
            }
            ViewSpec::from_config::<R>(config)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::weather::WeatherReading;

    fn view(name: &str, kind: &str, metric: Option<&str>, depends_on: &[ViewInput]) -> ViewConfig {
        ViewConfig {
            name: name.to_string(),
            kind: kind.to_string(),
            metric: metric.map(str::to_string),
            depends_on: depends_on.to_vec(),
        }
    }

    #[test]
    fn test_declared_inputs_must_match() {
        use ViewInput::*;
        assert!(ViewSpec::new::<WeatherReading>("s", Projection::Summary, &[Selection, Snapshot]).is_ok());
        // order and duplicates do not matter
        assert!(ViewSpec::new::<WeatherReading>("s", Projection::Summary, &[Selection, Snapshot, Selection]).is_ok());

        let missing = ViewSpec::new::<WeatherReading>("s", Projection::Summary, &[Snapshot]);
        assert!(matches!(missing, Err(TelemetryError::Config(_))));

        let extra = ViewSpec::new::<WeatherReading>("l", Projection::Latest, &[Snapshot, Selection]);
        assert!(extra.is_err());
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let err = ViewSpec::from_config::<WeatherReading>(&view(
            "c",
            "chart",
            Some("RegularMarketPrice"),
            &[ViewInput::Snapshot, ViewInput::Selection],
        ))
        .unwrap_err();
        assert_eq!(
            err,
            TelemetryError::Config("view c: unknown metric RegularMarketPrice".to_string())
        );
    }

    #[test]
    fn test_build_views() {
        let views = build_views::<WeatherReading>(&[
            view("summary", "summary", None, &[ViewInput::Snapshot, ViewInput::Selection]),
            view("temp_caption", "caption", Some("Temp_F"), &[ViewInput::Selection]),
        ])
        .unwrap();
        assert_eq!(views.len(), 2);
        assert!(!views[1].depends_on(ViewInput::Snapshot));

        let dup = build_views::<WeatherReading>(&[
            view("a", "latest", None, &[ViewInput::Snapshot]),
            view("a", "latest", None, &[ViewInput::Snapshot]),
        ]);
        assert!(dup.is_err());

        let no_metric = build_views::<WeatherReading>(&[view("c", "chart", None, &[])]);
        assert!(no_metric.is_err());
    }
}
