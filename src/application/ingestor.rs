// Bounded window ingestor - Polls every key and republishes the rolling window
use crate::application::sampler::Sampler;
use crate::application::snapshot_codec::SnapshotCodec;
use crate::application::snapshot_store::{SnapshotStore, SnapshotVersion};
use crate::application::source_resolver::SourceResolver;
use crate::domain::error::{Result, TelemetryError};
use crate::domain::record::SeriesRecord;
use crate::domain::window::SampleWindow;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub interval: Duration,
    pub max_rounds: u32,
    /// readings_per_key × number of keys
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestorState {
    Idle,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyFailure {
    pub key: String,
    pub cause: String,
}

/// Samples gathered in one round, before they touch the window
#[derive(Debug)]
pub struct RoundSamples<R> {
    pub samples: Vec<R>,
    pub failures: Vec<KeyFailure>,
}

/// Result of one round, after publish
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundReport {
    pub round: u32,
    pub sampled: Vec<String>,
    pub failures: Vec<KeyFailure>,
    pub evicted: usize,
    pub window_len: usize,
    pub version: SnapshotVersion,
}

impl RoundReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct Ingestor<S: Sampler> {
    sampler: Arc<S>,
    resolver: Arc<SourceResolver<S::Params>>,
    store: Arc<dyn SnapshotStore>,
    codec: Arc<dyn SnapshotCodec<S::Record>>,
    window: SampleWindow<S::Record>,
    settings: IngestSettings,
    state: IngestorState,
    rounds_completed: u32,
}

impl<S: Sampler> Ingestor<S> {
    pub fn new(
        sampler: Arc<S>,
        resolver: Arc<SourceResolver<S::Params>>,
        store: Arc<dyn SnapshotStore>,
        codec: Arc<dyn SnapshotCodec<S::Record>>,
        settings: IngestSettings,
    ) -> Self {
        let window = SampleWindow::new(settings.capacity);
        Self {
            sampler,
            resolver,
            store,
            codec,
            window,
            settings,
            state: IngestorState::Idle,
            rounds_completed: 0,
        }
    }

    pub fn state(&self) -> IngestorState {
        self.state
    }

    pub fn rounds_completed(&self) -> u32 {
        self.rounds_completed
    }

    pub fn window(&self) -> &SampleWindow<S::Record> {
        &self.window
    }

    /// Idle -> Running. Publishes an empty table with the schema header when
    /// the store has never been published to.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != IngestorState::Idle {
            return Err(TelemetryError::Config(format!(
                "ingestor cannot start from {:?}",
                self.state
            )));
        }

        if self.store.current_version().is_none() {
            let body = self.codec.encode(&[])?;
            let version = self.store.publish(body).await?;
            tracing::info!(%version, "initialized empty snapshot");
        }

        self.state = IngestorState::Running;
        tracing::info!(
            keys = self.resolver.len(),
            capacity = self.settings.capacity,
            interval_secs = self.settings.interval.as_secs_f64(),
            max_rounds = self.settings.max_rounds,
            "ingestor running"
        );
        Ok(())
    }

    /// Sample every key concurrently. Results come back in configured key
    /// order; a failed key only contributes a `KeyFailure`.
    pub async fn sample_round(&self) -> RoundSamples<S::Record> {
        let fetches = self.resolver.entries().map(|(key, params)| {
            let sampler = self.sampler.clone();
            async move { (key, sampler.sample(key, params).await) }
        });

        let mut samples = Vec::new();
        let mut failures = Vec::new();
        for (key, outcome) in join_all(fetches).await {
            match outcome {
                Ok(sample) => samples.push(sample),
                Err(err) => {
                    tracing::warn!(key, error = %err, "sample skipped this round");
                    let cause = match err {
                        TelemetryError::SampleUnavailable { cause, .. } => cause,
                        other => other.to_string(),
                    };
                    failures.push(KeyFailure {
                        key: key.to_string(),
                        cause,
                    });
                }
            }
        }

        RoundSamples { samples, failures }
    }

    /// Fold one round into the window and publish the result
    pub async fn apply_round(&mut self, round: RoundSamples<S::Record>) -> Result<RoundReport> {
        let sampled: Vec<String> = round.samples.iter().map(|s| s.key().to_string()).collect();
        let evicted = self.window.extend_round(round.samples);

        let body = self.codec.encode(&self.window.to_vec())?;
        let version = self.store.publish(body).await?;
        self.rounds_completed += 1;

        let report = RoundReport {
            round: self.rounds_completed,
            sampled,
            failures: round.failures,
            evicted,
            window_len: self.window.len(),
            version,
        };
        tracing::info!(
            round = report.round,
            sampled = report.sampled.len(),
            failed = report.failures.len(),
            evicted = report.evicted,
            window_len = report.window_len,
            %version,
            "round published"
        );
        Ok(report)
    }

    pub async fn run_round(&mut self) -> Result<RoundReport> {
        let round = self.sample_round().await;
        self.apply_round(round).await
    }

    /// Run until `max_rounds` rounds are published. Any error here is an
    /// internal fault: the ingestor moves to `Aborted` and stays there.
    pub async fn run(&mut self) -> Result<Vec<RoundReport>> {
        match self.run_inner().await {
            Ok(reports) => {
                self.state = IngestorState::Completed;
                tracing::info!(rounds = self.rounds_completed, "ingestor completed");
                Ok(reports)
            }
            Err(err) => {
                self.state = IngestorState::Aborted;
                tracing::error!(rounds = self.rounds_completed, error = %err, "ingestor aborted");
                Err(err)
            }
        }
    }

    async fn run_inner(&mut self) -> Result<Vec<RoundReport>> {
        self.start().await?;

        let mut reports = Vec::with_capacity(self.settings.max_rounds as usize);
        while self.rounds_completed < self.settings.max_rounds {
            reports.push(self.run_round().await?);
            if self.rounds_completed < self.settings.max_rounds {
                tokio::time::sleep(self.settings.interval).await;
            }
        }
        Ok(reports)
    }
}
