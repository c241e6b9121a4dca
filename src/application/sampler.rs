// Sampler trait for obtaining one sample per key
use crate::domain::error::Result;
use crate::domain::record::SeriesRecord;
use async_trait::async_trait;

#[async_trait]
pub trait Sampler: Send + Sync {
    /// Fetch parameters produced by the source resolver
    type Params: Send + Sync;

    type Record: SeriesRecord;

    /// Obtain one sample for `key`. Transport and parse failures surface as
    /// `TelemetryError::SampleUnavailable` and only affect this key.
    async fn sample(&self, key: &str, params: &Self::Params) -> Result<Self::Record>;
}
