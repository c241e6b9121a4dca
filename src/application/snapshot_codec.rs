// Snapshot codec port - Rows to published bytes and back
use crate::domain::error::Result;

pub trait SnapshotCodec<R>: Send + Sync {
    /// Serialize the whole table. An empty table still carries its schema.
    fn encode(&self, rows: &[R]) -> Result<Vec<u8>>;

    /// Fails with `CorruptSnapshot` when the body cannot be read as a table
    fn decode(&self, body: &[u8]) -> Result<Vec<R>>;
}
