// Source resolver - Maps logical keys to fetch parameters
use crate::domain::error::{Result, TelemetryError};

/// Fixed, ordered key enumeration supplied at startup
#[derive(Debug, Clone)]
pub struct SourceResolver<P> {
    entries: Vec<(String, P)>,
}

impl<P> SourceResolver<P> {
    /// Fails on an empty or duplicated key set
    pub fn new(entries: Vec<(String, P)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(TelemetryError::Config("key set is empty".to_string()));
        }
        for (i, (key, _)) in entries.iter().enumerate() {
            if entries[..i].iter().any(|(seen, _)| seen == key) {
                return Err(TelemetryError::Config(format!("duplicate key: {key}")));
            }
        }
        Ok(Self { entries })
    }

    pub fn resolve(&self, key: &str) -> Result<&P> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, params)| params)
            .ok_or_else(|| TelemetryError::unknown_key(key))
    }

    /// Keys in configured order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &P)> {
        self.entries.iter().map(|(k, p)| (k.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
