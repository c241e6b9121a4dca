// Key service - Use case for listing and validating series keys
use crate::application::source_resolver::SourceResolver;
use crate::domain::error::{Result, TelemetryError};
use std::sync::Arc;

/// Ordered key enumeration, independent of the fetch parameters behind it
pub trait KeySet: Send + Sync {
    fn key_list(&self) -> Vec<&str>;

    /// `UnknownKey` unless the key is enumerated
    fn validate(&self, key: &str) -> Result<()>;
}

impl<P: Send + Sync> KeySet for SourceResolver<P> {
    fn key_list(&self) -> Vec<&str> {
        self.keys().collect()
    }

    fn validate(&self, key: &str) -> Result<()> {
        self.resolve(key).map(|_| ())
    }
}

#[derive(Clone)]
pub struct KeyService {
    keys: Arc<dyn KeySet>,
}

impl KeyService {
    /// Shares the resolver the ingestor fetches with
    pub fn from_resolver<P: Send + Sync + 'static>(resolver: Arc<SourceResolver<P>>) -> Self {
        Self { keys: resolver }
    }

    pub fn list_keys(&self) -> Vec<&str> {
        self.keys.key_list()
    }

    pub fn validate(&self, key: &str) -> Result<()> {
        self.keys.validate(key)
    }

    /// Configured default, or the first key when none is configured
    pub fn default_selection(&self, configured: Option<&str>) -> Result<String> {
        match configured {
            Some(key) => self.validate(key).map(|_| key.to_string()),
            None => self
                .list_keys()
                .first()
                .map(|key| key.to_string())
                .ok_or_else(|| TelemetryError::Config("key set is empty".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beaches() -> KeyService {
        let resolver = SourceResolver::new(vec![
            ("Bondi Beach, Australia".to_string(), (-33.89, 151.27)),
            ("Railay Beach, Thailand".to_string(), (8.01, 98.83)),
        ])
        .unwrap();
        KeyService::from_resolver(Arc::new(resolver))
    }

    #[test]
    fn test_default_selection() {
        let keys = beaches();

        assert_eq!(keys.default_selection(None).unwrap(), "Bondi Beach, Australia");
        assert_eq!(
            keys.default_selection(Some("Railay Beach, Thailand")).unwrap(),
            "Railay Beach, Thailand"
        );
        assert_eq!(
            keys.default_selection(Some("Miami")),
            Err(TelemetryError::unknown_key("Miami"))
        );
    }

    #[test]
    fn test_validate_goes_through_resolver() {
        let keys = beaches();
        assert_eq!(
            keys.list_keys(),
            vec!["Bondi Beach, Australia", "Railay Beach, Thailand"]
        );
        assert!(keys.validate("Railay Beach, Thailand").is_ok());
        assert_eq!(
            keys.validate("railay beach, thailand"),
            Err(TelemetryError::unknown_key("railay beach, thailand"))
        );
    }
}
