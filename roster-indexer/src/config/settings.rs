//! Settings read from the environment at start-up.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use roster_pipeline::BatcherConfig;
use roster_repository::{GraphSettings, RetryPolicy, SearchSettings};

use crate::IndexingError;

pub const BACKEND_RETRY_ATTEMPTS: &str = "BACKEND_RETRY_ATTEMPTS";
pub const BACKEND_RETRY_BACKOFF_SECS: &str = "BACKEND_RETRY_BACKOFF_SECS";
pub const INDEX_BATCH_SIZE: &str = "INDEX_BATCH_SIZE";

/// Everything the indexer needs to build its dependencies.
///
/// Credential files are only located here; they are read when a backend
/// connection is first attempted.
#[derive(Debug, Clone)]
pub struct IndexerSettings {
    pub graph: GraphSettings,
    pub search: SearchSettings,
    pub retry: RetryPolicy,
    pub batcher: BatcherConfig,
}

impl IndexerSettings {
    /// Load settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `NEO4J_URI_FILE`, `NEO4J_USER_FILE`, `NEO4J_PASSWORD_FILE`: files
    ///   holding the graph store connection
    /// - `OPENSEARCH_URI_FILE`: file holding the search engine URL
    ///   (`ELASTIC_URI_FILE` is read when it is unset)
    /// - `BACKEND_RETRY_ATTEMPTS`: connection attempts per backend (default: 5)
    /// - `BACKEND_RETRY_BACKOFF_SECS`: pause between attempts (default: 5)
    /// - `INDEX_BATCH_SIZE`: documents per bulk request (default: 100)
    pub fn from_env() -> Result<Self, IndexingError> {
        let tunables = Tunables::from_lookup(|key| env::var(key).ok())?;
        Ok(Self {
            graph: GraphSettings::from_env(),
            search: SearchSettings::from_env(),
            retry: tunables.retry,
            batcher: tunables.batcher,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Tunables {
    retry: RetryPolicy,
    batcher: BatcherConfig,
}

impl Tunables {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IndexingError> {
        let defaults = RetryPolicy::default();
        let attempts = parse(&lookup, BACKEND_RETRY_ATTEMPTS, defaults.max_attempts)?;
        let backoff = parse(&lookup, BACKEND_RETRY_BACKOFF_SECS, defaults.backoff.as_secs())?;
        let batch_size = parse(&lookup, INDEX_BATCH_SIZE, BatcherConfig::default().batch_size)?;

        if attempts == 0 {
            return Err(IndexingError::config(format!(
                "{BACKEND_RETRY_ATTEMPTS} must be at least 1"
            )));
        }
        if batch_size == 0 {
            return Err(IndexingError::config(format!(
                "{INDEX_BATCH_SIZE} must be at least 1"
            )));
        }

        Ok(Self {
            retry: RetryPolicy::new(attempts, Duration::from_secs(backoff)),
            batcher: BatcherConfig { batch_size },
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, IndexingError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| IndexingError::config(format!("{key} is not a valid number: {raw}"))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tunables(vars: &[(&str, &str)]) -> Result<Tunables, IndexingError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Tunables::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let tunables = tunables(&[]).unwrap();
        assert_eq!(tunables.retry.max_attempts, 5);
        assert_eq!(tunables.retry.backoff, Duration::from_secs(5));
        assert_eq!(tunables.batcher.batch_size, 100);
    }

    #[test]
    fn test_overrides() {
        let tunables = tunables(&[
            (BACKEND_RETRY_ATTEMPTS, "3"),
            (BACKEND_RETRY_BACKOFF_SECS, "0"),
            (INDEX_BATCH_SIZE, " 250 "),
        ])
        .unwrap();
        assert_eq!(tunables.retry.max_attempts, 3);
        assert_eq!(tunables.retry.backoff, Duration::ZERO);
        assert_eq!(tunables.batcher.batch_size, 250);
    }

    #[test]
    fn test_invalid_values() {
        let err = tunables(&[(INDEX_BATCH_SIZE, "many")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: INDEX_BATCH_SIZE is not a valid number: many"
        );
        assert!(tunables(&[(BACKEND_RETRY_ATTEMPTS, "0")]).is_err());
        assert!(tunables(&[(BACKEND_RETRY_BACKOFF_SECS, "-1")]).is_err());
    }
}
