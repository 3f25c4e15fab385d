//! Connection settings for the graph store and the search engine.
//!
//! Locations and credentials are never passed as raw environment values.
//! Each one is an environment variable naming a file whose contents hold the
//! actual secret. The variable is captured when settings are built, but the
//! file is only read when a connection is attempted, so a missing input is
//! reported on first use.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::BackendError;

/// Variable naming the file with the Neo4j bolt URI.
pub const NEO4J_URI_FILE: &str = "NEO4J_URI_FILE";
/// Variable naming the file with the Neo4j user.
pub const NEO4J_USER_FILE: &str = "NEO4J_USER_FILE";
/// Variable naming the file with the Neo4j password.
pub const NEO4J_PASSWORD_FILE: &str = "NEO4J_PASSWORD_FILE";
/// Variable naming the file with the OpenSearch URL.
pub const OPENSEARCH_URI_FILE: &str = "OPENSEARCH_URI_FILE";
/// Older name for [`OPENSEARCH_URI_FILE`], still honored when that one is unset.
pub const ELASTIC_URI_FILE: &str = "ELASTIC_URI_FILE";

/// A secret read from the file an environment variable points at.
#[derive(Debug, Clone)]
pub struct SecretFile {
    env_var: &'static str,
    path: Option<PathBuf>,
}

impl SecretFile {
    pub fn new(env_var: &'static str, path: Option<PathBuf>) -> Self {
        Self { env_var, path }
    }

    /// Capture the path currently held by `env_var`, if any.
    pub fn from_env(env_var: &'static str) -> Self {
        Self::new(env_var, env::var_os(env_var).map(PathBuf::from))
    }

    /// Take the first of `candidates` that `lookup` resolves. When none is set
    /// the secret reports the first name as missing.
    pub fn first_set<F>(candidates: &[&'static str], lookup: F) -> Self
    where
        F: Fn(&str) -> Option<PathBuf>,
    {
        candidates
            .iter()
            .find_map(|&name| lookup(name).map(|path| Self::new(name, Some(path))))
            .unwrap_or_else(|| Self::new(candidates.first().copied().unwrap_or_default(), None))
    }

    pub fn env_var(&self) -> &'static str {
        self.env_var
    }

    pub fn is_set(&self) -> bool {
        self.path.is_some()
    }

    /// Read and trim the secret.
    pub fn read(&self) -> Result<String, BackendError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| BackendError::configuration(format!("{} is not set", self.env_var)))?;

        let contents = fs::read_to_string(path).map_err(|e| {
            BackendError::configuration(format!(
                "Failed to read {} ({}): {}",
                self.env_var,
                path.display(),
                e
            ))
        })?;

        let value = contents.trim();
        if value.is_empty() {
            return Err(BackendError::configuration(format!(
                "{} ({}) is empty",
                self.env_var,
                path.display()
            )));
        }
        Ok(value.to_string())
    }
}

fn ensure_all_set(backend: &str, files: &[&SecretFile]) -> Result<(), BackendError> {
    let missing: Vec<&str> = files
        .iter()
        .filter(|f| !f.is_set())
        .map(|f| f.env_var())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(BackendError::configuration(format!(
        "{} initialization error, please verify environment: {}",
        backend,
        missing.join(", ")
    )))
}

/// Resolved Neo4j connection inputs.
#[derive(Clone)]
pub struct GraphCredentials {
    pub uri: String,
    pub user: String,
    pub password: String,
}

/// Where to find the Neo4j connection inputs.
#[derive(Debug, Clone)]
pub struct GraphSettings {
    pub uri: SecretFile,
    pub user: SecretFile,
    pub password: SecretFile,
}

impl GraphSettings {
    pub fn from_env() -> Self {
        Self {
            uri: SecretFile::from_env(NEO4J_URI_FILE),
            user: SecretFile::from_env(NEO4J_USER_FILE),
            password: SecretFile::from_env(NEO4J_PASSWORD_FILE),
        }
    }

    pub fn resolve(&self) -> Result<GraphCredentials, BackendError> {
        ensure_all_set("Neo4j", &[&self.uri, &self.user, &self.password])?;
        Ok(GraphCredentials {
            uri: self.uri.read()?,
            user: self.user.read()?,
            password: self.password.read()?,
        })
    }
}

/// Where to find the OpenSearch URL.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub uri: SecretFile,
}

impl SearchSettings {
    pub fn from_env() -> Self {
        Self {
            uri: SecretFile::first_set(&[OPENSEARCH_URI_FILE, ELASTIC_URI_FILE], |name| {
                env::var_os(name).map(PathBuf::from)
            }),
        }
    }

    pub fn resolve(&self) -> Result<String, BackendError> {
        ensure_all_set("OpenSearch", &[&self.uri])?;
        self.uri.read()
    }
}

/// Retry budget for a [`crate::BackendClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts tolerated before the client gives up.
    pub max_attempts: u32,
    /// Fixed pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}
