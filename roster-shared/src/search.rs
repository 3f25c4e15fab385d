//! Search request and response types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A search against one alias.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free text in simple query string syntax. `None` matches everything.
    pub text: Option<String>,
    /// Offset of the first hit.
    pub from: usize,
    /// Maximum number of hits.
    pub size: usize,
}

impl SearchQuery {
    pub const DEFAULT_SIZE: usize = 10;

    pub fn match_all() -> Self {
        Self {
            text: None,
            from: 0,
            size: Self::DEFAULT_SIZE,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            text: if text.trim().is_empty() { None } else { Some(text) },
            from: 0,
            size: Self::DEFAULT_SIZE,
        }
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }
}

/// A single matching document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: Option<f64>,
    pub source: BTreeMap<String, String>,
}

/// Hits plus the total match count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total: u64,
    pub hits: Vec<SearchHit>,
}

impl SearchResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}
