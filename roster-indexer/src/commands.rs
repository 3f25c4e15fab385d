//! Sub-command implementations.

use std::fs::File;
use std::path::Path;

use roster_pipeline::{spawn_csv_reader, IngestControl, IngestionReport, Statistics};
use roster_shared::{Alias, SearchQuery, SearchResponse};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{Dependencies, IndexingError};

/// Load a roster CSV file into both stores.
///
/// Cancelling `cancel` stops the run after the current row.
pub async fn import(
    deps: &Dependencies,
    path: &Path,
    cancel: CancellationToken,
) -> Result<IngestionReport, IndexingError> {
    let file = File::open(path)?;
    info!(path = %path.display(), "Importing roster");

    deps.ensure_aliases().await?;
    let mut pipeline = deps.pipeline();
    let report = pipeline
        .ingest_with(spawn_csv_reader(file), &IngestControl::new(cancel))
        .await?;
    Ok(report)
}

pub async fn search(
    deps: &Dependencies,
    alias: Alias,
    text: Option<String>,
    size: usize,
) -> Result<SearchResponse, IndexingError> {
    let query = match text {
        Some(text) => SearchQuery::text(text),
        None => SearchQuery::match_all(),
    }
    .with_size(size);
    Ok(deps.catalog.search(alias, &query).await?)
}

pub async fn stats(deps: &Dependencies) -> Result<Statistics, IndexingError> {
    Ok(deps.catalog.statistics().await?)
}

/// Render a search response as printed by the `search` command.
pub fn format_hits(response: &SearchResponse) -> Vec<String> {
    let mut lines = vec![format!("Hits: {}", response.total)];
    for hit in &response.hits {
        let source = serde_json::to_string(&hit.source).unwrap_or_default();
        match hit.score {
            Some(score) => lines.push(format!("{} ({score:.3}) {source}", hit.id)),
            None => lines.push(format!("{} {source}", hit.id)),
        }
    }
    lines
}
