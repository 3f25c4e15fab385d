//! Orchestrator module for the roster pipeline.
//!
//! Drives a roster row stream through graph writes and the index batcher.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use roster_repository::GraphStore;
use roster_shared::{Alias, IndexDocument, Organization, Person};
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::consumer::{ColumnIndex, Record};
use crate::errors::IngestionError;
use crate::loader::IndexBatcher;
use crate::processor::EntityFactory;

/// Stops an ingestion run between rows.
#[derive(Debug, Clone, Default)]
pub struct IngestControl {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl IngestControl {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Stop once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Outcome of a completed or cancelled ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    /// Data rows taken from the stream.
    pub rows_read: usize,
    /// Rows whose organization and person reached the graph store.
    pub rows_committed: usize,
    /// Rows skipped because they failed validation.
    pub rows_rejected: usize,
    /// One-based number of the last committed data row.
    pub last_committed_row: Option<usize>,
    /// Documents written to the search index during the run.
    pub documents_indexed: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl IngestionReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            rows_read: 0,
            rows_committed: 0,
            rows_rejected: 0,
            last_committed_row: None,
            documents_indexed: 0,
            cancelled: false,
            started_at,
            finished_at: started_at,
        }
    }
}

/// Reads roster rows and keeps both stores in step with them.
///
/// For each row the organization is written to the graph and queued for the
/// `membership` alias, then the person is written and queued for `people`.
/// Pending documents are drained whenever the run ends.
pub struct IngestionPipeline {
    graph: Arc<dyn GraphStore>,
    factory: EntityFactory,
    batcher: IndexBatcher,
}

impl IngestionPipeline {
    pub fn new(graph: Arc<dyn GraphStore>, factory: EntityFactory, batcher: IndexBatcher) -> Self {
        Self {
            graph,
            factory,
            batcher,
        }
    }

    pub fn batcher(&self) -> &IndexBatcher {
        &self.batcher
    }

    /// Ingest a stream whose first record is the header row.
    pub async fn ingest<S>(&mut self, records: S) -> Result<IngestionReport, IngestionError>
    where
        S: Stream<Item = Result<Record, IngestionError>> + Unpin + Send,
    {
        self.ingest_with(records, &IngestControl::default()).await
    }

    /// Ingest a stream, stopping between rows when `control` says so.
    ///
    /// A cancelled run still drains pending documents and returns a report
    /// with `cancelled` set. A failed graph write, flush or source read stops
    /// the run with [`IngestionError::PartialIngestion`].
    #[instrument(skip_all)]
    pub async fn ingest_with<S>(
        &mut self,
        mut records: S,
        control: &IngestControl,
    ) -> Result<IngestionReport, IngestionError>
    where
        S: Stream<Item = Result<Record, IngestionError>> + Unpin + Send,
    {
        let mut report = IngestionReport::new(Utc::now());

        let header = match records.next().await {
            Some(header) => header?,
            None => return Err(IngestionError::configuration("Missing header row")),
        };
        let columns = ColumnIndex::from_header(&header)?;

        info!("Starting roster ingestion");

        let mut halted = None;
        loop {
            if control.is_stopped() {
                info!(rows = report.rows_read, "Ingestion cancelled");
                report.cancelled = true;
                break;
            }
            let Some(item) = records.next().await else {
                break;
            };
            report.rows_read += 1;
            let row = report.rows_read;

            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    halted = Some(e);
                    break;
                }
            };

            let (organization, person) = match self.factory.from_record(&columns, &record) {
                Ok(entities) => entities,
                Err(e) => {
                    warn!(row, error = %e, "Skipping invalid row");
                    report.rows_rejected += 1;
                    continue;
                }
            };

            match self.write_row(&organization, &person, control).await {
                Ok(indexed) => {
                    report.documents_indexed += indexed;
                    report.rows_committed += 1;
                    report.last_committed_row = Some(row);
                }
                Err(e) => {
                    error!(row, error = %e, "Row write failed");
                    halted = Some(e);
                    break;
                }
            }
        }

        let drained = self.batcher.drain().await;
        if let Ok(indexed) = &drained {
            report.documents_indexed += indexed;
        }
        report.finished_at = Utc::now();

        let cause = match (halted, drained) {
            (None, Ok(_)) => {
                info!(
                    read = report.rows_read,
                    committed = report.rows_committed,
                    rejected = report.rows_rejected,
                    indexed = report.documents_indexed,
                    "Roster ingestion complete"
                );
                return Ok(report);
            }
            (None, Err(e)) => IngestionError::Flush(e),
            (Some(cause), drained) => {
                if let Err(e) = drained {
                    error!(error = %e, "Failed to drain pending documents");
                }
                while records.next().await.is_some() {
                    report.rows_read += 1;
                }
                cause
            }
        };

        Err(IngestionError::PartialIngestion {
            committed: report.rows_committed,
            total: report.rows_read,
            last_committed_row: report.last_committed_row,
            cause: Box::new(cause),
        })
    }

    async fn write_row(
        &mut self,
        organization: &Organization,
        person: &Person,
        control: &IngestControl,
    ) -> Result<usize, IngestionError> {
        self.graph.upsert_organization(organization).await?;
        let mut indexed = self
            .stage(Alias::Membership, IndexDocument::from(organization), control)
            .await?;

        self.graph.upsert_person(person).await?;
        indexed += self
            .stage(Alias::People, IndexDocument::from(person), control)
            .await?;

        Ok(indexed)
    }

    /// Queue a document and flush a full batch unless the run is stopping,
    /// in which case the final drain picks it up.
    async fn stage(
        &mut self,
        alias: Alias,
        document: IndexDocument,
        control: &IngestControl,
    ) -> Result<usize, IngestionError> {
        if self.batcher.enqueue(alias, document) && !control.is_stopped() {
            return Ok(self.batcher.flush(alias).await?);
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::csv_records;
    use crate::loader::BatcherConfig;
    use crate::testing::{stores, InMemoryGraph, InMemorySearch};
    use futures::stream;
    use roster_repository::BackendError;
    use std::time::Duration;

    const HEADER: &str = "group_id,group,id,name,sort_name,email";

    fn pipeline(
        graph: &Arc<InMemoryGraph>,
        search: &Arc<InMemorySearch>,
        batch_size: usize,
    ) -> IngestionPipeline {
        IngestionPipeline::new(
            graph.clone(),
            EntityFactory::new(),
            IndexBatcher::with_config(search.clone(), BatcherConfig { batch_size }),
        )
    }

    fn roster(rows: &[&str]) -> String {
        let mut data = String::from(HEADER);
        for row in rows {
            data.push('\n');
            data.push_str(row);
        }
        data
    }

    fn generated(count: usize) -> String {
        let rows: Vec<String> = (0..count)
            .map(|i| format!("g{},Group {},p{i},Person {i},P {i},p{i}@example.com", i % 3, i % 3))
            .collect();
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        roster(&rows)
    }

    #[tokio::test]
    async fn test_two_row_roster() {
        let (graph, search, _) = stores();
        let mut pipeline = pipeline(&graph, &search, 100);
        let data = roster(&[
            "g1,Red,p1,Ann,\"B, Ann\",ann@example.com",
            "g2,Blue,p2,Bob,\"C, Bob\",bob@example.com",
        ]);

        let report = pipeline.ingest(csv_records(data.as_bytes())).await.unwrap();

        assert_eq!(report.rows_committed, 2);
        assert_eq!(report.last_committed_row, Some(2));
        assert!(!report.cancelled);
        assert_eq!(graph.organization_count(), 2);
        assert_eq!(graph.person_count(), 2);
        assert_eq!(search.document_count(Alias::Membership), 2);
        assert_eq!(search.document_count(Alias::People), 2);

        let ann = search.document(Alias::People, "p1").unwrap();
        assert_eq!(ann.body["alias"], "B, Ann");
        assert_eq!(ann.body["nationality"], "GB (Great Britain)");

        let ann = graph.find_person("p1").await.unwrap().unwrap();
        assert_eq!(ann.membership().group_id(), "g1");
        let bob = graph.find_person("p2").await.unwrap().unwrap();
        assert_eq!(bob.membership().group_id(), "g2");
    }

    #[tokio::test]
    async fn test_write_order_per_row() {
        let (graph, search, log) = stores();
        let mut pipeline = pipeline(&graph, &search, 1);
        let data = roster(&["g1,Red,p1,Ann,Ann B,ann@example.com"]);

        pipeline.ingest(csv_records(data.as_bytes())).await.unwrap();

        assert_eq!(
            log.entries(),
            vec![
                "graph.upsert_organization:g1",
                "search.bulk_index:membership:1",
                "search.refresh:membership",
                "graph.upsert_person:p1",
                "search.bulk_index:people:1",
                "search.refresh:people",
            ]
        );
    }

    #[tokio::test]
    async fn test_batches_of_one_hundred() {
        let (graph, search, _) = stores();
        let mut pipeline = pipeline(&graph, &search, 100);
        let data = generated(250);

        let report = pipeline.ingest(csv_records(data.as_bytes())).await.unwrap();

        let people: Vec<usize> = search
            .bulk_sizes()
            .into_iter()
            .filter(|(alias, _)| *alias == Alias::People)
            .map(|(_, size)| size)
            .collect();
        assert_eq!(people, vec![100, 100, 50]);
        assert_eq!(report.documents_indexed, 500);
        assert_eq!(search.document_count(Alias::People), 250);
        assert_eq!(search.document_count(Alias::Membership), 3);
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let (graph, search, _) = stores();
        let data = generated(20);

        for _ in 0..2 {
            let mut pipeline = pipeline(&graph, &search, 100);
            pipeline.ingest(csv_records(data.as_bytes())).await.unwrap();
        }

        assert_eq!(graph.organization_count(), 3);
        assert_eq!(graph.person_count(), 20);
        assert_eq!(search.document_count(Alias::Membership), 3);
        assert_eq!(search.document_count(Alias::People), 20);
    }

    #[tokio::test]
    async fn test_invalid_rows_are_skipped() {
        let (graph, search, log) = stores();
        let mut pipeline = pipeline(&graph, &search, 100);
        let data = roster(&[
            ",Red,p1,Ann,Ann B,ann@example.com",
            "g2,Blue,p2,Bob,Bob C,bob@example.com",
            "g3,Green,p3,Cat",
        ]);

        let report = pipeline.ingest(csv_records(data.as_bytes())).await.unwrap();

        assert_eq!(report.rows_read, 3);
        assert_eq!(report.rows_rejected, 2);
        assert_eq!(report.rows_committed, 1);
        assert_eq!(report.last_committed_row, Some(2));
        assert!(!log
            .entries()
            .iter()
            .any(|entry| entry.ends_with(":g1") || entry.ends_with(":g3")));
    }

    #[tokio::test]
    async fn test_missing_column_is_fatal() {
        let (graph, search, log) = stores();
        let mut pipeline = pipeline(&graph, &search, 100);
        let data = "group_id,group,id,name,email\ng1,Red,p1,Ann,ann@example.com";

        let err = pipeline.ingest(csv_records(data.as_bytes())).await.unwrap_err();

        assert!(matches!(err, IngestionError::Configuration(_)));
        assert!(log.entries().is_empty());
    }

    #[tokio::test]
    async fn test_empty_stream_is_fatal() {
        let (graph, search, _) = stores();
        let mut pipeline = pipeline(&graph, &search, 100);
        let err = pipeline
            .ingest(stream::empty::<Result<Record, IngestionError>>())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_graph_failure_drains_and_reports_partial() {
        let (graph, search, _) = stores();
        graph.fail("upsert_person", 2, BackendError::request("connection reset"));
        let mut pipeline = pipeline(&graph, &search, 100);
        let data = generated(5);

        let err = pipeline.ingest(csv_records(data.as_bytes())).await.unwrap_err();

        match err {
            IngestionError::PartialIngestion {
                committed,
                total,
                last_committed_row,
                cause,
            } => {
                assert_eq!(committed, 2);
                assert_eq!(total, 5);
                assert_eq!(last_committed_row, Some(2));
                assert!(matches!(*cause, IngestionError::Graph(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Documents batched before the failure were still flushed.
        assert_eq!(search.document_count(Alias::People), 2);
        assert_eq!(search.document_count(Alias::Membership), 3);

        // Re-running the same file once the store recovers completes the roster.
        graph.heal("upsert_person");
        let mut rerun = self::pipeline(&graph, &search, 100);
        let report = rerun.ingest(csv_records(data.as_bytes())).await.unwrap();

        assert_eq!(report.rows_committed, 5);
        assert_eq!(graph.organization_count(), 3);
        assert_eq!(graph.person_count(), 5);
        assert_eq!(search.document_count(Alias::People), 5);
        assert_eq!(search.document_count(Alias::Membership), 3);
    }

    #[tokio::test]
    async fn test_drain_failure_reports_partial() {
        let (graph, search, _) = stores();
        search.fail("bulk_index", 0, BackendError::request("timeout"));
        let mut pipeline = pipeline(&graph, &search, 100);
        let data = generated(3);

        let err = pipeline.ingest(csv_records(data.as_bytes())).await.unwrap_err();

        match err {
            IngestionError::PartialIngestion {
                committed, cause, ..
            } => {
                assert_eq!(committed, 3);
                assert!(matches!(*cause, IngestionError::Flush(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(pipeline.batcher().pending(Alias::People), 3);
    }

    #[tokio::test]
    async fn test_source_error_reports_partial() {
        let (graph, search, _) = stores();
        let mut pipeline = pipeline(&graph, &search, 100);
        let header: Record = HEADER.split(',').map(str::to_string).collect();
        let row: Record = "g1,Red,p1,Ann,Ann B,ann@example.com"
            .split(',')
            .map(str::to_string)
            .collect();
        let records = stream::iter(vec![
            Ok(header),
            Ok(row),
            Err(IngestionError::source(2, "invalid UTF-8")),
        ]);

        let err = pipeline.ingest(records).await.unwrap_err();

        match err {
            IngestionError::PartialIngestion {
                committed,
                total,
                cause,
                ..
            } => {
                assert_eq!((committed, total), (1, 2));
                assert!(matches!(*cause, IngestionError::Source { row: 2, .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_run_drains() {
        let (graph, search, _) = stores();
        let mut pipeline = pipeline(&graph, &search, 100);
        let control = IngestControl::new(CancellationToken::new());
        control.token().cancel();
        let data = generated(5);

        let report = pipeline
            .ingest_with(csv_records(data.as_bytes()), &control)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.rows_committed, 0);
        assert_eq!(graph.person_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_mid_row_defers_flush_to_drain() {
        let (graph, search, log) = stores();
        let mut pipeline = pipeline(&graph, &search, 1);
        let control = IngestControl::new(CancellationToken::new());
        let data = roster(&[
            "g1,Red,p1,Ann,Ann B,ann@example.com",
            "g2,Blue,p2,Bob,Bob C,bob@example.com",
        ]);
        graph.cancel_on_write(control.token().clone());

        let report = pipeline
            .ingest_with(csv_records(data.as_bytes()), &control)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.rows_committed, 1);
        assert_eq!(report.last_committed_row, Some(1));
        assert_eq!(
            log.entries(),
            vec![
                "graph.upsert_organization:g1",
                "graph.upsert_person:p1",
                "search.bulk_index:membership:1",
                "search.refresh:membership",
                "search.bulk_index:people:1",
                "search.refresh:people",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_stops_run() {
        let (graph, search, _) = stores();
        let mut pipeline = pipeline(&graph, &search, 100);
        let control = IngestControl::default().with_deadline(Instant::now() + Duration::from_secs(1));
        tokio::time::advance(Duration::from_secs(2)).await;
        let data = generated(5);

        let report = pipeline
            .ingest_with(csv_records(data.as_bytes()), &control)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.rows_read, 0);
    }
}
