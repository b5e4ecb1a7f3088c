//! The indexing driver.
//!
//! [`DocumentIndexer`] feeds a sorted row stream through the
//! [`IteratorState`] transitions and uploads every batch they hand out.
//! Row, document, and batch failures are counted and logged; only a failing
//! stream (query or connection) aborts the run.

use futures::StreamExt;
use sift_core::{Error, Result};
use sift_sql::{FetchedRow, RowSource, RowStream};

use crate::render::DocumentRenderer;
use crate::state::{IndexCounts, IteratorState, Step};
use crate::uploader::BatchUploader;

/// Drives rows into documents and documents into the search engine.
#[derive(Debug, Clone)]
pub struct DocumentIndexer {
    renderer: DocumentRenderer,
    uploader: BatchUploader,
    batch_size: usize,
}

impl DocumentIndexer {
    /// Create an indexer uploading `batch_size` documents per call.
    pub fn new(renderer: DocumentRenderer, uploader: BatchUploader, batch_size: usize) -> Self {
        Self {
            renderer,
            uploader,
            batch_size,
        }
    }

    /// The document renderer.
    pub fn renderer(&self) -> &DocumentRenderer {
        &self.renderer
    }

    /// Run `sql` against `source` and index the result.
    pub async fn index(&self, source: &dyn RowSource, sql: &str) -> Result<IndexCounts> {
        self.index_rows(source.fetch(sql)).await
    }

    /// Index a row stream sorted by `(item_id, field_name, place)`.
    pub async fn index_rows(&self, mut rows: RowStream<'_>) -> Result<IndexCounts> {
        let mut state = IteratorState::new(self.batch_size);

        while let Some(fetched) = rows.next().await {
            state = match fetched? {
                FetchedRow::Row(row) => {
                    let step = state.accept_row(row, &self.renderer);
                    self.settle(step).await
                }
                FetchedRow::Malformed(reason) => {
                    tracing::warn!(
                        item = state.current_item.as_deref().unwrap_or(""),
                        reason = %reason,
                        "skipping row that failed to scan"
                    );
                    state.row_failed()
                }
            };
        }

        let step = state.finish(&self.renderer);
        let counts = self.settle(step).await.counts;
        report(&counts);

        if counts.rows == 0 && counts.row_failures > 0 {
            return Err(Error::AllRowsFailed {
                rows: counts.row_failures,
            });
        }
        Ok(counts)
    }

    async fn settle(&self, step: Step) -> IteratorState {
        let Step {
            state,
            ready,
            document_error,
        } = step;

        if let Some(e) = document_error {
            tracing::warn!(error = %e, "skipping document that failed to build");
        }

        match ready {
            None => state,
            Some(batch) => match self.uploader.upload(&batch).await {
                Ok(()) => state.batch_uploaded(batch.len()),
                Err(e) => {
                    tracing::warn!(
                        documents = batch.len(),
                        error = %e,
                        "discarding batch that failed to upload"
                    );
                    state.batch_failed()
                }
            },
        }
    }
}

fn report(counts: &IndexCounts) {
    tracing::info!(
        rows = counts.rows,
        documents = counts.documents,
        batches = counts.batches,
        documents_uploaded = counts.documents_uploaded,
        "indexing run finished"
    );
    if counts.has_failures() {
        tracing::warn!(
            row_failures = counts.row_failures,
            doc_failures = counts.doc_failures,
            batch_failures = counts.batch_failures,
            "indexing run had failures"
        );
    }
}

// ============================================================================
// Tests
// ============================================================================
