//! Assembler state and its transitions.
//!
//! [`IteratorState`] is threaded through the row stream by value: every
//! transition consumes the state and returns the next one, together with a
//! batch that is ready for upload and the document error, if any. No
//! transition performs I/O.
//!
//! ```text
//! no item open --row--> item open --row of next item--> item closing
//!      ^                                                   |
//!      |                      batch full                   v
//!      +------------------- batch closing <----------------+
//! ```

use sift_core::{Error, ItemValueRow};

use crate::render::Render;

/// Counters of one indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexCounts {
    /// Rows decoded and assigned to an item.
    pub rows: usize,
    /// Rows that failed to decode.
    pub row_failures: usize,
    /// Documents rendered.
    pub documents: usize,
    /// Items whose document failed to render.
    pub doc_failures: usize,
    /// Batches uploaded.
    pub batches: usize,
    /// Batches whose upload failed.
    pub batch_failures: usize,
    /// Documents in uploaded batches.
    pub documents_uploaded: usize,
}

impl IndexCounts {
    /// Returns `true` if any row, document, or batch failed.
    pub fn has_failures(&self) -> bool {
        self.row_failures > 0 || self.doc_failures > 0 || self.batch_failures > 0
    }
}

/// Running state of the assembler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IteratorState {
    /// Item whose values are being accumulated.
    pub current_item: Option<String>,
    /// Values of the open item.
    pub values: Vec<ItemValueRow>,
    /// Rendered documents awaiting upload.
    pub batch: Vec<String>,
    /// Documents per batch.
    pub batch_size: usize,
    /// Counters so far.
    pub counts: IndexCounts,
}

/// Result of one transition.
#[derive(Debug)]
pub struct Step {
    /// The next state.
    pub state: IteratorState,
    /// A batch to upload now.
    pub ready: Option<Vec<String>>,
    /// Why the item closed by this transition failed to render.
    pub document_error: Option<Error>,
}

impl Step {
    fn idle(state: IteratorState) -> Self {
        Self {
            state,
            ready: None,
            document_error: None,
        }
    }
}

impl IteratorState {
    /// Initial state; a zero batch size is treated as one.
    pub fn new(batch_size: usize) -> Self {
        Self {
            current_item: None,
            values: Vec::new(),
            batch: Vec::new(),
            batch_size: batch_size.max(1),
            counts: IndexCounts::default(),
        }
    }

    /// Accept one decoded row.
    ///
    /// A row of a different item closes the open item first.
    pub fn accept_row(self, row: ItemValueRow, renderer: &dyn Render) -> Step {
        let mut step = if self.current_item.as_deref() == Some(row.item_id.as_str()) {
            Step::idle(self)
        } else {
            let mut step = self.finish_item(renderer);
            step.state.current_item = Some(row.item_id.clone());
            step
        };
        step.state.counts.rows += 1;
        step.state.values.push(row);
        step
    }

    /// Count a row that failed to decode; the open item is untouched.
    pub fn row_failed(mut self) -> Self {
        self.counts.row_failures += 1;
        self
    }

    /// Render the open item, if it has values, and append it to the batch.
    ///
    /// A full batch is handed out as ready.
    pub fn finish_item(mut self, renderer: &dyn Render) -> Step {
        let values = std::mem::take(&mut self.values);
        let item = self.current_item.take();
        let mut document_error = None;

        if let (Some(item), false) = (item, values.is_empty()) {
            match renderer.render(&item, &values) {
                Ok(doc) => {
                    self.batch.push(doc);
                    self.counts.documents += 1;
                }
                Err(e) => {
                    self.counts.doc_failures += 1;
                    document_error = Some(e);
                }
            }
        }

        let ready = if self.batch.len() >= self.batch_size {
            Some(std::mem::take(&mut self.batch))
        } else {
            None
        };
        Step {
            state: self,
            ready,
            document_error,
        }
    }

    /// Close the last item and hand out the last, possibly partial, batch.
    pub fn finish(self, renderer: &dyn Render) -> Step {
        let mut step = self.finish_item(renderer);
        if step.ready.is_none() && !step.state.batch.is_empty() {
            step.ready = Some(std::mem::take(&mut step.state.batch));
        }
        step
    }

    /// Record a successful upload of `documents` documents.
    pub fn batch_uploaded(mut self, documents: usize) -> Self {
        self.counts.batches += 1;
        self.counts.documents_uploaded += documents;
        self
    }

    /// Record a failed upload; the batch's documents are dropped.
    pub fn batch_failed(mut self) -> Self {
        self.counts.batch_failures += 1;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
