//! Streaming document assembly and batch upload.
//!
//! Rows arrive sorted by item; [`IteratorState`] groups them into one
//! document per item and into fixed-size batches, [`DocumentRenderer`]
//! renders each item through the field-kind hooks, and [`BatchUploader`]
//! sends batches to the search engine. [`DocumentIndexer`] ties them
//! together over a row stream.

pub mod indexer;
mod proptests;
pub mod render;
pub mod state;
pub mod uploader;

pub use indexer::DocumentIndexer;
pub use render::{DocumentRenderer, Render};
pub use state::{IndexCounts, IteratorState, Step};
pub use uploader::BatchUploader;
