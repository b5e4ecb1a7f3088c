//! Relational side of Sift: the projection statement that yields every
//! value to index, and the row sources that execute it.
//!
//! - [`ident`]: allow-list validation of interpolated names
//! - [`projection`]: [`ProjectionRequest`] and [`ProjectionBuilder`]
//! - [`source`]: the [`RowSource`] trait, [`PgRowSource`], [`StaticRowSource`]

pub mod ident;
pub mod projection;
pub mod source;

pub use projection::{ProjectionBuilder, ProjectionRequest, build_projection_sql};
pub use source::{FetchedRow, PgRowSource, RowSource, RowStream, StaticRowSource};
