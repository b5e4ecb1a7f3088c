//! Sources of item-value rows.
//!
//! A [`RowSource`] runs a projection statement and streams its rows. Rows
//! that cannot be decoded are yielded as [`FetchedRow::Malformed`] so the
//! indexer can count and skip them; a stream `Err` means the query or the
//! connection failed and the run cannot continue.

use std::sync::Mutex;

use futures::stream::{self, BoxStream, StreamExt};
use sift_core::{Error, ItemValueRow, Result};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

/// One element of a row stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedRow {
    /// A decoded row.
    Row(ItemValueRow),
    /// A row that failed to decode, with the reason.
    Malformed(String),
}

/// Stream of fetched rows.
pub type RowStream<'a> = BoxStream<'a, Result<FetchedRow>>;

/// Executes projection statements.
pub trait RowSource: Send + Sync {
    /// Run `sql` and stream its rows in result order.
    fn fetch<'a>(&'a self, sql: &'a str) -> RowStream<'a>;
}

// ============================================================================
// Postgres
// ============================================================================

/// Row source over a `sqlx` Postgres pool.
#[derive(Debug, Clone)]
pub struct PgRowSource {
    pool: PgPool,
}

impl PgRowSource {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a new pool.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| Error::database_with_source("failed to connect", e))?;
        Ok(Self::new(pool))
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode(row: &PgRow) -> FetchedRow {
    let decoded = (|| -> std::result::Result<ItemValueRow, sqlx::Error> {
        Ok(ItemValueRow {
            item_id: row.try_get("item_id")?,
            field_name: row.try_get("field_name")?,
            field_value: row.try_get("field_value")?,
            place: row.try_get("place")?,
            revision: row.try_get("revision")?,
            language: row.try_get("language")?,
        })
    })();
    match decoded {
        Ok(row) => FetchedRow::Row(row),
        Err(e) => FetchedRow::Malformed(e.to_string()),
    }
}

impl RowSource for PgRowSource {
    fn fetch<'a>(&'a self, sql: &'a str) -> RowStream<'a> {
        sqlx::query(sql)
            .fetch(&self.pool)
            .map(|result| match result {
                Ok(row) => Ok(decode(&row)),
                Err(e) => Err(Error::database_with_source("projection query failed", e)),
            })
            .boxed()
    }
}

// ============================================================================
// Static
// ============================================================================

#[derive(Debug, Clone)]
enum Canned {
    Row(ItemValueRow),
    Malformed(String),
    Failure(String),
}

/// Row source replaying canned rows, for tests.
///
/// Every statement it receives is recorded.
#[derive(Debug, Default)]
pub struct StaticRowSource {
    entries: Vec<Canned>,
    statements: Mutex<Vec<String>>,
}

impl StaticRowSource {
    /// Replay `rows`.
    pub fn new(rows: Vec<ItemValueRow>) -> Self {
        Self {
            entries: rows.into_iter().map(Canned::Row).collect(),
            statements: Mutex::default(),
        }
    }

    /// A source whose query fails immediately.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::default().then_fail(message)
    }

    /// Append a decoded row.
    pub fn then_row(mut self, row: ItemValueRow) -> Self {
        self.entries.push(Canned::Row(row));
        self
    }

    /// Append a row that fails to decode.
    pub fn then_malformed(mut self, reason: impl Into<String>) -> Self {
        self.entries.push(Canned::Malformed(reason.into()));
        self
    }

    /// Append a connection failure.
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.entries.push(Canned::Failure(message.into()));
        self
    }

    /// Statements received so far.
    pub fn statements(&self) -> Vec<String> {
        self.statements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl RowSource for StaticRowSource {
    fn fetch<'a>(&'a self, sql: &'a str) -> RowStream<'a> {
        self.statements
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(sql.to_string());

        stream::iter(self.entries.iter().map(|entry| match entry {
            Canned::Row(row) => Ok(FetchedRow::Row(row.clone())),
            Canned::Malformed(reason) => Ok(FetchedRow::Malformed(reason.clone())),
            Canned::Failure(message) => Err(Error::database(message.clone())),
        }))
        .boxed()
    }
}

// ============================================================================
// Tests
// ============================================================================
