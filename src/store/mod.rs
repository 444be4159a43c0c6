//! Table service client library
//!
//! The gateway stores every record in a hosted relational backend and only ever
//! issues single filtered select/insert/update/delete calls against it. This
//! module defines that contract as the [`TableService`] trait and provides three
//! implementations:
//!
//! - [`RestTableService`] talks to a PostgREST endpoint (Supabase) over HTTPS
//! - [`PgTableService`] talks to Postgres directly through a connection pool
//! - [`MemoryTableService`] keeps tables in process memory, for tests and local runs
//!
//! # Quick Start
//!
//! ```no_run
//! use journey_gateway::store::{RestTableService, SelectQuery, TableService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RestTableService::new("https://project.supabase.co", "anon-key")?;
//!
//!     let goals = store
//!         .select("goals", SelectQuery::new().eq("user_id", "user-1").order_by("created"))
//!         .await?;
//!     println!("{} goals", goals.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod rest;

use async_trait::async_trait;

pub use error::{Result, StoreError};
pub use memory::MemoryTableService;
pub use postgres::{PgConfig, PgTableService};
pub use query::{Filter, Row, SelectQuery};
pub use rest::RestTableService;

/// Filtered access to named tables
///
/// Rows are JSON objects keyed by column name. Implementations own transaction
/// semantics; callers issue exactly one call per operation.
#[async_trait]
pub trait TableService: Send + Sync {
    /// Select every row matching all filters, optionally ordered ascending
    async fn select(&self, table: &str, query: SelectQuery) -> Result<Vec<Row>>;

    /// Insert one row and return it as stored (including server-assigned columns)
    async fn insert(&self, table: &str, record: Row) -> Result<Row>;

    /// Apply `changes` to every row matching all filters and return the updated rows
    async fn update(&self, table: &str, filters: Vec<Filter>, changes: Row) -> Result<Vec<Row>>;

    /// Delete every row matching all filters
    async fn delete(&self, table: &str, filters: Vec<Filter>) -> Result<()>;
}

/// Check that a table or column name is a plain identifier
///
/// Names end up in URLs and SQL text, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}
