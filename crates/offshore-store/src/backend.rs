use async_trait::async_trait;
use offshore_models::Table;

use crate::error::GatewayError;
use crate::query::{Query, Record};

/// Row-level access to the research store. Mockable for testing.
///
/// Implementations validate column names against the schema and report every
/// failure as a [`GatewayError`]; none of them retry.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, GatewayError>;

    /// Insert one row and return it as stored (with its generated id).
    async fn insert(&self, table: Table, record: Record) -> Result<Record, GatewayError>;

    /// Apply a partial update to the row with `id`.
    async fn update(&self, table: Table, id: i64, patch: Record) -> Result<Record, GatewayError>;

    /// Insert, or update the row that already holds the same `conflict_key` values.
    async fn upsert(
        &self,
        table: Table,
        record: Record,
        conflict_key: &[&str],
    ) -> Result<Record, GatewayError>;

    async fn delete(&self, table: Table, id: i64) -> Result<(), GatewayError>;

    /// Replace every row whose `parent_column` equals `parent_id` with `records`.
    ///
    /// Must never leave the parent with zero children because of a failure
    /// half-way through: either the old set or the new set survives.
    async fn replace_children(
        &self,
        table: Table,
        parent_column: &str,
        parent_id: i64,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, GatewayError>;
}
