use std::sync::Arc;
use std::time::Duration;

use offshore_cache::QueryCache;
use offshore_models::schema::key_patterns;
use offshore_models::Table;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::backend::Backend;
use crate::error::GatewayError;
use crate::query::{to_record, Query, Record};

/// Typed, cached access to a [`Backend`].
///
/// Reads go through the [`QueryCache`]. Every write drops the cached reads of the
/// written table, and of the tables that join it, before returning, so a read
/// issued right after a write always sees it.
pub struct Gateway {
    backend: Arc<dyn Backend>,
    cache: QueryCache,
    ttl: Duration,
}

impl Gateway {
    pub fn new(backend: Arc<dyn Backend>, cache: QueryCache, ttl: Duration) -> Self {
        Self {
            backend,
            cache,
            ttl,
        }
    }

    /// Run a query and deserialize every row into `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, GatewayError> {
        query.validate()?;
        let key = query.cache_key()?;
        let backend = Arc::clone(&self.backend);
        let records: Vec<Record> = self
            .cache
            .get_or_fetch(&key, self.ttl, move || async move { backend.query(query).await })
            .await?;

        records
            .into_iter()
            .map(|record| serde_json::from_value(Value::Object(record)).map_err(GatewayError::from))
            .collect()
    }

    /// First row of the query, if any.
    pub async fn fetch_first<T: DeserializeOwned>(
        &self,
        query: &Query,
    ) -> Result<Option<T>, GatewayError> {
        Ok(self.fetch(query).await?.into_iter().next())
    }

    /// Row by primary key.
    pub async fn fetch_by_id<T: DeserializeOwned>(
        &self,
        table: Table,
        id: i64,
    ) -> Result<Option<T>, GatewayError> {
        self.fetch_first(&Query::table(table).eq("id", id)).await
    }

    pub async fn insert<N, T>(&self, table: Table, new: &N) -> Result<T, GatewayError>
    where
        N: Serialize,
        T: DeserializeOwned,
    {
        let record = to_record(new)?;
        let result = self.backend.insert(table, record).await;
        self.invalidate(table).await;
        decode(result?)
    }

    pub async fn update<P, T>(&self, table: Table, id: i64, patch: &P) -> Result<T, GatewayError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let record = to_record(patch)?;
        let result = self.backend.update(table, id, record).await;
        self.invalidate(table).await;
        decode(result?)
    }

    pub async fn upsert<N, T>(
        &self,
        table: Table,
        new: &N,
        conflict_key: &[&str],
    ) -> Result<T, GatewayError>
    where
        N: Serialize,
        T: DeserializeOwned,
    {
        let record = to_record(new)?;
        let result = self.backend.upsert(table, record, conflict_key).await;
        self.invalidate(table).await;
        decode(result?)
    }

    pub async fn delete(&self, table: Table, id: i64) -> Result<(), GatewayError> {
        let result = self.backend.delete(table, id).await;
        self.invalidate(table).await;
        result
    }

    /// Atomically replace the children of one parent row.
    pub async fn replace_children<N, T>(
        &self,
        table: Table,
        parent_column: &str,
        parent_id: i64,
        children: &[N],
    ) -> Result<Vec<T>, GatewayError>
    where
        N: Serialize,
        T: DeserializeOwned,
    {
        let records = children
            .iter()
            .map(to_record)
            .collect::<Result<Vec<_>, _>>()?;
        let result = self
            .backend
            .replace_children(table, parent_column, parent_id, records)
            .await;
        self.invalidate(table).await;
        result?.into_iter().map(decode).collect()
    }

    /// Drop cached reads of `table` and of every table holding a foreign key to it,
    /// since those reads may embed `table`'s rows through a join.
    pub async fn invalidate(&self, table: Table) {
        let mut dropped = self
            .cache
            .invalidate_prefix(&key_patterns::table_prefix(table))
            .await;
        for dependent in Table::ALL
            .iter()
            .filter(|t| **t != table && t.has_column(table.foreign_key()))
        {
            dropped += self
                .cache
                .invalidate_prefix(&key_patterns::table_prefix(*dependent))
                .await;
        }
        debug!(table = %table, dropped, "Invalidated cached reads");
    }
}

fn decode<T: DeserializeOwned>(record: Record) -> Result<T, GatewayError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}
