use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use offshore_models::schema::SCHEMA_DDL;
use offshore_models::Table;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use tracing::{debug, info};

use crate::backend::Backend;
use crate::error::GatewayError;
use crate::query::{check_column, check_record, Direction, Filter, FilterOp, Query, Record};

/// Embedded SQLite store.
///
/// Applies the schema on open. Access is synchronized via `Mutex` since
/// `rusqlite::Connection` is not `Sync`.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) a database file. Enables WAL and foreign keys.
    pub fn open(path: &str) -> Result<Self, GatewayError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// Open an empty in-memory database with the schema applied. Useful for testing.
    pub fn open_in_memory() -> Result<Self, GatewayError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, GatewayError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, GatewayError> {
        self.conn
            .lock()
            .map_err(|e| GatewayError::Unavailable(format!("SQLite mutex poisoned: {e}")))
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, GatewayError> {
        let conn = self.lock()?;
        select(&conn, query)
    }

    async fn insert(&self, table: Table, record: Record) -> Result<Record, GatewayError> {
        let conn = self.lock()?;
        insert_row(&conn, table, &record)
    }

    async fn update(&self, table: Table, id: i64, patch: Record) -> Result<Record, GatewayError> {
        check_record(table, &patch)?;
        let conn = self.lock()?;

        let columns: Vec<&str> = patch
            .keys()
            .map(String::as_str)
            .filter(|c| *c != "id")
            .collect();
        let rows = if columns.is_empty() {
            let sql = format!("SELECT * FROM {} WHERE id = ?", table.name());
            read_rows(&conn, &sql, &[SqlValue::Integer(id)])?
        } else {
            let assignments: Vec<String> = columns.iter().map(|c| format!("{c} = ?")).collect();
            let mut params = columns
                .iter()
                .map(|c| to_sql(&patch[*c]))
                .collect::<Result<Vec<_>, _>>()?;
            params.push(SqlValue::Integer(id));
            let sql = format!(
                "UPDATE {} SET {} WHERE id = ? RETURNING *",
                table.name(),
                assignments.join(", ")
            );
            read_rows(&conn, &sql, &params)?
        };

        rows.into_iter()
            .next()
            .ok_or(GatewayError::RowNotFound { table, id })
    }

    async fn upsert(
        &self,
        table: Table,
        record: Record,
        conflict_key: &[&str],
    ) -> Result<Record, GatewayError> {
        check_record(table, &record)?;
        if conflict_key.is_empty() {
            return Err(GatewayError::Malformed("upsert needs a conflict key".to_string()));
        }
        for key in conflict_key {
            check_column(table, key)?;
            if !record.contains_key(*key) {
                return Err(GatewayError::Malformed(format!(
                    "upsert into {table} is missing conflict column {key}"
                )));
            }
        }

        let columns: Vec<&str> = record.keys().map(String::as_str).collect();
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| **c != "id" && !conflict_key.contains(*c))
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();
        let updates = if updates.is_empty() {
            format!("{0} = excluded.{0}", conflict_key[0])
        } else {
            updates.join(", ")
        };
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {} RETURNING *",
            table.name(),
            columns.join(", "),
            placeholders(columns.len()),
            conflict_key.join(", "),
            updates
        );
        let params = record.values().map(to_sql).collect::<Result<Vec<_>, _>>()?;

        let conn = self.lock()?;
        single_row(read_rows(&conn, &sql, &params)?, table)
    }

    async fn delete(&self, table: Table, id: i64) -> Result<(), GatewayError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", table.name()),
            rusqlite::params![id],
        )?;
        if deleted == 0 {
            return Err(GatewayError::RowNotFound { table, id });
        }
        Ok(())
    }

    /// Delete and re-insert inside one transaction. Any failure rolls back to the
    /// previous children.
    async fn replace_children(
        &self,
        table: Table,
        parent_column: &str,
        parent_id: i64,
        records: Vec<Record>,
    ) -> Result<Vec<Record>, GatewayError> {
        check_column(table, parent_column)?;
        for record in &records {
            check_record(table, record)?;
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute(
            &format!("DELETE FROM {} WHERE {parent_column} = ?1", table.name()),
            rusqlite::params![parent_id],
        )?;

        let mut inserted = Vec::with_capacity(records.len());
        for mut record in records {
            record.insert(parent_column.to_string(), Value::from(parent_id));
            inserted.push(insert_row(&tx, table, &record)?);
        }
        tx.commit()?;

        info!(
            table = %table,
            parent_id,
            removed,
            inserted = inserted.len(),
            "Children replaced"
        );
        Ok(inserted)
    }
}

fn select(conn: &Connection, query: &Query) -> Result<Vec<Record>, GatewayError> {
    query.validate()?;

    let mut params = Vec::new();
    let clauses = query
        .filters
        .iter()
        .map(|f| filter_clause(f, &mut params))
        .collect::<Result<Vec<_>, _>>()?;

    let mut sql = format!("SELECT * FROM {}", query.table.name());
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let order = if query.order_by.is_empty() {
        "id ASC".to_string()
    } else {
        query
            .order_by
            .iter()
            .map(|o| match o.direction {
                Direction::Asc => format!("{} ASC", o.column),
                Direction::Desc => format!("{} DESC", o.column),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };
    sql.push_str(" ORDER BY ");
    sql.push_str(&order);

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    debug!(%sql, params = params.len(), "SQLite select");
    let mut rows = read_rows(conn, &sql, &params)?;
    for related in &query.joins {
        attach_join(conn, &mut rows, *related)?;
    }
    Ok(rows)
}

fn filter_clause(filter: &Filter, params: &mut Vec<SqlValue>) -> Result<String, GatewayError> {
    let column = &filter.column;
    let clause = match filter.op {
        FilterOp::IsNull => format!("{column} IS NULL"),
        FilterOp::Eq if filter.value.is_null() => format!("{column} IS NULL"),
        FilterOp::Neq if filter.value.is_null() => format!("{column} IS NOT NULL"),
        FilterOp::Eq => {
            params.push(to_sql(&filter.value)?);
            format!("{column} = ?")
        }
        FilterOp::Neq => {
            params.push(to_sql(&filter.value)?);
            format!("{column} <> ?")
        }
        FilterOp::In => {
            let values = filter.value.as_array().ok_or_else(|| {
                GatewayError::Malformed(format!("`in` filter on {column} needs an array value"))
            })?;
            if values.is_empty() {
                "0".to_string()
            } else {
                for value in values {
                    params.push(to_sql(value)?);
                }
                format!("{column} IN ({})", placeholders(values.len()))
            }
        }
    };
    Ok(clause)
}

/// Nest each row's related record under the related table's name, or `null`.
fn attach_join(conn: &Connection, rows: &mut [Record], related: Table) -> Result<(), GatewayError> {
    let fk = related.foreign_key();
    let mut ids: Vec<i64> = rows
        .iter()
        .filter_map(|row| row.get(fk).and_then(Value::as_i64))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let related_rows = if ids.is_empty() {
        Vec::new()
    } else {
        select(conn, &Query::table(related).is_in("id", ids))?
    };
    let by_id: HashMap<i64, Record> = related_rows
        .into_iter()
        .filter_map(|row| row.get("id").and_then(Value::as_i64).map(|id| (id, row)))
        .collect();

    for row in rows.iter_mut() {
        let nested = row
            .get(fk)
            .and_then(Value::as_i64)
            .and_then(|id| by_id.get(&id))
            .cloned()
            .map(Value::Object)
            .unwrap_or(Value::Null);
        row.insert(related.name().to_string(), nested);
    }
    Ok(())
}

fn insert_row(conn: &Connection, table: Table, record: &Record) -> Result<Record, GatewayError> {
    check_record(table, record)?;

    let sql = if record.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING *", table.name())
    } else {
        let columns: Vec<&str> = record.keys().map(String::as_str).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            table.name(),
            columns.join(", "),
            placeholders(columns.len())
        )
    };
    let params = record.values().map(to_sql).collect::<Result<Vec<_>, _>>()?;
    single_row(read_rows(conn, &sql, &params)?, table)
}

fn read_rows(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
) -> Result<Vec<Record>, GatewayError> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            let mut record = Record::new();
            for (idx, name) in names.iter().enumerate() {
                record.insert(name.clone(), from_sql(row.get_ref(idx)?));
            }
            Ok(record)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn single_row(rows: Vec<Record>, table: Table) -> Result<Record, GatewayError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| GatewayError::Malformed(format!("write to {table} returned no row")))
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn to_sql(value: &Value) -> Result<SqlValue, GatewayError> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .ok_or_else(|| GatewayError::Malformed(format!("unrepresentable number {n}"))),
        Value::String(s) => Ok(SqlValue::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(GatewayError::Malformed(format!(
            "nested value cannot be stored in a column: {value}"
        ))),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
