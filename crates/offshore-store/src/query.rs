use offshore_models::schema::key_patterns;
use offshore_models::Table;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// A loosely-typed row as exchanged with a backend.
pub type Record = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
    /// `value` must be an array; an empty array matches nothing.
    In,
    /// `value` is ignored.
    IsNull,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// A filtered read of one table, optionally joined with related tables.
///
/// Each join nests the related row under the related table's name, matched
/// through that table's foreign key column on the queried table
/// (e.g. joining `managers` on `analyses.manager_id`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    pub table: Table,
    pub filters: Vec<Filter>,
    pub joins: Vec<Table>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            filters: Vec::new(),
            joins: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Eq, value.into())
    }

    pub fn neq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Neq, value.into())
    }

    pub fn is_in<V: Into<Value>>(self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filter(column, FilterOp::In, Value::Array(values))
    }

    pub fn is_null(self, column: &str) -> Self {
        self.filter(column, FilterOp::IsNull, Value::Null)
    }

    fn filter(mut self, column: &str, op: FilterOp, value: Value) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value,
        });
        self
    }

    pub fn join(mut self, related: Table) -> Self {
        self.joins.push(related);
        self
    }

    pub fn order_asc(mut self, column: &str) -> Self {
        self.order_by.push(OrderBy {
            column: column.to_string(),
            direction: Direction::Asc,
        });
        self
    }

    pub fn order_desc(mut self, column: &str) -> Self {
        self.order_by.push(OrderBy {
            column: column.to_string(),
            direction: Direction::Desc,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check every column and join against the schema before the query reaches
    /// a backend. Column names are interpolated into SQL and URLs, values never are.
    pub fn validate(&self) -> Result<(), GatewayError> {
        for filter in &self.filters {
            check_column(self.table, &filter.column)?;
            if filter.op == FilterOp::In && !filter.value.is_array() {
                return Err(GatewayError::Malformed(format!(
                    "`in` filter on {} needs an array value",
                    filter.column
                )));
            }
        }
        for order in &self.order_by {
            check_column(self.table, &order.column)?;
        }
        for related in &self.joins {
            check_column(self.table, related.foreign_key())?;
        }
        Ok(())
    }

    /// Cache key: the table prefix followed by the serialized query.
    pub fn cache_key(&self) -> Result<String, GatewayError> {
        let fingerprint = serde_json::to_string(self)?;
        Ok(key_patterns::query(self.table, &fingerprint))
    }
}

pub(crate) fn check_column(table: Table, column: &str) -> Result<(), GatewayError> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(GatewayError::UnknownColumn {
            table,
            column: column.to_string(),
        })
    }
}

/// Reject records carrying columns the table does not have.
pub(crate) fn check_record(table: Table, record: &Record) -> Result<(), GatewayError> {
    record.keys().try_for_each(|column| check_column(table, column))
}

/// Serialize a typed payload into a row.
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, GatewayError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(GatewayError::Malformed(format!(
            "expected an object payload, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_filters_joins_and_order() {
        let query = Query::table(Table::Analyses)
            .eq("kind", "Macro")
            .is_in("country_id", [1, 2])
            .join(Table::Managers)
            .order_desc("publication_date")
            .order_asc("id")
            .limit(10);

        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[1].value, json!([1, 2]));
        assert_eq!(query.joins, vec![Table::Managers]);
        assert_eq!(query.order_by[0].direction, Direction::Desc);
        assert_eq!(query.limit, Some(10));
        assert!(query.validate().is_ok());
    }

    #[test]
    fn unknown_filter_column_is_rejected() {
        let query = Query::table(Table::Countries).eq("name; DROP TABLE countries", "x");
        assert!(matches!(
            query.validate(),
            Err(GatewayError::UnknownColumn { table: Table::Countries, .. })
        ));
    }

    #[test]
    fn join_needs_foreign_key_on_base_table() {
        let query = Query::table(Table::Countries).join(Table::Managers);
        assert!(matches!(
            query.validate(),
            Err(GatewayError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn cache_keys_differ_by_arguments_and_share_table_prefix() {
        let a = Query::table(Table::Analyses).eq("country_id", 1).cache_key().unwrap();
        let b = Query::table(Table::Analyses).eq("country_id", 2).cache_key().unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("analyses:"));
        assert!(b.starts_with("analyses:"));
    }

    #[test]
    fn to_record_rejects_non_objects() {
        assert!(to_record(&json!({"name": "Brasil"})).is_ok());
        assert!(matches!(
            to_record(&json!([1, 2])),
            Err(GatewayError::Malformed(_))
        ));
    }
}
