use async_trait::async_trait;
use offshore_models::Table;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::backend::Backend;
use crate::error::GatewayError;
use crate::query::{check_column, check_record, Direction, FilterOp, Query, Record};

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_DUPLICATES: &str = "resolution=merge-duplicates,return=representation";

/// Remote store reached through a PostgREST API (e.g. a hosted Supabase project).
///
/// Every call is one HTTP round trip; nothing is retried.
pub struct PostgrestBackend {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PostgrestBackend {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, GatewayError> {
        if base_url.trim().is_empty() {
            return Err(GatewayError::Unavailable(
                "PostgREST base URL is empty".to_string(),
            ));
        }
        Ok(Self {
            client: Client::builder().build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    fn request(&self, method: Method, table: Table) -> RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Vec<Record>, GatewayError> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Translate a query into PostgREST URL parameters.
pub fn query_params(query: &Query) -> Result<Vec<(String, String)>, GatewayError> {
    query.validate()?;

    let mut select = String::from("*");
    for related in &query.joins {
        select.push_str(&format!(",{}(*)", related.name()));
    }
    let mut params = vec![("select".to_string(), select)];

    for filter in &query.filters {
        let condition = match filter.op {
            FilterOp::IsNull => "is.null".to_string(),
            FilterOp::Eq if filter.value.is_null() => "is.null".to_string(),
            FilterOp::Neq if filter.value.is_null() => "not.is.null".to_string(),
            FilterOp::Eq => format!("eq.{}", literal(&filter.value)),
            FilterOp::Neq => format!("neq.{}", literal(&filter.value)),
            FilterOp::In => {
                let values = filter.value.as_array().ok_or_else(|| {
                    GatewayError::Malformed(format!(
                        "`in` filter on {} needs an array value",
                        filter.column
                    ))
                })?;
                format!("in.({})", list(values))
            }
        };
        params.push((filter.column.clone(), condition));
    }

    if !query.order_by.is_empty() {
        let order = query
            .order_by
            .iter()
            .map(|o| match o.direction {
                Direction::Asc => format!("{}.asc", o.column),
                Direction::Desc => format!("{}.desc", o.column),
            })
            .collect::<Vec<_>>()
            .join(",");
        params.push(("order".to_string(), order));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    Ok(params)
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Comma-separated list for `in.(...)`. Strings are always double-quoted so that
/// commas and parentheses inside values survive.
fn list(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn first_row(rows: Vec<Record>, table: Table) -> Result<Record, GatewayError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| GatewayError::Malformed(format!("write to {table} returned no row")))
}

#[async_trait]
impl Backend for PostgrestBackend {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, GatewayError> {
        let params = query_params(query)?;
        debug!(table = %query.table, ?params, "PostgREST select");
        self.send(self.request(Method::GET, query.table).query(&params))
            .await
    }

    async fn insert(&self, table: Table, record: Record) -> Result<Record, GatewayError> {
        check_record(table, &record)?;
        let rows = self
            .send(
                self.request(Method::POST, table)
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&record),
            )
            .await?;
        first_row(rows, table)
    }

    async fn update(&self, table: Table, id: i64, patch: Record) -> Result<Record, GatewayError> {
        check_record(table, &patch)?;
        let rows = self
            .send(
                self.request(Method::PATCH, table)
                    .query(&[("id", format!("eq.{id}"))])
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&patch),
            )
            .await?;
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
        for key in conflict_key {
            check_column(table, key)?;
        }
        let rows = self
            .send(
                self.request(Method::POST, table)
                    .query(&[("on_conflict", conflict_key.join(","))])
                    .header("Prefer", MERGE_DUPLICATES)
                    .json(&record),
            )
            .await?;
        first_row(rows, table)
    }

    async fn delete(&self, table: Table, id: i64) -> Result<(), GatewayError> {
        let rows = self
            .send(
                self.request(Method::DELETE, table)
                    .query(&[("id", format!("eq.{id}"))])
                    .header("Prefer", RETURN_REPRESENTATION),
            )
            .await?;
        if rows.is_empty() {
            return Err(GatewayError::RowNotFound { table, id });
        }
        Ok(())
    }

    /// PostgREST has no multi-request transaction, so the new rows are inserted
    /// first and only the previous rows are deleted afterwards. A failure between
    /// the two steps leaves both sets in place rather than none.
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

        let previous = self
            .query(&Query::table(table).eq(parent_column, parent_id))
            .await?;
        let previous_ids: Vec<i64> = previous
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .collect();

        let payload: Vec<Record> = records
            .into_iter()
            .map(|mut record| {
                record.insert(parent_column.to_string(), Value::from(parent_id));
                record
            })
            .collect();
        let inserted = if payload.is_empty() {
            Vec::new()
        } else {
            self.send(
                self.request(Method::POST, table)
                    .header("Prefer", RETURN_REPRESENTATION)
                    .json(&payload),
            )
            .await?
        };

        if !previous_ids.is_empty() {
            let ids = previous_ids
                .iter()
                .map(i64::to_string)
                .collect::<Vec<_>>()
                .join(",");
            let removal = self
                .send(
                    self.request(Method::DELETE, table)
                        .query(&[
                            (parent_column.to_string(), format!("eq.{parent_id}")),
                            ("id".to_string(), format!("in.({ids})")),
                        ]),
                )
                .await;
            if let Err(e) = removal {
                error!(
                    table = %table,
                    parent_id,
                    error = %e,
                    "New children inserted but previous ones could not be removed"
                );
                return Err(e);
            }
        }

        info!(
            table = %table,
            parent_id,
            removed = previous_ids.len(),
            inserted = inserted.len(),
            "Children replaced"
        );
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_for_filtered_joined_query() {
        let query = Query::table(Table::Analyses)
            .eq("kind", "Macro")
            .is_in("country_id", [1, 3])
            .join(Table::Managers)
            .order_desc("publication_date")
            .order_asc("id")
            .limit(20);

        let params = query_params(&query).unwrap();
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*,managers(*)".to_string()),
                ("kind".to_string(), "eq.Macro".to_string()),
                ("country_id".to_string(), "in.(1,3)".to_string()),
                ("order".to_string(), "publication_date.desc,id.asc".to_string()),
                ("limit".to_string(), "20".to_string()),
            ]
        );
    }

    #[test]
    fn null_filters_use_is_operator() {
        let query = Query::table(Table::Analyses)
            .is_null("manager_id")
            .neq("theme_id", Value::Null);
        let params = query_params(&query).unwrap();
        assert_eq!(params[1], ("manager_id".to_string(), "is.null".to_string()));
        assert_eq!(params[2], ("theme_id".to_string(), "not.is.null".to_string()));
    }

    #[test]
    fn string_lists_are_quoted() {
        let query = Query::table(Table::Countries).is_in("name", ["Coreia, Sul", "EUA"]);
        let params = query_params(&query).unwrap();
        assert_eq!(params[1].1, r#"in.("Coreia, Sul","EUA")"#);
    }

    #[test]
    fn invalid_column_is_rejected_before_any_request() {
        let query = Query::table(Table::Countries).eq("nome", "Brasil");
        assert!(matches!(
            query_params(&query),
            Err(GatewayError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn table_url_strips_trailing_slash() {
        let backend = PostgrestBackend::new("https://example.supabase.co/", "key").unwrap();
        assert_eq!(
            backend.table_url(Table::EconomicIndicators),
            "https://example.supabase.co/rest/v1/economic_indicators"
        );
        assert!(PostgrestBackend::new("  ", "key").is_err());
    }
}
