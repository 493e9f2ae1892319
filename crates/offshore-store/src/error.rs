use offshore_models::Table;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(#[from] offshore_cache::CacheError),

    #[error("Unknown column {column:?} on table {table}")]
    UnknownColumn { table: Table, column: String },

    #[error("No row with id {id} in {table}")]
    RowNotFound { table: Table, id: i64 },

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("Backend not available: {0}")]
    Unavailable(String),
}
