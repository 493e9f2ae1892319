//! Data access for the research store.
//!
//! [`Backend`] is the loosely-typed row interface a store must offer; [`Gateway`]
//! puts the read cache in front of it and converts rows to the typed records of
//! `offshore-models`.

pub mod backend;
pub mod error;
pub mod gateway;
pub mod postgrest;
pub mod query;
pub mod sqlite;

pub use backend::Backend;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use postgrest::PostgrestBackend;
pub use query::{Direction, Filter, FilterOp, OrderBy, Query, Record};
pub use sqlite::SqliteBackend;
