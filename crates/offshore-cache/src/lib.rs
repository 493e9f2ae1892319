pub mod error;
pub mod memory;

pub use error::CacheError;
pub use memory::QueryCache;
