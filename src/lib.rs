pub mod bulk_load;
pub mod common;
pub mod config;
pub mod error;
pub mod expand;
pub mod indexer;
pub mod schema;
pub mod search;
pub mod source;
pub mod state;
pub mod tools;
pub mod transliterate;

pub use error::{Error, Result};
pub use schema::{DictDb, IndexStatus};
pub use search::{Dictionary, SearchMode, SearchResult};
