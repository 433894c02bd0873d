use std::path::PathBuf;

use rusqlite::Error as SqliteError;
use thiserror::Error;

use crate::search::SearchMode;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any storage access: empty query, unknown mode or direction token.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error during {op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: SqliteError,
    },

    #[error("Query failed ({mode} search): {source}")]
    QueryFailed {
        mode: SearchMode,
        #[source]
        source: SqliteError,
    },

    #[error("Full-text indexes have not been built, rebuild them before finalizing the index")]
    FullTextNotBuilt,

    #[error("Could not load {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: SourceError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Attaches the name of the failing operation to a storage error.
pub(crate) trait StorageContext<T> {
    fn during(self, op: &'static str) -> Result<T>;
}

impl<T> StorageContext<T> for rusqlite::Result<T> {
    fn during(self, op: &'static str) -> Result<T> {
        self.map_err(|source| Error::Storage { op, source })
    }
}
