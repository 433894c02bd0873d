use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use rusqlite::{Connection, TransactionBehavior, params};
use serde::Serialize;

use crate::bulk_load::{BulkLoader, INSERT_ARTICLE, INSERT_DICT, INSERT_WORD};
use crate::common::{ArticleId, SqliteId};
use crate::config::{
    BULK_PRAGMAS, BULK_SCHEMA, FULL_TEXT_SCHEMA, READ_PRAGMAS, STATUS_BASE_TABLES,
    STATUS_FULL_TEXT,
};
use crate::error::{Error, Result, StorageContext};

/// How far an index artifact was built, as recorded in `PRAGMA user_version`. Artifacts written
/// without the version are recognized by their full-text tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexStatus {
    Empty,
    /// Rows can be inserted and searched by headword, full-text search finds nothing yet
    BaseTables,
    /// Full-text structures, indexes and triggers are in place
    FullText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StoreStats {
    pub dictionaries: u64,
    pub articles: u64,
    pub words: u64,
}

/// Handle to an index database. Constructed once and passed to every operation that needs it.
/// Shareable between threads, statements run one at a time on the underlying connection.
#[derive(Debug)]
pub struct DictDb {
    conn: Mutex<Connection>,
}

impl DictDb {
    /// Open for serving: write-ahead logging so readers don't block on the occasional writer.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).during("open database")?;
        conn.execute_batch(READ_PRAGMAS).during("set read pragmas")?;
        Ok(Self::from_connection(conn))
    }

    /// Open for a one-shot offline load. Not safe against crashes during the load.
    pub fn open_for_bulk_insert(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).during("open database")?;
        conn.execute_batch(BULK_PRAGMAS).during("set bulk pragmas")?;
        Ok(Self::from_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().during("open database")?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// A panic while holding the lock leaves the connection itself intact, so poisoning is ignored.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn conn_mut(&mut self) -> &mut Connection {
        self.conn.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the base tables only, without any index or full-text structure.
    pub fn init_bulk_schema(&self) -> Result<()> {
        self.conn()
            .execute_batch(BULK_SCHEMA)
            .during("create base tables")?;
        if self.index_status()? == IndexStatus::Empty {
            self.set_status(STATUS_BASE_TABLES)?;
        }
        info!("Base tables created");
        Ok(())
    }

    /// Base tables plus full-text structures: a store ready for single-row inserts.
    pub fn init_schema(&mut self) -> Result<()> {
        self.init_bulk_schema()?;
        self.rebuild_full_text_indexes()
    }

    /// Start the single write transaction of a bulk load. Nothing is visible to other connections
    /// before [`BulkLoader::commit`].
    pub fn begin_bulk_load(&mut self) -> Result<BulkLoader<'_>> {
        let tx = self
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .during("begin bulk load")?;
        BulkLoader::new(tx)
    }

    /// Create and populate the full-text structures from the current table contents, together with
    /// the ordinary indexes and the triggers that keep them in sync with later inserts. Running it
    /// again repopulates the full-text structures instead of adding rows twice.
    pub fn rebuild_full_text_indexes(&mut self) -> Result<()> {
        let tx = self
            .conn_mut()
            .transaction()
            .during("rebuild full-text indexes")?;
        tx.execute_batch(FULL_TEXT_SCHEMA)
            .during("rebuild full-text indexes")?;
        tx.pragma_update(None, "user_version", STATUS_FULL_TEXT)
            .during("rebuild full-text indexes")?;
        tx.commit().during("rebuild full-text indexes")?;
        info!("Full-text indexes rebuilt");
        Ok(())
    }

    /// Refresh the query planner statistics and compact the file.
    pub fn optimize(&self) -> Result<()> {
        self.conn()
            .execute_batch("ANALYZE; VACUUM;")
            .during("optimize")?;
        info!("Database optimized");
        Ok(())
    }

    /// Last step of building an index artifact. Refuses an index whose full-text structures were
    /// never built, since full-text search on it would silently find nothing. A failing
    /// optimization is only logged.
    pub fn finalize(&self) -> Result<()> {
        if self.index_status()? != IndexStatus::FullText {
            return Err(Error::FullTextNotBuilt);
        }
        if let Err(err) = self.optimize() {
            warn!("Optimization failed, the index is usable but may be larger and slower: {err}");
        }
        Ok(())
    }

    pub fn index_status(&self) -> Result<IndexStatus> {
        let conn = self.conn();
        let version: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .during("read index status")?;
        if version == STATUS_FULL_TEXT {
            return Ok(IndexStatus::FullText);
        }
        // an artifact from another indexer carries no version, look at its tables instead
        let (base_tables, fts_tables): (i64, i64) = conn
            .query_row(
                "SELECT
                    COUNT(*) FILTER (WHERE name IN ('dicts', 'articles', 'words')),
                    COUNT(*) FILTER (WHERE name IN ('articles_fts', 'words_fts'))
                FROM sqlite_master WHERE type = 'table'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .during("read index status")?;
        Ok(if fts_tables == 2 {
            debug!("Full-text tables found without index version {version}");
            IndexStatus::FullText
        } else if version == STATUS_BASE_TABLES || base_tables == 3 {
            IndexStatus::BaseTables
        } else {
            IndexStatus::Empty
        })
    }

    fn set_status(&self, version: i64) -> Result<()> {
        self.conn()
            .pragma_update(None, "user_version", version)
            .during("write index status")
    }

    /// Insert or replace a dictionary outside of a bulk load.
    pub fn insert_dictionary(
        &self,
        code: &str,
        name: &str,
        from_lang: &str,
        to_lang: &str,
        favorite: bool,
    ) -> Result<()> {
        self.conn()
            .prepare_cached(INSERT_DICT)
            .and_then(|mut stmt| stmt.execute(params![code, name, from_lang, to_lang, favorite]))
            .during("insert dictionary")?;
        Ok(())
    }

    pub fn insert_article(&self, dict_code: &str, content: &str) -> Result<ArticleId> {
        self.conn()
            .prepare_cached(INSERT_ARTICLE)
            .and_then(|mut stmt| stmt.insert(params![dict_code, content]))
            .during("insert article")
    }

    pub fn insert_word(
        &self,
        word_iast: &str,
        word_deva: &str,
        article_id: ArticleId,
        dict_code: &str,
    ) -> Result<SqliteId> {
        self.conn()
            .prepare_cached(INSERT_WORD)
            .and_then(|mut stmt| stmt.insert(params![word_iast, word_deva, article_id, dict_code]))
            .during("insert word")
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.conn()
            .query_row(
                "SELECT (SELECT COUNT(*) FROM dicts), (SELECT COUNT(*) FROM articles), (SELECT COUNT(*) FROM words)",
                [],
                |row| {
                    Ok(StoreStats {
                        dictionaries: row.get(0)?,
                        articles: row.get(1)?,
                        words: row.get(2)?,
                    })
                },
            )
            .during("count rows")
    }
}
