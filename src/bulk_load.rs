use log::{debug, info, warn};
use rusqlite::{Transaction, params};

use crate::common::ArticleId;
use crate::error::{Result, StorageContext};

pub(crate) const INSERT_DICT: &str = "INSERT OR REPLACE INTO dicts (code, name, from_lang, to_lang, favorite) VALUES (?1, ?2, ?3, ?4, ?5)";
pub(crate) const INSERT_ARTICLE: &str = "INSERT INTO articles (dict_code, content) VALUES (?1, ?2)";
pub(crate) const INSERT_WORD: &str =
    "INSERT INTO words (word_iast, word_deva, article_id, dict_code) VALUES (?1, ?2, ?3, ?4)";

/// Exclusive owner of the write transaction of a bulk load. The three insert statements are
/// prepared once and reused from the connection's statement cache.
///
/// Dropping the loader without calling [`BulkLoader::commit`] rolls everything back.
#[derive(Debug)]
pub struct BulkLoader<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> BulkLoader<'conn> {
    pub(crate) fn new(tx: Transaction<'conn>) -> Result<Self> {
        for sql in [INSERT_DICT, INSERT_ARTICLE, INSERT_WORD] {
            tx.prepare_cached(sql).during("prepare bulk inserts")?;
        }
        debug!("Bulk load started");
        Ok(Self { tx })
    }

    /// Insert a dictionary, replacing any existing one with the same code.
    pub fn insert_dictionary(
        &self,
        code: &str,
        name: &str,
        from_lang: &str,
        to_lang: &str,
        favorite: bool,
    ) -> Result<()> {
        self.tx
            .prepare_cached(INSERT_DICT)
            .and_then(|mut stmt| stmt.execute(params![code, name, from_lang, to_lang, favorite]))
            .during("insert dictionary")?;
        Ok(())
    }

    pub fn insert_article(&self, dict_code: &str, content: &str) -> Result<ArticleId> {
        self.tx
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
    ) -> Result<()> {
        self.tx
            .prepare_cached(INSERT_WORD)
            .and_then(|mut stmt| stmt.execute(params![word_iast, word_deva, article_id, dict_code]))
            .during("insert word")?;
        Ok(())
    }

    /// Run `load` inside a savepoint. If it fails, only the rows it inserted are rolled back and
    /// the bulk load can continue.
    pub fn in_savepoint<T>(&mut self, load: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        self.tx
            .execute_batch("SAVEPOINT source_file")
            .during("begin savepoint")?;
        match load(self) {
            Ok(value) => {
                self.tx
                    .execute_batch("RELEASE source_file")
                    .during("release savepoint")?;
                Ok(value)
            }
            Err(err) => {
                self.tx
                    .execute_batch("ROLLBACK TO source_file; RELEASE source_file")
                    .during("roll back savepoint")?;
                Err(err)
            }
        }
    }

    pub fn commit(self) -> Result<()> {
        self.tx.flush_prepared_statement_cache();
        self.tx.commit().during("commit bulk load")?;
        info!("Bulk load committed");
        Ok(())
    }

    pub fn rollback(self) -> Result<()> {
        self.tx.flush_prepared_statement_cache();
        self.tx.rollback().during("roll back bulk load")?;
        warn!("Bulk load rolled back");
        Ok(())
    }
}
