use std::fs;
use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::common::{ArticleId, escape_like};
use crate::error::{Result, StorageContext};
use crate::search::SearchResult;

/// What the search flow needs from the user's persistent state.
pub trait UserState {
    /// Remember a query that found something.
    fn record_query(&mut self, query: &str) -> Result<()>;
    fn is_starred(&self, article_id: ArticleId) -> Result<bool>;
    /// Star the article of `result` if it isn't starred yet, otherwise unstar it. Returns whether it
    /// is starred now.
    fn toggle_star(&mut self, result: &SearchResult) -> Result<bool>;
}

/* Settings are plain key-value pairs.

history.last_used is an ordering key rather than a timestamp: it is one more than the highest
value in the table whenever a query is recorded, so the latest query always sorts first.

starred keeps the headword and dictionary next to the article id, so that the list can be shown
without opening the index. */
const STATE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "settings" (
	"key" TEXT PRIMARY KEY,
	"value" TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS "history" (
	"id" INTEGER PRIMARY KEY AUTOINCREMENT,
	"query" TEXT NOT NULL UNIQUE,
	"count" INTEGER NOT NULL DEFAULT 1,
	"last_used" INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS "starred" (
	"id" INTEGER PRIMARY KEY AUTOINCREMENT,
	"article_id" INTEGER NOT NULL UNIQUE,
	"word" TEXT NOT NULL,
	"dict_code" TEXT NOT NULL,
	"created_at" DATETIME DEFAULT CURRENT_TIMESTAMP
);
"#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StarredArticle {
    pub article_id: ArticleId,
    pub word: String,
    pub dict_code: String,
}

/// User settings, search history and starred articles, kept in their own database next to the
/// index so that replacing the index keeps them.
#[derive(Debug)]
pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path).during("open state database")?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().during("open state database")?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(STATE_SCHEMA)
            .during("create state tables")?;
        Ok(Self { conn })
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .during("read setting")
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .during("write setting")?;
        Ok(())
    }

    pub fn delete_setting(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM settings WHERE key = ?1", params![key])
            .during("delete setting")?;
        Ok(())
    }

    pub fn add_history(&self, query: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO history (query, count, last_used)
                VALUES (?1, 1, (SELECT COALESCE(MAX(last_used), 0) + 1 FROM history))
                ON CONFLICT(query) DO UPDATE SET
                    count = count + 1,
                    last_used = (SELECT MAX(last_used) + 1 FROM history)",
                params![query],
            )
            .during("record history")?;
        Ok(())
    }

    /// Past queries starting with `prefix`, most frequent first
    pub fn search_history(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        self.query_strings(
            r"SELECT query FROM history
            WHERE query LIKE ?1 ESCAPE '\'
            ORDER BY count DESC, last_used DESC
            LIMIT ?2",
            params![format!("{}%", escape_like(prefix)), limit],
        )
    }

    pub fn recent_history(&self, limit: usize) -> Result<Vec<String>> {
        self.query_strings(
            "SELECT query FROM history ORDER BY last_used DESC LIMIT ?1",
            params![limit],
        )
    }

    fn query_strings(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(sql).during("read history")?;
        stmt.query_map(params, |row| row.get(0))
            .and_then(Iterator::collect)
            .during("read history")
    }

    pub fn star(&self, article_id: ArticleId, word: &str, dict_code: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO starred (article_id, word, dict_code, created_at)
                VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)",
                params![article_id, word, dict_code],
            )
            .during("star article")?;
        Ok(())
    }

    pub fn unstar(&self, article_id: ArticleId) -> Result<()> {
        self.conn
            .execute("DELETE FROM starred WHERE article_id = ?1", params![article_id])
            .during("unstar article")?;
        Ok(())
    }

    /// Starred articles, the most recently starred first
    pub fn starred_articles(&self) -> Result<Vec<StarredArticle>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT article_id, word, dict_code FROM starred ORDER BY id DESC")
            .during("list starred articles")?;
        stmt.query_map([], |row| {
            Ok(StarredArticle {
                article_id: row.get(0)?,
                word: row.get(1)?,
                dict_code: row.get(2)?,
            })
        })
        .and_then(Iterator::collect)
        .during("list starred articles")
    }
}

impl UserState for StateStore {
    fn record_query(&mut self, query: &str) -> Result<()> {
        self.add_history(query)
    }

    fn is_starred(&self, article_id: ArticleId) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT EXISTS (SELECT 1 FROM starred WHERE article_id = ?1)",
                params![article_id],
                |row| row.get(0),
            )
            .during("check starred")
    }

    fn toggle_star(&mut self, result: &SearchResult) -> Result<bool> {
        if self.is_starred(result.article_id)? {
            self.unstar(result.article_id)?;
            Ok(false)
        } else {
            self.star(result.article_id, &result.word, &result.dict_code)?;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings() {
        let state = StateStore::open_in_memory().unwrap();
        assert_eq!(state.get_setting("theme").unwrap(), None);
        state.set_setting("theme", "dark").unwrap();
        state.set_setting("theme", "light").unwrap();
        assert_eq!(state.get_setting("theme").unwrap().as_deref(), Some("light"));
        state.delete_setting("theme").unwrap();
        assert_eq!(state.get_setting("theme").unwrap(), None);
    }

    #[test]
    fn test_history() {
        let state = StateStore::open_in_memory().unwrap();
        for query in ["dharma", "karma", "dharma", "dhātu", "yoga"] {
            state.add_history(query).unwrap();
        }
        assert_eq!(
            state.search_history("dh", 10).unwrap(),
            vec!["dharma", "dhātu"]
        );
        assert_eq!(
            state.recent_history(3).unwrap(),
            vec!["yoga", "dhātu", "dharma"]
        );
        state.add_history("karma").unwrap();
        assert_eq!(state.recent_history(1).unwrap(), vec!["karma"]);
        // wildcards in the prefix are literal
        assert!(state.search_history("%", 10).unwrap().is_empty());
    }

    #[test]
    fn test_toggle_star() {
        let mut state = StateStore::open_in_memory().unwrap();
        let result = SearchResult {
            dict_code: "mw".to_owned(),
            dict_name: "Monier-Williams".to_owned(),
            article_id: 42,
            word: "dharma".to_owned(),
            content: None,
        };
        assert!(!state.is_starred(42).unwrap());
        assert!(state.toggle_star(&result).unwrap());
        assert!(state.is_starred(42).unwrap());
        state.star(7, "yoga", "ap90").unwrap();
        assert_eq!(
            state
                .starred_articles()
                .unwrap()
                .iter()
                .map(|s| s.article_id)
                .collect::<Vec<_>>(),
            vec![7, 42]
        );
        assert!(!state.toggle_star(&result).unwrap());
        assert!(!state.is_starred(42).unwrap());
    }

    #[test]
    fn test_open_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kosha").join("state.db");
        {
            let state = StateStore::open(&path).unwrap();
            state.add_history("yoga").unwrap();
        }
        let state = StateStore::open(&path).unwrap();
        assert_eq!(state.recent_history(5).unwrap(), vec!["yoga"]);
    }
}
