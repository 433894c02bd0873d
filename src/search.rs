use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use log::warn;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use serde::Serialize;

use crate::common::{ArticleId, escape_like, fts_phrase};
use crate::config::{EXCERPT_CHARS, RESULT_LIMIT};
use crate::error::{Error, Result, StorageContext};
use crate::schema::{DictDb, IndexStatus};

/// Upper bound of ids bound in a single `IN (...)` list when fetching article contents.
const CONTENT_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Case-insensitive equality with either script form of a headword
    Exact,
    /// Headword starts with the query
    Prefix,
    /// Headword contains the query
    Fuzzy,
    /// Full-text match inside article content
    Reverse,
}

impl SearchMode {
    pub const ALL: [SearchMode; 4] = [
        SearchMode::Exact,
        SearchMode::Prefix,
        SearchMode::Fuzzy,
        SearchMode::Reverse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::Exact => "exact",
            SearchMode::Prefix => "prefix",
            SearchMode::Fuzzy => "fuzzy",
            SearchMode::Reverse => "reverse",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SearchMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "invalid mode '{s}', use one of: {}",
                    SearchMode::ALL.iter().join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub dict_code: String,
    pub dict_name: String,
    pub article_id: ArticleId,
    /// Matched headword, or an excerpt of the content for full-text hits
    pub word: String,
    /// Only filled by article lookups, searches leave it to `get_article_content(s)`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dictionary {
    pub code: String,
    pub name: String,
    pub from_lang: String,
    pub to_lang: String,
    pub favorite: bool,
}

fn result_from_row(row: &Row) -> rusqlite::Result<SearchResult> {
    Ok(SearchResult {
        dict_code: row.get(0)?,
        dict_name: row.get(1)?,
        article_id: row.get(2)?,
        word: row.get(3)?,
        content: None,
    })
}

/// ` AND <column> IN (?, ?, ...)`, or nothing when all dictionaries are searched.
/// The placeholders are numbered after the highest explicitly numbered one.
fn dict_filter(column: &str, dict_codes: &[String]) -> String {
    if dict_codes.is_empty() {
        return String::new();
    }
    format!(
        " AND {column} IN ({})",
        std::iter::repeat_n("?", dict_codes.len()).join(", ")
    )
}

impl DictDb {
    /// Search one term with the given mode. An empty query gives no results. `dict_codes` restricts
    /// the search to these dictionaries, an empty slice searches all of them.
    pub fn search(
        &self,
        query: &str,
        mode: SearchMode,
        dict_codes: &[String],
    ) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(vec![]);
        }
        let lower = query.to_lowercase();
        match mode {
            SearchMode::Exact => self.search_exact(&lower, dict_codes),
            SearchMode::Prefix => {
                self.search_like(&format!("{}%", escape_like(&lower)), mode, dict_codes)
            }
            SearchMode::Fuzzy => {
                self.search_like(&format!("%{}%", escape_like(&lower)), mode, dict_codes)
            }
            SearchMode::Reverse => self.search_content(query, dict_codes),
        }
    }

    fn search_exact(&self, lower: &str, dict_codes: &[String]) -> Result<Vec<SearchResult>> {
        let sql = format!(
            r"SELECT d.code, d.name, a.id, w.word_iast
            FROM words w
            JOIN articles a ON a.id = w.article_id
            JOIN dicts d ON d.code = w.dict_code
            WHERE (LOWER(w.word_iast) = ?1 OR LOWER(w.word_deva) = ?1){}
            ORDER BY d.favorite DESC, LENGTH(w.word_iast), d.code, w.word_iast
            LIMIT {RESULT_LIMIT}",
            dict_filter("w.dict_code", dict_codes)
        );
        self.query_results(&sql, lower, dict_codes, SearchMode::Exact)
    }

    /// Shared by prefix and contains matching, which differ only in where the wildcards go.
    fn search_like(
        &self,
        pattern: &str,
        mode: SearchMode,
        dict_codes: &[String],
    ) -> Result<Vec<SearchResult>> {
        let sql = format!(
            r"SELECT d.code, d.name, a.id, w.word_iast
            FROM words w
            JOIN articles a ON a.id = w.article_id
            JOIN dicts d ON d.code = w.dict_code
            WHERE (LOWER(w.word_iast) LIKE ?1 ESCAPE '\' OR LOWER(w.word_deva) LIKE ?1 ESCAPE '\'){}
            ORDER BY d.favorite DESC, LENGTH(w.word_iast), d.code, w.word_iast
            LIMIT {RESULT_LIMIT}",
            dict_filter("w.dict_code", dict_codes)
        );
        self.query_results(&sql, pattern, dict_codes, mode)
    }

    fn search_content(&self, query: &str, dict_codes: &[String]) -> Result<Vec<SearchResult>> {
        if self.index_status()? != IndexStatus::FullText {
            warn!("Full-text search on an index without full-text structures, rebuild them first");
            return Ok(vec![]);
        }
        // no single headword for a content hit, show the first word of the article instead
        let sql = format!(
            r"SELECT d.code, d.name, a.id,
                CASE WHEN INSTR(a.content, ' ') > 0
                    THEN SUBSTR(a.content, 1, INSTR(a.content, ' ') - 1)
                    ELSE SUBSTR(a.content, 1, {EXCERPT_CHARS})
                END
            FROM articles_fts
            JOIN articles a ON a.id = articles_fts.rowid
            JOIN dicts d ON d.code = a.dict_code
            WHERE articles_fts MATCH ?1{}
            ORDER BY d.favorite DESC, d.code, a.id
            LIMIT {RESULT_LIMIT}",
            dict_filter("a.dict_code", dict_codes)
        );
        self.query_results(&sql, &fts_phrase(query), dict_codes, SearchMode::Reverse)
    }

    fn query_results(
        &self,
        sql: &str,
        term: &str,
        dict_codes: &[String],
        mode: SearchMode,
    ) -> Result<Vec<SearchResult>> {
        let run = || -> rusqlite::Result<Vec<SearchResult>> {
            let conn = self.conn();
            let mut stmt = conn.prepare_cached(sql)?;
            let params = std::iter::once(term).chain(dict_codes.iter().map(String::as_str));
            stmt.query_map(params_from_iter(params), result_from_row)?
                .collect()
        };
        run().map_err(|source| Error::QueryFailed { mode, source })
    }

    /// The article together with its dictionary and content. If several headwords point to the
    /// article, the one inserted first is shown. Empty if the article does not exist.
    pub fn get_article(&self, article_id: ArticleId) -> Result<Vec<SearchResult>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT d.code, d.name, a.id,
                    COALESCE((SELECT w.word_iast FROM words w WHERE w.article_id = a.id ORDER BY w.id LIMIT 1), ''),
                    a.content
                FROM articles a
                JOIN dicts d ON d.code = a.dict_code
                WHERE a.id = ?1",
            )
            .during("get article")?;
        let article = stmt
            .query_row(params![article_id], |row| {
                Ok(SearchResult {
                    content: Some(row.get(4)?),
                    ..result_from_row(row)?
                })
            })
            .optional()
            .during("get article")?;
        Ok(article.into_iter().collect())
    }

    pub fn get_article_content(&self, article_id: ArticleId) -> Result<Option<String>> {
        self.conn()
            .prepare_cached("SELECT content FROM articles WHERE id = ?1")
            .and_then(|mut stmt| stmt.query_row(params![article_id], |row| row.get(0)).optional())
            .during("get article content")
    }

    /// Contents of many articles in as few round trips as possible. Ids without an article are
    /// missing from the map.
    pub fn get_article_contents(
        &self,
        article_ids: &[ArticleId],
    ) -> Result<HashMap<ArticleId, String>> {
        let mut contents = HashMap::with_capacity(article_ids.len());
        let conn = self.conn();
        for chunk in article_ids.chunks(CONTENT_BATCH_SIZE) {
            let sql = format!(
                "SELECT id, content FROM articles WHERE id IN ({})",
                std::iter::repeat_n("?", chunk.len()).join(", ")
            );
            let mut stmt = conn.prepare(&sql).during("get article contents")?;
            let rows = stmt
                .query_map(params_from_iter(chunk), |row| Ok((row.get(0)?, row.get(1)?)))
                .during("get article contents")?;
            for row in rows {
                let (id, content) = row.during("get article contents")?;
                contents.insert(id, content);
            }
        }
        Ok(contents)
    }

    /// All dictionaries, favorites first, then by code
    pub fn list_dictionaries(&self) -> Result<Vec<Dictionary>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare_cached(
                "SELECT code, name, COALESCE(from_lang, ''), COALESCE(to_lang, ''), favorite
                FROM dicts
                ORDER BY favorite DESC, code",
            )
            .during("list dictionaries")?;
        stmt.query_map([], |row| {
            Ok(Dictionary {
                code: row.get(0)?,
                name: row.get(1)?,
                from_lang: row.get(2)?,
                to_lang: row.get(3)?,
                favorite: row.get(4)?,
            })
        })
        .and_then(Iterator::collect)
        .during("list dictionaries")
    }
}
