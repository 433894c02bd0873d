use std::io::{BufRead, Write};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::common::{ArticleId, strip_markup};
use crate::config::{DEFAULT_TOOL_LIMIT, MAX_TOOL_LIMIT};
use crate::error::{Error, Result};
use crate::expand::search_all;
use crate::schema::DictDb;
use crate::search::{Dictionary, SearchMode, SearchResult};
use crate::transliterate::{devanagari_to_iast, iast_to_devanagari};

/// A call of one of the remote operations, e.g. `{"tool": "search", "query": "dharma", "mode": "exact"}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum ToolRequest {
    Search {
        query: String,
        mode: String,
        #[serde(default)]
        dict_codes: Vec<String>,
        /// Defaults to 50, at most 1000
        #[serde(default)]
        limit: Option<usize>,
    },
    ListDictionaries,
    GetArticle {
        article_id: ArticleId,
    },
    Transliterate {
        text: String,
        /// Target script, "iast" or "deva"
        direction: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    pub word: String,
    pub dict_code: String,
    pub dict_name: String,
    /// Without markup
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ToolResponse {
    Search {
        count: usize,
        total: usize,
        truncated: bool,
        results: Vec<SearchResult>,
    },
    Dictionaries {
        dictionaries: Vec<Dictionary>,
    },
    Article(ArticleView),
    Transliteration {
        original: String,
        transliterated: String,
    },
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn dispatch(db: &DictDb, request: ToolRequest) -> Result<ToolResponse> {
    match request {
        ToolRequest::Search {
            query,
            mode,
            dict_codes,
            limit,
        } => {
            if query.trim().is_empty() {
                return Err(Error::InvalidInput("query cannot be empty".to_owned()));
            }
            let mode: SearchMode = mode.parse()?;
            let mut results = search_all(db, &query, mode, &dict_codes)?;
            let limit = limit
                .filter(|&limit| limit > 0)
                .unwrap_or(DEFAULT_TOOL_LIMIT)
                .min(MAX_TOOL_LIMIT);
            let total = results.len();
            results.truncate(limit);
            Ok(ToolResponse::Search {
                count: results.len(),
                total,
                truncated: total > limit,
                results,
            })
        }
        ToolRequest::ListDictionaries => Ok(ToolResponse::Dictionaries {
            dictionaries: db.list_dictionaries()?,
        }),
        ToolRequest::GetArticle { article_id } => {
            let Some(article) = db.get_article(article_id)?.into_iter().next() else {
                return Err(Error::InvalidInput(format!(
                    "article {article_id} not found"
                )));
            };
            Ok(ToolResponse::Article(ArticleView {
                content: strip_markup(article.content.as_deref().unwrap_or_default()),
                word: article.word,
                dict_code: article.dict_code,
                dict_name: article.dict_name,
            }))
        }
        ToolRequest::Transliterate { text, direction } => {
            if text.is_empty() {
                return Err(Error::InvalidInput("text cannot be empty".to_owned()));
            }
            let transliterated = match direction.as_str() {
                "deva" => iast_to_devanagari(&text),
                "iast" => devanagari_to_iast(&text),
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "invalid direction '{direction}', use: iast or deva"
                    )));
                }
            };
            Ok(ToolResponse::Transliteration {
                original: text,
                transliterated,
            })
        }
    }
}

/// Answer newline-delimited JSON requests from `reader` on `writer`, one response line per
/// request line, until the reader is exhausted. A request that fails gets an `{"error": ...}`
/// line. Only I/O errors on the streams end the loop.
pub fn serve(db: &DictDb, reader: impl BufRead, mut writer: impl Write) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        debug!("Request: {line}");
        let response = serde_json::from_str::<ToolRequest>(&line)
            .map_err(|err| Error::InvalidInput(format!("invalid request: {err}")))
            .and_then(|request| dispatch(db, request))
            .and_then(|response| {
                serde_json::to_string(&response)
                    .map_err(|err| Error::InvalidInput(format!("unserializable response: {err}")))
            });
        let json = match response {
            Ok(json) => json,
            Err(err) => {
                warn!("Request failed: {err}");
                error_line(&err)
            }
        };
        writeln!(writer, "{json}")?;
        writer.flush()?;
    }
    Ok(())
}

fn error_line(err: &Error) -> String {
    let error = ErrorResponse {
        error: err.to_string(),
    };
    serde_json::to_string(&error).unwrap_or_else(|_| String::from(r#"{"error": "internal error"}"#))
}
