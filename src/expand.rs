use itertools::Itertools;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::schema::DictDb;
use crate::search::{SearchMode, SearchResult};
use crate::state::UserState;
use crate::transliterate::to_search_terms;

/// Search every equivalent form of `query` (as typed, Devanagari, lowercased) and merge the
/// results. Each article appears once, at the position of its first hit, so results of earlier
/// terms rank above those of later ones.
pub fn search_all(
    db: &DictDb,
    query: &str,
    mode: SearchMode,
    dict_codes: &[String],
) -> Result<Vec<SearchResult>> {
    let terms = to_search_terms(query);
    if terms.is_empty() {
        return Err(Error::InvalidInput("query cannot be empty".to_owned()));
    }
    let mut merged = Vec::new();
    for term in &terms {
        let results = db.search(term, mode, dict_codes)?;
        debug!("{mode} search for '{term}': {} results", results.len());
        merged.extend(results);
    }
    Ok(dedupe_by_article(merged))
}

/// Keep the first result of every article, preserving order.
pub fn dedupe_by_article(results: Vec<SearchResult>) -> Vec<SearchResult> {
    results
        .into_iter()
        .unique_by(|result| result.article_id)
        .collect()
}

/// [`search_all`], and remember the query in the history if it found anything. A failure to
/// record the query does not fail the search.
pub fn search_and_record(
    db: &DictDb,
    state: &mut impl UserState,
    query: &str,
    mode: SearchMode,
    dict_codes: &[String],
) -> Result<Vec<SearchResult>> {
    let results = search_all(db, query, mode, dict_codes)?;
    if !results.is_empty()
        && let Err(err) = state.record_query(query.trim())
    {
        warn!("Could not record '{}' in the history: {err}", query.trim());
    }
    Ok(results)
}
