/*
Source Format

One JSON file per dictionary, named after the dictionary code (e.g. mw.json):

{
  "name": "display name",
  "source": "optional provenance note",
  "data": {
    "words": { "<headword>": <indices>, ... },
    "text": { "<index>": "<article content>", ... }
  }
}

- headwords are IAST or Devanagari
- <indices> point into "text" and come in three shapes: 12, [12, 13] or "12,13"
- article content may contain lightweight markup (<b>, <i>, <br>)
- the display name and languages of known dictionaries come from config::dict_meta instead

The grammar of the joined string shape:

indices = index {"," index}
index = [space] integer [space]

*/

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use itertools::Itertools;
use log::{debug, warn};
use nom::{
    IResult, Parser,
    bytes::complete::take_till,
    character::complete::{char, i64, space0},
    combinator::all_consuming,
    multi::separated_list1,
    sequence::delimited,
};
use serde::Deserialize;

use crate::bulk_load::BulkLoader;
use crate::common::ArticleId;
use crate::config::{FALLBACK_LANGS, dict_meta};
use crate::error::{Result, SourceError};
use crate::transliterate::{iast_to_devanagari, is_devanagari};

#[derive(Debug, Deserialize)]
pub struct DictSource {
    pub name: String,
    #[serde(default)]
    pub source: Option<String>,
    pub data: SourceData,
}

#[derive(Debug, Default, Deserialize)]
pub struct SourceData {
    #[serde(default)]
    pub words: BTreeMap<String, ArticleIndices>,
    #[serde(default)]
    pub text: HashMap<String, String>,
}

/// Article indices of a headword in any of the shapes found in source files
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ArticleIndices {
    Single(i64),
    List(Vec<i64>),
    Joined(String),
}

impl ArticleIndices {
    /// Normalize to a plain list, dropping duplicates and unparsable parts of a joined string.
    pub fn into_indices(self) -> Vec<i64> {
        let indices = match self {
            ArticleIndices::Single(index) => vec![index],
            ArticleIndices::List(indices) => indices,
            ArticleIndices::Joined(joined) => parse_joined_indices(&joined),
        };
        indices.into_iter().unique().collect()
    }
}

fn parse_index_parts(joined: &str) -> IResult<&str, Vec<&str>> {
    separated_list1(char(','), take_till(|c| c == ',')).parse(joined)
}

fn parse_index(part: &str) -> IResult<&str, i64> {
    all_consuming(delimited(space0, i64, space0)).parse(part)
}

fn parse_joined_indices(joined: &str) -> Vec<i64> {
    let Ok((_, parts)) = parse_index_parts(joined) else {
        warn!("Cannot split article indices '{joined}'");
        return vec![];
    };
    parts
        .into_iter()
        .filter_map(|part| match parse_index(part) {
            Ok((_, index)) => Some(index),
            Err(_) => {
                warn!("Ignoring malformed article index '{part}' in '{joined}'");
                None
            }
        })
        .collect()
}

/// Counts of what one source file contributed to the index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub code: String,
    pub words: usize,
    pub articles: usize,
    /// Headword indices that point to no article of the file
    pub unresolved: usize,
}

impl DictSource {
    pub fn from_path(path: &Path) -> std::result::Result<Self, SourceError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> std::result::Result<Self, SourceError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Insert the dictionary, its articles in ascending index order and its headwords in lexical
    /// order, so that repeated runs assign the same article ids.
    pub fn load_into(&self, code: &str, loader: &BulkLoader<'_>) -> Result<LoadStats> {
        let (name, from_lang, to_lang, favorite) = match dict_meta(code) {
            Some(meta) => (meta.name, meta.from_lang, meta.to_lang, meta.favorite),
            None => (self.name.as_str(), FALLBACK_LANGS.0, FALLBACK_LANGS.1, false),
        };
        loader.insert_dictionary(code, name, from_lang, to_lang, favorite)?;

        let mut texts = BTreeMap::new();
        for (index, content) in &self.data.text {
            match index.trim().parse::<i64>() {
                Ok(index) => {
                    texts.insert(index, content);
                }
                Err(_) => warn!("{code}: ignoring article with non-numeric index '{index}'"),
            }
        }

        let mut stats = LoadStats {
            code: code.to_owned(),
            ..LoadStats::default()
        };
        let mut article_ids: HashMap<i64, ArticleId> = HashMap::with_capacity(texts.len());
        for (index, content) in texts {
            article_ids.insert(index, loader.insert_article(code, content)?);
            stats.articles += 1;
        }

        for (headword, indices) in &self.data.words {
            let word_iast = headword.trim();
            if word_iast.is_empty() {
                continue;
            }
            let word_deva = if is_devanagari(word_iast) {
                word_iast.to_owned()
            } else {
                iast_to_devanagari(word_iast)
            };
            for index in indices.clone().into_indices() {
                let Some(&article_id) = article_ids.get(&index) else {
                    debug!("{code}: '{word_iast}' points to missing article {index}");
                    stats.unresolved += 1;
                    continue;
                };
                loader.insert_word(word_iast, &word_deva, article_id, code)?;
                stats.words += 1;
            }
        }
        Ok(stats)
    }
}
