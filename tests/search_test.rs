use std::collections::HashSet;
use std::io::Cursor;

use kosha::bulk_load::BulkLoader;
use kosha::expand::{search_all, search_and_record};
use kosha::state::StateStore;
use kosha::tools::{self, ToolRequest, ToolResponse};
use kosha::transliterate::iast_to_devanagari;
use kosha::{DictDb, Error, IndexStatus, SearchMode, SearchResult};

fn add(loader: &BulkLoader<'_>, code: &str, words: &[&str], content: &str) -> i64 {
    let article_id = loader.insert_article(code, content).unwrap();
    for word in words {
        loader
            .insert_word(word, &iast_to_devanagari(word), article_id, code)
            .unwrap();
    }
    article_id
}

/// mw and ap90 are favorites, pw is not. All three have "dharma".
fn fixture_without_full_text() -> DictDb {
    let mut db = DictDb::open_in_memory().unwrap();
    db.init_bulk_schema().unwrap();
    let loader = db.begin_bulk_load().unwrap();
    loader
        .insert_dictionary("mw", "Monier-Williams", "sa", "en", true)
        .unwrap();
    loader
        .insert_dictionary("ap90", "Apte", "sa", "en", true)
        .unwrap();
    loader
        .insert_dictionary("pw", "Böhtlingk", "sa", "de", false)
        .unwrap();
    add(&loader, "mw", &["dharma"], "dharma m. that which is established, law, duty");
    add(&loader, "mw", &["karma"], "karma n. act, action, performance");
    add(&loader, "mw", &["yoga", "yogin"], "yoga m. the act of yoking, union");
    add(&loader, "ap90", &["dharma"], "dharma m. religion, virtue, <b>duty</b>");
    add(&loader, "ap90", &["dharmakāya"], "dharmakāya m. the body of the law");
    add(&loader, "pw", &["dharma"], "dharma m. Satzung, Recht, Pflicht");
    add(&loader, "pw", &["arma"], "arma m. Trümmer");
    loader.commit().unwrap();
    db
}

fn fixture() -> DictDb {
    let mut db = fixture_without_full_text();
    db.rebuild_full_text_indexes().unwrap();
    db
}

fn codes(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.dict_code.as_str()).collect()
}

fn words(results: &[SearchResult]) -> Vec<&str> {
    results.iter().map(|r| r.word.as_str()).collect()
}

fn article_ids(results: &[SearchResult]) -> HashSet<i64> {
    results.iter().map(|r| r.article_id).collect()
}

#[test]
fn test_exact_search_case_insensitive_multi_dictionary() {
    let db = fixture();
    for query in ["dharma", "DHARMA", "Dharma", " dharma "] {
        let results = search_all(&db, query, SearchMode::Exact, &[]).unwrap();
        assert_eq!(results.len(), 3, "{query}");
        assert_eq!(
            codes(&results).into_iter().collect::<HashSet<_>>(),
            HashSet::from(["mw", "ap90", "pw"])
        );
        assert_eq!(db.search(query, SearchMode::Exact, &[]).unwrap().len(), 3);
    }
}

#[test]
fn test_concrete_scenario() {
    let db = fixture();
    let iast = search_all(&db, "dharma", SearchMode::Exact, &[]).unwrap();
    // favorites first, then by code
    assert_eq!(codes(&iast), vec!["ap90", "mw", "pw"]);
    assert!(iast.iter().all(|r| r.word == "dharma" && r.content.is_none()));

    let deva = search_all(&db, "धर्म", SearchMode::Exact, &[]).unwrap();
    assert_eq!(deva, iast);

    let filtered = search_all(&db, "dharma", SearchMode::Exact, &["pw".to_owned()]).unwrap();
    assert_eq!(codes(&filtered), vec!["pw"]);
    assert_eq!(filtered[0].dict_name, "Böhtlingk");
}

#[test]
fn test_dictionary_filter_is_strict_subset() {
    let db = fixture();
    let mw = ["mw".to_owned()];
    for mode in SearchMode::ALL {
        let results = search_all(&db, "dharma", mode, &mw).unwrap();
        assert!(!results.is_empty(), "{mode}");
        assert!(results.iter().all(|r| r.dict_code == "mw"), "{mode}");
    }
    let two = ["mw".to_owned(), "pw".to_owned()];
    for mode in SearchMode::ALL {
        let results = db.search("dharma", mode, &two).unwrap();
        assert!(results.iter().all(|r| r.dict_code != "ap90"), "{mode}");
        assert!(codes(&results).contains(&"pw"), "{mode}");
    }
    assert!(
        search_all(&db, "dharma", SearchMode::Exact, &["ccs".to_owned()])
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_prefix_results_are_fuzzy_results() {
    let db = fixture();
    for query in ["dharma", "dha", "arm", "arma", "yog", "ध", "धर्म"] {
        let prefix = search_all(&db, query, SearchMode::Prefix, &[]).unwrap();
        let fuzzy = search_all(&db, query, SearchMode::Fuzzy, &[]).unwrap();
        assert!(
            article_ids(&prefix).is_subset(&article_ids(&fuzzy)),
            "{query}"
        );
    }
    assert_eq!(
        words(&search_all(&db, "arma", SearchMode::Prefix, &[]).unwrap()),
        vec!["arma"]
    );
    assert_eq!(
        search_all(&db, "arma", SearchMode::Fuzzy, &[])
            .unwrap()
            .len(),
        6
    );
}

#[test]
fn test_prefix_ordering() {
    let db = fixture();
    let results = db.search("dharma", SearchMode::Prefix, &[]).unwrap();
    let ordered: Vec<(&str, &str)> = results
        .iter()
        .map(|r| (r.dict_code.as_str(), r.word.as_str()))
        .collect();
    // favorites, then shorter headwords, then code
    assert_eq!(
        ordered,
        vec![
            ("ap90", "dharma"),
            ("mw", "dharma"),
            ("ap90", "dharmakāya"),
            ("pw", "dharma"),
        ]
    );
    // the Devanagari column is searched as well
    assert_eq!(db.search("ध", SearchMode::Prefix, &[]).unwrap(), results);
}

#[test]
fn test_like_wildcards_are_literal() {
    let db = fixture();
    assert!(db.search("%", SearchMode::Fuzzy, &[]).unwrap().is_empty());
    assert!(db.search("_", SearchMode::Prefix, &[]).unwrap().is_empty());
    assert!(db.search("d_arma", SearchMode::Fuzzy, &[]).unwrap().is_empty());
}

#[test]
fn test_shared_handle_across_threads() {
    let db = fixture();
    let expected = db.search("dharma", SearchMode::Exact, &[]).unwrap();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let db = &db;
                scope.spawn(move || {
                    let mode = SearchMode::ALL[i % SearchMode::ALL.len()];
                    let results = search_all(db, "dharma", mode, &[]).unwrap();
                    let exact = db.search("dharma", SearchMode::Exact, &[]).unwrap();
                    let article = db.get_article(exact[0].article_id).unwrap();
                    (results.len(), exact, article.len())
                })
            })
            .collect();
        for handle in handles {
            let (found, exact, articles) = handle.join().unwrap();
            assert!(found > 0);
            assert_eq!(exact, expected);
            assert_eq!(articles, 1);
        }
    });
}

#[test]
fn test_deferred_full_text() {
    let mut db = fixture_without_full_text();
    assert_eq!(db.index_status().unwrap(), IndexStatus::BaseTables);
    // headword modes work without the full-text structures
    assert_eq!(db.search("dharma", SearchMode::Exact, &[]).unwrap().len(), 3);
    assert!(db.search("duty", SearchMode::Reverse, &[]).unwrap().is_empty());
    assert!(matches!(db.finalize(), Err(Error::FullTextNotBuilt)));

    db.rebuild_full_text_indexes().unwrap();
    let results = db.search("duty", SearchMode::Reverse, &[]).unwrap();
    assert_eq!(codes(&results), vec!["ap90", "mw"]);
    assert!(results.iter().all(|r| r.word == "dharma" && r.content.is_none()));
    db.finalize().unwrap();
}

#[test]
fn test_rebuild_twice_does_not_duplicate() {
    let mut db = fixture();
    let before = db.search("law", SearchMode::Reverse, &[]).unwrap();
    assert_eq!(before.len(), 2);
    db.rebuild_full_text_indexes().unwrap();
    let after = db.search("law", SearchMode::Reverse, &[]).unwrap();
    assert_eq!(before, after);
}

#[test]
fn test_reverse_search() {
    let db = fixture();
    // markup does not hide words from the full-text index
    assert_eq!(
        codes(&db.search("duty", SearchMode::Reverse, &[]).unwrap()),
        vec!["ap90", "mw"]
    );
    assert_eq!(
        codes(&db.search("Pflicht", SearchMode::Reverse, &[]).unwrap()),
        vec!["pw"]
    );
    assert!(db.search("law, duty", SearchMode::Reverse, &[]).is_ok());
    assert!(db.search("\"duty", SearchMode::Reverse, &[]).is_ok());
    assert!(db.search("AND OR NOT", SearchMode::Reverse, &[]).is_ok());
}

#[test]
fn test_single_row_inserts_after_rebuild() {
    let db = fixture();
    db.insert_dictionary("ben", "Benfey", "sa", "en", true)
        .unwrap();
    let article = db.insert_article("ben", "yajña m. sacrifice").unwrap();
    db.insert_word("yajña", &iast_to_devanagari("yajña"), article, "ben")
        .unwrap();
    let long = "y".repeat(45);
    let unspaced = db.insert_article("ben", &long).unwrap();

    let hits = db.search("sacrifice", SearchMode::Reverse, &[]).unwrap();
    assert_eq!(words(&hits), vec!["yajña"]);
    assert_eq!(hits[0].article_id, article);
    assert_eq!(
        search_all(&db, "यज्ञ", SearchMode::Exact, &[]).unwrap()[0].article_id,
        article
    );

    let hits = db.search(&long, SearchMode::Reverse, &[]).unwrap();
    assert_eq!(hits[0].article_id, unspaced);
    assert_eq!(hits[0].word, "y".repeat(40));
}

#[test]
fn test_get_article() {
    let db = fixture();
    let yoga = db.search("yogin", SearchMode::Exact, &[]).unwrap()[0].article_id;
    let article = db.get_article(yoga).unwrap();
    assert_eq!(article.len(), 1);
    // the first of several headwords is shown
    assert_eq!(article[0].word, "yoga");
    assert_eq!(article[0].dict_name, "Monier-Williams");
    assert_eq!(
        article[0].content.as_deref(),
        Some("yoga m. the act of yoking, union")
    );

    assert!(db.get_article(9999).unwrap().is_empty());
    assert_eq!(db.get_article_content(9999).unwrap(), None);
    assert_eq!(
        db.get_article_content(yoga).unwrap().as_deref(),
        Some("yoga m. the act of yoking, union")
    );
}

#[test]
fn test_get_article_contents() {
    let db = fixture();
    let results = search_all(&db, "dharma", SearchMode::Exact, &[]).unwrap();
    let mut ids: Vec<i64> = results.iter().map(|r| r.article_id).collect();
    ids.push(9999);
    let contents = db.get_article_contents(&ids).unwrap();
    assert_eq!(contents.len(), 3);
    assert!(!contents.contains_key(&9999));
    assert!(contents.values().all(|c| c.starts_with("dharma m.")));
    assert!(db.get_article_contents(&[]).unwrap().is_empty());
}

#[test]
fn test_list_dictionaries() {
    let db = fixture();
    let dicts = db.list_dictionaries().unwrap();
    let listed: Vec<(&str, bool)> = dicts.iter().map(|d| (d.code.as_str(), d.favorite)).collect();
    assert_eq!(listed, vec![("ap90", true), ("mw", true), ("pw", false)]);
    assert_eq!(dicts[2].to_lang, "de");
    let stats = db.stats().unwrap();
    assert_eq!((stats.dictionaries, stats.articles, stats.words), (3, 7, 8));
}

#[test]
fn test_empty_query() {
    let db = fixture();
    for mode in SearchMode::ALL {
        assert!(db.search("", mode, &[]).unwrap().is_empty());
        assert!(db.search("   ", mode, &[]).unwrap().is_empty());
        assert!(matches!(
            search_all(&db, " ", mode, &[]),
            Err(Error::InvalidInput(_))
        ));
    }
}

#[test]
fn test_search_and_record() {
    let db = fixture();
    let mut state = StateStore::open_in_memory().unwrap();
    let results =
        search_and_record(&db, &mut state, " dharma ", SearchMode::Exact, &[]).unwrap();
    assert_eq!(results.len(), 3);
    assert!(
        search_and_record(&db, &mut state, "nothing", SearchMode::Exact, &[])
            .unwrap()
            .is_empty()
    );
    assert_eq!(state.recent_history(10).unwrap(), vec!["dharma"]);
}

#[test]
fn test_tool_search() {
    let db = fixture();
    let response = tools::dispatch(
        &db,
        ToolRequest::Search {
            query: "dharma".to_owned(),
            mode: "exact".to_owned(),
            dict_codes: vec![],
            limit: Some(2),
        },
    )
    .unwrap();
    let ToolResponse::Search {
        count,
        total,
        truncated,
        results,
    } = response
    else {
        panic!("not a search response");
    };
    assert_eq!((count, total, truncated), (2, 3, true));
    assert_eq!(codes(&results), vec!["ap90", "mw"]);

    assert!(matches!(
        tools::dispatch(
            &db,
            ToolRequest::Search {
                query: "dharma".to_owned(),
                mode: "contains".to_owned(),
                dict_codes: vec![],
                limit: None,
            }
        ),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_tool_get_article() {
    let db = fixture();
    let id = db.search("duty", SearchMode::Reverse, &["ap90".to_owned()]).unwrap()[0].article_id;
    let response = tools::dispatch(&db, ToolRequest::GetArticle { article_id: id }).unwrap();
    assert_eq!(
        serde_json::to_value(response).unwrap(),
        serde_json::json!({
            "word": "dharma",
            "dict_code": "ap90",
            "dict_name": "Apte",
            "content": "dharma m. religion, virtue, duty",
        })
    );
    assert!(matches!(
        tools::dispatch(&db, ToolRequest::GetArticle { article_id: 9999 }),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn test_serve() {
    let db = fixture();
    let input = concat!(
        r#"{"tool": "search", "query": "धर्म", "mode": "exact", "dict_codes": ["pw"]}"#,
        "\n",
        "not json\n",
        "\n",
        r#"{"tool": "transliterate", "text": "धर्म", "direction": "iast"}"#,
        "\n",
        r#"{"tool": "list_dictionaries"}"#,
        "\n",
    );
    let mut output = Vec::new();
    tools::serve(&db, Cursor::new(input), &mut output).unwrap();
    let lines: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["total"], 1);
    assert_eq!(lines[0]["results"][0]["dict_code"], "pw");
    assert!(lines[1]["error"].as_str().unwrap().contains("invalid request"));
    assert_eq!(lines[2]["transliterated"], "dharma");
    assert_eq!(lines[3]["dictionaries"].as_array().unwrap().len(), 3);
}
