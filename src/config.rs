use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "kosha";
pub const DATABASE_FILE_NAME: &str = "sanskrit.db";
pub const STATE_FILE_NAME: &str = "state.db";

/// Hard cap on rows returned by a single search query.
pub const RESULT_LIMIT: usize = 1000;
pub const DEFAULT_TOOL_LIMIT: usize = 50;
pub const MAX_TOOL_LIMIT: usize = 1000;

/// Length of the fallback excerpt of a full-text hit whose content has no space.
pub const EXCERPT_CHARS: usize = 40;

/// Values of `PRAGMA user_version`, recording how far the index artifact was built.
pub const STATUS_BASE_TABLES: i64 = 1;
pub const STATUS_FULL_TEXT: i64 = 2;

/// Serving mode: concurrent readers with a single writer.
pub const READ_PRAGMAS: &str = r"
PRAGMA journal_mode = WAL;
PRAGMA mmap_size = 268435456;
";

/// One-shot offline load: durability and locking are relaxed, only the committed result matters.
/// The rollback journal is kept in memory so that a failed source file can still be rolled back.
pub const BULK_PRAGMAS: &str = r"
PRAGMA journal_mode = MEMORY;
PRAGMA synchronous = OFF;
PRAGMA cache_size = -64000;
PRAGMA mmap_size = 268435456;
PRAGMA temp_store = MEMORY;
PRAGMA locking_mode = EXCLUSIVE;
";

/* Base tables of the index. No auxiliary indexes and no full-text structures, so that bulk inserts
stay cheap; FULL_TEXT_SCHEMA adds those after all rows are loaded.

Each dictionary (dicts) owns articles, which hold the definitional text. A headword occurrence (words)
points to exactly one article; several headwords may point to the same article and the same headword
may occur in many dictionaries. word_deva is computed at load time from word_iast, or equals it if the
source headword is already in Devanagari. */
pub const BULK_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "dicts" (
	"code" TEXT PRIMARY KEY,
	"name" TEXT NOT NULL,
	"from_lang" TEXT,
	"to_lang" TEXT,
	-- favorites sort first, they are never excluded
	"favorite" INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS "articles" (
	"id" INTEGER PRIMARY KEY,
	"dict_code" TEXT NOT NULL,
	-- may contain lightweight markup (<b>, <i>, <br>)
	"content" TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS "words" (
	"id" INTEGER PRIMARY KEY,
	"word_iast" TEXT NOT NULL,
	"word_deva" TEXT,
	"article_id" INTEGER NOT NULL,
	"dict_code" TEXT NOT NULL
);
"#;

/* Full-text structures are external-content FTS5 tables over words and articles. The 'rebuild'
command repopulates them from the base tables in one pass, so running this batch again never
inserts rows twice. Triggers keep them in sync for single-row inserts made after the bulk load. */
pub const FULL_TEXT_SCHEMA: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS "words_fts" USING fts5(
	word_iast,
	word_deva,
	content='words',
	content_rowid='id',
	tokenize='unicode61 remove_diacritics 0'
);

CREATE VIRTUAL TABLE IF NOT EXISTS "articles_fts" USING fts5(
	content,
	content='articles',
	content_rowid='id',
	tokenize='unicode61 remove_diacritics 0'
);

INSERT INTO words_fts(words_fts) VALUES ('rebuild');
INSERT INTO articles_fts(articles_fts) VALUES ('rebuild');

CREATE INDEX IF NOT EXISTS "idx_words_article" ON "words" ("article_id");
CREATE INDEX IF NOT EXISTS "idx_words_dict" ON "words" ("dict_code");
CREATE INDEX IF NOT EXISTS "idx_articles_dict" ON "articles" ("dict_code");

CREATE TRIGGER IF NOT EXISTS "words_ai" AFTER INSERT ON "words" BEGIN
	INSERT INTO words_fts(rowid, word_iast, word_deva) VALUES (new.id, new.word_iast, new.word_deva);
END;

CREATE TRIGGER IF NOT EXISTS "articles_ai" AFTER INSERT ON "articles" BEGIN
	INSERT INTO articles_fts(rowid, content) VALUES (new.id, new.content);
END;
"#;

/// Canonical metadata of a known dictionary, overriding whatever its source file claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DictMeta {
    pub name: &'static str,
    pub from_lang: &'static str,
    pub to_lang: &'static str,
    pub favorite: bool,
}

/// Get the canonical metadata (name, source language, target language, favorite) of a known dictionary
pub fn dict_meta(code: &str) -> Option<DictMeta> {
    let (name, from_lang, to_lang, favorite) = match code {
        "mw" => ("Monier-Williams Sanskrit-English Dictionary - 1899", "sa", "en", true),
        "ap90" => ("Apte Practical Sanskrit-English Dictionary - 1890", "sa", "en", true),
        "ben" => ("Benfey Sanskrit-English Dictionary - 1866", "sa", "en", true),
        "wil" => ("Wilson Sanskrit-English Dictionary - 1832", "sa", "en", true),
        "pwg" => ("Böhtlingk and Roth Grosses Petersburger Wörterbuch - 1855", "sa", "de", true),
        "shs" => ("Shabda-Sagara Sanskrit-English Dictionary - 1900", "sa", "en", true),
        "md" => ("Macdonell Sanskrit-English Dictionary - 1893", "sa", "en", true),
        "cae" => ("Cappeller Sanskrit-English Dictionary - 1891", "sa", "en", true),
        "yat" => ("Yates Sanskrit-English Dictionary - 1846", "sa", "en", true),
        "gst" => ("Goldstücker Sanskrit-English Dictionary - 1856", "sa", "en", false),
        "stc" => ("Stchoupak Dictionnaire Sanscrit-Français - 1932", "sa", "fr", false),
        "pe" => ("Puranic Encyclopedia - 1975", "sa", "en", false),
        "bur" => ("Burnouf Dictionnaire Sanscrit-Français - 1866", "sa", "fr", false),
        "krm" => ("Kṛdantarūpamālā - 1965", "sa", "sa", false),
        "sch" => ("Schmidt Nachträge zum Sanskrit-Wörterbuch - 1928", "sa", "de", false),
        "acc" => ("Aufrecht's Catalogus Catalogorum - 1962", "sa", "en", false),
        "mwe" => ("Monier-Williams English-Sanskrit Dictionary - 1851", "en", "sa", false),
        "bop" => ("Bopp Glossarium Sanscritum - 1847", "sa", "la", false),
        "skd" => ("Sabda-kalpadruma - 1886", "sa", "sa", false),
        "ieg" => ("Indian Epigraphical Glossary - 1966", "sa", "en", false),
        "pw" => ("Böhtlingk Sanskrit-Wörterbuch in kürzerer Fassung - 1879", "sa", "de", false),
        "pui" => ("The Purana Index - 1951", "sa", "en", false),
        "lan" => ("Lanman's Sanskrit Reader Vocabulary - 1884", "sa", "en", false),
        "gra" => ("Grassmann Wörterbuch zum Rig Veda", "sa", "de", false),
        "inm" => ("Index to the Names in the Mahabharata - 1904", "sa", "en", false),
        "bor" => ("Borooah English-Sanskrit Dictionary - 1877", "en", "sa", false),
        "armh" => ("Abhidhānaratnamālā of Halāyudha - 1861", "sa", "sa", false),
        "snp" => ("Meulenbeld's Sanskrit Names of Plants - 1974", "sa", "la", false),
        "vcp" => ("Vacaspatyam", "sa", "sa", false),
        "ae" => ("Apte Student's English-Sanskrit Dictionary - 1920", "en", "sa", false),
        "bhs" => ("Edgerton Buddhist Hybrid Sanskrit Dictionary - 1953", "sa", "en", false),
        "pgn" => ("Personal and Geographical Names in the Gupta Inscriptions - 1978", "sa", "en", false),
        "mw72" => ("Monier-Williams Sanskrit-English Dictionary - 1872", "sa", "en", false),
        "vei" => ("The Vedic Index of Names and Subjects - 1912", "sa", "en", false),
        "ccs" => ("Cappeller Sanskrit Wörterbuch - 1887", "sa", "de", false),
        "mci" => ("Mahabharata Cultural Index - 1993", "sa", "en", false),
        _ => {
            return None;
        }
    };
    Some(DictMeta {
        name,
        from_lang,
        to_lang,
        favorite,
    })
}

/// Language pair assumed for dictionaries missing from the metadata table.
pub const FALLBACK_LANGS: (&str, &str) = ("sa", "en");

/// `<data dir>/kosha`, e.g. `~/.local/share/kosha` on Linux. None if the platform has no data dir.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR_NAME))
}

pub fn default_database_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join(DATABASE_FILE_NAME))
}

pub fn default_state_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join(STATE_FILE_NAME))
}
