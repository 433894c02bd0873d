use kosha::common::strip_markup;
use kosha::config;
use kosha::expand::{search_all, search_and_record};
use kosha::indexer;
use kosha::state::{StateStore, UserState};
use kosha::tools;
use kosha::transliterate::{devanagari_to_iast, iast_to_devanagari, is_devanagari};
use kosha::{DictDb, IndexStatus, SearchMode};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "kosha")]
#[command(version)]
#[command(about = "Sanskrit dictionary lookup across many dictionaries, in IAST or Devanagari", long_about = None)]
struct Cli {
    /// Index database (.db), defaults to sanskrit.db in the user data directory
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// State database with search history and starred articles, defaults to state.db next to the default index
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the index database from a directory of dictionary .json files
    Index {
        /// Directory with one <code>.json file per dictionary
        input_dir: PathBuf,
    },
    /// Search all or some dictionaries
    Search {
        /// Headword (or text with --mode reverse), in IAST or Devanagari
        query: String,

        /// exact, prefix, fuzzy or reverse (full text in article content)
        #[arg(short, long, default_value = "exact")]
        mode: SearchMode,

        /// Restrict the search to these dictionary codes, e.g. -d mw -d ap90
        #[arg(short, long = "dict")]
        dicts: Vec<String>,

        /// Maximum number of results to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Print the article content of each result
        #[arg(short, long)]
        content: bool,

        /// Don't record the query in the search history
        #[arg(long)]
        no_history: bool,
    },
    /// Print one article
    Article {
        /// Article id as shown by search
        id: i64,
    },
    /// List the indexed dictionaries
    Dicts,
    /// Transliterate between IAST and Devanagari
    Translit {
        text: String,

        /// Target script, by default the one the text is not written in
        #[arg(short, long)]
        to: Option<Script>,
    },
    /// Star an article, or unstar it if it is starred already
    Star {
        /// Article id as shown by search
        id: i64,
    },
    /// Show starred articles
    Starred,
    /// Show past queries, most frequent first if a prefix is given, otherwise the latest
    History {
        prefix: Option<String>,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Answer newline-delimited JSON tool requests on stdin until it is closed
    Serve,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Script {
    Iast,
    Deva,
}

fn database_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    cli.db
        .clone()
        .or_else(config::default_database_path)
        .ok_or_else(|| anyhow!("No data directory on this platform, use --db"))
}

fn state_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    cli.state
        .clone()
        .or_else(config::default_state_path)
        .ok_or_else(|| anyhow!("No data directory on this platform, use --state"))
}

fn open_database(path: &Path) -> anyhow::Result<DictDb> {
    if !path.is_file() {
        bail!(
            "Index database {} not found, build it with `kosha index`",
            path.display()
        );
    }
    let db = DictDb::open(path)
        .with_context(|| format!("Could not open index database {}", path.display()))?;
    if db.index_status()? != IndexStatus::FullText {
        eprintln!(
            "Warning: {} has no full-text indexes, reverse search will find nothing",
            path.display()
        );
    }
    Ok(db)
}

fn run_index(input_dir: &Path, output: &Path) -> anyhow::Result<bool> {
    if !input_dir.is_dir() {
        bail!("Input directory {} does not exist", input_dir.display());
    }
    let summary = indexer::build_index(input_dir, output)
        .with_context(|| format!("Could not build index {}", output.display()))?;
    for failure in &summary.failures {
        eprintln!("ERROR {}: {}", failure.path.display(), failure.reason);
    }
    println!(
        "Indexed {} words, {} articles from {} dictionaries in {:.1?}",
        summary.words, summary.articles, summary.files_indexed, summary.elapsed
    );
    if let Ok(meta) = fs::metadata(output) {
        #[expect(clippy::cast_precision_loss, reason = "file size for display only")]
        let size_mb = meta.len() as f64 / (1024.0 * 1024.0);
        println!("Database size: {size_mb:.2} MB");
    }
    Ok(summary.failures.is_empty())
}

fn run_search(
    cli: &Cli,
    query: &str,
    mode: SearchMode,
    dicts: &[String],
    limit: usize,
    content: bool,
    no_history: bool,
) -> anyhow::Result<()> {
    let db = open_database(&database_path(cli)?)?;
    let results = if no_history {
        search_all(&db, query, mode, dicts)?
    } else {
        let mut state = StateStore::open(&state_path(cli)?)?;
        search_and_record(&db, &mut state, query, mode, dicts)?
    };
    if results.is_empty() {
        eprintln!("No results for '{query}'");
        return Ok(());
    }
    let shown = &results[..results.len().min(limit)];
    let contents = if content {
        let ids: Vec<i64> = shown.iter().map(|r| r.article_id).collect();
        db.get_article_contents(&ids)?
    } else {
        Default::default()
    };
    for result in shown {
        println!(
            "{} [{}] #{}",
            result.word, result.dict_code, result.article_id
        );
        if let Some(text) = contents.get(&result.article_id) {
            println!("{}\n", strip_markup(text).trim());
        }
    }
    if results.len() > shown.len() {
        eprintln!("{} of {} results shown", shown.len(), results.len());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let mut status_ok = true;

    match &cli.command {
        Command::Index { input_dir } => {
            status_ok = run_index(input_dir, &database_path(&cli)?)?;
        }
        Command::Search {
            query,
            mode,
            dicts,
            limit,
            content,
            no_history,
        } => {
            run_search(&cli, query, *mode, dicts, *limit, *content, *no_history)?;
        }
        Command::Article { id } => {
            let db = open_database(&database_path(&cli)?)?;
            let Some(article) = db.get_article(*id)?.into_iter().next() else {
                bail!("Article {id} not found");
            };
            println!("{} [{}: {}]\n", article.word, article.dict_code, article.dict_name);
            println!(
                "{}",
                strip_markup(article.content.as_deref().unwrap_or_default()).trim()
            );
        }
        Command::Dicts => {
            let db = open_database(&database_path(&cli)?)?;
            for dict in db.list_dictionaries()? {
                let favorite = if dict.favorite { "*" } else { " " };
                println!(
                    "{favorite} {:<6} {}-{}  {}",
                    dict.code, dict.from_lang, dict.to_lang, dict.name
                );
            }
        }
        Command::Translit { text, to } => {
            let to = to.unwrap_or(if is_devanagari(text) {
                Script::Iast
            } else {
                Script::Deva
            });
            let output = match to {
                Script::Iast => devanagari_to_iast(text),
                Script::Deva => iast_to_devanagari(text),
            };
            println!("{output}");
        }
        Command::Star { id } => {
            let db = open_database(&database_path(&cli)?)?;
            let Some(article) = db.get_article(*id)?.into_iter().next() else {
                bail!("Article {id} not found");
            };
            let mut state = StateStore::open(&state_path(&cli)?)?;
            let starred = state.toggle_star(&article)?;
            println!(
                "{} #{id} [{}] {}",
                article.word,
                article.dict_code,
                if starred { "starred" } else { "unstarred" }
            );
        }
        Command::Starred => {
            let state = StateStore::open(&state_path(&cli)?)?;
            for article in state.starred_articles()? {
                println!(
                    "{} [{}] #{}",
                    article.word, article.dict_code, article.article_id
                );
            }
        }
        Command::History { prefix, limit } => {
            let state = StateStore::open(&state_path(&cli)?)?;
            let queries = match prefix {
                Some(prefix) => state.search_history(prefix, *limit)?,
                None => state.recent_history(*limit)?,
            };
            for query in queries {
                println!("{query}");
            }
        }
        Command::Serve => {
            let db = open_database(&database_path(&cli)?)?;
            tools::serve(&db, io::stdin().lock(), io::stdout().lock())?;
        }
    }

    if status_ok {
        Ok(())
    } else {
        Err(anyhow!("Some dictionaries could not be indexed"))
    }
}
