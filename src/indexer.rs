use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::error::{Error, Result};
use crate::schema::DictDb;
use crate::source::DictSource;

/// A source file that was skipped, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Totals over the source files that were indexed successfully.
#[derive(Debug, Clone, Default)]
pub struct IndexSummary {
    pub files_indexed: usize,
    pub words: usize,
    pub articles: usize,
    pub failures: Vec<FileFailure>,
    pub elapsed: Duration,
}

/// All `*.json` files directly inside `input_dir`, sorted by name.
pub fn find_source_files(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

/// The database file and the `-wal`/`-shm` files a serving connection may have left next to it.
fn remove_database(path: &Path) -> io::Result<()> {
    remove_if_exists(path)?;
    for suffix in ["-wal", "-shm"] {
        let mut sibling = path.as_os_str().to_owned();
        sibling.push(suffix);
        remove_if_exists(Path::new(&sibling))?;
    }
    Ok(())
}

/// Build a complete index artifact at `output` from the dictionary files in `input_dir`, replacing
/// any existing file. A source file that cannot be read, parsed or inserted is skipped and
/// reported in the summary.
pub fn build_index(input_dir: &Path, output: &Path) -> Result<IndexSummary> {
    let start = Instant::now();
    remove_database(output)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    info!("Opening database {}", output.display());
    let mut db = DictDb::open_for_bulk_insert(output)?;
    db.init_bulk_schema()?;

    let files = find_source_files(input_dir)?;
    info!("Found {} dictionary files", files.len());

    let mut summary = IndexSummary::default();
    let mut loader = db.begin_bulk_load()?;
    for path in files {
        let Some(code) = path.file_stem().and_then(|s| s.to_str()).map(str::to_owned) else {
            warn!("Skipping {}: file name is not valid UTF-8", path.display());
            continue;
        };
        info!("Processing {code}");
        let loaded = DictSource::from_path(&path)
            .map_err(|source| Error::Source {
                path: path.clone(),
                source,
            })
            .and_then(|source| loader.in_savepoint(|l| source.load_into(&code, l)));
        match loaded {
            Ok(stats) => {
                info!(
                    "Indexed {} words, {} articles from {code}",
                    stats.words, stats.articles
                );
                if stats.unresolved > 0 {
                    warn!(
                        "{code}: {} headword indices point to no article",
                        stats.unresolved
                    );
                }
                summary.files_indexed += 1;
                summary.words += stats.words;
                summary.articles += stats.articles;
            }
            Err(err) => {
                warn!("Skipping {}: {err}", path.display());
                summary.failures.push(FileFailure {
                    path,
                    reason: err.to_string(),
                });
            }
        }
    }
    loader.commit()?;

    db.rebuild_full_text_indexes()?;
    db.finalize()?;

    summary.elapsed = start.elapsed();
    info!(
        "Indexed {} words, {} articles from {} files in {:.1?}",
        summary.words, summary.articles, summary.files_indexed, summary.elapsed
    );
    Ok(summary)
}
