// WHY: each book file is parsed, resolved and tokenized independently (one task per file);
// finished files are merged into the index by this task alone, one at a time

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::align::{CorpusIndex, IndexBuilder};
use crate::canon::{Book, Corpus};
use crate::config::PipelineConfig;
use crate::diagnostics::{Diagnostic, RunSummary};
use crate::discovery::{self, DiscoveryConfig, FileValidation};
use crate::ketiv_qere::resolve;
use crate::morphology::{MorphologyAdapter, TextFabricDataset};
use crate::reader::{AsyncFileReader, ReaderConfig};
use crate::reference::{LineParser, ParserConfig};
use crate::tokenizer::Tokenizer;
use crate::verse::{RawLine, VerseRecord};

/// Everything produced from one book file
#[derive(Debug, Clone)]
pub struct BookIngest {
    pub corpus: Corpus,
    pub book: Book,
    pub records: Vec<VerseRecord>,
    pub diagnostics: Vec<Diagnostic>,
    pub lines_read: u64,
}

impl BookIngest {
    pub fn word_count(&self) -> usize {
        self.records.iter().map(VerseRecord::word_count).sum()
    }
}

/// Which part of the corpora a run covers
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub corpora: Vec<Corpus>,
    /// `None` means every book found
    pub books: Option<Vec<Book>>,
    pub show_progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            corpora: Corpus::ALL.to_vec(),
            books: None,
            show_progress: false,
        }
    }
}

#[derive(Debug)]
pub struct PipelineRun {
    pub index: CorpusIndex,
    pub summary: RunSummary,
}

/// Parse, resolve and tokenize one book's lines
pub fn ingest_lines(
    corpus: Corpus,
    book: Book,
    lines: &[RawLine],
    parser_config: &ParserConfig,
    tokenizer: &Tokenizer,
) -> Result<BookIngest> {
    let mut parser = LineParser::new(corpus, book, parser_config)?;
    let parsed = parser.parse_all(lines);
    let mut diagnostics = parsed.diagnostics;
    let mut records = Vec::with_capacity(parsed.verses.len());

    for verse in parsed.verses {
        let record = match corpus {
            Corpus::Hebrew => {
                let resolution = resolve(verse);
                let words = tokenizer.tokenize_resolution(&resolution);
                diagnostics.extend(resolution.diagnostics);
                VerseRecord {
                    verse: resolution.verse,
                    words,
                }
            }
            Corpus::Greek | Corpus::English => {
                let words = tokenizer.tokenize(&verse.cleaned_text, corpus, verse.key);
                VerseRecord { verse, words }
            }
        };
        records.push(record);
    }

    Ok(BookIngest {
        corpus,
        book,
        records,
        diagnostics,
        lines_read: lines.len() as u64,
    })
}

/// Read and ingest one discovered file; a read error fails the file
pub async fn ingest_file(file: &FileValidation, config: &PipelineConfig, tokenizer: &Tokenizer) -> Result<BookIngest> {
    let book = file
        .book
        .with_context(|| format!("No book for {}", file.path.display()))?;
    let reader = AsyncFileReader::new(ReaderConfig::default());
    let (lines, stats) = reader.read_raw_lines(&file.path, file.corpus).await?;
    let ingest = ingest_lines(file.corpus, book, &lines, &config.parser_config(), tokenizer)?;
    debug!(
        "Ingested {} {}: {} verses, {} words from {} lines",
        file.corpus,
        book,
        ingest.records.len(),
        ingest.word_count(),
        stats.lines_read
    );
    Ok(ingest)
}

fn progress_bar(len: u64, show: bool) -> Result<ProgressBar> {
    if !show {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new(len);
    bar.set_style(ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}",
    )?);
    Ok(bar)
}

/// Discover, ingest in parallel and merge into a canonical index
/// With fail_fast the first failure ends the run; otherwise failed books are reported and left out,
/// and a merge integrity error withdraws that corpus entirely
pub async fn run(root: &Path, config: &PipelineConfig, options: &RunOptions) -> Result<PipelineRun> {
    let start_time = std::time::Instant::now();
    let mut summary = RunSummary::default();

    let discovery_config = DiscoveryConfig {
        fail_fast: config.fail_fast,
    };
    // WHY: named books resolve straight to their conventional paths; only a full run scans
    let discovered = match &options.books {
        Some(books) => {
            discovery::collect_book_files(root, config, &options.corpora, books, discovery_config).await?
        }
        None => discovery::collect_discovered_files(root, config, &options.corpora, discovery_config).await?,
    };

    let mut files = Vec::new();
    for file in discovered {
        match (file.book, &file.error) {
            (Some(_), None) => files.push(file),
            (_, error) => {
                let error = error.clone().unwrap_or_else(|| "unplaceable file".to_string());
                summary.corpus_mut(file.corpus).failed_files += 1;
                summary.integrity_errors.push(error);
            }
        }
    }
    info!("Ingesting {} book files with {} workers", files.len(), config.max_workers);

    let progress = progress_bar(files.len() as u64, options.show_progress)?;
    let shared_config = Arc::new(config.clone());
    let tokenizer = Arc::new(Tokenizer::new()?);
    let semaphore = Arc::new(Semaphore::new(config.max_workers.max(1)));

    let mut tasks = FuturesUnordered::new();
    let mut abort_handles: BTreeMap<Corpus, Vec<AbortHandle>> = BTreeMap::new();
    for file in files {
        let corpus = file.corpus;
        let config = Arc::clone(&shared_config);
        let tokenizer = Arc::clone(&tokenizer);
        let semaphore = Arc::clone(&semaphore);
        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await?;
            let result = ingest_file(&file, &config, &tokenizer).await;
            Ok::<_, anyhow::Error>((file, result))
        });
        abort_handles.entry(corpus).or_default().push(handle.abort_handle());
        tasks.push(async move { (corpus, handle.await) });
    }
    let abort_all = |handles: &BTreeMap<Corpus, Vec<AbortHandle>>| {
        handles.values().flatten().for_each(AbortHandle::abort);
    };

    let mut builder = IndexBuilder::new();
    let mut aborted: BTreeSet<Corpus> = BTreeSet::new();
    while let Some((corpus, joined)) = tasks.next().await {
        progress.inc(1);
        let (file, result) = match joined {
            Ok(output) => output?,
            // WHY: only tasks of an aborted corpus are ever cancelled here
            Err(e) if e.is_cancelled() => {
                let stats = summary.corpus_mut(corpus);
                stats.files += 1;
                stats.failed_files += 1;
                continue;
            }
            Err(e) => return Err(anyhow::Error::new(e).context("Ingestion task panicked")),
        };
        let stats = summary.corpus_mut(file.corpus);
        stats.files += 1;

        if aborted.contains(&file.corpus) {
            debug!("Discarding {}: {} ingestion was aborted", file.path.display(), file.corpus);
            stats.failed_files += 1;
            continue;
        }

        let ingest = match result {
            Ok(ingest) => ingest,
            Err(e) => {
                warn!("Failed to ingest {}: {:#}", file.path.display(), e);
                if config.fail_fast {
                    abort_all(&abort_handles);
                    progress.abandon();
                    return Err(e.context(format!("Failed to ingest {}", file.path.display())));
                }
                stats.failed_files += 1;
                summary.integrity_errors.push(format!("{}: {:#}", file.path.display(), e));
                continue;
            }
        };

        stats.lines_read += ingest.lines_read;
        let verse_count = ingest.records.len() as u64;
        let word_count = ingest.word_count() as u64;
        progress.set_message(format!("{} {}", ingest.corpus, ingest.book));

        match builder.insert_corpus(ingest.corpus, ingest.records) {
            Ok(_) => {
                stats.verses += verse_count;
                stats.words += word_count;
                summary.record_all(&ingest.diagnostics);
            }
            Err(integrity) => {
                warn!("{}: {}", file.path.display(), integrity);
                if config.fail_fast {
                    abort_all(&abort_handles);
                    progress.abandon();
                    return Err(integrity.into());
                }
                // WHY: one canonical key claimed twice taints the corpus's whole key mapping,
                // so none of its books may stay in the index
                let removed = builder.remove_corpus(file.corpus);
                if let Some(handles) = abort_handles.get(&file.corpus) {
                    handles.iter().for_each(AbortHandle::abort);
                }
                aborted.insert(file.corpus);
                warn!("Aborted {} ingestion, withdrew {} merged verses", file.corpus, removed);

                stats.aborted = true;
                stats.failed_files = stats.files;
                stats.verses = 0;
                stats.words = 0;
                summary.record_all(&ingest.diagnostics);
                summary.record_integrity(&integrity);
            }
        }
    }
    progress.finish_and_clear();

    let index = builder.finish();
    info!(
        "Aligned {} canonical verse keys in {}ms ({} skipped, {} warnings, {} integrity errors)",
        index.len(),
        start_time.elapsed().as_millis(),
        summary.skipped(),
        summary.warnings(),
        summary.integrity_errors.len()
    );
    Ok(PipelineRun { index, summary })
}

/// One-time blocking dataset load, kept off the async workers
pub async fn open_morphology(dir: PathBuf) -> Result<MorphologyAdapter<TextFabricDataset>> {
    let dataset = tokio::task::spawn_blocking(move || TextFabricDataset::load_default(&dir))
        .await
        .context("Dataset load task panicked")??;
    Ok(MorphologyAdapter::open(dataset))
}
