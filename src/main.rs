use anyhow::Result;
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use canon_align::canon::{Book, Corpus};
use canon_align::config::PipelineConfig;
use canon_align::diagnostics::{Diagnostic, DiagnosticKind};
use canon_align::pipeline::{self, RunOptions};
use canon_align::render::ConsoleRenderer;

#[derive(Parser, Debug)]
#[command(name = "canon-align")]
#[command(about = "Canonical verse-indexed, word-tokenized Hebrew, Greek and English Biblical texts")]
#[command(version)]
struct Args {
    /// Root directory holding the per-corpus text directories
    root_dir: PathBuf,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Corpora to ingest (default: all)
    #[arg(long = "corpus")]
    corpora: Vec<Corpus>,

    /// Restrict to these books
    #[arg(long = "book")]
    books: Vec<Book>,

    /// Abort on first integrity error
    #[arg(long)]
    fail_fast: bool,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,

    /// Render Hebrew and Greek as ASCII transliteration
    #[arg(long)]
    ascii: bool,

    /// Persist the aligned index as JSON
    #[arg(long)]
    index_out: Option<PathBuf>,

    /// Stats output file path
    #[arg(long, default_value = "run_stats.json")]
    stats_out: PathBuf,

    /// Text-Fabric feature directory of the annotation dataset
    #[arg(long)]
    morphology: Option<PathBuf>,

    /// Book to enumerate from the annotation dataset
    #[arg(long, requires = "morphology")]
    morph_book: Option<Book>,

    /// Reference word count the enumeration must reproduce
    #[arg(long, requires = "morph_book")]
    expected_words: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // WHY: structured JSON logging enables observability and debugging in production
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .json()
        .init();

    let args = Args::parse();
    info!(?args, "Parsed CLI arguments");

    // WHY: validate root directory exists early to fail fast with clear error
    if !args.root_dir.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", args.root_dir.display());
    }

    let mut config = PipelineConfig::load(args.config.as_deref())?;
    config.fail_fast |= args.fail_fast;
    config.ascii_output |= args.ascii;

    let options = RunOptions {
        corpora: if args.corpora.is_empty() {
            Corpus::ALL.to_vec()
        } else {
            args.corpora.clone()
        },
        books: (!args.books.is_empty()).then(|| args.books.clone()),
        show_progress: !args.no_progress,
    };

    let run = pipeline::run(&args.root_dir, &config, &options).await?;
    let mut summary = run.summary;
    let renderer = ConsoleRenderer::from_env(config.ascii_output);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "canon-align v{} - {} canonical verse keys", env!("CARGO_PKG_VERSION"), run.index.len())?;
    for (corpus, stats) in &summary.corpora {
        writeln!(
            out,
            "  {corpus}: {} files, {} verses, {} words, {} failed files{}",
            stats.files,
            stats.verses,
            stats.words,
            stats.failed_files,
            if stats.aborted { " (aborted)" } else { "" }
        )?;
    }

    // First aligned verse as a rendering sample for each corpus
    for corpus in &options.corpora {
        if let Some(record) = run.index.records(*corpus).next() {
            let sample = format!("  {} {}: {}", corpus, record.key(), record.surfaces().join(" "));
            renderer.write_line(&mut out, &sample)?;
        }
    }

    if let Some(dir) = args.morphology.clone() {
        let adapter = pipeline::open_morphology(dir).await?;
        if let Some(book) = args.morph_book {
            let words = match args.expected_words {
                Some(expected) => adapter.words_for_book_checked(book, expected)?,
                None => adapter.words_for_book(book)?,
            };
            summary.record_all(&words.diagnostics);
            writeln!(out, "  morphology {}: {} words", book, words.len())?;
            if let Some(first) = words.words.first() {
                let sample = format!(
                    "  first word: {} lex={} sp={}",
                    first.surface,
                    first.vocalized_lexeme.as_deref().unwrap_or("-"),
                    first.part_of_speech.as_deref().unwrap_or("-")
                );
                renderer.write_line(&mut out, &sample)?;
            }
        }
        adapter.close();
    }

    for _ in 0..renderer.fallbacks() {
        summary.record(&Diagnostic::new(DiagnosticKind::EncodingRenderFailure, "ascii fallback"));
    }

    writeln!(
        out,
        "  skipped: {}, warnings: {}, integrity errors: {}",
        summary.skipped(),
        summary.warnings(),
        summary.integrity_errors.len()
    )?;
    for error in &summary.integrity_errors {
        writeln!(out, "  error: {error}")?;
    }

    if let Some(path) = &args.index_out {
        run.index.save_json(path)?;
        writeln!(out, "  index written to {}", path.display())?;
    }

    let stats_json = serde_json::to_string_pretty(&summary)?;
    tokio::fs::write(&args.stats_out, stats_json).await?;
    info!("Run stats written to {}", args.stats_out.display());

    Ok(())
}
