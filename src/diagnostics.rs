// WHY: two-tier error taxonomy - integrity errors abort a unit of work,
// diagnostics are recovered locally and only counted into the run summary

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::canon::{Book, Corpus, VerseKey};

/// Fatal integrity failures; each carries enough context to diagnose without re-running
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IntegrityError {
    /// Two verses of one corpus map to the same canonical key (upstream parsing defect)
    #[error("duplicate {corpus} verse {key}: lines {first_line} and {second_line}")]
    DuplicateKeyMapping {
        corpus: Corpus,
        key: VerseKey,
        first_line: usize,
        second_line: usize,
    },
    /// A record was filed under a corpus other than the one it was parsed from
    #[error("{key} parsed from {found} was supplied as {expected}")]
    CorpusMismatch {
        expected: Corpus,
        found: Corpus,
        key: VerseKey,
    },
    /// Adapter enumeration overcounted, typically a join-style traversal
    /// `expected` is the reference word count when one was given, else the number of distinct word nodes
    #[error("traversal duplication in {book}: {actual} words enumerated, {expected} expected")]
    TraversalDuplication {
        book: Book,
        expected: usize,
        actual: usize,
    },
    /// Adapter enumeration disagrees with the reference count by a non-multiple
    #[error("word count mismatch in {book}: {actual} words enumerated, {expected} expected")]
    ReferenceCountMismatch {
        book: Book,
        expected: usize,
        actual: usize,
    },
    /// A book identifier that the translation table cannot place
    #[error("unknown book identifier {name:?} ({context})")]
    UnknownBook { name: String, context: String },
}

/// Failure reported by an annotation graph collaborator for a single call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    UnknownNode(u32),
    #[error("node type {0:?} is not defined")]
    UnknownType(String),
    #[error("feature {feature:?} unreadable on node {node}: {reason}")]
    FeatureAccess {
        node: u32,
        feature: String,
        reason: String,
    },
}

/// Recoverable, per-item issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Line matched no known pattern
    ParseSkip,
    /// Verse reference parsed but the text was empty
    EmptyVerse,
    /// Verse line seen before any chapter header
    MissingChapterContext,
    /// Line names a different book than its file
    BookMismatch,
    /// Ketiv/qere pair where the qere could not be identified
    ResolutionAmbiguous,
    /// Morphological feature not populated for a word
    FeatureMissing,
    /// Adapter call failed for a single word or verse; skipped
    TraversalSkip,
    /// Output sink could not display a script; fallback rendering used
    EncodingRenderFailure,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::ParseSkip => "parse_skip",
            DiagnosticKind::EmptyVerse => "empty_verse",
            DiagnosticKind::MissingChapterContext => "missing_chapter_context",
            DiagnosticKind::BookMismatch => "book_mismatch",
            DiagnosticKind::ResolutionAmbiguous => "resolution_ambiguous",
            DiagnosticKind::FeatureMissing => "feature_missing",
            DiagnosticKind::TraversalSkip => "traversal_skip",
            DiagnosticKind::EncodingRenderFailure => "encoding_render_failure",
        }
    }

    /// Warnings are data-integrity signals; the rest are plain skips
    pub fn is_warning(self) -> bool {
        !matches!(self, DiagnosticKind::ParseSkip | DiagnosticKind::FeatureMissing)
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recovered issue with its location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub corpus: Option<Corpus>,
    pub book: Option<Book>,
    /// 1-based source line when the issue is tied to a line
    pub line: Option<usize>,
    pub detail: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            corpus: None,
            book: None,
            line: None,
            detail: detail.into(),
        }
    }

    pub fn at(mut self, corpus: Corpus, book: Book, line: usize) -> Self {
        self.corpus = Some(corpus);
        self.book = Some(book);
        self.line = Some(line);
        self
    }

    pub fn in_book(mut self, book: Book) -> Self {
        self.book = Some(book);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(corpus) = self.corpus {
            write!(f, " [{corpus}]")?;
        }
        if let Some(book) = self.book {
            write!(f, " {book}")?;
        }
        if let Some(line) = self.line {
            write!(f, " line {line}")?;
        }
        write!(f, ": {}", self.detail)
    }
}

/// Per-corpus counters for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub files: u64,
    pub lines_read: u64,
    pub verses: u64,
    pub words: u64,
    pub failed_files: u64,
    /// A merge integrity error withdrew this corpus from the index
    #[serde(default)]
    pub aborted: bool,
}

/// Aggregated run report: successes alongside skipped and warned counts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub corpora: BTreeMap<Corpus, CorpusStats>,
    pub diagnostic_counts: BTreeMap<DiagnosticKind, u64>,
    /// Integrity errors that aborted a unit of work
    pub integrity_errors: Vec<String>,
}

impl RunSummary {
    pub fn record(&mut self, diagnostic: &Diagnostic) {
        *self.diagnostic_counts.entry(diagnostic.kind).or_insert(0) += 1;
    }

    pub fn record_all<'a>(&mut self, diagnostics: impl IntoIterator<Item = &'a Diagnostic>) {
        for diagnostic in diagnostics {
            self.record(diagnostic);
        }
    }

    pub fn record_integrity(&mut self, error: &IntegrityError) {
        self.integrity_errors.push(error.to_string());
    }

    pub fn corpus_mut(&mut self, corpus: Corpus) -> &mut CorpusStats {
        self.corpora.entry(corpus).or_default()
    }

    pub fn count(&self, kind: DiagnosticKind) -> u64 {
        self.diagnostic_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn skipped(&self) -> u64 {
        self.diagnostic_counts
            .iter()
            .filter(|(kind, _)| !kind.is_warning())
            .map(|(_, n)| n)
            .sum()
    }

    pub fn warnings(&self) -> u64 {
        self.diagnostic_counts
            .iter()
            .filter(|(kind, _)| kind.is_warning())
            .map(|(_, n)| n)
            .sum()
    }

    pub fn merge(&mut self, other: RunSummary) {
        for (corpus, stats) in other.corpora {
            let mine = self.corpus_mut(corpus);
            mine.files += stats.files;
            mine.lines_read += stats.lines_read;
            mine.verses += stats.verses;
            mine.words += stats.words;
            mine.failed_files += stats.failed_files;
            mine.aborted |= stats.aborted;
        }
        for (kind, n) in other.diagnostic_counts {
            *self.diagnostic_counts.entry(kind).or_insert(0) += n;
        }
        self.integrity_errors.extend(other.integrity_errors);
    }
}
