// WHY: the canonical key space is the union of every corpus's keys; a corpus missing a key
// is an explicit absence, a corpus supplying a key twice is a fatal upstream defect

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use crate::canon::{Book, Corpus, VerseKey};
use crate::diagnostics::IntegrityError;
use crate::verse::VerseRecord;

/// At most one verse record per corpus for a canonical key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseBundle {
    pub hebrew: Option<VerseRecord>,
    pub greek: Option<VerseRecord>,
    pub english: Option<VerseRecord>,
}

impl VerseBundle {
    pub fn get(&self, corpus: Corpus) -> Option<&VerseRecord> {
        match corpus {
            Corpus::Hebrew => self.hebrew.as_ref(),
            Corpus::Greek => self.greek.as_ref(),
            Corpus::English => self.english.as_ref(),
        }
    }

    fn slot_mut(&mut self, corpus: Corpus) -> &mut Option<VerseRecord> {
        match corpus {
            Corpus::Hebrew => &mut self.hebrew,
            Corpus::Greek => &mut self.greek,
            Corpus::English => &mut self.english,
        }
    }

    /// Corpora that have a verse at this key, in corpus order
    pub fn corpora(&self) -> Vec<Corpus> {
        Corpus::ALL.into_iter().filter(|c| self.get(*c).is_some()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.hebrew.is_none() && self.greek.is_none() && self.english.is_none()
    }
}

/// Canonical verse-key space with per-corpus records
#[derive(Debug, Clone, Default)]
pub struct CorpusIndex {
    entries: BTreeMap<VerseKey, VerseBundle>,
}

impl CorpusIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record for a key in one corpus; `None` is a valid absence
    pub fn get(&self, key: &VerseKey, corpus: Corpus) -> Option<&VerseRecord> {
        self.entries.get(key).and_then(|bundle| bundle.get(corpus))
    }

    pub fn bundle(&self, key: &VerseKey) -> Option<&VerseBundle> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &VerseKey) -> bool {
        self.entries.contains_key(key)
    }

    /// All canonical keys in canonical order
    pub fn keys(&self) -> impl Iterator<Item = &VerseKey> + '_ {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VerseKey, &VerseBundle)> + '_ {
        self.entries.iter()
    }

    pub fn keys_in(&self, corpus: Corpus) -> impl Iterator<Item = &VerseKey> + '_ {
        self.entries
            .iter()
            .filter(move |(_, bundle)| bundle.get(corpus).is_some())
            .map(|(key, _)| key)
    }

    /// Records of one corpus in canonical order
    pub fn records(&self, corpus: Corpus) -> impl Iterator<Item = &VerseRecord> + '_ {
        self.entries.values().filter_map(move |bundle| bundle.get(corpus))
    }

    /// Keys present in both corpora, the basis of cross-language comparisons
    pub fn shared_keys(&self, a: Corpus, b: Corpus) -> Vec<VerseKey> {
        self.entries
            .iter()
            .filter(|(_, bundle)| bundle.get(a).is_some() && bundle.get(b).is_some())
            .map(|(key, _)| *key)
            .collect()
    }

    /// Records for one book of one corpus
    pub fn book_records(&self, book: Book, corpus: Corpus) -> impl Iterator<Item = &VerseRecord> + '_ {
        let start = VerseKey::book_start(book);
        self.entries
            .range(start..)
            .take_while(move |(key, _)| key.book() == book)
            .filter_map(move |(_, bundle)| bundle.get(corpus))
    }

    pub fn verse_count(&self, corpus: Corpus) -> usize {
        self.records(corpus).count()
    }

    pub fn word_count(&self, book: Book, corpus: Corpus) -> usize {
        self.book_records(book, corpus).map(VerseRecord::word_count).sum()
    }

    pub fn book_word_counts(&self, corpus: Corpus) -> BTreeMap<Book, usize> {
        let mut counts = BTreeMap::new();
        for record in self.records(corpus) {
            *counts.entry(record.key().book()).or_insert(0) += record.word_count();
        }
        counts
    }

    /// Persist as JSON; keys are recomputed and re-checked on load
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let persisted = PersistedIndex {
            version: PERSISTED_VERSION,
            records: self
                .entries
                .values()
                .flat_map(|bundle| Corpus::ALL.into_iter().filter_map(|c| bundle.get(c)))
                .cloned()
                .collect(),
        };
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create index file {}", path.display()))?;
        serde_json::to_writer(std::io::BufWriter::new(file), &persisted)?;
        info!("Saved index with {} keys to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read index file {}", path.display()))?;
        let persisted: PersistedIndex = serde_json::from_str(&content)?;
        if persisted.version != PERSISTED_VERSION {
            anyhow::bail!(
                "Unsupported index version {} in {}",
                persisted.version,
                path.display()
            );
        }
        let mut builder = IndexBuilder::new();
        builder.insert_all(persisted.records)?;
        Ok(builder.finish())
    }
}

const PERSISTED_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    version: u32,
    records: Vec<VerseRecord>,
}

/// Single-writer merge point for verse records
/// WHY: per-file work may run in parallel, but only finished files are merged, one at a time
#[derive(Debug, Default)]
pub struct IndexBuilder {
    index: CorpusIndex,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one unit of work; all-or-nothing so a failed unit never half-lands in the index
    pub fn insert_all(&mut self, records: Vec<VerseRecord>) -> Result<usize, IntegrityError> {
        let mut seen: BTreeMap<(Corpus, VerseKey), usize> = BTreeMap::new();
        for record in &records {
            let slot = (record.corpus(), record.key());
            if let Some(existing) = self.index.get(&record.key(), record.corpus()) {
                return Err(duplicate(record, existing.verse.source_line));
            }
            if let Some(first_line) = seen.insert(slot, record.verse.source_line) {
                return Err(duplicate(record, first_line));
            }
        }

        let count = records.len();
        for record in records {
            let key = record.key();
            let corpus = record.corpus();
            *self.index.entries.entry(key).or_default().slot_mut(corpus) = Some(record);
        }
        debug!("Merged {} verse records, index now {} keys", count, self.index.len());
        Ok(count)
    }

    /// Merge records that must all belong to `corpus`
    pub fn insert_corpus(&mut self, corpus: Corpus, records: Vec<VerseRecord>) -> Result<usize, IntegrityError> {
        if let Some(stray) = records.iter().find(|r| r.corpus() != corpus) {
            return Err(IntegrityError::CorpusMismatch {
                expected: corpus,
                found: stray.corpus(),
                key: stray.key(),
            });
        }
        self.insert_all(records)
    }

    /// Withdraw every record already merged for `corpus`; returns how many were dropped
    pub fn remove_corpus(&mut self, corpus: Corpus) -> usize {
        let mut removed = 0;
        self.index.entries.retain(|_, bundle| {
            if bundle.slot_mut(corpus).take().is_some() {
                removed += 1;
            }
            !bundle.is_empty()
        });
        debug!("Removed {} {} verse records, index now {} keys", removed, corpus, self.index.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn finish(self) -> CorpusIndex {
        self.index
    }
}

fn duplicate(record: &VerseRecord, first_line: usize) -> IntegrityError {
    IntegrityError::DuplicateKeyMapping {
        corpus: record.corpus(),
        key: record.key(),
        first_line,
        second_line: record.verse.source_line,
    }
}

/// Build the canonical index from each corpus's verse records
/// Stops at the first integrity error
pub fn align<I>(corpora: I) -> Result<CorpusIndex, IntegrityError>
where
    I: IntoIterator<Item = (Corpus, Vec<VerseRecord>)>,
{
    let mut builder = IndexBuilder::new();
    for (corpus, records) in corpora {
        let merged = builder.insert_corpus(corpus, records)?;
        info!("Aligned {} {} verses", merged, corpus);
    }
    Ok(builder.finish())
}
