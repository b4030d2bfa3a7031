// WHY: canonical records every downstream analysis consumes
// Immutable after construction; words are owned by exactly one verse record

use serde::{Deserialize, Serialize};

use crate::canon::{Corpus, VerseKey};

/// One line of a source file, consumed immediately by the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub corpus: Corpus,
    pub raw_text: String,
    /// 1-based line number within its file
    pub source_offset: usize,
}

impl RawLine {
    pub fn new(corpus: Corpus, raw_text: impl Into<String>, source_offset: usize) -> Self {
        Self {
            corpus,
            raw_text: raw_text.into(),
            source_offset,
        }
    }
}

/// A parsed verse; `raw_text` is sanitized and stripped of terminal section markers,
/// `cleaned_text` is the text the tokenizer sees (ketiv/qere resolved for Hebrew)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub key: VerseKey,
    pub corpus: Corpus,
    pub raw_text: String,
    pub cleaned_text: String,
    /// 1-based line number the verse was parsed from
    pub source_line: usize,
}

impl Verse {
    pub fn new(key: VerseKey, corpus: Corpus, raw_text: String, source_line: usize) -> Self {
        let cleaned_text = raw_text.clone();
        Self {
            key,
            corpus,
            raw_text,
            cleaned_text,
            source_line,
        }
    }

    /// Same verse with a different cleaned text
    pub fn with_cleaned_text(self, cleaned_text: String) -> Self {
        Self { cleaned_text, ..self }
    }

    pub fn is_empty(&self) -> bool {
        self.cleaned_text.trim().is_empty()
    }
}

/// Which scribal reading a Hebrew word came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceReading {
    Ketiv,
    Qere,
    /// No dual reading at this position (and every Greek/English word)
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub surface_form: String,
    pub normalized_form: String,
    /// 0-based position in logical reading order
    pub position_in_verse: usize,
    pub verse_key: VerseKey,
    pub is_qere: bool,
    pub source_reading: SourceReading,
    /// Best-effort resolution of an ambiguous ketiv/qere encoding
    pub ambiguous: bool,
}

/// Verse plus its word sequence, the unit stored in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseRecord {
    pub verse: Verse,
    pub words: Vec<Word>,
}

impl VerseRecord {
    pub fn key(&self) -> VerseKey {
        self.verse.key
    }

    pub fn corpus(&self) -> Corpus {
        self.verse.corpus
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Surface forms in order, convenient for comparisons and display
    pub fn surfaces(&self) -> Vec<&str> {
        self.words.iter().map(|w| w.surface_form.as_str()).collect()
    }
}
