// WHY: the annotation dataset is a third-party node graph; callers only ever see a
// deduplicated per-book word stream enumerated by strict downward traversal
// Join-style queries across independently matched node sets overcount (~14x in practice)

pub mod memory;
pub mod text_fabric;

pub use memory::MemoryGraph;
pub use text_fabric::TextFabricDataset;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::canon::{Book, VerseKey};
use crate::diagnostics::{Diagnostic, DiagnosticKind, GraphError, IntegrityError};
use crate::verse::{VerseRecord, Word};

/// Node identifier inside one loaded dataset; not stable across loads
pub type NodeId = u32;

pub const BOOK_TYPE: &str = "book";
pub const VERSE_TYPE: &str = "verse";
pub const WORD_TYPE: &str = "word";

/// Feature names of the ETCBC BHSA dataset
pub mod features {
    pub const BOOK: &str = "book";
    pub const CHAPTER: &str = "chapter";
    pub const VERSE: &str = "verse";
    pub const SURFACE: &str = "g_word_utf8";
    pub const LEXEME: &str = "lex";
    pub const VOCALIZED_LEXEME: &str = "voc_lex_utf8";
    pub const PART_OF_SPEECH: &str = "sp";
}

/// Read-only query contract of an annotation graph
pub trait AnnotationGraph {
    /// All nodes of a type, in corpus order
    fn nodes_of_type(&self, otype: &str) -> Result<Vec<NodeId>, GraphError>;

    /// Nodes of `otype` contained in `parent`, in corpus order (downward edges only)
    fn children(&self, parent: NodeId, otype: &str) -> Result<Vec<NodeId>, GraphError>;

    /// Feature value; `Ok(None)` when the feature is not populated for the node
    fn feature(&self, node: NodeId, name: &str) -> Result<Option<String>, GraphError>;
}

/// One word of a book as enumerated by the adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphWord {
    /// 0-based position within the book; skipped word nodes keep their slot
    pub position: usize,
    /// `None` when the book has no verse nodes or the verse reference is unreadable
    pub verse_key: Option<VerseKey>,
    /// 0-based position within the verse
    pub position_in_verse: usize,
    pub surface: String,
    pub lexeme: Option<String>,
    pub vocalized_lexeme: Option<String>,
    pub part_of_speech: Option<String>,
}

/// Morphological features keyed by word position, never by node identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WordKey {
    pub verse_key: VerseKey,
    pub position_in_verse: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphFeatureBundle {
    pub word_key: WordKey,
    pub lexeme: Option<String>,
    pub vocalized_lexeme: Option<String>,
    pub part_of_speech: Option<String>,
}

/// Words of one book plus everything skipped or missing along the way
#[derive(Debug, Clone)]
pub struct BookWords {
    pub book: Book,
    pub words: Vec<MorphWord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl BookWords {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// A canonical word with the features matched to it by key
#[derive(Debug, Clone, Copy)]
pub struct EnrichedWord<'a> {
    pub word: &'a Word,
    pub features: Option<&'a MorphFeatureBundle>,
}

/// Scoped owner of a loaded annotation graph
/// WHY: the dataset loads once per process; the adapter is the only handle to it
pub struct MorphologyAdapter<G: AnnotationGraph> {
    graph: G,
}

impl<G: AnnotationGraph> MorphologyAdapter<G> {
    /// Take ownership of an already loaded graph
    pub fn open(graph: G) -> Self {
        info!("Morphology adapter opened");
        Self { graph }
    }

    /// Release the dataset, handing the graph back to the caller
    pub fn close(self) -> G {
        info!("Morphology adapter closed");
        self.graph
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Locate the book node through the translation table
    pub fn book_node(&self, book: Book) -> Result<NodeId, IntegrityError> {
        let name = book.etcbc_name().ok_or_else(|| IntegrityError::UnknownBook {
            name: book.name().to_string(),
            context: "book has no annotation dataset identifier".to_string(),
        })?;

        let nodes = self
            .graph
            .nodes_of_type(BOOK_TYPE)
            .map_err(|e| IntegrityError::UnknownBook {
                name: name.to_string(),
                context: format!("book nodes unavailable: {e}"),
            })?;

        for node in nodes {
            match self.graph.feature(node, features::BOOK) {
                Ok(Some(value)) if value == name => return Ok(node),
                Ok(_) => {}
                Err(e) => warn!("Unreadable book feature on node {}: {}", node, e),
            }
        }

        Err(IntegrityError::UnknownBook {
            name: name.to_string(),
            context: format!("no book node carries {}={name}", features::BOOK),
        })
    }

    /// Every word of the book exactly once, in corpus order
    pub fn words_for_book(&self, book: Book) -> Result<BookWords, IntegrityError> {
        let book_node = self.book_node(book)?;
        let mut result = BookWords {
            book,
            words: Vec::new(),
            diagnostics: Vec::new(),
        };
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut duplicates = 0usize;
        let mut position = 0usize;

        let verses = match self.graph.children(book_node, VERSE_TYPE) {
            Ok(verses) => verses,
            Err(e) => {
                warn!("{}: verse traversal failed, enumerating words directly: {}", book, e);
                Vec::new()
            }
        };

        if verses.is_empty() {
            let words = self.graph.children(book_node, WORD_TYPE).map_err(|e| {
                IntegrityError::UnknownBook {
                    name: book.name().to_string(),
                    context: format!("word traversal failed: {e}"),
                }
            })?;
            for node in words {
                if !seen.insert(node) {
                    duplicates += 1;
                    continue;
                }
                self.push_word(&mut result, node, position, None, position);
                position += 1;
            }
        } else {
            for verse_node in verses {
                let verse_key = self.verse_key(book, verse_node, &mut result.diagnostics);
                let words = match self.graph.children(verse_node, WORD_TYPE) {
                    Ok(words) => words,
                    Err(e) => {
                        warn!("{}: skipping verse node {}: {}", book, verse_node, e);
                        result.diagnostics.push(
                            Diagnostic::new(
                                DiagnosticKind::TraversalSkip,
                                format!("verse node {verse_node}: {e}"),
                            )
                            .in_book(book),
                        );
                        continue;
                    }
                };
                // WHY: positions count every word node, skipped or not, so joins by position stay aligned
                let mut position_in_verse = 0;
                for node in words {
                    if !seen.insert(node) {
                        duplicates += 1;
                        continue;
                    }
                    self.push_word(&mut result, node, position, verse_key, position_in_verse);
                    position += 1;
                    position_in_verse += 1;
                }
            }
        }

        if duplicates > 0 {
            // No reference count here: the distinct nodes are the best available expectation
            return Err(IntegrityError::TraversalDuplication {
                book,
                expected: position,
                actual: position + duplicates,
            });
        }

        debug!(
            "Enumerated {} words of {} ({} diagnostics)",
            result.words.len(),
            book,
            result.diagnostics.len()
        );
        Ok(result)
    }

    /// `words_for_book` guarded by an independently known word count
    pub fn words_for_book_checked(&self, book: Book, expected: usize) -> Result<BookWords, IntegrityError> {
        let words = self.words_for_book(book)?;
        check_reference_count(book, expected, words.len())?;
        Ok(words)
    }

    /// Feature bundles for every word with a readable verse reference
    pub fn feature_bundles_for_book(&self, book: Book) -> Result<(Vec<MorphFeatureBundle>, Vec<Diagnostic>), IntegrityError> {
        let BookWords { words, diagnostics, .. } = self.words_for_book(book)?;
        let bundles = words
            .into_iter()
            .filter_map(|word| {
                let verse_key = word.verse_key?;
                Some(MorphFeatureBundle {
                    word_key: WordKey {
                        verse_key,
                        position_in_verse: word.position_in_verse,
                    },
                    lexeme: word.lexeme,
                    vocalized_lexeme: word.vocalized_lexeme,
                    part_of_speech: word.part_of_speech,
                })
            })
            .collect();
        Ok((bundles, diagnostics))
    }

    /// A word whose surface cannot be read is skipped; its position stays taken
    fn push_word(
        &self,
        result: &mut BookWords,
        node: NodeId,
        position: usize,
        verse_key: Option<VerseKey>,
        position_in_verse: usize,
    ) {
        let book = result.book;
        let surface = match self.graph.feature(node, features::SURFACE) {
            Ok(surface) => surface.unwrap_or_default(),
            Err(e) => {
                warn!("{}: skipping word node {}: {}", book, node, e);
                result.diagnostics.push(
                    Diagnostic::new(DiagnosticKind::TraversalSkip, format!("word node {node}: {e}"))
                        .in_book(book),
                );
                return;
            }
        };

        let mut optional = |name: &str| -> Option<String> {
            match self.graph.feature(node, name) {
                Ok(Some(value)) => Some(value),
                Ok(None) => {
                    result.diagnostics.push(
                        Diagnostic::new(DiagnosticKind::FeatureMissing, format!("{name} on word node {node}"))
                            .in_book(book),
                    );
                    None
                }
                Err(e) => {
                    debug!("{}: feature {} unreadable on {}: {}", book, name, node, e);
                    result.diagnostics.push(
                        Diagnostic::new(DiagnosticKind::FeatureMissing, e.to_string()).in_book(book),
                    );
                    None
                }
            }
        };
        let lexeme = optional(features::LEXEME);
        let vocalized_lexeme = optional(features::VOCALIZED_LEXEME);
        let part_of_speech = optional(features::PART_OF_SPEECH);

        result.words.push(MorphWord {
            position,
            verse_key,
            position_in_verse,
            surface,
            lexeme,
            vocalized_lexeme,
            part_of_speech,
        });
    }

    fn verse_key(&self, book: Book, verse_node: NodeId, diagnostics: &mut Vec<Diagnostic>) -> Option<VerseKey> {
        let number = |name: &str| -> Option<u32> {
            self.graph
                .feature(verse_node, name)
                .ok()
                .flatten()
                .and_then(|v| v.trim().parse().ok())
        };
        let key = number(features::CHAPTER)
            .zip(number(features::VERSE))
            .and_then(|(chapter, verse)| VerseKey::new(book, chapter, verse));
        if key.is_none() {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::FeatureMissing,
                    format!("chapter/verse unreadable on verse node {verse_node}"),
                )
                .in_book(book),
            );
        }
        key
    }
}

/// Classify a word count against its reference
pub fn check_reference_count(book: Book, expected: usize, actual: usize) -> Result<(), IntegrityError> {
    if actual == expected {
        return Ok(());
    }
    if expected > 0 && actual > expected && actual % expected == 0 {
        return Err(IntegrityError::TraversalDuplication { book, expected, actual });
    }
    Err(IntegrityError::ReferenceCountMismatch { book, expected, actual })
}

/// Join feature bundles onto canonical words by (verse key, position)
pub fn attach_features<'a>(records: &'a [VerseRecord], bundles: &'a [MorphFeatureBundle]) -> Vec<EnrichedWord<'a>> {
    let by_key: HashMap<WordKey, &MorphFeatureBundle> =
        bundles.iter().map(|bundle| (bundle.word_key, bundle)).collect();
    records
        .iter()
        .flat_map(|record| record.words.iter())
        .map(|word| EnrichedWord {
            word,
            features: by_key
                .get(&WordKey {
                    verse_key: word.verse_key,
                    position_in_verse: word.position_in_verse,
                })
                .copied(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::Corpus;
    use crate::tokenizer::Tokenizer;
    use crate::verse::Verse;

    /// Two verses of Job, three and two words; one word lacks `sp`
    fn job_graph() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        let book = g.add_node(BOOK_TYPE, None);
        g.set_feature(book, features::BOOK, "Iob");

        let words: [(u32, &[(&str, &str, &str)]); 2] = [
            (1, &[("אִ֛ישׁ", ">JC/", "noun"), ("הָיָ֥ה", "HJH[", "verb"), ("בְאֶֽרֶץ", "B", "prep")]),
            (2, &[("וַיִּוָּ֥לְדוּ", "JLD[", "verb"), ("ל֛וֹ", "L", "prep")]),
        ];
        for (verse, entries) in words {
            let v = g.add_node(VERSE_TYPE, Some(book));
            g.set_feature(v, features::CHAPTER, "1");
            g.set_feature(v, features::VERSE, &verse.to_string());
            for (surface, lex, sp) in entries.iter() {
                let w = g.add_node(WORD_TYPE, Some(v));
                g.set_feature(w, features::SURFACE, surface);
                g.set_feature(w, features::LEXEME, lex);
                g.set_feature(w, features::VOCALIZED_LEXEME, surface);
                if *lex != "L" {
                    g.set_feature(w, features::PART_OF_SPEECH, sp);
                }
            }
        }
        g
    }

    #[test]
    fn test_words_for_book_matches_reference_count() {
        let adapter = MorphologyAdapter::open(job_graph());
        let words = adapter.words_for_book_checked(Book::Job, 5).unwrap();
        assert_eq!(words.len(), 5);
        let positions: Vec<_> = words.words.iter().map(|w| w.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
        assert_eq!(words.words[3].verse_key, VerseKey::new(Book::Job, 1, 2));
        assert_eq!(words.words[3].position_in_verse, 0);
        assert_eq!(words.words[0].lexeme.as_deref(), Some(">JC/"));
    }

    #[test]
    fn test_lookup_goes_through_translation_table() {
        let adapter = MorphologyAdapter::open(job_graph());
        assert!(adapter.book_node(Book::Job).is_ok());
        assert!(matches!(
            adapter.book_node(Book::Proverbs),
            Err(IntegrityError::UnknownBook { .. })
        ));
        assert!(matches!(
            adapter.book_node(Book::Romans),
            Err(IntegrityError::UnknownBook { .. })
        ));
    }

    #[test]
    fn test_missing_feature_is_absent_not_error() {
        let adapter = MorphologyAdapter::open(job_graph());
        let words = adapter.words_for_book(Book::Job).unwrap();
        assert_eq!(words.words[4].part_of_speech, None);
        assert_eq!(words.words[4].lexeme.as_deref(), Some("L"));
        let missing: Vec<_> = words
            .diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::FeatureMissing)
            .collect();
        assert_eq!(missing.len(), 1);
    }

    #[test]
    fn test_failing_word_is_skipped_not_fatal() {
        let mut graph = job_graph();
        let victim = graph.nodes_of_type(WORD_TYPE).unwrap()[1];
        graph.fail_feature(victim, features::SURFACE);
        let adapter = MorphologyAdapter::open(graph);

        let words = adapter.words_for_book(Book::Job).unwrap();
        assert_eq!(words.len(), 4);
        assert_eq!(words.words[1].surface, "בְאֶֽרֶץ");
        // The skipped word keeps its slot
        assert_eq!(words.words[1].position_in_verse, 2);
        assert_eq!(words.words[1].position, 2);
        assert_eq!(words.words[2].position, 3);
        assert!(words.diagnostics.iter().any(|d| d.kind == DiagnosticKind::TraversalSkip));
        assert!(matches!(
            adapter.words_for_book_checked(Book::Job, 5),
            Err(IntegrityError::ReferenceCountMismatch { expected: 5, actual: 4, .. })
        ));
    }

    /// Stand-in for a join-style query: every verse returns every word of the book
    struct JoinGraph(MemoryGraph);

    impl AnnotationGraph for JoinGraph {
        fn nodes_of_type(&self, otype: &str) -> Result<Vec<NodeId>, GraphError> {
            self.0.nodes_of_type(otype)
        }

        fn children(&self, parent: NodeId, otype: &str) -> Result<Vec<NodeId>, GraphError> {
            if otype == WORD_TYPE {
                return self.0.nodes_of_type(WORD_TYPE);
            }
            self.0.children(parent, otype)
        }

        fn feature(&self, node: NodeId, name: &str) -> Result<Option<String>, GraphError> {
            self.0.feature(node, name)
        }
    }

    #[test]
    fn test_repeated_nodes_are_traversal_duplication() {
        let adapter = MorphologyAdapter::open(JoinGraph(job_graph()));
        let err = adapter.words_for_book(Book::Job).unwrap_err();
        assert_eq!(
            err,
            IntegrityError::TraversalDuplication {
                book: Book::Job,
                expected: 5,
                actual: 10,
            }
        );
    }

    #[test]
    fn test_reference_count_classification() {
        assert!(check_reference_count(Book::Job, 10, 10).is_ok());
        assert!(matches!(
            check_reference_count(Book::Job, 10, 140),
            Err(IntegrityError::TraversalDuplication { actual: 140, .. })
        ));
        assert!(matches!(
            check_reference_count(Book::Job, 10, 11),
            Err(IntegrityError::ReferenceCountMismatch { .. })
        ));
        assert!(matches!(
            check_reference_count(Book::Job, 0, 3),
            Err(IntegrityError::ReferenceCountMismatch { .. })
        ));
    }

    #[test]
    fn test_attach_features_by_key() {
        let adapter = MorphologyAdapter::open(job_graph());
        let (bundles, _) = adapter.feature_bundles_for_book(Book::Job).unwrap();
        assert_eq!(bundles.len(), 5);

        let key = VerseKey::new(Book::Job, 1, 2).unwrap();
        let tokenizer = Tokenizer::new().unwrap();
        let text = "וַיִּוָּ֥לְדוּ ל֛וֹ שִׁבְעָ֥ה";
        let record = VerseRecord {
            verse: Verse::new(key, Corpus::Hebrew, text.to_string(), 1),
            words: tokenizer.tokenize(text, Corpus::Hebrew, key),
        };
        let records = [record];
        let enriched = attach_features(&records, &bundles);
        assert_eq!(enriched.len(), 3);
        assert_eq!(enriched[0].features.unwrap().lexeme.as_deref(), Some("JLD["));
        assert_eq!(enriched[1].features.unwrap().part_of_speech, None);
        assert!(enriched[2].features.is_none());
    }

    #[test]
    fn test_skipped_word_does_not_shift_join() {
        let mut graph = job_graph();
        let victim = graph.nodes_of_type(WORD_TYPE).unwrap()[1];
        graph.fail_feature(victim, features::SURFACE);
        let adapter = MorphologyAdapter::open(graph);
        let (bundles, _) = adapter.feature_bundles_for_book(Book::Job).unwrap();
        assert_eq!(bundles.len(), 4);

        let key = VerseKey::new(Book::Job, 1, 1).unwrap();
        let tokenizer = Tokenizer::new().unwrap();
        let text = "אִ֛ישׁ הָיָ֥ה בְאֶֽרֶץ";
        let records = [VerseRecord {
            verse: Verse::new(key, Corpus::Hebrew, text.to_string(), 1),
            words: tokenizer.tokenize(text, Corpus::Hebrew, key),
        }];
        let enriched = attach_features(&records, &bundles);

        assert_eq!(enriched[0].features.unwrap().lexeme.as_deref(), Some(">JC/"));
        assert!(enriched[1].features.is_none());
        assert_eq!(enriched[2].word.surface_form, "בְאֶֽרֶץ");
        assert_eq!(enriched[2].features.unwrap().part_of_speech.as_deref(), Some("prep"));
    }

    #[test]
    fn test_close_returns_graph() {
        let adapter = MorphologyAdapter::open(job_graph());
        let graph = adapter.close();
        assert_eq!(graph.nodes_of_type(WORD_TYPE).unwrap().len(), 5);
    }
}
