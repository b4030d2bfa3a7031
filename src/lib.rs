pub mod align;
pub mod canon;
pub mod config;
pub mod diagnostics;
pub mod discovery;
pub mod ketiv_qere;
pub mod morphology;
pub mod pipeline;
pub mod reader;
pub mod reference;
pub mod render;
pub mod sanitize;
pub mod tokenizer;
pub mod verse;

// Re-export the canonical model for downstream analyses
pub use align::{align, CorpusIndex, IndexBuilder, VerseBundle};
pub use canon::{Book, Corpus, Testament, VerseKey};
pub use diagnostics::{Diagnostic, DiagnosticKind, GraphError, IntegrityError, RunSummary};
pub use verse::{RawLine, SourceReading, Verse, VerseRecord, Word};

// Re-export the per-stage entry points
pub use ketiv_qere::resolve;
pub use reference::{LineParser, ParsedLine, ParserConfig};
pub use sanitize::sanitize;
pub use tokenizer::Tokenizer;

pub use morphology::{AnnotationGraph, MorphFeatureBundle, MorphWord, MorphologyAdapter};
