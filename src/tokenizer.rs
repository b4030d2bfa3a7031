// WHY: per-language word segmentation in one place so every analysis counts words the same way
// Hebrew splits on whitespace and maqaf; Greek and English use Unicode word-boundary runs

use anyhow::Result;
use regex_automata::meta::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::canon::{Corpus, VerseKey};
use crate::ketiv_qere::Resolution;
use crate::verse::{SourceReading, Word};

/// Hebrew maqaf, joins two lexical words typographically
pub const MAQAF: char = '\u{05BE}';

/// Hebrew block: letters, points, cantillation and Hebrew punctuation
pub fn is_hebrew_block(ch: char) -> bool {
    ('\u{0590}'..='\u{05FF}').contains(&ch)
}

/// Consonants including final forms and the Yiddish ligatures
pub fn is_hebrew_letter(ch: char) -> bool {
    ('\u{05D0}'..='\u{05EA}').contains(&ch) || ('\u{05F0}'..='\u{05F2}').contains(&ch)
}

/// Block members that separate words rather than belong to them
fn is_hebrew_separator(ch: char) -> bool {
    matches!(
        ch,
        MAQAF | '\u{05C0}' // paseq
            | '\u{05C3}' // sof pasuq
            | '\u{05C6}' // nun hafukha
    )
}

/// Consonant-only form: strips points and cantillation
pub fn hebrew_consonants(surface: &str) -> String {
    surface.chars().filter(|&ch| is_hebrew_letter(ch)).collect()
}

/// Lowercase, diacritic-free Greek with final sigma folded
pub fn greek_fold(surface: &str) -> String {
    surface
        .nfd()
        .filter(|&ch| !is_combining_mark(ch))
        .collect::<String>()
        .to_lowercase()
        .replace('ς', "σ")
}

/// Word-internal Hebrew content of one maqaf-delimited part, `None` when it holds no letter
fn hebrew_surface(part: &str) -> Option<String> {
    let surface: String = part
        .chars()
        .filter(|&ch| is_hebrew_block(ch) && !is_hebrew_separator(ch))
        .collect();
    surface.chars().any(is_hebrew_letter).then_some(surface)
}

/// Per-language tokenizer; compile once and reuse across verses
pub struct Tokenizer {
    word_re: Regex,
}

impl Tokenizer {
    pub fn new() -> Result<Self> {
        // WHY: Unicode \w covers Greek letters and combining marks, drops punctuation and sigla
        let word_re = Regex::new(r"\w+")?;
        Ok(Self { word_re })
    }

    /// Tokenize cleaned text; every word reports `SourceReading::NotApplicable`
    pub fn tokenize(&self, cleaned_text: &str, corpus: Corpus, key: VerseKey) -> Vec<Word> {
        let forms = match corpus {
            Corpus::Hebrew => hebrew_forms(cleaned_text),
            Corpus::Greek => self.boundary_forms(cleaned_text, greek_fold),
            Corpus::English => self.boundary_forms(cleaned_text, str::to_lowercase),
        };
        forms
            .into_iter()
            .enumerate()
            .map(|(position, (surface_form, normalized_form))| Word {
                surface_form,
                normalized_form,
                position_in_verse: position,
                verse_key: key,
                is_qere: false,
                source_reading: SourceReading::NotApplicable,
                ambiguous: false,
            })
            .collect()
    }

    /// Tokenize a resolved verse, carrying ketiv/qere provenance onto each word
    pub fn tokenize_resolution(&self, resolution: &Resolution) -> Vec<Word> {
        let verse = &resolution.verse;
        if verse.corpus != Corpus::Hebrew {
            return self.tokenize(&verse.cleaned_text, verse.corpus, verse.key);
        }

        let mut words = Vec::new();
        for segment in &resolution.segments {
            for (surface_form, normalized_form) in hebrew_forms(&segment.text) {
                words.push(Word {
                    surface_form,
                    normalized_form,
                    position_in_verse: words.len(),
                    verse_key: verse.key,
                    is_qere: segment.reading == SourceReading::Qere,
                    source_reading: segment.reading,
                    ambiguous: segment.ambiguous,
                });
            }
        }
        words
    }

    fn boundary_forms(&self, text: &str, normalize: impl Fn(&str) -> String) -> Vec<(String, String)> {
        self.word_re
            .find_iter(text)
            .map(|m| {
                let surface = &text[m.start()..m.end()];
                (surface.to_string(), normalize(surface))
            })
            .collect()
    }
}

fn hebrew_forms(text: &str) -> Vec<(String, String)> {
    text.split_whitespace()
        .flat_map(|group| group.split(MAQAF))
        .filter_map(hebrew_surface)
        .map(|surface| {
            let consonants = hebrew_consonants(&surface);
            (surface, consonants)
        })
        .collect()
}
