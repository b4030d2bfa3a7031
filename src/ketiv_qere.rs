// WHY: the source marks the written form with `*` and the read form with `**`;
// analyses need exactly one token per logical word, always the qere

use tracing::warn;

use crate::canon::Corpus;
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::verse::{SourceReading, Verse};

const KETIV_MARK: &str = "*";
const QERE_MARK: &str = "**";

/// One whitespace-delimited unit of a resolved verse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingSegment {
    pub text: String,
    pub reading: SourceReading,
    /// Qere could not be identified; `text` is the best-effort reading
    pub ambiguous: bool,
}

/// Verse with the ketiv/qere choice applied to `cleaned_text`
#[derive(Debug, Clone)]
pub struct Resolution {
    pub verse: Verse,
    pub segments: Vec<ReadingSegment>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marked<'a> {
    Ketiv(&'a str),
    Qere(&'a str),
    Plain(&'a str),
}

fn classify(token: &str) -> Marked<'_> {
    if let Some(rest) = token.strip_prefix(QERE_MARK) {
        Marked::Qere(rest)
    } else if let Some(rest) = token.strip_prefix(KETIV_MARK) {
        Marked::Ketiv(rest)
    } else {
        Marked::Plain(token)
    }
}

/// Keep the qere, drop the ketiv; non-Hebrew verses pass through unchanged
pub fn resolve(verse: Verse) -> Resolution {
    if verse.corpus != Corpus::Hebrew {
        let segments = verse
            .cleaned_text
            .split_whitespace()
            .map(|t| ReadingSegment {
                text: t.to_string(),
                reading: SourceReading::NotApplicable,
                ambiguous: false,
            })
            .collect();
        return Resolution {
            verse,
            segments,
            diagnostics: Vec::new(),
        };
    }

    let tokens: Vec<Marked<'_>> = verse.cleaned_text.split_whitespace().map(classify).collect();
    let mut segments = Vec::with_capacity(tokens.len());
    let mut diagnostics = Vec::new();
    let key = verse.key;
    let line = verse.source_line;
    let mut ambiguous = |detail: String| {
        warn!("Ambiguous ketiv/qere in {}: {}", key, detail);
        diagnostics.push(
            Diagnostic::new(DiagnosticKind::ResolutionAmbiguous, format!("{key}: {detail}"))
                .at(Corpus::Hebrew, key.book(), line),
        );
    };

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            Marked::Plain(text) => {
                segments.push(ReadingSegment {
                    text: text.to_string(),
                    reading: SourceReading::NotApplicable,
                    ambiguous: false,
                });
                i += 1;
            }
            Marked::Qere(text) => {
                if text.is_empty() {
                    ambiguous("bare qere marker".to_string());
                } else {
                    segments.push(ReadingSegment {
                        text: text.to_string(),
                        reading: SourceReading::Qere,
                        ambiguous: false,
                    });
                }
                i += 1;
            }
            Marked::Ketiv(_) => {
                // A ketiv run may span several tokens before its qere
                let run_end = tokens[i..]
                    .iter()
                    .position(|t| !matches!(t, Marked::Ketiv(_)))
                    .map_or(tokens.len(), |n| i + n);
                let has_qere = matches!(tokens.get(run_end), Some(Marked::Qere(q)) if !q.is_empty());

                if !has_qere {
                    for token in &tokens[i..run_end] {
                        let Marked::Ketiv(text) = token else { continue };
                        if text.is_empty() {
                            ambiguous("bare ketiv marker".to_string());
                            continue;
                        }
                        ambiguous(format!("ketiv {text:?} has no qere; kept as read form"));
                        segments.push(ReadingSegment {
                            text: text.to_string(),
                            reading: SourceReading::Ketiv,
                            ambiguous: true,
                        });
                    }
                }
                i = run_end;
            }
        }
    }

    let cleaned: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
    let verse = verse.with_cleaned_text(cleaned.join(" "));
    Resolution {
        verse,
        segments,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canon::{Book, VerseKey};

    fn hebrew(text: &str) -> Verse {
        Verse::new(VerseKey::new(Book::Proverbs, 2, 7).unwrap(), Corpus::Hebrew, text.to_string(), 1)
    }

    #[test]
    fn test_ketiv_dropped_qere_kept() {
        let r = resolve(hebrew("*וצפן **יִצְפֹּ֣ן לַ֭יְשָׁרִים תּוּשִׁיָּ֑ה"));
        assert_eq!(r.verse.cleaned_text, "יִצְפֹּ֣ן לַ֭יְשָׁרִים תּוּשִׁיָּ֑ה");
        assert_eq!(r.segments.len(), 3);
        assert_eq!(r.segments[0].reading, SourceReading::Qere);
        assert_eq!(r.segments[0].text, "יִצְפֹּ֣ן");
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn test_qere_mid_verse() {
        let r = resolve(hebrew("לִ֭נְצֹר אָרְח֣וֹת מִשְׁפָּ֑ט וְדֶ֖רֶךְ *חסידו **חֲסִידָ֣יו יִשְׁמֹֽר"));
        let texts: Vec<_> = r.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts.len(), 6);
        assert_eq!(texts[4], "חֲסִידָ֣יו");
        assert!(!texts.contains(&"חסידו"));
    }

    #[test]
    fn test_multi_token_ketiv_and_qere() {
        // two written tokens read as two different tokens: positions follow the qere
        let r = resolve(hebrew("א *בב *גג **דד **הה ו"));
        let texts: Vec<_> = r.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["א", "דד", "הה", "ו"]);
    }

    #[test]
    fn test_qere_without_ketiv_is_kept() {
        let r = resolve(hebrew("א **בב ג"));
        assert_eq!(r.segments.len(), 3);
        assert_eq!(r.segments[1].reading, SourceReading::Qere);
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn test_ketiv_without_qere_is_ambiguous() {
        let r = resolve(hebrew("א *בב ג"));
        assert_eq!(r.segments.len(), 3);
        assert!(r.segments[1].ambiguous);
        assert_eq!(r.segments[1].reading, SourceReading::Ketiv);
        assert_eq!(r.diagnostics.len(), 1);
        assert_eq!(r.diagnostics[0].kind, DiagnosticKind::ResolutionAmbiguous);
    }

    #[test]
    fn test_bare_markers_dropped_with_warning() {
        let r = resolve(hebrew("א * ** ב"));
        let texts: Vec<_> = r.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["א", "ב"]);
        assert_eq!(r.diagnostics.len(), 2);
    }

    #[test]
    fn test_non_hebrew_passes_through() {
        let verse = Verse::new(
            VerseKey::new(Book::Genesis, 1, 1).unwrap(),
            Corpus::English,
            "In the *beginning".to_string(),
            1,
        );
        let r = resolve(verse);
        assert_eq!(r.verse.cleaned_text, "In the *beginning");
        assert!(r.segments.iter().all(|s| s.reading == SourceReading::NotApplicable));
    }
}
