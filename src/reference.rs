// WHY: each corpus has its own line grammar; a closed enum of strategies is selected once
// per file and carries the per-file state (chapter context, numbering orientation)

use anyhow::Result;
use regex_automata::meta::Regex;
use regex_automata::util::captures::Captures;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, info};

use crate::canon::{Book, Corpus, VerseKey};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::sanitize::{needs_sanitizing, sanitize};
use crate::verse::{RawLine, Verse};

/// Hebrew verse separator (sof pasuq), also used between chapter and verse numbers
pub const SOF_PASUQ: char = '\u{05C3}';
/// Standalone setumah / petuchah section markers
const SECTION_MARKERS: &[&str] = &["\u{05E4}", "\u{05E1}", "{\u{05E4}}", "{\u{05E1}}"];

/// Which number of the `N ׃N` construct is the chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HebrewNumbering {
    #[default]
    ChapterFirst,
    VerseFirst,
}

/// Line grammar settings shared by all strategies
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Edition name closing every English chapter header
    pub english_edition: String,
    /// Starting orientation for Hebrew references; corrected from chapter headers when they disagree
    pub hebrew_numbering: HebrewNumbering,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            english_edition: "New American Standard Bible".to_string(),
            hebrew_numbering: HebrewNumbering::default(),
        }
    }
}

/// Result of feeding one line to a parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// Verse parsed; `warning` set for empty text or a book mismatch
    Verse {
        verse: Verse,
        warning: Option<Diagnostic>,
    },
    /// Chapter header or file banner, consumed as context
    Header { warning: Option<Diagnostic> },
    /// Blank line
    Blank,
    /// Matched no known pattern
    Skip(Diagnostic),
}

/// Verses and diagnostics for one file
#[derive(Debug, Clone, Default)]
pub struct ParsedBook {
    pub verses: Vec<Verse>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Per-corpus line parser
pub enum LineParser {
    Hebrew(HebrewLineParser),
    Greek(GreekLineParser),
    English(EnglishLineParser),
}

impl LineParser {
    /// Build the strategy for a corpus; book identity comes from the file being parsed
    pub fn new(corpus: Corpus, book: Book, config: &ParserConfig) -> Result<Self> {
        Ok(match corpus {
            Corpus::Hebrew => LineParser::Hebrew(HebrewLineParser::new(book, config.hebrew_numbering)?),
            Corpus::Greek => LineParser::Greek(GreekLineParser::new(book)?),
            Corpus::English => LineParser::English(EnglishLineParser::new(book, &config.english_edition)?),
        })
    }

    pub fn corpus(&self) -> Corpus {
        match self {
            LineParser::Hebrew(_) => Corpus::Hebrew,
            LineParser::Greek(_) => Corpus::Greek,
            LineParser::English(_) => Corpus::English,
        }
    }

    pub fn book(&self) -> Book {
        match self {
            LineParser::Hebrew(p) => p.book,
            LineParser::Greek(p) => p.book,
            LineParser::English(p) => p.book,
        }
    }

    pub fn parse_line(&mut self, line: &RawLine) -> ParsedLine {
        let clean: Cow<'_, str> = if needs_sanitizing(&line.raw_text) {
            Cow::Owned(sanitize(&line.raw_text))
        } else {
            Cow::Borrowed(line.raw_text.as_str())
        };
        if clean.trim().is_empty() {
            return ParsedLine::Blank;
        }
        match self {
            LineParser::Hebrew(p) => p.parse(&clean, line.source_offset),
            LineParser::Greek(p) => p.parse(&clean, line.source_offset),
            LineParser::English(p) => p.parse(&clean, line.source_offset),
        }
    }

    /// Verse-or-nothing view of `parse_line`
    pub fn parse_verse(&mut self, line: &RawLine) -> Option<Verse> {
        match self.parse_line(line) {
            ParsedLine::Verse { verse, .. } => Some(verse),
            _ => None,
        }
    }

    /// Parse a whole file's lines, collecting verses and diagnostics
    pub fn parse_all<'a>(&mut self, lines: impl IntoIterator<Item = &'a RawLine>) -> ParsedBook {
        let mut parsed = ParsedBook::default();
        for line in lines {
            match self.parse_line(line) {
                ParsedLine::Verse { verse, warning } => {
                    if let Some(warning) = warning {
                        parsed.diagnostics.push(warning);
                    }
                    parsed.verses.push(verse);
                }
                ParsedLine::Header { warning: Some(diagnostic) } | ParsedLine::Skip(diagnostic) => {
                    parsed.diagnostics.push(diagnostic)
                }
                ParsedLine::Header { warning: None } | ParsedLine::Blank => {}
            }
        }
        debug!(
            "Parsed {} {}: {} verses, {} diagnostics",
            self.corpus(),
            self.book(),
            parsed.verses.len(),
            parsed.diagnostics.len()
        );
        parsed
    }
}

fn group<'h>(caps: &Captures, hay: &'h str, index: usize) -> Option<&'h str> {
    caps.get_group(index).map(|span| &hay[span.start..span.end])
}

fn number(caps: &Captures, hay: &str, index: usize) -> Option<u32> {
    group(caps, hay, index).and_then(|s| s.parse().ok())
}

fn skip(corpus: Corpus, book: Book, line: usize, text: &str) -> ParsedLine {
    let preview: String = text.chars().take(40).collect();
    ParsedLine::Skip(
        Diagnostic::new(DiagnosticKind::ParseSkip, format!("no verse pattern: {preview:?}"))
            .at(corpus, book, line),
    )
}

fn build_verse(corpus: Corpus, key: VerseKey, text: &str, line: usize) -> ParsedLine {
    let verse = Verse::new(key, corpus, text.trim().to_string(), line);
    let warning = verse.is_empty().then(|| {
        Diagnostic::new(DiagnosticKind::EmptyVerse, format!("{key} has no text"))
            .at(corpus, key.book(), line)
    });
    ParsedLine::Verse { verse, warning }
}

/// Strip trailing sof pasuq and standalone section markers, repeatedly
pub fn strip_section_markers(text: &str) -> &str {
    let mut rest = text.trim_end();
    loop {
        if let Some(stripped) = rest.strip_suffix(SOF_PASUQ) {
            rest = stripped.trim_end();
            continue;
        }
        let marker = SECTION_MARKERS.iter().find(|marker| {
            rest.strip_suffix(**marker)
                .is_some_and(|before| before.is_empty() || before.ends_with(char::is_whitespace))
        });
        match marker {
            Some(marker) => rest = rest[..rest.len() - marker.len()].trim_end(),
            None => return rest,
        }
    }
}

/// WLC/UXLC lines: `N ׃N text`, with `Chapter N` headers and `xxxx` banners
pub struct HebrewLineParser {
    book: Book,
    numbering: HebrewNumbering,
    chapter_context: Option<u32>,
    verse_re: Regex,
    chapter_re: Regex,
    caps: Captures,
    chapter_caps: Captures,
}

impl HebrewLineParser {
    pub fn new(book: Book, numbering: HebrewNumbering) -> Result<Self> {
        let verse_re = Regex::new(r"^\s*([0-9]+)\s*\x{05C3}\s*([0-9]+)\s*(.*)$")?;
        let chapter_re = Regex::new(r"Chapter\s+([0-9]+)")?;
        let caps = verse_re.create_captures();
        let chapter_caps = chapter_re.create_captures();
        Ok(Self {
            book,
            numbering,
            chapter_context: None,
            verse_re,
            chapter_re,
            caps,
            chapter_caps,
        })
    }

    fn parse(&mut self, line: &str, offset: usize) -> ParsedLine {
        if line.contains("xxxx") {
            self.chapter_re.captures(line, &mut self.chapter_caps);
            if self.chapter_caps.is_match() {
                self.chapter_context = number(&self.chapter_caps, line, 1);
            }
            return ParsedLine::Header { warning: None };
        }

        self.verse_re.captures(line, &mut self.caps);
        if !self.caps.is_match() {
            self.chapter_re.captures(line, &mut self.chapter_caps);
            if self.chapter_caps.is_match() {
                self.chapter_context = number(&self.chapter_caps, line, 1);
                return ParsedLine::Header { warning: None };
            }
            return skip(Corpus::Hebrew, self.book, offset, line);
        }

        let (Some(first), Some(second)) = (number(&self.caps, line, 1), number(&self.caps, line, 2)) else {
            return skip(Corpus::Hebrew, self.book, offset, line);
        };
        self.orient(first, second);

        let (chapter, verse) = match self.numbering {
            HebrewNumbering::ChapterFirst => (first, second),
            HebrewNumbering::VerseFirst => (second, first),
        };
        let Some(key) = VerseKey::new(self.book, chapter, verse) else {
            return skip(Corpus::Hebrew, self.book, offset, line);
        };

        let text = group(&self.caps, line, 3).unwrap_or("");
        build_verse(Corpus::Hebrew, key, strip_section_markers(text), offset)
    }

    /// Flip orientation when the chapter header contradicts the configured order
    fn orient(&mut self, first: u32, second: u32) {
        let Some(context) = self.chapter_context else {
            return;
        };
        let chapter = match self.numbering {
            HebrewNumbering::ChapterFirst => first,
            HebrewNumbering::VerseFirst => second,
        };
        let other = match self.numbering {
            HebrewNumbering::ChapterFirst => second,
            HebrewNumbering::VerseFirst => first,
        };
        if chapter != context && other == context {
            self.numbering = match self.numbering {
                HebrewNumbering::ChapterFirst => HebrewNumbering::VerseFirst,
                HebrewNumbering::VerseFirst => HebrewNumbering::ChapterFirst,
            };
            info!(
                "{}: verse references follow {:?} order per chapter header {}",
                self.book, self.numbering, context
            );
        }
    }
}

/// SBLGNT lines: `<Abbrev> <C>:<V>\t<text>`; one book per file
pub struct GreekLineParser {
    book: Book,
    verse_re: Regex,
    caps: Captures,
}

impl GreekLineParser {
    pub fn new(book: Book) -> Result<Self> {
        let verse_re = Regex::new(r"^\s*(\S+)\s+([0-9]+):([0-9]+)\s*(.*)$")?;
        let caps = verse_re.create_captures();
        Ok(Self { book, verse_re, caps })
    }

    fn parse(&mut self, line: &str, offset: usize) -> ParsedLine {
        self.verse_re.captures(line, &mut self.caps);
        if !self.caps.is_match() {
            // Title lines such as "ΚΑΤΑ ΜΑΘΘΑΙΟΝ" carry no reference
            return skip(Corpus::Greek, self.book, offset, line);
        }

        let (Some(chapter), Some(verse)) = (number(&self.caps, line, 2), number(&self.caps, line, 3)) else {
            return skip(Corpus::Greek, self.book, offset, line);
        };
        let Some(key) = VerseKey::new(self.book, chapter, verse) else {
            return skip(Corpus::Greek, self.book, offset, line);
        };

        let abbrev = group(&self.caps, line, 1).unwrap_or("");
        let text = group(&self.caps, line, 4).unwrap_or("");
        let parsed = build_verse(Corpus::Greek, key, text, offset);

        if Book::from_greek_abbrev(abbrev) == Some(self.book) {
            return parsed;
        }
        let mismatch = Diagnostic::new(
            DiagnosticKind::BookMismatch,
            format!("reference prefix {abbrev:?} in file for {}", self.book),
        )
        .at(Corpus::Greek, self.book, offset);
        match parsed {
            ParsedLine::Verse { verse, warning } => ParsedLine::Verse {
                verse,
                warning: warning.or(Some(mismatch)),
            },
            other => other,
        }
    }
}

/// NASB lines: `<Book> <N> <Edition>` headers, then `N text` verses
pub struct EnglishLineParser {
    book: Book,
    edition: String,
    chapter_context: Option<u32>,
    verse_re: Regex,
    caps: Captures,
}

impl EnglishLineParser {
    pub fn new(book: Book, edition: &str) -> Result<Self> {
        let verse_re = Regex::new(r"^\s*([0-9]+)(?:\s+(.*?))?\s*$")?;
        let caps = verse_re.create_captures();
        Ok(Self {
            book,
            edition: edition.trim().to_string(),
            chapter_context: None,
            verse_re,
            caps,
        })
    }

    /// `Genesis 1 New American Standard Bible` -> ("Genesis", 1)
    fn header<'h>(&self, line: &'h str) -> Option<(&'h str, u32)> {
        let head = line.trim().strip_suffix(self.edition.as_str())?.trim_end();
        let (name, chapter) = head.rsplit_once(char::is_whitespace)?;
        let chapter = chapter.parse().ok()?;
        Some((name.trim(), chapter))
    }

    fn parse(&mut self, line: &str, offset: usize) -> ParsedLine {
        if let Some((name, chapter)) = self.header(line) {
            self.chapter_context = Some(chapter);
            // Context is still taken; the file decides the book
            let warning = (Book::parse_name(name) != Some(self.book)).then(|| {
                Diagnostic::new(
                    DiagnosticKind::BookMismatch,
                    format!("header names {name:?} in file for {}", self.book),
                )
                .at(Corpus::English, self.book, offset)
            });
            return ParsedLine::Header { warning };
        }

        self.verse_re.captures(line, &mut self.caps);
        if !self.caps.is_match() {
            return skip(Corpus::English, self.book, offset, line);
        }

        let Some(chapter) = self.chapter_context else {
            return ParsedLine::Skip(
                Diagnostic::new(
                    DiagnosticKind::MissingChapterContext,
                    "verse line before any chapter header",
                )
                .at(Corpus::English, self.book, offset),
            );
        };
        let Some(key) = number(&self.caps, line, 1).and_then(|v| VerseKey::new(self.book, chapter, v)) else {
            return skip(Corpus::English, self.book, offset, line);
        };

        let text = group(&self.caps, line, 2).unwrap_or("");
        build_verse(Corpus::English, key, text, offset)
    }
}

/// Parse raw lines for one book with default settings
pub fn parse_book(corpus: Corpus, book: Book, lines: &[RawLine]) -> Result<ParsedBook> {
    let mut parser = LineParser::new(corpus, book, &ParserConfig::default())?;
    Ok(parser.parse_all(lines))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(corpus: Corpus, text: &[&str]) -> Vec<RawLine> {
        text.iter()
            .enumerate()
            .map(|(i, t)| RawLine::new(corpus, *t, i + 1))
            .collect()
    }

    fn hebrew_parser(book: Book) -> LineParser {
        LineParser::new(Corpus::Hebrew, book, &ParserConfig::default()).unwrap()
    }

    #[test]
    fn test_hebrew_verse_line() {
        let mut parser = hebrew_parser(Book::Proverbs);
        let line = RawLine::new(Corpus::Hebrew, "\u{202A}1 \u{202C}׃1 מִשְׁלֵי שְׁלֹמֹה בֶן־דָּוִד׃", 3);
        let verse = parser.parse_verse(&line).unwrap();
        assert_eq!(verse.key, VerseKey::new(Book::Proverbs, 1, 1).unwrap());
        assert_eq!(verse.raw_text, "מִשְׁלֵי שְׁלֹמֹה בֶן־דָּוִד");
        assert_eq!(verse.source_line, 3);
    }

    #[test]
    fn test_hebrew_headers_and_banners_are_not_verses() {
        let mut parser = hebrew_parser(Book::Genesis);
        let banner = RawLine::new(Corpus::Hebrew, "xxxx Genesis xxxx", 1);
        let chapter = RawLine::new(Corpus::Hebrew, "Chapter 1", 2);
        let blank = RawLine::new(Corpus::Hebrew, "   ", 3);
        assert_eq!(parser.parse_line(&banner), ParsedLine::Header { warning: None });
        assert_eq!(parser.parse_line(&chapter), ParsedLine::Header { warning: None });
        assert_eq!(parser.parse_line(&blank), ParsedLine::Blank);
    }

    #[test]
    fn test_hebrew_orientation_follows_chapter_header() {
        let input = lines(Corpus::Hebrew, &["Chapter 10", "1 ׃10 מִשְׁלֵ֬י שְׁלֹמֹ֗ה", "2 ׃10 לֹא־י֭וֹעִילוּ"]);
        let parsed = parse_book(Corpus::Hebrew, Book::Proverbs, &input).unwrap();
        let keys: Vec<_> = parsed.verses.iter().map(|v| (v.key.chapter(), v.key.verse())).collect();
        assert_eq!(keys, vec![(10, 1), (10, 2)]);
    }

    #[test]
    fn test_section_markers_stripped() {
        assert_eq!(strip_section_markers("הָאָֽרֶץ׃ פ"), "הָאָֽרֶץ");
        assert_eq!(strip_section_markers("הָאָֽרֶץ׃ {ס}"), "הָאָֽרֶץ");
        assert_eq!(strip_section_markers("הָאָֽרֶץ׃  "), "הָאָֽרֶץ");
        // A word that merely ends in samekh is untouched
        assert_eq!(strip_section_markers("סוּס"), "סוּס");
        assert_eq!(strip_section_markers("׃"), "");
    }

    #[test]
    fn test_empty_verse_is_a_warning_not_a_skip() {
        let mut parser = hebrew_parser(Book::Ruth);
        let line = RawLine::new(Corpus::Hebrew, "3 ׃2 ׃", 9);
        match parser.parse_line(&line) {
            ParsedLine::Verse { verse, warning } => {
                assert!(verse.is_empty());
                assert_eq!(warning.unwrap().kind, DiagnosticKind::EmptyVerse);
            }
            other => panic!("expected verse, got {other:?}"),
        }
    }

    #[test]
    fn test_unmatched_line_is_parse_skip() {
        let mut parser = hebrew_parser(Book::Ruth);
        let line = RawLine::new(Corpus::Hebrew, "random trailer text", 4);
        match parser.parse_line(&line) {
            ParsedLine::Skip(d) => {
                assert_eq!(d.kind, DiagnosticKind::ParseSkip);
                assert_eq!(d.line, Some(4));
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn test_english_header_sets_chapter() {
        let input = lines(
            Corpus::English,
            &[
                "Genesis 1 New American Standard Bible",
                "1 In the beginning God created the heavens and the earth.",
                "2 The earth was formless and void,",
                "Genesis 2 New American Standard Bible",
                "1 Thus the heavens and the earth were completed,",
            ],
        );
        let parsed = parse_book(Corpus::English, Book::Genesis, &input).unwrap();
        let keys: Vec<_> = parsed.verses.iter().map(|v| v.key.to_string()).collect();
        assert_eq!(keys, vec!["Genesis 1:1", "Genesis 1:2", "Genesis 2:1"]);
        assert_eq!(parsed.verses[0].raw_text, "In the beginning God created the heavens and the earth.");
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn test_english_numbered_book_header() {
        let input = lines(Corpus::English, &["1 Samuel 3 New American Standard Bible", "4 that the LORD called Samuel;"]);
        let parsed = parse_book(Corpus::English, Book::FirstSamuel, &input).unwrap();
        assert_eq!(parsed.verses[0].key, VerseKey::new(Book::FirstSamuel, 3, 4).unwrap());
    }

    #[test]
    fn test_english_header_for_other_book_warns() {
        let input = lines(Corpus::English, &["Exodus 1 New American Standard Bible", "1 Now these are the names"]);
        let parsed = parse_book(Corpus::English, Book::Genesis, &input).unwrap();
        assert_eq!(parsed.verses[0].key, VerseKey::new(Book::Genesis, 1, 1).unwrap());
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::BookMismatch);
    }

    #[test]
    fn test_english_verse_without_header() {
        let input = lines(Corpus::English, &["1 In the beginning"]);
        let parsed = parse_book(Corpus::English, Book::Genesis, &input).unwrap();
        assert!(parsed.verses.is_empty());
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::MissingChapterContext);
    }

    #[test]
    fn test_greek_lines() {
        let input = lines(
            Corpus::Greek,
            &[
                "ΚΑΤΑ ΜΑΘΘΑΙΟΝ",
                "Matt 1:1\tΒίβλος γενέσεως Ἰησοῦ χριστοῦ υἱοῦ Δαυὶδ υἱοῦ Ἀβραάμ.",
                "Matt 1:2\tἈβραὰμ ἐγέννησεν τὸν Ἰσαάκ,",
            ],
        );
        let parsed = parse_book(Corpus::Greek, Book::Matthew, &input).unwrap();
        assert_eq!(parsed.verses.len(), 2);
        assert_eq!(parsed.verses[1].key, VerseKey::new(Book::Matthew, 1, 2).unwrap());
        assert_eq!(parsed.diagnostics.len(), 1);
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::ParseSkip);
    }

    #[test]
    fn test_greek_prefix_mismatch_keeps_file_book() {
        let input = lines(Corpus::Greek, &["Mark 1:1\tἈρχὴ τοῦ εὐαγγελίου"]);
        let parsed = parse_book(Corpus::Greek, Book::Matthew, &input).unwrap();
        assert_eq!(parsed.verses[0].key.book(), Book::Matthew);
        assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::BookMismatch);
    }
}
