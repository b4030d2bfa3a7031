// Tests for the per-stage entry points exposed to downstream analyses
// WHY: Public API functions must be tested to ensure they work correctly for external users

use canon_align::reference::parse_book;
use canon_align::{
    align, resolve, sanitize, Book, Corpus, IntegrityError, LineParser, ParsedLine, ParserConfig, RawLine,
    Tokenizer, VerseKey, VerseRecord,
};

fn records(corpus: Corpus, book: Book, lines: &[&str]) -> Vec<VerseRecord> {
    let raw: Vec<RawLine> = lines
        .iter()
        .enumerate()
        .map(|(i, text)| RawLine::new(corpus, *text, i + 1))
        .collect();
    let parsed = parse_book(corpus, book, &raw).expect("parser should build");
    let tokenizer = Tokenizer::new().unwrap();
    parsed
        .verses
        .into_iter()
        .map(|verse| {
            let resolution = resolve(verse);
            let words = tokenizer.tokenize_resolution(&resolution);
            VerseRecord {
                verse: resolution.verse,
                words,
            }
        })
        .collect()
}

#[test]
fn test_sanitize_is_idempotent_and_preserves_marks() {
    let raw = "\u{FEFF}\u{202B}בְּרֵאשִׁ֖ית\u{202C}";
    let once = sanitize(raw);
    assert_eq!(once, "בְּרֵאשִׁ֖ית");
    assert_eq!(sanitize(&once), once);
}

#[test]
fn test_line_parser_per_corpus() {
    let config = ParserConfig::default();

    let mut greek = LineParser::new(Corpus::Greek, Book::John, &config).unwrap();
    let line = RawLine::new(Corpus::Greek, "John 3:16\tΟὕτως γὰρ ἠγάπησεν ὁ θεὸς τὸν κόσμον", 1);
    let verse = greek.parse_verse(&line).expect("verse line");
    assert_eq!(verse.key, VerseKey::new(Book::John, 3, 16).unwrap());

    let mut english = LineParser::new(Corpus::English, Book::John, &config).unwrap();
    let header = RawLine::new(Corpus::English, "John 3 New American Standard Bible", 1);
    assert!(matches!(english.parse_line(&header), ParsedLine::Header { warning: None }));
    assert!(matches!(english.parse_line(&RawLine::new(Corpus::English, "   ", 2)), ParsedLine::Blank));
}

#[test]
fn test_align_builds_shared_key_space() {
    let hebrew = records(Corpus::Hebrew, Book::Ruth, &["1 ׃1 וַיְהִי בִּימֵי שְׁפֹט הַשֹּׁפְטִים"]);
    let english = records(
        Corpus::English,
        Book::Ruth,
        &["Ruth 1 New American Standard Bible", "1 Now it came about in the days when the judges governed,", "2 The name of the man was Elimelech,"],
    );

    let index = align([(Corpus::Hebrew, hebrew), (Corpus::English, english)]).unwrap();
    let ruth_1_1 = VerseKey::new(Book::Ruth, 1, 1).unwrap();
    let ruth_1_2 = VerseKey::new(Book::Ruth, 1, 2).unwrap();

    assert_eq!(index.len(), 2);
    assert_eq!(index.get(&ruth_1_1, Corpus::Hebrew).unwrap().word_count(), 4);
    assert!(index.get(&ruth_1_2, Corpus::Hebrew).is_none());
    assert_eq!(index.word_count(Book::Ruth, Corpus::English), 18);
}

#[test]
fn test_align_rejects_misfiled_corpus() {
    let greek = records(Corpus::Greek, Book::Jude, &["Jude 1:1\tἸούδας Ἰησοῦ Χριστοῦ δοῦλος"]);
    let result = align([(Corpus::English, greek)]);
    assert!(matches!(result, Err(IntegrityError::CorpusMismatch { expected: Corpus::English, found: Corpus::Greek, .. })));
}
