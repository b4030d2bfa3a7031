// WHY: one explicit translation table keyed by the canonical book enum
// Every boundary crossing (file stems, header names, dataset names) goes through here

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source corpus of a verse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corpus {
    /// Westminster Leningrad Codex, UXLC encoding with cantillation
    Hebrew,
    /// SBL Greek New Testament
    Greek,
    /// New American Standard Bible
    English,
}

impl Corpus {
    pub const ALL: [Corpus; 3] = [Corpus::Hebrew, Corpus::Greek, Corpus::English];

    /// Dense index used for per-corpus slots in the index
    pub fn index(self) -> usize {
        match self {
            Corpus::Hebrew => 0,
            Corpus::Greek => 1,
            Corpus::English => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Corpus::Hebrew => "hebrew",
            Corpus::Greek => "greek",
            Corpus::English => "english",
        }
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Corpus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hebrew" | "heb" | "wlc" => Ok(Corpus::Hebrew),
            "greek" | "grk" | "sblgnt" => Ok(Corpus::Greek),
            "english" | "eng" | "nasb" => Ok(Corpus::English),
            other => Err(anyhow::anyhow!("Unknown corpus: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Testament {
    Old,
    New,
}

/// Canonical book identity; declaration order is canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Book {
    Genesis,
    Exodus,
    Leviticus,
    Numbers,
    Deuteronomy,
    Joshua,
    Judges,
    Ruth,
    FirstSamuel,
    SecondSamuel,
    FirstKings,
    SecondKings,
    FirstChronicles,
    SecondChronicles,
    Ezra,
    Nehemiah,
    Esther,
    Job,
    Psalms,
    Proverbs,
    Ecclesiastes,
    SongOfSongs,
    Isaiah,
    Jeremiah,
    Lamentations,
    Ezekiel,
    Daniel,
    Hosea,
    Joel,
    Amos,
    Obadiah,
    Jonah,
    Micah,
    Nahum,
    Habakkuk,
    Zephaniah,
    Haggai,
    Zechariah,
    Malachi,
    Matthew,
    Mark,
    Luke,
    John,
    Acts,
    Romans,
    FirstCorinthians,
    SecondCorinthians,
    Galatians,
    Ephesians,
    Philippians,
    Colossians,
    FirstThessalonians,
    SecondThessalonians,
    FirstTimothy,
    SecondTimothy,
    Titus,
    Philemon,
    Hebrews,
    James,
    FirstPeter,
    SecondPeter,
    FirstJohn,
    SecondJohn,
    ThirdJohn,
    Jude,
    Revelation,
}

/// One row of the translation table
#[derive(Debug)]
struct BookNames {
    /// Display name, also the NASB chapter header name
    name: &'static str,
    /// tanach.us file stem (OT only)
    hebrew_stem: Option<&'static str>,
    /// NASB per-book file stem
    english_stem: &'static str,
    /// SBLGNT abbreviation as used in file names and line prefixes (NT only)
    greek_abbrev: Option<&'static str>,
    /// ETCBC BHSA `book` feature value (OT only)
    etcbc: Option<&'static str>,
}

const fn ot(name: &'static str, hebrew: &'static str, english: &'static str, etcbc: &'static str) -> BookNames {
    BookNames {
        name,
        hebrew_stem: Some(hebrew),
        english_stem: english,
        greek_abbrev: None,
        etcbc: Some(etcbc),
    }
}

const fn nt(name: &'static str, english: &'static str, greek: &'static str) -> BookNames {
    BookNames {
        name,
        hebrew_stem: None,
        english_stem: english,
        greek_abbrev: Some(greek),
        etcbc: None,
    }
}

// Indexed by `Book as usize`; must stay in declaration order
static BOOK_TABLE: [BookNames; 66] = [
    ot("Genesis", "genesis", "genesis", "Genesis"),
    ot("Exodus", "exodus", "exodus", "Exodus"),
    ot("Leviticus", "leviticus", "leviticus", "Leviticus"),
    ot("Numbers", "numbers", "numbers", "Numeri"),
    ot("Deuteronomy", "deuteronomy", "deuteronomy", "Deuteronomium"),
    ot("Joshua", "joshua", "joshua", "Josua"),
    ot("Judges", "judges", "judges", "Judices"),
    ot("Ruth", "ruth", "ruth", "Ruth"),
    ot("1 Samuel", "1samuel", "1_samuel", "Samuel_I"),
    ot("2 Samuel", "2samuel", "2_samuel", "Samuel_II"),
    ot("1 Kings", "1kings", "1_kings", "Reges_I"),
    ot("2 Kings", "2kings", "2_kings", "Reges_II"),
    ot("1 Chronicles", "1chronicles", "1_chronicles", "Chronica_I"),
    ot("2 Chronicles", "2chronicles", "2_chronicles", "Chronica_II"),
    ot("Ezra", "ezra", "ezra", "Esra"),
    ot("Nehemiah", "nehemiah", "nehemiah", "Nehemia"),
    ot("Esther", "esther", "esther", "Esther"),
    ot("Job", "job", "job", "Iob"),
    ot("Psalms", "psalms", "psalms", "Psalmi"),
    ot("Proverbs", "proverbs", "proverbs", "Proverbia"),
    ot("Ecclesiastes", "ecclesiastes", "ecclesiastes", "Koheleth"),
    ot("Song of Solomon", "songofsongs", "song_of_solomon", "Canticum"),
    ot("Isaiah", "isaiah", "isaiah", "Jesaia"),
    ot("Jeremiah", "jeremiah", "jeremiah", "Jeremia"),
    ot("Lamentations", "lamentations", "lamentations", "Threni"),
    ot("Ezekiel", "ezekiel", "ezekiel", "Ezechiel"),
    ot("Daniel", "daniel", "daniel", "Daniel"),
    ot("Hosea", "hosea", "hosea", "Hosea"),
    ot("Joel", "joel", "joel", "Joel"),
    ot("Amos", "amos", "amos", "Amos"),
    ot("Obadiah", "obadiah", "obadiah", "Obadia"),
    ot("Jonah", "jonah", "jonah", "Jona"),
    ot("Micah", "micah", "micah", "Micha"),
    ot("Nahum", "nahum", "nahum", "Nahum"),
    ot("Habakkuk", "habakkuk", "habakkuk", "Habakuk"),
    ot("Zephaniah", "zephaniah", "zephaniah", "Zephania"),
    ot("Haggai", "haggai", "haggai", "Haggai"),
    ot("Zechariah", "zechariah", "zechariah", "Sacharia"),
    ot("Malachi", "malachi", "malachi", "Maleachi"),
    nt("Matthew", "matthew", "Matt"),
    nt("Mark", "mark", "Mark"),
    nt("Luke", "luke", "Luke"),
    nt("John", "john", "John"),
    nt("Acts", "acts", "Acts"),
    nt("Romans", "romans", "Rom"),
    nt("1 Corinthians", "1_corinthians", "1Cor"),
    nt("2 Corinthians", "2_corinthians", "2Cor"),
    nt("Galatians", "galatians", "Gal"),
    nt("Ephesians", "ephesians", "Eph"),
    nt("Philippians", "philippians", "Phil"),
    nt("Colossians", "colossians", "Col"),
    nt("1 Thessalonians", "1_thessalonians", "1Thess"),
    nt("2 Thessalonians", "2_thessalonians", "2Thess"),
    nt("1 Timothy", "1_timothy", "1Tim"),
    nt("2 Timothy", "2_timothy", "2Tim"),
    nt("Titus", "titus", "Titus"),
    nt("Philemon", "philemon", "Phlm"),
    nt("Hebrews", "hebrews", "Heb"),
    nt("James", "james", "Jas"),
    nt("1 Peter", "1_peter", "1Pet"),
    nt("2 Peter", "2_peter", "2Pet"),
    nt("1 John", "1_john", "1John"),
    nt("2 John", "2_john", "2John"),
    nt("3 John", "3_john", "3John"),
    nt("Jude", "jude", "Jude"),
    nt("Revelation", "revelation", "Rev"),
];

// Alternate spellings seen in headers and user input
const NAME_ALIASES: &[(&str, Book)] = &[
    ("song of songs", Book::SongOfSongs),
    ("songofsongs", Book::SongOfSongs),
    ("canticles", Book::SongOfSongs),
    ("psalm", Book::Psalms),
    ("qoheleth", Book::Ecclesiastes),
    ("revelations", Book::Revelation),
];

impl Book {
    pub const ALL: [Book; 66] = [
        Book::Genesis, Book::Exodus, Book::Leviticus, Book::Numbers, Book::Deuteronomy,
        Book::Joshua, Book::Judges, Book::Ruth, Book::FirstSamuel, Book::SecondSamuel,
        Book::FirstKings, Book::SecondKings, Book::FirstChronicles, Book::SecondChronicles,
        Book::Ezra, Book::Nehemiah, Book::Esther, Book::Job, Book::Psalms, Book::Proverbs,
        Book::Ecclesiastes, Book::SongOfSongs, Book::Isaiah, Book::Jeremiah, Book::Lamentations,
        Book::Ezekiel, Book::Daniel, Book::Hosea, Book::Joel, Book::Amos, Book::Obadiah,
        Book::Jonah, Book::Micah, Book::Nahum, Book::Habakkuk, Book::Zephaniah, Book::Haggai,
        Book::Zechariah, Book::Malachi,
        Book::Matthew, Book::Mark, Book::Luke, Book::John, Book::Acts, Book::Romans,
        Book::FirstCorinthians, Book::SecondCorinthians, Book::Galatians, Book::Ephesians,
        Book::Philippians, Book::Colossians, Book::FirstThessalonians, Book::SecondThessalonians,
        Book::FirstTimothy, Book::SecondTimothy, Book::Titus, Book::Philemon, Book::Hebrews,
        Book::James, Book::FirstPeter, Book::SecondPeter, Book::FirstJohn, Book::SecondJohn,
        Book::ThirdJohn, Book::Jude, Book::Revelation,
    ];

    fn names(self) -> &'static BookNames {
        &BOOK_TABLE[self as usize]
    }

    /// Common English name, e.g. "1 Samuel"
    pub fn name(self) -> &'static str {
        self.names().name
    }

    pub fn testament(self) -> Testament {
        if self < Book::Matthew {
            Testament::Old
        } else {
            Testament::New
        }
    }

    /// Whether the given corpus is expected to carry this book
    pub fn in_corpus(self, corpus: Corpus) -> bool {
        match corpus {
            Corpus::Hebrew => self.testament() == Testament::Old,
            Corpus::Greek => self.testament() == Testament::New,
            Corpus::English => true,
        }
    }

    /// Lowercase file stem for a corpus directory, `None` when the corpus lacks the book
    pub fn file_stem(self, corpus: Corpus) -> Option<String> {
        let names = self.names();
        match corpus {
            Corpus::Hebrew => names.hebrew_stem.map(str::to_string),
            Corpus::Greek => names.greek_abbrev.map(str::to_ascii_lowercase),
            Corpus::English => Some(names.english_stem.to_string()),
        }
    }

    /// Reverse of `file_stem`; comparison is case-insensitive
    pub fn from_file_stem(corpus: Corpus, stem: &str) -> Option<Book> {
        let stem = stem.to_ascii_lowercase();
        Book::ALL
            .iter()
            .copied()
            .find(|book| book.file_stem(corpus).as_deref() == Some(stem.as_str()))
    }

    /// SBLGNT reference abbreviation, e.g. "1Cor"
    pub fn greek_abbrev(self) -> Option<&'static str> {
        self.names().greek_abbrev
    }

    pub fn from_greek_abbrev(abbrev: &str) -> Option<Book> {
        Book::ALL.iter().copied().find(|book| {
            book.greek_abbrev()
                .is_some_and(|a| a.eq_ignore_ascii_case(abbrev))
        })
    }

    /// Identifier used by the ETCBC annotation dataset, e.g. "Iob" for Job
    pub fn etcbc_name(self) -> Option<&'static str> {
        self.names().etcbc
    }

    pub fn from_etcbc_name(name: &str) -> Option<Book> {
        let name = name.trim();
        Book::ALL
            .iter()
            .copied()
            .find(|book| book.etcbc_name() == Some(name))
    }

    /// Parse a display name or alias ("1 Samuel", "song of songs", "Proverbs")
    pub fn parse_name(name: &str) -> Option<Book> {
        let wanted = collapse_spaces(name).to_lowercase();
        if wanted.is_empty() {
            return None;
        }

        if let Some(book) = Book::ALL
            .iter()
            .copied()
            .find(|book| book.name().to_lowercase() == wanted)
        {
            return Some(book);
        }

        NAME_ALIASES
            .iter()
            .find(|(alias, _)| *alias == wanted)
            .map(|(_, book)| *book)
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Book {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Book::parse_name(s)
            .or_else(|| Book::from_greek_abbrev(s))
            .or_else(|| Book::from_etcbc_name(s))
            .or_else(|| Corpus::ALL.iter().find_map(|c| Book::from_file_stem(*c, s)))
            .ok_or_else(|| anyhow::anyhow!("Unknown book: {}", s))
    }
}

fn collapse_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical (book, chapter, verse) address
/// Ordering follows canonical book sequence, then chapter, then verse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawVerseKey")]
pub struct VerseKey {
    book: Book,
    chapter: u32,
    verse: u32,
}

impl VerseKey {
    /// Chapter and verse are 1-based; zero is rejected
    pub fn new(book: Book, chapter: u32, verse: u32) -> Option<Self> {
        if chapter == 0 || verse == 0 {
            return None;
        }
        Some(Self { book, chapter, verse })
    }

    /// Sorts before every real verse of `book`; only a range bound, never stored
    pub(crate) fn book_start(book: Book) -> Self {
        Self { book, chapter: 0, verse: 0 }
    }

    pub fn book(&self) -> Book {
        self.book
    }

    pub fn chapter(&self) -> u32 {
        self.chapter
    }

    pub fn verse(&self) -> u32 {
        self.verse
    }
}

/// Unchecked wire form; every deserialized key goes through `VerseKey::new`
#[derive(Deserialize)]
struct RawVerseKey {
    book: Book,
    chapter: u32,
    verse: u32,
}

impl TryFrom<RawVerseKey> for VerseKey {
    type Error = String;

    fn try_from(raw: RawVerseKey) -> Result<Self, Self::Error> {
        VerseKey::new(raw.book, raw.chapter, raw.verse)
            .ok_or_else(|| format!("invalid verse key {} {}:{}", raw.book, raw.chapter, raw.verse))
    }
}

impl fmt::Display for VerseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.book.name(), self.chapter, self.verse)
    }
}
