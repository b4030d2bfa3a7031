// Integration test utilities and common code
// WHY: Centralized utilities avoid duplication across integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use canon_align::config::PipelineConfig;
use canon_align::{Book, Corpus};

pub const GENESIS_HEBREW: &str = "\
xxxx Genesis Chapter 1 xxxx
\u{202A}1 \u{202C}\u{202B}׃1\u{202C} בְּרֵאשִׁית בָּרָא אֱלֹהִים אֵת הַשָּׁמַיִם וְאֵת הָאָרֶץ׃
1 ׃2 וְהָאָרֶץ הָיְתָה תֹהוּ וָבֹהוּ ׃ ס
";

pub const GENESIS_ENGLISH: &str = "\
Genesis 1 New American Standard Bible
1 In the beginning God created the heavens and the earth.
2 The earth was formless and void,
";

pub const MATTHEW_GREEK: &str = "\
ΚΑΤΑ ΜΑΘΘΑΙΟΝ
Matt 1:1\tΒίβλος γενέσεως Ἰησοῦ Χριστοῦ υἱοῦ Δαυὶδ υἱοῦ Ἀβραάμ.
Matt 1:2\tἈβραὰμ ἐγέννησεν τὸν Ἰσαάκ,
";

pub const MATTHEW_ENGLISH: &str = "\
Matthew 1 New American Standard Bible
1 The record of the genealogy of Jesus the Messiah, the son of David, the son of Abraham:
";

/// Test fixture helper for creating temporary corpus trees
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub root_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with temporary directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root_path = temp_dir.path().to_path_buf();

        Self { temp_dir, root_path }
    }

    /// Fixture with Genesis (Hebrew, English) and Matthew (Greek, English)
    pub fn with_sample_corpora() -> Self {
        let fixture = Self::new();
        fixture.create_book_file(Corpus::Hebrew, Book::Genesis, GENESIS_HEBREW);
        fixture.create_book_file(Corpus::English, Book::Genesis, GENESIS_ENGLISH);
        fixture.create_book_file(Corpus::Greek, Book::Matthew, MATTHEW_GREEK);
        fixture.create_book_file(Corpus::English, Book::Matthew, MATTHEW_ENGLISH);
        fixture
    }

    /// Create a file relative to the fixture root
    pub fn create_file<P: AsRef<Path>>(&self, relative_path: P, content: &str) -> PathBuf {
        let file_path = self.root_path.join(relative_path);

        // Create parent directories if needed
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }

        fs::write(&file_path, content).expect("Failed to write test file");
        file_path
    }

    /// Create a book file where the default configuration looks for it
    pub fn create_book_file(&self, corpus: Corpus, book: Book, content: &str) -> PathBuf {
        let stem = book
            .file_stem(corpus)
            .unwrap_or_else(|| panic!("{book} has no {corpus} file"));
        let relative = self.config().dir_for(corpus).join(format!("{stem}.txt"));
        self.create_file(relative, content)
    }

    /// Default configuration with a small worker pool
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            max_workers: 2,
            ..Default::default()
        }
    }

    /// Get path to the fixture root
    pub fn path(&self) -> &Path {
        &self.root_path
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
