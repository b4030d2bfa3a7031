use anyhow::Result;
use futures::stream::{Stream, StreamExt};
use glob::glob;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::canon::{Book, Corpus};
use crate::config::PipelineConfig;
use crate::diagnostics::IntegrityError;

/// Configuration for file discovery behavior
#[derive(Debug, Clone, Default)]
pub struct DiscoveryConfig {
    /// Whether an unplaceable file aborts discovery
    pub fail_fast: bool,
}

/// One per-book file found under a corpus directory
#[derive(Debug, Clone)]
pub struct FileValidation {
    pub path: PathBuf,
    pub corpus: Corpus,
    /// `None` when the file stem maps to no book of the corpus
    pub book: Option<Book>,
    pub error: Option<String>,
}

impl FileValidation {
    pub fn is_valid(&self) -> bool {
        self.book.is_some() && self.error.is_none()
    }
}

/// Lookup convention: root / corpus directory / lowercase book stem `.txt`
pub fn book_file_path(root: &Path, config: &PipelineConfig, corpus: Corpus, book: Book) -> Option<PathBuf> {
    let stem = book.file_stem(corpus)?;
    Some(root.join(config.dir_for(corpus)).join(format!("{stem}.txt")))
}

/// Streams every `*.txt` file directly under the corpus directory, mapped to its book
pub fn discover_files(
    root_dir: impl AsRef<Path>,
    pipeline: &PipelineConfig,
    corpus: Corpus,
    config: DiscoveryConfig,
) -> impl Stream<Item = Result<FileValidation>> {
    let corpus_dir = root_dir.as_ref().join(pipeline.dir_for(corpus));

    // WHY: futures::stream::unfold gives async iteration without an extra stream crate
    futures::stream::unfold(
        DiscoveryState::new(corpus_dir, corpus, config),
        |mut state| async move {
            state.next_file().await.map(|result| (result, state))
        },
    )
}

/// Internal state for file discovery iteration
struct DiscoveryState {
    corpus_dir: PathBuf,
    corpus: Corpus,
    config: DiscoveryConfig,
    glob_iter: Option<glob::Paths>,
    finished: bool,
}

impl DiscoveryState {
    fn new(corpus_dir: PathBuf, corpus: Corpus, config: DiscoveryConfig) -> Self {
        Self {
            corpus_dir,
            corpus,
            config,
            glob_iter: None,
            finished: false,
        }
    }

    async fn next_file(&mut self) -> Option<Result<FileValidation>> {
        if self.finished {
            return None;
        }

        if self.glob_iter.is_none() {
            let pattern = format!("{}/*.txt", self.corpus_dir.display());
            debug!("Starting {} file discovery with pattern: {}", self.corpus, pattern);

            match glob(&pattern) {
                Ok(paths) => self.glob_iter = Some(paths),
                Err(e) => {
                    self.finished = true;
                    return Some(Err(anyhow::anyhow!("Failed to create glob pattern: {}", e)));
                }
            }
        }

        let glob_iter = self.glob_iter.as_mut()?;
        loop {
            match glob_iter.next() {
                Some(Ok(path)) => {
                    debug!("Found file: {}", path.display());
                    let result = validate_file(path, self.corpus, &self.config).await;
                    if result.is_err() {
                        self.finished = true;
                    }
                    return Some(result);
                }
                Some(Err(e)) => {
                    let error_msg = format!("Glob iteration error: {e}");
                    warn!("{}", error_msg);
                    if self.config.fail_fast {
                        self.finished = true;
                        return Some(Err(anyhow::anyhow!(error_msg)));
                    }
                }
                None => {
                    info!("{} file discovery completed", self.corpus);
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

async fn validate_file(path: PathBuf, corpus: Corpus, config: &DiscoveryConfig) -> Result<FileValidation> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let book = Book::from_file_stem(corpus, &stem);

    let error = match fs::metadata(&path).await {
        Ok(metadata) if !metadata.is_file() => Some(format!("Path is not a file: {}", path.display())),
        Ok(_) => None,
        Err(e) => Some(format!("Cannot access file {}: {}", path.display(), e)),
    };

    if book.is_none() {
        let error = IntegrityError::UnknownBook {
            name: stem,
            context: format!("{corpus} file {}", path.display()),
        };
        warn!("{}", error);
        if config.fail_fast {
            return Err(error.into());
        }
        return Ok(FileValidation {
            path,
            corpus,
            book,
            error: Some(error.to_string()),
        });
    }

    if let Some(ref error) = error {
        warn!("{}", error);
    }
    Ok(FileValidation { path, corpus, book, error })
}

/// Discover files for several corpora, in corpus then canonical book order
pub async fn collect_discovered_files(
    root_dir: impl AsRef<Path>,
    pipeline: &PipelineConfig,
    corpora: &[Corpus],
    config: DiscoveryConfig,
) -> Result<Vec<FileValidation>> {
    let mut files = Vec::new();
    for corpus in corpora {
        let corpus_dir = root_dir.as_ref().join(pipeline.dir_for(*corpus));
        if !corpus_dir.is_dir() {
            warn!("{} directory not found: {}", corpus, corpus_dir.display());
            continue;
        }
        let mut stream = Box::pin(discover_files(root_dir.as_ref(), pipeline, *corpus, config.clone()));
        while let Some(result) = stream.next().await {
            files.push(result?);
        }
    }

    files.sort_by(|a, b| (a.corpus, a.book, &a.path).cmp(&(b.corpus, b.book, &b.path)));

    let valid_count = files.iter().filter(|f| f.is_valid()).count();
    let invalid_count = files.len() - valid_count;
    if invalid_count > 0 {
        warn!("Found {} files with validation issues", invalid_count);
    }
    info!("File discovery summary: {} valid, {} invalid", valid_count, invalid_count);

    Ok(files)
}

/// Look up named books directly by the file naming convention instead of scanning
/// Books a corpus does not hold, or whose file is absent, are skipped
pub async fn collect_book_files(
    root_dir: impl AsRef<Path>,
    pipeline: &PipelineConfig,
    corpora: &[Corpus],
    books: &[Book],
    config: DiscoveryConfig,
) -> Result<Vec<FileValidation>> {
    let mut files = Vec::new();
    for corpus in corpora {
        for book in books {
            let Some(path) = book_file_path(root_dir.as_ref(), pipeline, *corpus, *book) else {
                debug!("{} has no {} file", book, corpus);
                continue;
            };
            if !fs::try_exists(&path).await.unwrap_or(false) {
                debug!("No {} file for {}: {}", corpus, book, path.display());
                continue;
            }
            files.push(validate_file(path, *corpus, &config).await?);
        }
    }

    files.sort_by(|a, b| (a.corpus, a.book, &a.path).cmp(&(b.corpus, b.book, &b.path)));
    files.dedup_by(|a, b| a.path == b.path);
    info!("Book lookup found {} of {} requested files", files.len(), corpora.len() * books.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
        let file_path = dir.join(name);
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file_path, content).await?;
        Ok(file_path)
    }

    #[test]
    fn test_book_file_path_convention() {
        let config = PipelineConfig::default();
        let root = Path::new("/data");
        assert_eq!(
            book_file_path(root, &config, Corpus::Hebrew, Book::SongOfSongs).unwrap(),
            PathBuf::from("/data/texts/tanakh/songofsongs.txt")
        );
        assert_eq!(
            book_file_path(root, &config, Corpus::English, Book::FirstKings).unwrap(),
            PathBuf::from("/data/texts/nasb/books/1_kings.txt")
        );
        assert_eq!(
            book_file_path(root, &config, Corpus::Greek, Book::Revelation).unwrap(),
            PathBuf::from("/data/texts/greek_nt/rev.txt")
        );
        assert!(book_file_path(root, &config, Corpus::Greek, Book::Genesis).is_none());
    }

    #[tokio::test]
    async fn test_discover_files_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let files = collect_discovered_files(
            temp_dir.path(),
            &PipelineConfig::default(),
            &Corpus::ALL,
            DiscoveryConfig::default(),
        )
        .await
        .unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_discover_maps_stems_to_books() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "texts/tanakh/genesis.txt", "").await.unwrap();
        create_test_file(root, "texts/tanakh/1samuel.txt", "").await.unwrap();
        create_test_file(root, "texts/tanakh/README.md", "").await.unwrap();
        create_test_file(root, "texts/nasb/books/1_samuel.txt", "").await.unwrap();
        create_test_file(root, "texts/greek_nt/1cor.txt", "").await.unwrap();

        let files = collect_discovered_files(root, &PipelineConfig::default(), &Corpus::ALL, DiscoveryConfig::default())
            .await
            .unwrap();
        let found: Vec<_> = files.iter().map(|f| (f.corpus, f.book.unwrap())).collect();
        assert_eq!(
            found,
            vec![
                (Corpus::Hebrew, Book::Genesis),
                (Corpus::Hebrew, Book::FirstSamuel),
                (Corpus::Greek, Book::FirstCorinthians),
                (Corpus::English, Book::FirstSamuel),
            ]
        );
        assert!(files.iter().all(FileValidation::is_valid));
    }

    #[tokio::test]
    async fn test_unknown_stem_reported() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "texts/tanakh/enoch.txt", "").await.unwrap();
        create_test_file(root, "texts/tanakh/ruth.txt", "").await.unwrap();

        let files = collect_discovered_files(root, &PipelineConfig::default(), &[Corpus::Hebrew], DiscoveryConfig::default())
            .await
            .unwrap();
        assert_eq!(files.len(), 2);
        let enoch = files.iter().find(|f| f.book.is_none()).unwrap();
        assert!(enoch.error.as_ref().unwrap().contains("enoch"));

        let strict = collect_discovered_files(
            root,
            &PipelineConfig::default(),
            &[Corpus::Hebrew],
            DiscoveryConfig { fail_fast: true },
        )
        .await;
        assert!(strict.is_err());
    }

    #[tokio::test]
    async fn test_book_lookup_by_convention() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "texts/tanakh/1samuel.txt", "").await.unwrap();
        create_test_file(root, "texts/tanakh/ruth.txt", "").await.unwrap();
        create_test_file(root, "texts/nasb/books/1_samuel.txt", "").await.unwrap();
        create_test_file(root, "texts/greek_nt/jude.txt", "").await.unwrap();

        let files = collect_book_files(
            root,
            &PipelineConfig::default(),
            &Corpus::ALL,
            &[Book::Jude, Book::FirstSamuel, Book::FirstSamuel],
            DiscoveryConfig::default(),
        )
        .await
        .unwrap();

        // Ruth is not requested; Jude has no Hebrew or English file on disk
        let found: Vec<_> = files.iter().map(|f| (f.corpus, f.book.unwrap())).collect();
        assert_eq!(
            found,
            vec![
                (Corpus::Hebrew, Book::FirstSamuel),
                (Corpus::Greek, Book::Jude),
                (Corpus::English, Book::FirstSamuel),
            ]
        );
        assert!(files.iter().all(FileValidation::is_valid));
    }

    #[tokio::test]
    async fn test_new_testament_stem_not_in_hebrew_dir() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        create_test_file(root, "texts/tanakh/matthew.txt", "").await.unwrap();

        let files = collect_discovered_files(root, &PipelineConfig::default(), &[Corpus::Hebrew], DiscoveryConfig::default())
            .await
            .unwrap();
        assert!(!files[0].is_valid());
    }
}
