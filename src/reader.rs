use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::canon::Corpus;
use crate::verse::RawLine;

/// Configuration for corpus file reading
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Buffer size for async reading (default: 8KB)
    pub buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            buffer_size: 8192, // WHY: one book is at most a few hundred KB; 8KB keeps syscalls low
        }
    }
}

/// Statistics for one corpus file
#[derive(Debug, Clone, Default)]
pub struct ReadStats {
    pub file_path: String,
    pub lines_read: u64,
    pub bytes_read: u64,
    pub duration_ms: u64,
}

/// Async reader turning a corpus file into numbered raw lines
pub struct AsyncFileReader {
    config: ReaderConfig,
}

impl AsyncFileReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self { config }
    }

    /// Read a file line-by-line; `source_offset` is the 1-based line number
    /// WHY: a book is ingested whole or not at all, so any read error fails the file
    pub async fn read_raw_lines<P: AsRef<Path>>(
        &self,
        file_path: P,
        corpus: Corpus,
    ) -> Result<(Vec<RawLine>, ReadStats)> {
        let path = file_path.as_ref();
        let start_time = std::time::Instant::now();
        let mut stats = ReadStats {
            file_path: path.display().to_string(),
            ..Default::default()
        };

        debug!("Starting async read of {} file: {}", corpus, path.display());

        let file = File::open(path)
            .await
            .with_context(|| format!("Failed to open file {}", path.display()))?;

        let reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut lines = reader.lines();
        let mut raw_lines = Vec::new();

        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    stats.bytes_read += line.len() as u64 + 1; // +1 for newline
                    stats.lines_read += 1;
                    raw_lines.push(RawLine::new(corpus, line, stats.lines_read as usize));
                }
                Ok(None) => break,
                Err(e) => {
                    let error_msg = format!(
                        "UTF-8 decoding error in {} at line {}: {}",
                        path.display(),
                        stats.lines_read + 1,
                        e
                    );
                    warn!("{}", error_msg);
                    return Err(anyhow::anyhow!(error_msg));
                }
            }
        }

        stats.duration_ms = start_time.elapsed().as_millis() as u64;
        info!(
            "Read {}: {} lines, {} bytes in {}ms",
            path.display(),
            stats.lines_read,
            stats.bytes_read,
            stats.duration_ms
        );
        Ok((raw_lines, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::fs;

    async fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> Result<std::path::PathBuf> {
        let file_path = dir.join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&file_path, content).await?;
        Ok(file_path)
    }

    #[tokio::test]
    async fn test_read_numbers_lines() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig::default());

        let content = "Genesis 1 New American Standard Bible\n1 In the beginning\n\n2 The earth";
        let file_path = create_test_file(temp_dir.path(), "genesis.txt", content.as_bytes()).await.unwrap();

        let (lines, stats) = reader.read_raw_lines(&file_path, Corpus::English).await.unwrap();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].raw_text, "1 In the beginning");
        assert_eq!(lines[1].source_offset, 2);
        assert_eq!(lines[3].source_offset, 4);
        assert!(lines.iter().all(|l| l.corpus == Corpus::English));
        assert_eq!(stats.lines_read, 4);
    }

    #[tokio::test]
    async fn test_read_hebrew_content() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig::default());

        let content = "\u{202A}1 \u{202C}׃1 מִשְׁלֵי שְׁלֹמֹה\n";
        let file_path = create_test_file(temp_dir.path(), "proverbs.txt", content.as_bytes()).await.unwrap();

        let (lines, stats) = reader.read_raw_lines(&file_path, Corpus::Hebrew).await.unwrap();
        assert_eq!(lines.len(), 1);
        // sanitizing is the parser's job
        assert!(lines[0].raw_text.starts_with('\u{202A}'));
        assert_eq!(stats.bytes_read, content.len() as u64);
    }

    #[tokio::test]
    async fn test_read_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig::default());
        let file_path = temp_dir.path().join("nonexistent.txt");

        let err = reader.read_raw_lines(&file_path, Corpus::Greek).await.unwrap_err();
        assert!(err.to_string().contains("nonexistent.txt"));
    }

    #[tokio::test]
    async fn test_invalid_utf8_fails_file() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig::default());

        let mut content = b"Matt 1:1\tfirst\n".to_vec();
        content.extend_from_slice(&[0xFF, 0xFE, b'\n']);
        let file_path = create_test_file(temp_dir.path(), "matt.txt", &content).await.unwrap();

        let err = reader.read_raw_lines(&file_path, Corpus::Greek).await.unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn test_small_buffer() {
        let temp_dir = TempDir::new().unwrap();
        let reader = AsyncFileReader::new(ReaderConfig { buffer_size: 1024 });

        let content = "x".repeat(2048) + "\n" + &"y".repeat(2048);
        let file_path = create_test_file(temp_dir.path(), "large.txt", content.as_bytes()).await.unwrap();

        let (lines, _) = reader.read_raw_lines(&file_path, Corpus::English).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].raw_text.len(), 2048);
    }
}
