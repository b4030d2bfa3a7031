// WHY: directory layout and edition names differ between installs; defaults match the
// standard layout and a TOML file overrides them, CLI flags override both

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::canon::Corpus;
use crate::reference::{HebrewNumbering, ParserConfig};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// tanach.us per-book files, relative to the root
    pub hebrew_dir: PathBuf,
    /// SBLGNT per-book files, relative to the root
    pub greek_dir: PathBuf,
    /// NASB per-book files, relative to the root
    pub english_dir: PathBuf,
    /// Edition name closing every English chapter header
    pub english_edition: String,
    pub hebrew_numbering: HebrewNumbering,
    /// Abort the run on the first integrity error
    pub fail_fast: bool,
    /// Files processed concurrently
    pub max_workers: usize,
    /// Force ASCII fallback rendering of Hebrew and Greek
    pub ascii_output: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let parser = ParserConfig::default();
        Self {
            hebrew_dir: PathBuf::from("texts/tanakh"),
            greek_dir: PathBuf::from("texts/greek_nt"),
            english_dir: PathBuf::from("texts/nasb/books"),
            english_edition: parser.english_edition,
            hebrew_numbering: parser.hebrew_numbering,
            fail_fast: false,
            // WHY: leave half the cores for the rest of the machine, like directory traversal
            max_workers: (num_cpus::get() / 2).max(1),
            ascii_output: false,
        }
    }
}

impl PipelineConfig {
    /// Defaults, overridden by the TOML file when one is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.max_workers = config.max_workers.max(1);
        Ok(config)
    }

    pub fn dir_for(&self, corpus: Corpus) -> &Path {
        match corpus {
            Corpus::Hebrew => &self.hebrew_dir,
            Corpus::Greek => &self.greek_dir,
            Corpus::English => &self.english_dir,
        }
    }

    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig {
            english_edition: self.english_edition.clone(),
            hebrew_numbering: self.hebrew_numbering,
        }
    }
}
