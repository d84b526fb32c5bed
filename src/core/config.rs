use super::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// Which splitting strategy the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Recursive boundary-aware splitting (paragraphs, lines, sentences, ...).
    Recursive,
    /// Fixed-size character windows with a sentence-boundary lookback.
    FixedSize,
}

impl FromStr for ChunkStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "recursive" => Ok(ChunkStrategy::Recursive),
            "fixed" => Ok(ChunkStrategy::FixedSize),
            other => Err(Error::Config(format!(
                "unknown chunking strategy '{}' (expected 'recursive' or 'fixed')",
                other
            ))),
        }
    }
}

/// Options governing how documents are split into units.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    pub strategy: ChunkStrategy,
    /// Approximate token budget per unit.
    pub target_tokens: usize,
    /// Approximate tokens of overlap between consecutive units.
    pub overlap_tokens: usize,
    /// Units whose trimmed text is shorter than this are dropped after chunking.
    pub min_unit_chars: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::Recursive,
            target_tokens: 256,
            overlap_tokens: 32,
            min_unit_chars: 16,
        }
    }
}

/// Limits for a single embedding batch.
#[derive(Debug, Clone)]
pub struct BatchLimits {
    pub max_units: usize,
    pub max_chars: usize,
    pub max_tokens: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_units: 128,
            max_chars: 65_536,
            max_tokens: 8_192,
        }
    }
}

/// Settings consumed by the indexing pipeline.
#[derive(Debug, Clone)]
pub struct IndexingConfig {
    pub chunking: ChunkOptions,
    pub batch: BatchLimits,
    /// Maximum number of embedding requests in flight at once.
    pub max_concurrent_requests: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkOptions::default(),
            batch: BatchLimits::default(),
            max_concurrent_requests: 4,
        }
    }
}

impl IndexingConfig {
    /// Validate all parameters. Called before a run does any work.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.target_tokens == 0 {
            return Err(Error::Config("target_tokens must be positive".to_string()));
        }
        if self.chunking.overlap_tokens >= self.chunking.target_tokens {
            return Err(Error::Config(format!(
                "overlap_tokens ({}) must be strictly smaller than target_tokens ({})",
                self.chunking.overlap_tokens, self.chunking.target_tokens
            )));
        }
        if self.batch.max_units == 0 || self.batch.max_chars == 0 || self.batch.max_tokens == 0 {
            return Err(Error::Config("batch limits must be positive".to_string()));
        }
        if self.max_concurrent_requests == 0 {
            return Err(Error::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Directory layout for corpus2vec data
#[derive(Debug, Clone)]
pub struct Config {
    /// Base directory for corpus2vec data
    pub base_dir: PathBuf,
    /// Path to the unit/vector database
    pub units_path: PathBuf,
    /// Path to the file-record database
    pub records_path: PathBuf,
}

impl Config {
    /// Get the default configuration directory
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))
            .map(|home| home.join(".corpus2vec"))
    }

    /// Create a new configuration
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.unwrap_or_else(|| {
            Self::default_base_dir().unwrap_or_else(|_| PathBuf::from(".corpus2vec"))
        });

        Ok(Self {
            units_path: base_dir.join("database").join("units.redb"),
            records_path: base_dir.join("state").join("records.redb"),
            base_dir,
        })
    }

    /// Initialize the configuration directories
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.units_path.parent().unwrap())?;
        std::fs::create_dir_all(self.records_path.parent().unwrap())?;
        Ok(())
    }

    /// Check if the configuration is already initialized
    pub fn is_initialized(&self) -> bool {
        self.base_dir.exists()
            && self.units_path.parent().unwrap().exists()
            && self.records_path.parent().unwrap().exists()
    }
}
