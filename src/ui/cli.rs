use clap::{Args, Parser, Subcommand};

/// corpus2vec - incremental semantic indexing for text corpora
#[derive(Parser, Debug)]
#[command(name = "corpus2vec")]
#[command(about = "Incremental semantic indexing for directories of text documents", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize corpus2vec (create data directories)
    Init {
        /// Custom base directory (default: ~/.corpus2vec)
        #[arg(short, long)]
        base_dir: Option<String>,
    },
    /// Index documents from a directory
    Index {
        /// Path to the document directory
        path: String,
        /// Re-process all files regardless of recorded modification times
        #[arg(short, long)]
        force: bool,
        /// Custom base directory (default: ~/.corpus2vec)
        #[arg(long)]
        base_dir: Option<String>,
        /// Chunking strategy: 'recursive' or 'fixed'
        #[arg(long, default_value = "recursive")]
        strategy: String,
        /// Approximate token budget per unit
        #[arg(long, default_value_t = 256)]
        target_tokens: usize,
        /// Approximate tokens of overlap between consecutive units
        #[arg(long, default_value_t = 32)]
        overlap_tokens: usize,
        /// Drop units whose trimmed text is shorter than this
        #[arg(long, default_value_t = 16)]
        min_unit_chars: usize,
        /// Maximum units per embedding batch
        #[arg(long, default_value_t = 128)]
        batch_units: usize,
        /// Maximum characters per embedding batch
        #[arg(long, default_value_t = 65536)]
        batch_chars: usize,
        /// Maximum estimated tokens per embedding batch
        #[arg(long, default_value_t = 8192)]
        batch_tokens: usize,
        /// Maximum embedding requests in flight at once
        #[arg(long, default_value_t = 4)]
        max_concurrent: usize,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Search indexed documents
    Search {
        /// Search query
        query: String,
        /// Maximum number of results to return
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
        /// Custom base directory (default: ~/.corpus2vec)
        #[arg(long)]
        base_dir: Option<String>,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Show index statistics
    Stats {
        /// Custom base directory (default: ~/.corpus2vec)
        #[arg(long)]
        base_dir: Option<String>,
    },
}

/// Embedding backend selection, shared by index and search
#[derive(Args, Debug)]
pub struct BackendArgs {
    /// Embedding backend: 'http' or 'mock'
    #[arg(long, default_value = "http")]
    pub backend: String,
    /// Base URL of the OpenAI-compatible embeddings API
    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub backend_url: String,
    /// Embedding model name
    #[arg(long, default_value = "text-embedding-3-small")]
    pub model: String,
    /// Environment variable holding the API key
    #[arg(long, default_value = "CORPUS2VEC_API_KEY")]
    pub api_key_env: String,
}
