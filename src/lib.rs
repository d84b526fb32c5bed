// Core functionality
pub mod core {
    pub mod config;
    pub mod error;
}

// Indexing pipeline
pub mod indexing {
    pub mod batch;
    pub mod chunker;
    pub mod dedup;
    pub mod discovery;
    pub mod executor;
    pub mod pipeline;
    pub mod sync;
    pub mod tokens;
}

// Embedding backends
pub mod embedding {
    pub mod backend;
    pub mod http;
    pub mod mock;
}

// Data storage
pub mod storage {
    pub mod records;
    pub mod units;
}

// User interfaces
pub mod ui {
    pub mod cli;
}

// Re-export commonly used types
pub use crate::core::config::{BatchLimits, ChunkOptions, ChunkStrategy, Config, IndexingConfig};
pub use crate::core::error::{Error, Result};
pub use crate::embedding::backend::EmbeddingBackend;
pub use crate::embedding::http::HttpBackend;
pub use crate::embedding::mock::MockBackend;
pub use crate::indexing::chunker::{Chunker, FixedSizeChunker, RecursiveChunker, TextUnit};
pub use crate::indexing::dedup::Fingerprint;
pub use crate::indexing::discovery::{discover_files, SourceFile};
pub use crate::indexing::executor::IndexedUnit;
pub use crate::indexing::pipeline::{IndexPipeline, IndexReport};
pub use crate::storage::records::RecordStore;
pub use crate::storage::units::UnitStore;
pub use crate::ui::cli::Cli;
