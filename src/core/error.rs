use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("unit of {chars} chars (~{tokens} tokens) cannot fit any batch under the configured limits")]
    BatchTooLarge { chars: usize, tokens: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
