use crate::core::error::Result;
use async_trait::async_trait;

/// A service that turns texts into vectors.
///
/// Implementations must return exactly one vector per input text, in input
/// order, with a constant dimensionality per instance. Errors are opaque to
/// callers; the executor treats any failure as retryable by bisection.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
