use crate::core::error::Result;
use crate::embedding::backend::EmbeddingBackend;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Deterministic offline backend: vectors are derived from a SHA-256 digest
/// of the trimmed input text, so identical text always embeds to the
/// identical vector. Useful for tests and for dry-running the pipeline
/// without network access.
pub struct MockBackend {
    dimension: usize,
}

impl MockBackend {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.trim().as_bytes());
        (0..self.dimension)
            .map(|i| {
                let byte = digest[i % digest.len()];
                (byte as f32 / 255.0) * 2.0 - 1.0
            })
            .collect()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl EmbeddingBackend for MockBackend {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.vector_for(text)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deterministic_and_content_addressed() {
        let backend = MockBackend::new(32);
        let texts = vec![
            "Hello world".to_string(),
            "Goodbye world".to_string(),
            "Hello world".to_string(),
        ];

        let first = backend.embed(&texts).await.unwrap();
        let second = backend.embed(&texts).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0], first[2]);
        assert_ne!(first[0], first[1]);
    }

    #[tokio::test]
    async fn test_dimension_is_constant() {
        let backend = MockBackend::new(48);
        let texts = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];
        let vectors = backend.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        for vector in &vectors {
            assert_eq!(vector.len(), 48);
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let backend = MockBackend::default();
        assert!(backend.embed(&[]).await.unwrap().is_empty());
    }
}
