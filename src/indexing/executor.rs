//! Concurrency-bounded batch submission to an embedding backend.

use crate::core::error::{Error, Result};
use crate::embedding::backend::EmbeddingBackend;
use crate::indexing::batch::Batch;
use crate::indexing::chunker::TextUnit;
use crate::indexing::dedup::Fingerprint;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A unit paired with its fingerprint and vector, ready to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedUnit {
    pub unit: TextUnit,
    pub fingerprint: Fingerprint,
    pub vector: Vec<f32>,
}

impl IndexedUnit {
    /// Identity key in the unit store.
    pub fn store_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.unit.source_path, self.unit.start_line, self.unit.end_line
        )
    }
}

/// Maximum bisection depth before a failing batch is abandoned.
const MAX_RETRY_DEPTH: u32 = 3;

/// Submit batches to the backend with at most `max_concurrent` calls in
/// flight, returning indexed units in the original unit order.
///
/// Permits are acquired in batch order before each task is spawned, so
/// admission is FIFO. Completion order is not ordering-significant: results
/// carry their batch's sequence number and are re-sorted before the final
/// merge. A batch that exhausts its retry budget aborts the whole call and
/// partial results are discarded.
pub async fn execute(
    batches: Vec<Batch>,
    backend: Arc<dyn EmbeddingBackend>,
    max_concurrent: usize,
) -> Result<Vec<IndexedUnit>> {
    if batches.is_empty() {
        return Ok(Vec::new());
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut tasks: JoinSet<Result<(usize, Batch, Vec<Vec<f32>>)>> = JoinSet::new();

    for batch in batches {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Embedding(format!("admission limiter closed: {}", e)))?;
        let backend = Arc::clone(&backend);
        tasks.spawn(async move {
            let _permit = permit;
            let texts: Vec<String> = batch.units.iter().map(|u| u.text.clone()).collect();
            let vectors = embed_with_retry(backend.as_ref(), &texts, MAX_RETRY_DEPTH).await?;
            if vectors.len() != texts.len() {
                return Err(Error::Embedding(format!(
                    "backend returned {} vectors for {} texts",
                    vectors.len(),
                    texts.len()
                )));
            }
            Ok((batch.sequence, batch, vectors))
        });
    }

    let mut completed: Vec<(usize, Batch, Vec<Vec<f32>>)> = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let result =
            joined.map_err(|e| Error::Embedding(format!("embedding task failed: {}", e)))?;
        // Returning here drops the JoinSet, aborting in-flight batches.
        completed.push(result?);
    }

    completed.sort_by_key(|(sequence, _, _)| *sequence);

    let mut indexed = Vec::new();
    for (_, batch, vectors) in completed {
        for (unit, vector) in batch.units.into_iter().zip(vectors) {
            let fingerprint = Fingerprint::of(&unit.text);
            indexed.push(IndexedUnit {
                unit,
                fingerprint,
                vector,
            });
        }
    }
    Ok(indexed)
}

/// Call the backend, bisecting the input on failure to isolate bad texts.
///
/// Each split decrements the remaining depth; a failure with no depth left,
/// or on a single text, propagates. Halves are retried independently and
/// their vectors concatenated in order, so one malformed text costs at most
/// its own sub-span rather than the whole batch.
fn embed_with_retry<'a>(
    backend: &'a dyn EmbeddingBackend,
    texts: &'a [String],
    depth: u32,
) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>>> + Send + 'a>> {
    Box::pin(async move {
        match backend.embed(texts).await {
            Ok(vectors) => Ok(vectors),
            Err(err) => {
                if depth == 0 || texts.len() <= 1 {
                    return Err(err);
                }
                tracing::debug!(
                    texts = texts.len(),
                    depth,
                    "embedding call failed, bisecting: {err}"
                );
                let mid = texts.len() / 2;
                let mut left = embed_with_retry(backend, &texts[..mid], depth - 1).await?;
                let right = embed_with_retry(backend, &texts[mid..], depth - 1).await?;
                left.extend(right);
                Ok(left)
            }
        }
    })
}
