//! End-to-end indexing runs.
//!
//! One run walks the source directory, reconciles it against the persisted
//! file records, chunks and deduplicates changed files, embeds the unique
//! units in bounded batches, and writes the results back to the stores.

use crate::core::config::IndexingConfig;
use crate::core::error::Result;
use crate::embedding::backend::EmbeddingBackend;
use crate::indexing::batch::plan_batches;
use crate::indexing::chunker::{chunker_for, Chunker};
use crate::indexing::dedup::filter_duplicates;
use crate::indexing::discovery::discover_files;
use crate::indexing::executor::execute;
use crate::indexing::sync::reconcile;
use crate::storage::records::RecordStore;
use crate::storage::units::UnitStore;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Stages of one indexing run, used for logging and failure context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scanning,
    Reconciling,
    Preparing,
    Embedding,
    Writing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Scanning => "scanning",
            Stage::Reconciling => "reconciling",
            Stage::Preparing => "preparing",
            Stage::Embedding => "embedding",
            Stage::Writing => "writing",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Counters accumulated over one indexing run.
#[derive(Debug, Default, Clone)]
pub struct IndexReport {
    pub files_scanned: usize,
    pub files_indexed: usize,
    pub files_deleted: usize,
    pub files_errored: usize,
    pub units_chunked: usize,
    pub units_filtered: usize,
    pub units_skipped: usize,
    pub units_written: usize,
    pub batches: usize,
}

/// Sequences the indexing stages against a pair of stores and an embedding
/// backend.
///
/// There is no cross-stage transaction: stale-file deletions applied in the
/// preparing stage stay applied even when a later stage fails. The stores
/// are single-writer; running two pipelines against the same store
/// concurrently is not supported.
pub struct IndexPipeline {
    records: RecordStore,
    units: UnitStore,
    backend: Arc<dyn EmbeddingBackend>,
    chunker: Box<dyn Chunker>,
    config: IndexingConfig,
}

impl IndexPipeline {
    /// Build a pipeline, validating the configuration before any work.
    pub fn new(
        records: RecordStore,
        units: UnitStore,
        backend: Arc<dyn EmbeddingBackend>,
        config: IndexingConfig,
    ) -> Result<Self> {
        config.validate()?;
        let chunker = chunker_for(&config.chunking)?;
        Ok(Self {
            records,
            units,
            backend,
            chunker,
            config,
        })
    }

    /// Run one indexing pass over `root`. With `force`, every discovered
    /// file is re-processed regardless of its recorded mtime; deduplication
    /// still applies.
    ///
    /// Fatal errors abort the run; the counts accumulated up to the failure
    /// are logged before the error propagates, and no partial run is
    /// reported as complete.
    pub async fn run(&self, root: &Path, force: bool) -> Result<IndexReport> {
        let mut report = IndexReport::default();
        match self.run_stages(root, force, &mut report).await {
            Ok(()) => Ok(report),
            Err(err) => {
                tracing::error!(
                    files_indexed = report.files_indexed,
                    files_deleted = report.files_deleted,
                    units_written = report.units_written,
                    "indexing run failed: {err}"
                );
                Err(err)
            }
        }
    }

    async fn run_stages(&self, root: &Path, force: bool, report: &mut IndexReport) -> Result<()> {
        tracing::info!(stage = %Stage::Scanning, root = %root.display(), "scanning source directory");
        let current = discover_files(root)?;
        report.files_scanned = current.len();

        let persisted = self.records.file_records()?;
        let plan = reconcile(&current, &persisted, force);
        tracing::info!(
            stage = %Stage::Reconciling,
            to_index = plan.to_index.len(),
            to_delete = plan.to_delete.len(),
            "reconciled against {} file records",
            persisted.len()
        );
        if plan.is_noop() {
            tracing::info!(stage = %Stage::Done, "nothing to index or delete");
            return Ok(());
        }

        // Stale files lose their units and record right away, independent of
        // the embedding step. Cleanup failures must not block the run.
        for path in &plan.to_delete {
            match self.units.delete_units_for_path(path) {
                Ok(removed) => {
                    tracing::debug!(stage = %Stage::Preparing, path = %path, removed, "removed stale units")
                }
                Err(err) => {
                    tracing::warn!(stage = %Stage::Preparing, path = %path, "failed to remove stale units: {err}")
                }
            }
            if let Err(err) = self.records.delete_record(path) {
                tracing::warn!(stage = %Stage::Preparing, path = %path, "failed to remove stale file record: {err}");
            }
            report.files_deleted += 1;
        }

        // Chunk and deduplicate across all files before batching; the dedup
        // set is seeded from the store and owned by this run.
        let mut known = self.units.known_fingerprints()?;
        let mut unique_units = Vec::new();
        let mut processed = Vec::new();
        let min_unit_chars = self.config.chunking.min_unit_chars;
        for (i, file) in plan.to_index.iter().enumerate() {
            if i > 0 && i % 100 == 0 {
                tracing::info!(stage = %Stage::Preparing, "{}/{} files prepared", i, plan.to_index.len());
            }
            let content = match std::fs::read_to_string(&file.path) {
                Ok(content) => content,
                Err(err) => {
                    if err.kind() == std::io::ErrorKind::InvalidData {
                        tracing::warn!(path = %file.relative_path, "skipping non-UTF-8 file");
                    } else {
                        tracing::warn!(path = %file.relative_path, "failed to read file: {err}");
                    }
                    report.files_errored += 1;
                    continue;
                }
            };

            let mut units = self.chunker.chunk(&content, &file.relative_path);
            report.units_chunked += units.len();
            if min_unit_chars > 0 {
                let before = units.len();
                units.retain(|unit| unit.text.trim().chars().count() >= min_unit_chars);
                report.units_filtered += before - units.len();
            }

            let (unique, skipped) = filter_duplicates(units, &mut known).await;
            report.units_skipped += skipped;
            unique_units.extend(unique);
            processed.push(file);
        }

        tracing::info!(
            stage = %Stage::Embedding,
            units = unique_units.len(),
            "embedding unique units"
        );
        let batches = plan_batches(unique_units, &self.config.batch)?;
        report.batches = batches.len();
        let indexed = execute(
            batches,
            Arc::clone(&self.backend),
            self.config.max_concurrent_requests,
        )
        .await?;

        tracing::info!(stage = %Stage::Writing, units = indexed.len(), "writing units and file records");
        self.units.write_units(&indexed)?;
        report.units_written = indexed.len();
        for file in processed {
            self.records
                .upsert_record(&file.relative_path, file.modified_millis)?;
            report.files_indexed += 1;
        }

        tracing::info!(
            stage = %Stage::Done,
            files_indexed = report.files_indexed,
            units_written = report.units_written,
            units_skipped = report.units_skipped,
            "indexing run complete"
        );
        Ok(())
    }
}
