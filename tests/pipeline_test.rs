//! End-to-end indexing runs against real stores and the mock backend.

use corpus2vec::{
    BatchLimits, ChunkOptions, ChunkStrategy, Chunker, Config, Fingerprint, IndexPipeline,
    IndexReport, IndexingConfig, MockBackend, RecordStore, RecursiveChunker, Result, UnitStore,
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

// Large enough that each test paragraph chunks as a whole: units then cover
// distinct line ranges, so store keys are collision-free and counts exact.
const TARGET_TOKENS: usize = 48;
const OVERLAP_TOKENS: usize = 2;

fn test_config() -> IndexingConfig {
    IndexingConfig {
        chunking: ChunkOptions {
            strategy: ChunkStrategy::Recursive,
            target_tokens: TARGET_TOKENS,
            overlap_tokens: OVERLAP_TOKENS,
            min_unit_chars: 1,
        },
        batch: BatchLimits {
            max_units: 8,
            max_chars: 10_000,
            max_tokens: 1_000,
        },
        max_concurrent_requests: 2,
    }
}

/// Run one indexing pass; stores are opened for the run and closed when the
/// pipeline is dropped, so callers can reopen them for inspection.
async fn run_index(base_dir: &Path, corpus: &Path, force: bool) -> Result<IndexReport> {
    let config = Config::new(Some(base_dir.to_path_buf()))?;
    config.init()?;
    let records = RecordStore::open(&config)?;
    let units = UnitStore::open(&config)?;
    let backend = Arc::new(MockBackend::new(16));
    let pipeline = IndexPipeline::new(records, units, backend, test_config())?;
    pipeline.run(corpus, force).await
}

fn open_stores(base_dir: &Path) -> (RecordStore, UnitStore) {
    let config = Config::new(Some(base_dir.to_path_buf())).unwrap();
    (
        RecordStore::open(&config).unwrap(),
        UnitStore::open(&config).unwrap(),
    )
}

// Every sentence mentions the paragraph number and topic so no two chunks
// anywhere in a corpus share trimmed text by accident.
fn prose(topic: &str, paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            format!(
                "Paragraph {i} about {topic} explains one idea clearly. \
                 The second sentence of part {i} adds detail about {topic}. \
                 A closing remark for section {i} wraps up {topic}.\n\n"
            )
        })
        .collect()
}

fn write_corpus(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("alpha.md"), prose("storage engines", 6)).unwrap();
    fs::write(dir.join("beta.md"), prose("network protocols", 6)).unwrap();
}

#[tokio::test]
async fn test_initial_index_populates_stores() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("data");
    let corpus = temp.path().join("corpus");
    write_corpus(&corpus);

    let report = run_index(&base, &corpus, false).await?;

    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.files_indexed, 2);
    assert_eq!(report.files_deleted, 0);
    assert!(report.units_chunked > 0);
    assert!(report.units_written > 0);
    assert!(report.batches > 0);

    let (records, units) = open_stores(&base);
    assert_eq!(records.file_records()?.len(), 2);
    assert_eq!(units.count_units()?, report.units_written);
    Ok(())
}

#[tokio::test]
async fn test_unchanged_second_run_is_noop() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("data");
    let corpus = temp.path().join("corpus");
    write_corpus(&corpus);

    let first = run_index(&base, &corpus, false).await?;
    let second = run_index(&base, &corpus, false).await?;

    assert_eq!(second.files_indexed, 0);
    assert_eq!(second.units_written, 0);
    assert_eq!(second.units_chunked, 0);

    let (_, units) = open_stores(&base);
    assert_eq!(units.count_units()?, first.units_written);
    Ok(())
}

#[tokio::test]
async fn test_force_reindex_reports_all_duplicates() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("data");
    let corpus = temp.path().join("corpus");
    write_corpus(&corpus);

    let first = run_index(&base, &corpus, false).await?;
    assert!(first.units_written > 0);

    // Same content re-fed through the dedup gate: zero new units, every
    // chunk reported as a skipped duplicate, store count unchanged.
    let second = run_index(&base, &corpus, true).await?;
    assert_eq!(second.files_indexed, 2);
    assert_eq!(second.units_written, 0);
    assert_eq!(second.units_chunked, first.units_chunked);
    assert_eq!(second.units_skipped, second.units_chunked);

    let (_, units) = open_stores(&base);
    assert_eq!(units.count_units()?, first.units_written);
    Ok(())
}

#[tokio::test]
async fn test_deletion_precision() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("data");
    let corpus = temp.path().join("corpus");
    write_corpus(&corpus);

    run_index(&base, &corpus, false).await?;

    fs::remove_file(corpus.join("beta.md")).unwrap();
    let report = run_index(&base, &corpus, false).await?;
    assert_eq!(report.files_deleted, 1);
    assert_eq!(report.files_indexed, 0);

    // Exactly alpha's units survive, and only alpha is tracked.
    let alpha_text = prose("storage engines", 6);
    let chunker = RecursiveChunker::new(TARGET_TOKENS, OVERLAP_TOKENS)?;
    let alpha_units = chunker.chunk(&alpha_text, "alpha.md");
    let alpha_fingerprints: HashSet<Fingerprint> = alpha_units
        .iter()
        .map(|u| Fingerprint::of(&u.text))
        .collect();

    let (records, units) = open_stores(&base);
    let tracked = records.file_records()?;
    assert_eq!(tracked.len(), 1);
    assert!(tracked.contains_key("alpha.md"));

    let remaining = units.known_fingerprints()?;
    assert!(!remaining.is_empty());
    assert!(remaining.is_subset(&alpha_fingerprints));
    Ok(())
}

#[tokio::test]
async fn test_modified_file_contributes_only_new_units() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("data");
    let corpus = temp.path().join("corpus");
    write_corpus(&corpus);

    let first = run_index(&base, &corpus, false).await?;

    // Let the mtime move past millisecond granularity before rewriting.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let mut updated = prose("network protocols", 6);
    updated.push_str("A freshly appended paragraph talks about congestion control instead.\n");
    fs::write(corpus.join("beta.md"), updated).unwrap();

    let second = run_index(&base, &corpus, false).await?;
    assert_eq!(second.files_indexed, 1);
    assert!(second.units_written > 0, "appended text must produce units");
    assert!(
        second.units_skipped > 0,
        "unchanged chunks must be skipped as duplicates"
    );

    // The appended units are new rows; boundary fragments near the edit may
    // overwrite a same-key row, so the count is bounded rather than exact.
    let (_, units) = open_stores(&base);
    let count = units.count_units()?;
    assert!(count > first.units_written);
    assert!(count <= first.units_written + second.units_written);
    Ok(())
}

#[tokio::test]
async fn test_added_file_is_picked_up() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("data");
    let corpus = temp.path().join("corpus");
    write_corpus(&corpus);

    run_index(&base, &corpus, false).await?;

    fs::write(corpus.join("gamma.md"), prose("query planners", 4)).unwrap();
    let report = run_index(&base, &corpus, false).await?;
    assert_eq!(report.files_indexed, 1);
    assert!(report.units_written > 0);

    let (records, _) = open_stores(&base);
    assert_eq!(records.file_records()?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_empty_directory_is_a_noop() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("data");
    let corpus = temp.path().join("corpus");
    fs::create_dir_all(&corpus).unwrap();

    let report = run_index(&base, &corpus, false).await?;
    assert_eq!(report.files_scanned, 0);
    assert_eq!(report.units_written, 0);
    Ok(())
}

#[tokio::test]
async fn test_non_utf8_file_is_skipped() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("data");
    let corpus = temp.path().join("corpus");
    fs::create_dir_all(&corpus).unwrap();
    fs::write(corpus.join("good.md"), prose("indexing", 2)).unwrap();
    fs::write(corpus.join("binary.txt"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

    let report = run_index(&base, &corpus, false).await?;
    assert_eq!(report.files_errored, 1);
    assert_eq!(report.files_indexed, 1);
    assert!(report.units_written > 0);
    Ok(())
}

#[tokio::test]
async fn test_large_corpus_double_index_keeps_count_stable() -> Result<()> {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("data");
    let corpus = temp.path().join("corpus");
    fs::create_dir_all(&corpus).unwrap();
    fs::write(corpus.join("one.md"), prose("compilers", 40)).unwrap();
    fs::write(corpus.join("two.md"), prose("schedulers", 40)).unwrap();

    let first = run_index(&base, &corpus, false).await?;
    assert!(
        first.units_written > 50,
        "expected a sizeable unit count, got {}",
        first.units_written
    );

    let second = run_index(&base, &corpus, true).await?;
    assert_eq!(second.units_written, 0);
    assert_eq!(second.units_skipped, second.units_chunked);

    let (_, units) = open_stores(&base);
    assert_eq!(units.count_units()?, first.units_written);
    Ok(())
}
