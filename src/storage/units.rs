use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::indexing::dedup::Fingerprint;
use crate::indexing::executor::IndexedUnit;
use redb::{Database, ReadableTable, TableDefinition};
use std::collections::HashSet;

/// Table definition for indexed units
/// Key: unit key (format: "source_path:start_line:end_line")
/// Value: JSON serialized IndexedUnit
const UNITS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("units");

fn unit_to_json(unit: &IndexedUnit) -> Result<String> {
    serde_json::to_string(unit)
        .map_err(|e| Error::Store(format!("Failed to serialize unit: {}", e)))
}

fn unit_from_json(json: &str) -> Result<IndexedUnit> {
    serde_json::from_str(json)
        .map_err(|e| Error::Store(format!("Failed to deserialize unit: {}", e)))
}

/// Store for indexed units and their vectors
pub struct UnitStore {
    db: Database,
}

impl UnitStore {
    /// Open or create the unit store
    pub fn open(config: &Config) -> Result<Self> {
        if let Some(parent) = config.units_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = if config.units_path.exists() {
            Database::open(&config.units_path).map_err(|e| {
                let msg = e.to_string();
                if msg.to_lowercase().contains("lock") {
                    Error::Store("Unit database is locked. Another corpus2vec process may be running. Close other instances and try again.".to_string())
                } else {
                    Error::Store(format!("Failed to open unit database: {}", e))
                }
            })?
        } else {
            Database::create(&config.units_path)
                .map_err(|e| Error::Store(format!("Failed to create unit database: {}", e)))?
        };

        let write_txn = db
            .begin_write()
            .map_err(|e| Error::Store(format!("Failed to begin write transaction: {}", e)))?;
        {
            let _table = write_txn
                .open_table(UNITS_TABLE)
                .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| Error::Store(format!("Failed to commit transaction: {}", e)))?;

        Ok(Self { db })
    }

    /// Persist a batch of indexed units in one transaction
    pub fn write_units(&self, units: &[IndexedUnit]) -> Result<()> {
        if units.is_empty() {
            return Ok(());
        }

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Store(format!("Failed to begin write transaction: {}", e)))?;

        {
            let mut table = write_txn
                .open_table(UNITS_TABLE)
                .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;

            for unit in units {
                let key = unit.store_key();
                let json = unit_to_json(unit)?;
                table
                    .insert(key.as_str(), json.as_str())
                    .map_err(|e| Error::Store(format!("Failed to insert unit: {}", e)))?;
            }
        }

        write_txn
            .commit()
            .map_err(|e| Error::Store(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    /// Fingerprints of every stored unit, used to seed a run's dedup set
    pub fn known_fingerprints(&self) -> Result<HashSet<Fingerprint>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Store(format!("Failed to begin read transaction: {}", e)))?;

        let table = read_txn
            .open_table(UNITS_TABLE)
            .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;

        let mut fingerprints = HashSet::new();
        for item in table
            .iter()
            .map_err(|e| Error::Store(format!("Failed to iterate table: {}", e)))?
        {
            let (_key, value) =
                item.map_err(|e| Error::Store(format!("Failed to read table item: {}", e)))?;
            let unit = unit_from_json(value.value())?;
            fingerprints.insert(unit.fingerprint);
        }

        Ok(fingerprints)
    }

    /// Remove all units for a specific source path
    /// Optimized: matches on the key prefix to avoid deserializing entries
    pub fn delete_units_for_path(&self, path: &str) -> Result<usize> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Store(format!("Failed to begin read transaction: {}", e)))?;

        let read_table = read_txn
            .open_table(UNITS_TABLE)
            .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;

        let prefix = format!("{}:", path);
        let mut to_remove = Vec::new();

        for item in read_table
            .iter()
            .map_err(|e| Error::Store(format!("Failed to iterate table: {}", e)))?
        {
            let (key, _value) =
                item.map_err(|e| Error::Store(format!("Failed to read table item: {}", e)))?;
            let key_str = key.value();
            if key_str.starts_with(&prefix) {
                to_remove.push(key_str.to_string());
            }
        }

        drop(read_table);
        drop(read_txn);

        if to_remove.is_empty() {
            return Ok(0);
        }

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Store(format!("Failed to begin write transaction: {}", e)))?;

        {
            let mut table = write_txn
                .open_table(UNITS_TABLE)
                .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;

            for key in &to_remove {
                table
                    .remove(key.as_str())
                    .map_err(|e| Error::Store(format!("Failed to remove unit: {}", e)))?;
            }
        }

        write_txn
            .commit()
            .map_err(|e| Error::Store(format!("Failed to commit transaction: {}", e)))?;

        Ok(to_remove.len())
    }

    /// Number of stored units
    pub fn count_units(&self) -> Result<usize> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Store(format!("Failed to begin read transaction: {}", e)))?;

        let table = read_txn
            .open_table(UNITS_TABLE)
            .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;

        let len = table
            .len()
            .map_err(|e| Error::Store(format!("Failed to count units: {}", e)))?;

        Ok(len as usize)
    }

    /// Search for similar units using cosine similarity
    /// Uses a min-heap to keep the top K results without storing all vectors
    pub fn search(&self, query: &[f32], limit: usize) -> Result<Vec<(IndexedUnit, f32)>> {
        use std::cmp::Ordering;
        use std::collections::BinaryHeap;

        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Store(format!("Failed to begin read transaction: {}", e)))?;

        let table = read_txn
            .open_table(UNITS_TABLE)
            .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;

        let mut heap: BinaryHeap<SimilarityEntry> = BinaryHeap::with_capacity(limit + 1);

        for item in table
            .iter()
            .map_err(|e| Error::Store(format!("Failed to iterate table: {}", e)))?
        {
            let (_key, value) =
                item.map_err(|e| Error::Store(format!("Failed to read table item: {}", e)))?;
            if let Ok(unit) = unit_from_json(value.value()) {
                let similarity = cosine_similarity(query, &unit.vector);
                heap.push(SimilarityEntry(unit, similarity));
                if heap.len() > limit {
                    heap.pop();
                }
            }
        }

        let mut results: Vec<(IndexedUnit, f32)> =
            heap.into_iter().map(|entry| (entry.0, entry.1)).collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        Ok(results)
    }
}

/// Helper struct for maintaining top-K search results using a min-heap
struct SimilarityEntry(IndexedUnit, f32);

impl PartialEq for SimilarityEntry {
    fn eq(&self, other: &Self) -> bool {
        self.1 == other.1
    }
}

impl Eq for SimilarityEntry {}

impl PartialOrd for SimilarityEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        // Reverse ordering so BinaryHeap (a max-heap) behaves like a min-heap by similarity.
        other.1.partial_cmp(&self.1)
    }
}

impl std::cmp::Ord for SimilarityEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.partial_cmp(other).unwrap_or(std::cmp::Ordering::Equal)
    }
}

/// Calculate cosine similarity between two vectors
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
