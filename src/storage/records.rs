use crate::core::config::Config;
use crate::core::error::{Error, Result};
use redb::{Database, ReadableTable, TableDefinition};
use std::collections::HashMap;
use std::time::SystemTime;

/// Table definition for file-record tracking
/// Using &str for both key and value (JSON serialized)
const RECORDS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("file_records");

/// Last-indexed state for one source file
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FileRecord {
    /// Relative path of the source file
    pub path: String,
    /// Modification time at indexing, milliseconds since the Unix epoch
    pub modified_millis: u64,
    /// Timestamp when the file was last indexed
    pub indexed_at: u64,
}

impl FileRecord {
    pub fn new(path: String, modified_millis: u64) -> Self {
        Self {
            path,
            modified_millis,
            indexed_at: SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Store(format!("Failed to serialize file record: {}", e)))
    }

    fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::Store(format!("Failed to deserialize file record: {}", e)))
    }
}

/// Store tracking which files were indexed at which modification time
pub struct RecordStore {
    db: Database,
}

impl RecordStore {
    /// Open or create the record store
    pub fn open(config: &Config) -> Result<Self> {
        if let Some(parent) = config.records_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = if config.records_path.exists() {
            Database::open(&config.records_path).map_err(|e| {
                let msg = e.to_string();
                if msg.to_lowercase().contains("lock") {
                    Error::Store("Record database is locked. Another corpus2vec process may be running. Close other instances and try again.".to_string())
                } else {
                    Error::Store(format!("Failed to open record database: {}", e))
                }
            })?
        } else {
            Database::create(&config.records_path)
                .map_err(|e| Error::Store(format!("Failed to create record database: {}", e)))?
        };

        // Initialize table (safe even if the table already exists)
        let write_txn = db
            .begin_write()
            .map_err(|e| Error::Store(format!("Failed to begin write transaction: {}", e)))?;
        {
            let _table = write_txn
                .open_table(RECORDS_TABLE)
                .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| Error::Store(format!("Failed to commit transaction: {}", e)))?;

        Ok(Self { db })
    }

    /// All persisted path → modification-time pairs
    pub fn file_records(&self) -> Result<HashMap<String, u64>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Store(format!("Failed to begin read transaction: {}", e)))?;

        let table = read_txn
            .open_table(RECORDS_TABLE)
            .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;

        let mut records = HashMap::new();
        for item in table
            .iter()
            .map_err(|e| Error::Store(format!("Failed to iterate table: {}", e)))?
        {
            let (key, value) =
                item.map_err(|e| Error::Store(format!("Failed to read table item: {}", e)))?;
            let record = FileRecord::from_json(value.value())?;
            records.insert(key.value().to_string(), record.modified_millis);
        }

        Ok(records)
    }

    /// Replace the record for a path. The store has no native update, so
    /// the old record is removed before the new one is inserted.
    pub fn upsert_record(&self, path: &str, modified_millis: u64) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Store(format!("Failed to begin write transaction: {}", e)))?;

        {
            let mut table = write_txn
                .open_table(RECORDS_TABLE)
                .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;

            table
                .remove(path)
                .map_err(|e| Error::Store(format!("Failed to remove file record: {}", e)))?;

            let record = FileRecord::new(path.to_string(), modified_millis);
            let json = record.to_json()?;
            table
                .insert(path, json.as_str())
                .map_err(|e| Error::Store(format!("Failed to insert file record: {}", e)))?;
        }

        write_txn
            .commit()
            .map_err(|e| Error::Store(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    /// Remove the record for a path
    pub fn delete_record(&self, path: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Store(format!("Failed to begin write transaction: {}", e)))?;

        {
            let mut table = write_txn
                .open_table(RECORDS_TABLE)
                .map_err(|e| Error::Store(format!("Failed to open table: {}", e)))?;

            table
                .remove(path)
                .map_err(|e| Error::Store(format!("Failed to remove file record: {}", e)))?;
        }

        write_txn
            .commit()
            .map_err(|e| Error::Store(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }
}
