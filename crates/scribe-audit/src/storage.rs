//! Audit storage backends.
//!
//! Storage is append-only: a sink assigns the surrogate id and keeps the
//! record. Nothing in the engine updates or removes a stored record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scribe_core::config::{StorageBackend, StorageConfig};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::AuditError;
use crate::record::{AuditAction, AuditRecord};

/// Filter for querying audit records.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Filter by entity type name.
    pub entity_class_name: Option<String>,
    /// Filter by entity id.
    pub entity_id: Option<String>,
    /// Filter by action.
    pub action: Option<AuditAction>,
    /// Filter by auditor.
    pub auditor: Option<String>,
    /// Filter by start time (inclusive).
    pub start_time: Option<DateTime<Utc>>,
    /// Filter by end time (inclusive).
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
}

impl AuditFilter {
    /// All records for one entity.
    pub fn for_entity(entity_class_name: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_class_name: Some(entity_class_name.into()),
            entity_id: Some(entity_id.into()),
            ..Default::default()
        }
    }

    /// Whether a record passes every set criterion (ignores limit/offset).
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(ref class_name) = self.entity_class_name {
            if &record.entity_class_name != class_name {
                return false;
            }
        }
        if let Some(ref entity_id) = self.entity_id {
            if &record.entity_id != entity_id {
                return false;
            }
        }
        if let Some(action) = self.action {
            if record.action != action {
                return false;
            }
        }
        if let Some(ref auditor) = self.auditor {
            if &record.auditor != auditor {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if record.datetime < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if record.datetime > end {
                return false;
            }
        }
        true
    }

    /// Apply the filter, then offset and limit, to records in append order.
    pub fn apply<'a>(&self, records: impl Iterator<Item = &'a AuditRecord>) -> Vec<AuditRecord> {
        records
            .filter(|r| self.matches(r))
            .skip(self.offset.unwrap_or(0))
            .take(self.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }
}

/// Trait for audit storage backends.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append a record and return it as stored.
    ///
    /// Queryable backends assign a unique, increasing `id`; write-only
    /// backends ([`ConsoleSink`], [`NullSink`]) return it with `id` unset.
    async fn append(&self, record: AuditRecord) -> Result<AuditRecord, AuditError>;

    /// Query audit records with filters, in append order.
    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditRecord>, AuditError>;

    /// Count audit records matching a filter (ignores limit/offset).
    async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError>;

    /// Get an audit record by id.
    async fn get(&self, id: u64) -> Result<Option<AuditRecord>, AuditError>;
}

/// Create a storage backend based on configuration.
pub fn create_sink(config: &StorageConfig) -> Result<Box<dyn AuditSink>, AuditError> {
    match config.backend {
        StorageBackend::Memory => Ok(Box::new(MemorySink::new())),
        StorageBackend::Console => Ok(Box::new(ConsoleSink)),
        StorageBackend::File => {
            let path = config.file_path.as_deref().unwrap_or("audit.log");
            Ok(Box::new(JsonLinesSink::open(path)?))
        }
    }
}

/// In-memory record list guarded by a lock.
///
/// Ids continue from the highest id ever handed out, which may exceed the
/// number of records held when unreadable lines were dropped on load.
#[derive(Debug, Default)]
struct RecordLog {
    records: RwLock<Vec<AuditRecord>>,
    last_id: AtomicU64,
}

impl RecordLog {
    fn with_records(records: Vec<AuditRecord>, last_id: u64) -> Self {
        Self {
            records: RwLock::new(records),
            last_id: AtomicU64::new(last_id),
        }
    }

    fn push_with<F>(&self, mut record: AuditRecord, persist: F) -> Result<AuditRecord, AuditError>
    where
        F: FnOnce(&AuditRecord) -> Result<(), AuditError>,
    {
        let mut records = self.records.write().map_err(|e| {
            AuditError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        // Only bumped on success; the write lock serializes appends.
        let id = self.last_id.load(Ordering::SeqCst) + 1;
        record.id = Some(id);
        persist(&record)?;
        self.last_id.store(id, Ordering::SeqCst);
        records.push(record.clone());
        Ok(record)
    }

    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        let records = self.records.read().map_err(|e| {
            AuditError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(filter.apply(records.iter()))
    }

    fn count(&self, filter: &AuditFilter) -> Result<usize, AuditError> {
        let records = self.records.read().map_err(|e| {
            AuditError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(records.iter().filter(|r| filter.matches(r)).count())
    }

    fn get(&self, id: u64) -> Result<Option<AuditRecord>, AuditError> {
        let records = self.records.read().map_err(|e| {
            AuditError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(records.iter().find(|r| r.id == Some(id)).cloned())
    }
}

/// Memory storage (records live as long as the process).
#[derive(Debug, Default)]
pub struct MemorySink {
    log: RecordLog,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuditSink for MemorySink {
    async fn append(&self, record: AuditRecord) -> Result<AuditRecord, AuditError> {
        self.log.push_with(record, |_| Ok(()))
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        self.log.query(&filter)
    }

    async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError> {
        self.log.count(&filter)
    }

    async fn get(&self, id: u64) -> Result<Option<AuditRecord>, AuditError> {
        self.log.get(id)
    }
}

/// File storage (appends one JSON object per line).
///
/// Existing lines are loaded on open so ids keep increasing across restarts
/// and earlier records stay queryable.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    log: RecordLog,
}

impl JsonLinesSink {
    /// Open (or create on first append) a JSON Lines audit file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let mut records = Vec::new();
        let mut line_count = 0u64;

        if path.exists() {
            let file = std::fs::File::open(&path)?;
            for (index, line) in BufReader::new(file).lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                line_count += 1;
                match serde_json::from_str::<AuditRecord>(&line) {
                    Ok(record) => records.push(record),
                    Err(e) => tracing::warn!(
                        path = %path.display(),
                        line = index + 1,
                        error = %e,
                        "Skipping malformed audit line"
                    ),
                }
            }
        }

        // A skipped line may have held any id up to its position.
        let last_id = records
            .iter()
            .filter_map(|r| r.id)
            .max()
            .unwrap_or(0)
            .max(line_count);

        Ok(Self {
            path,
            log: RecordLog::with_records(records, last_id),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonLinesSink {
    async fn append(&self, record: AuditRecord) -> Result<AuditRecord, AuditError> {
        self.log.push_with(record, |record| {
            let json = serde_json::to_string(record)?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            writeln!(file, "{}", json)?;
            Ok(())
        })
    }

    async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        self.log.query(&filter)
    }

    async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError> {
        self.log.count(&filter)
    }

    async fn get(&self, id: u64) -> Result<Option<AuditRecord>, AuditError> {
        self.log.get(id)
    }
}

/// Console storage (prints JSON lines to stdout).
#[derive(Debug, Default)]
pub struct ConsoleSink;

#[async_trait]
impl AuditSink for ConsoleSink {
    async fn append(&self, record: AuditRecord) -> Result<AuditRecord, AuditError> {
        let json = serde_json::to_string(&record)?;
        println!("{}", json);
        Ok(record)
    }

    async fn query(&self, _filter: AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        // Console storage doesn't support querying
        Ok(vec![])
    }

    async fn count(&self, _filter: AuditFilter) -> Result<usize, AuditError> {
        Ok(0)
    }

    async fn get(&self, _id: u64) -> Result<Option<AuditRecord>, AuditError> {
        Ok(None)
    }
}

/// Discards everything; used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl AuditSink for NullSink {
    async fn append(&self, record: AuditRecord) -> Result<AuditRecord, AuditError> {
        Ok(record)
    }

    async fn query(&self, _filter: AuditFilter) -> Result<Vec<AuditRecord>, AuditError> {
        Ok(vec![])
    }

    async fn count(&self, _filter: AuditFilter) -> Result<usize, AuditError> {
        Ok(0)
    }

    async fn get(&self, _id: u64) -> Result<Option<AuditRecord>, AuditError> {
        Ok(None)
    }
}
