use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    ports::VectorStore, DistanceMetric, Document, DomainError, Embedding, ScoredDocument,
};
use crate::infrastructure::vector_store::DuplicatePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Record {
    document: Document,
    embedding: Embedding,
}

/// Embedded store doing an exact scan over every record.
///
/// When opened with a data directory every accepted batch is appended to
/// `<dir>/<collection>.jsonl`, one record per line. Opening replays the log
/// (later lines win for a repeated id) and compacts it when it holds stale
/// or torn entries.
pub struct InMemoryVectorStore {
    collection: String,
    metric: DistanceMetric,
    duplicates: DuplicatePolicy,
    log: Option<PathBuf>,
    records: RwLock<Vec<Record>>,
    // Serializes writers so a batch is screened and applied against the same state.
    writer: Mutex<()>,
}

impl InMemoryVectorStore {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            metric: DistanceMetric::default(),
            duplicates: DuplicatePolicy::default(),
            log: None,
            records: RwLock::new(Vec::new()),
            writer: Mutex::new(()),
        }
    }

    /// Opens (or creates) a persisted collection under `dir`.
    pub fn open(dir: &Path, collection: impl Into<String>) -> Result<Self, DomainError> {
        let collection = collection.into();
        std::fs::create_dir_all(dir).map_err(|e| {
            DomainError::store(format!("failed to create {}: {e}", dir.display()))
        })?;

        let log = dir.join(format!("{collection}.jsonl"));
        let mut store = Self::new(collection);

        if log.exists() {
            let raw = std::fs::read_to_string(&log).map_err(|e| {
                DomainError::store(format!("failed to read {}: {e}", log.display()))
            })?;
            let (records, stale) = replay(&raw, &log)?;

            if stale {
                compact(&log, &records)?;
            }

            info!(
                collection = %store.collection,
                documents = records.len(),
                compacted = stale,
                "loaded vector store"
            );
            store.records = RwLock::new(records);
        }

        store.log = Some(log);
        Ok(store)
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_duplicate_policy(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Splits `batch` into the records that may be stored and the error that
    /// stopped the rest, if any.
    fn screen(
        &self,
        stored: &[Record],
        batch: &[(Document, Embedding)],
    ) -> (Vec<Record>, Option<DomainError>) {
        let mut dimension = stored.first().map(|r| r.embedding.dimension());
        let mut accepted: Vec<Record> = Vec::with_capacity(batch.len());

        for (document, embedding) in batch {
            if embedding.dimension() == 0 {
                return (accepted, Some(DomainError::store("embedding must not be empty")));
            }

            let expected = *dimension.get_or_insert(embedding.dimension());
            if expected != embedding.dimension() {
                return (
                    accepted,
                    Some(DomainError::store(format!(
                        "embedding dimension {} does not match collection dimension {expected}",
                        embedding.dimension()
                    ))),
                );
            }

            let taken = |r: &Record| r.document.id == document.id;
            if self.duplicates == DuplicatePolicy::Reject
                && (stored.iter().any(taken) || accepted.iter().any(taken))
            {
                return (
                    accepted,
                    Some(DomainError::store(format!(
                        "document '{}' already exists",
                        document.id
                    ))),
                );
            }

            accepted.push(Record {
                document: document.clone(),
                embedding: embedding.clone(),
            });
        }

        (accepted, None)
    }

    async fn append(&self, records: &[Record]) -> Result<(), DomainError> {
        let Some(path) = self.log.clone() else {
            return Ok(());
        };

        let bytes = encode(records)?;
        tokio::task::spawn_blocking(move || append_lines(&path, &bytes))
            .await
            .map_err(|e| DomainError::internal(format!("store writer task failed: {e}")))?
    }
}

/// Rebuilds the collection from a log. The flag is set when the log holds
/// more lines than live records and should be rewritten.
fn replay(raw: &str, path: &Path) -> Result<(Vec<Record>, bool), DomainError> {
    let mut records: Vec<Record> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut stale = false;

    let lines: Vec<&str> = raw.lines().collect();
    let torn_tail = !raw.is_empty() && !raw.ends_with('\n');

    for (n, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record: Record = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) if torn_tail && n + 1 == lines.len() => {
                warn!(file = %path.display(), error = %e, "dropping incomplete final entry");
                stale = true;
                break;
            }
            Err(e) => {
                return Err(DomainError::store(format!(
                    "corrupt store file {} at line {}: {e}",
                    path.display(),
                    n + 1
                )))
            }
        };

        let existing = positions.get(&record.document.id).copied();
        match existing {
            Some(idx) => {
                records[idx] = record;
                stale = true;
            }
            None => {
                positions.insert(record.document.id.clone(), records.len());
                records.push(record);
            }
        }
    }

    Ok((records, stale))
}

fn encode(records: &[Record]) -> Result<Vec<u8>, DomainError> {
    let mut bytes = Vec::new();
    for record in records {
        serde_json::to_writer(&mut bytes, record)
            .map_err(|e| DomainError::internal(e.to_string()))?;
        bytes.push(b'\n');
    }
    Ok(bytes)
}

fn append_lines(path: &Path, bytes: &[u8]) -> Result<(), DomainError> {
    let io_error = |e: std::io::Error| {
        DomainError::store(format!("failed to write {}: {e}", path.display()))
    };

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_error)?;
    let start = file.metadata().map_err(io_error)?.len();

    if let Err(e) = file.write_all(bytes).and_then(|()| file.sync_data()) {
        // Cut off a partial batch so the next append starts on a clean line.
        let _ = file.set_len(start);
        return Err(io_error(e));
    }
    Ok(())
}

/// Rewrites the log with exactly one line per record.
fn compact(path: &Path, records: &[Record]) -> Result<(), DomainError> {
    let bytes = encode(records)?;
    let tmp = path.with_extension("jsonl.tmp");
    std::fs::write(&tmp, bytes)
        .and_then(|()| std::fs::rename(&tmp, path))
        .map_err(|e| DomainError::store(format!("failed to compact {}: {e}", path.display())))
}

fn apply(records: &mut Vec<Record>, record: Record) -> bool {
    match records.iter().position(|r| r.document.id == record.document.id) {
        Some(idx) => {
            records[idx] = record;
            true
        }
        None => {
            records.push(record);
            false
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, document: &Document, embedding: &Embedding) -> Result<(), DomainError> {
        self.upsert_batch(&[(document.clone(), embedding.clone())]).await
    }

    /// The batch reaches disk in one append, written off the async runtime.
    /// Readers are only blocked while accepted records are swapped in.
    async fn upsert_batch(&self, batch: &[(Document, Embedding)]) -> Result<(), DomainError> {
        if batch.is_empty() {
            return Ok(());
        }

        let _writer = self.writer.lock().await;

        let (accepted, rejection) = {
            let records = self
                .records
                .read()
                .map_err(|e| DomainError::internal(e.to_string()))?;
            self.screen(&records, batch)
        };

        if !accepted.is_empty() {
            self.append(&accepted).await?;

            let mut records = self
                .records
                .write()
                .map_err(|e| DomainError::internal(e.to_string()))?;
            let stored = accepted.len();
            let mut overwritten = 0;
            for record in accepted {
                if apply(&mut records, record) {
                    overwritten += 1;
                }
            }
            debug!(stored, overwritten, "documents stored");
        }

        match rejection {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn query(
        &self,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, DomainError> {
        let store = self
            .records
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;

        let mut results: Vec<ScoredDocument> = store
            .iter()
            .map(|record| ScoredDocument {
                id: record.document.id.clone(),
                content: record.document.content.clone(),
                metadata: record.document.metadata.clone(),
                distance: self.metric.distance(embedding, &record.embedding),
            })
            .collect();

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(top_k);

        Ok(results)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let store = self
            .records
            .read()
            .map_err(|e| DomainError::internal(e.to_string()))?;
        Ok(store.len())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}
