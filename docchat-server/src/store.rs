//! In-memory catalog of uploaded documents.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Metadata about one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub id: u64,
    /// Name the file is stored under (`{uuid}_{original_filename}`).
    pub filename: String,
    pub original_filename: String,
    pub upload_date: DateTime<Utc>,
    pub file_path: String,
}

#[derive(Debug, Default)]
struct StoreInner {
    last_id: u64,
    records: BTreeMap<u64, DocumentRecord>,
}

/// Assigns ids and keeps records until they are removed.
///
/// Ids start at 1 and are never reused within a process.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        filename: String,
        original_filename: String,
        file_path: String,
    ) -> DocumentRecord {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let record = DocumentRecord {
            id: inner.last_id,
            filename,
            original_filename,
            upload_date: Utc::now(),
            file_path,
        };
        inner.records.insert(record.id, record.clone());
        record
    }

    pub async fn get(&self, id: u64) -> Option<DocumentRecord> {
        self.inner.read().await.records.get(&id).cloned()
    }

    pub async fn remove(&self, id: u64) -> Option<DocumentRecord> {
        self.inner.write().await.records.remove(&id)
    }

    /// All records, oldest first.
    pub async fn list(&self) -> Vec<DocumentRecord> {
        self.inner.read().await.records.values().cloned().collect()
    }
}
