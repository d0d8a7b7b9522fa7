//! Process-wide mapping from document id to its published [`VectorIndex`].

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::{info, warn};

use crate::document::DocumentId;
use crate::index::VectorIndex;

type IndexMap = HashMap<DocumentId, Arc<VectorIndex>>;

/// Holds the currently published index of every indexed document.
///
/// The map itself is immutable and shared behind an atomic pointer. Readers
/// load the current map without taking a lock; writers copy it, apply their
/// change and swap the new map in (retrying if another writer swapped first).
/// A reader that fetched an index before it was replaced keeps using the old
/// one.
///
/// Construct one per process (or per test) and share it behind an `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::IndexRegistry;
///
/// let registry = Arc::new(IndexRegistry::new());
/// registry.register(index.document_id().clone(), Arc::new(index));
/// let index = registry.get(&doc_id);
/// ```
#[derive(Debug, Default)]
pub struct IndexRegistry {
    indexes: ArcSwap<IndexMap>,
}

impl IndexRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `index` for `document_id`, returning the index it replaced.
    ///
    /// Concurrent registrations for the same id are last-writer-wins.
    pub fn register(
        &self,
        document_id: DocumentId,
        index: Arc<VectorIndex>,
    ) -> Option<Arc<VectorIndex>> {
        let entries = index.len();
        let mut previous = None;
        self.indexes.rcu(|current| {
            let mut next = IndexMap::clone(current);
            previous = next.insert(document_id.clone(), index.clone());
            next
        });
        if previous.is_some() {
            warn!(document.id = %document_id, entries, "replaced existing index");
        } else {
            info!(document.id = %document_id, entries, "published index");
        }
        previous
    }

    /// Look up the published index for `document_id`.
    pub fn get(&self, document_id: &DocumentId) -> Option<Arc<VectorIndex>> {
        self.indexes.load().get(document_id).cloned()
    }

    /// Remove and return the index for `document_id`.
    pub fn remove(&self, document_id: &DocumentId) -> Option<Arc<VectorIndex>> {
        let mut removed = None;
        self.indexes.rcu(|current| {
            let mut next = IndexMap::clone(current);
            removed = next.remove(document_id);
            next
        });
        if removed.is_some() {
            info!(document.id = %document_id, "removed index");
        }
        removed
    }

    /// Whether an index is published for `document_id`.
    pub fn contains(&self, document_id: &DocumentId) -> bool {
        self.indexes.load().contains_key(document_id)
    }

    /// Number of published indexes.
    pub fn len(&self) -> usize {
        self.indexes.load().len()
    }

    /// Whether no index is published.
    pub fn is_empty(&self) -> bool {
        self.indexes.load().is_empty()
    }

    /// Ids of all indexed documents, sorted.
    pub fn document_ids(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self.indexes.load().keys().cloned().collect();
        ids.sort();
        ids
    }
}
