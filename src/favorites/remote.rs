use crate::error::RemoteError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Path of a document collection, e.g. `users/{uid}/favorites`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Favorites collection of one user. The id must be a single path segment.
    pub fn favorites(user_id: &str) -> Result<Self, RemoteError> {
        if user_id.trim().is_empty() || user_id.contains('/') {
            return Err(RemoteError::Rejected(format!(
                "invalid user id {:?}",
                user_id
            )));
        }
        Ok(CollectionPath(format!("users/{}/favorites", user_id)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A stored document: its id inside the collection and its JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub id: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Delete { id: String },
    Set { id: String, data: Value },
}

/// Writes against one collection, applied all-or-nothing
#[derive(Debug, Clone, PartialEq)]
pub struct WriteBatch {
    pub collection: CollectionPath,
    pub ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new(collection: CollectionPath) -> Self {
        Self {
            collection,
            ops: Vec::new(),
        }
    }

    pub fn delete(&mut self, id: impl Into<String>) {
        self.ops.push(BatchOp::Delete { id: id.into() });
    }

    pub fn set(&mut self, id: impl Into<String>, data: Value) {
        self.ops.push(BatchOp::Set {
            id: id.into(),
            data,
        });
    }
}

/// Remote per-user document store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<RemoteDocument>, RemoteError>;

    /// Apply every operation of the batch atomically
    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError>;
}

/// Remote store kept in process memory, with an offline switch for tests
#[derive(Default)]
pub struct InMemoryRemoteStore {
    collections: Mutex<HashMap<CollectionPath, BTreeMap<String, Value>>>,
    offline: AtomicBool,
    commits: AtomicUsize,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `Unavailable`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of batches committed so far
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Seed or inspect a collection directly
    pub fn insert(&self, collection: &CollectionPath, id: impl Into<String>, data: Value) {
        if let Ok(mut collections) = self.collections.lock() {
            collections
                .entry(collection.clone())
                .or_default()
                .insert(id.into(), data);
        }
    }

    pub fn document_ids(&self, collection: &CollectionPath) -> Vec<String> {
        self.collections
            .lock()
            .map(|collections| {
                collections
                    .get(collection)
                    .map(|docs| docs.keys().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn check_online(&self) -> Result<(), RemoteError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable(
                "the client is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn list(&self, collection: &CollectionPath) -> Result<Vec<RemoteDocument>, RemoteError> {
        self.check_online()?;
        let collections = self
            .collections
            .lock()
            .map_err(|_| RemoteError::Unavailable("store poisoned".to_string()))?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| RemoteDocument {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), RemoteError> {
        self.check_online()?;
        let mut collections = self
            .collections
            .lock()
            .map_err(|_| RemoteError::Unavailable("store poisoned".to_string()))?;

        // Apply to a copy so a rejected op leaves the collection untouched
        let mut docs = collections.get(&batch.collection).cloned().unwrap_or_default();
        for op in batch.ops {
            match op {
                BatchOp::Delete { id } => {
                    docs.remove(&id);
                }
                BatchOp::Set { id, data } => {
                    if id.is_empty() || id.contains('/') {
                        return Err(RemoteError::Rejected(format!("invalid document id `{}`", id)));
                    }
                    docs.insert(id, data);
                }
            }
        }
        collections.insert(batch.collection, docs);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
