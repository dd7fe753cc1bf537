//! In-memory store implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};

use osb_types::ServiceInstance;

use crate::error::{StoreError, StoreResult};
use crate::scheme::Scheme;
use crate::traits::{InstanceList, InstanceStore, StoreEvent};

/// Default number of undelivered changes a watcher may lag behind by
const DEFAULT_WATCH_CAPACITY: usize = 1024;

type ObjectKey = (String, String);

#[derive(Debug, Clone, Copy)]
enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// A change as broadcast to watchers, still encoded
#[derive(Debug, Clone)]
struct Change {
    kind: ChangeKind,
    namespace: String,
    data: Arc<Vec<u8>>,
}

#[derive(Debug)]
struct StoredObject {
    resource_version: u64,
    data: Arc<Vec<u8>>,
}

#[derive(Debug)]
struct Inner {
    objects: HashMap<ObjectKey, StoredObject>,
    changes: broadcast::Sender<Change>,
}

impl Inner {
    fn publish(&self, kind: ChangeKind, namespace: &str, data: Arc<Vec<u8>>) {
        // No subscribers is not an error
        let _ = self.changes.send(Change {
            kind,
            namespace: namespace.to_string(),
            data,
        });
    }
}

/// In-memory instance store for development and testing.
///
/// Objects are kept encoded through the [`Scheme`] and decoded on every
/// read, so callers never share state with the store or with each other.
/// All mutations take one write lock, which also orders the change feed.
#[derive(Debug)]
pub struct InMemoryInstanceStore {
    scheme: Arc<Scheme>,
    inner: RwLock<Inner>,
    revision: AtomicU64,
    watch_capacity: usize,
}

impl InMemoryInstanceStore {
    /// Create an empty store using the given scheme
    pub fn new(scheme: Arc<Scheme>) -> Self {
        Self::with_watch_capacity(scheme, DEFAULT_WATCH_CAPACITY)
    }

    /// Create an empty store whose watchers are dropped after lagging
    /// `capacity` changes behind
    pub fn with_watch_capacity(scheme: Arc<Scheme>, capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        Self {
            scheme,
            inner: RwLock::new(Inner {
                objects: HashMap::new(),
                changes,
            }),
            revision: AtomicU64::new(0),
            watch_capacity: capacity.max(1),
        }
    }

    /// Drop every open watch, as a lost connection would
    pub async fn sever_watches(&self) {
        let mut inner = self.inner.write().await;
        let (changes, _) = broadcast::channel(self.watch_capacity);
        inner.changes = changes;
        tracing::debug!("severed all instance watches");
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn key(namespace: &str, name: &str) -> ObjectKey {
        (namespace.to_string(), name.to_string())
    }
}

#[async_trait]
impl InstanceStore for InMemoryInstanceStore {
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<ServiceInstance> {
        let inner = self.inner.read().await;
        let stored = inner
            .objects
            .get(&Self::key(namespace, name))
            .ok_or_else(|| StoreError::not_found(namespace, name))?;
        self.scheme.decode(&stored.data)
    }

    async fn create(&self, mut instance: ServiceInstance) -> StoreResult<ServiceInstance> {
        let key = Self::key(instance.namespace(), instance.name());

        let mut inner = self.inner.write().await;
        if inner.objects.contains_key(&key) {
            return Err(StoreError::already_exists(
                instance.namespace(),
                instance.name(),
            ));
        }

        let version = self.next_revision();
        instance.metadata.resource_version = version;
        instance.metadata.creation_timestamp = Some(Utc::now());

        let data = Arc::new(self.scheme.encode(&instance)?);
        inner.objects.insert(
            key,
            StoredObject {
                resource_version: version,
                data: data.clone(),
            },
        );
        inner.publish(ChangeKind::Added, instance.namespace(), data);

        Ok(instance)
    }

    async fn update(&self, mut instance: ServiceInstance) -> StoreResult<ServiceInstance> {
        let key = Self::key(instance.namespace(), instance.name());

        let mut inner = self.inner.write().await;
        let current = inner
            .objects
            .get(&key)
            .map(|o| o.resource_version)
            .ok_or_else(|| StoreError::not_found(instance.namespace(), instance.name()))?;

        if current != instance.resource_version() {
            return Err(StoreError::Conflict {
                namespace: instance.namespace().to_string(),
                name: instance.name().to_string(),
                expected: instance.resource_version(),
                actual: current,
            });
        }

        let version = self.next_revision();
        instance.metadata.resource_version = version;

        let data = Arc::new(self.scheme.encode(&instance)?);
        inner.objects.insert(
            key,
            StoredObject {
                resource_version: version,
                data: data.clone(),
            },
        );
        inner.publish(ChangeKind::Modified, instance.namespace(), data);

        Ok(instance)
    }

    async fn delete(&self, namespace: &str, name: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let removed = inner
            .objects
            .remove(&Self::key(namespace, name))
            .ok_or_else(|| StoreError::not_found(namespace, name))?;

        self.next_revision();
        inner.publish(ChangeKind::Deleted, namespace, removed.data);
        Ok(())
    }

    async fn list(&self, namespace: &str) -> StoreResult<InstanceList> {
        let inner = self.inner.read().await;
        let mut items = inner
            .objects
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|(_, stored)| self.scheme.decode::<ServiceInstance>(&stored.data))
            .collect::<StoreResult<Vec<_>>>()?;
        items.sort_by(|a, b| a.name().cmp(b.name()));

        Ok(InstanceList {
            items,
            resource_version: self.revision.load(Ordering::SeqCst),
        })
    }

    async fn watch(&self, namespace: &str) -> StoreResult<mpsc::Receiver<StoreEvent>> {
        let mut changes = self.inner.read().await.changes.subscribe();
        let (tx, rx) = mpsc::channel(self.watch_capacity);
        let scheme = self.scheme.clone();
        let namespace = namespace.to_string();

        tokio::spawn(async move {
            loop {
                let change = match changes.recv().await {
                    Ok(change) => change,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            namespace = %namespace,
                            skipped,
                            "watcher fell behind, closing watch"
                        );
                        break;
                    }
                    Err(RecvError::Closed) => break,
                };

                if change.namespace != namespace {
                    continue;
                }

                let instance: ServiceInstance = match scheme.decode(&change.data) {
                    Ok(instance) => instance,
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable change, closing watch");
                        break;
                    }
                };

                let event = match change.kind {
                    ChangeKind::Added => StoreEvent::Added(instance),
                    ChangeKind::Modified => StoreEvent::Modified(instance),
                    ChangeKind::Deleted => StoreEvent::Deleted(instance),
                };

                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}
