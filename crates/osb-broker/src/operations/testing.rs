//! Store double for facade and controller tests

use async_trait::async_trait;
use osb_store::{
    broker_scheme, InMemoryInstanceStore, InstanceList, InstanceStore, StoreError, StoreEvent,
    StoreResult,
};
use osb_types::ServiceInstance;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// An in-memory store that records every call and can be told to fail a
/// given method.
pub(crate) struct FakeStore {
    inner: InMemoryInstanceStore,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, StoreError>>,
    one_shot: Mutex<HashMap<&'static str, StoreError>>,
}

impl FakeStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryInstanceStore::new(Arc::new(broker_scheme())),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            one_shot: Mutex::new(HashMap::new()),
        }
    }

    /// The backing store, bypassing call recording and failure injection
    pub(crate) fn inner(&self) -> &InMemoryInstanceStore {
        &self.inner
    }

    /// Make every subsequent call to `method` fail with `error`
    pub(crate) fn fail(&self, method: &'static str, error: StoreError) {
        self.failures.lock().unwrap().insert(method, error);
    }

    /// Fail only the next call to `method`
    pub(crate) fn fail_once(&self, method: &'static str, error: StoreError) {
        self.one_shot.lock().unwrap().insert(method, error);
    }

    /// Stop failing `method`
    pub(crate) fn recover(&self, method: &'static str) {
        self.failures.lock().unwrap().remove(method);
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(' ').next() == Some(method))
            .count()
    }

    fn record(&self, method: &'static str, target: &str) -> StoreResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {}", method, target));
        if let Some(err) = self.one_shot.lock().unwrap().remove(method) {
            return Err(err);
        }
        match self.failures.lock().unwrap().get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InstanceStore for FakeStore {
    async fn get(&self, namespace: &str, name: &str) -> StoreResult<ServiceInstance> {
        self.record("get", name)?;
        self.inner.get(namespace, name).await
    }

    async fn create(&self, instance: ServiceInstance) -> StoreResult<ServiceInstance> {
        self.record("create", instance.name())?;
        self.inner.create(instance).await
    }

    async fn update(&self, instance: ServiceInstance) -> StoreResult<ServiceInstance> {
        self.record("update", instance.name())?;
        self.inner.update(instance).await
    }

    async fn delete(&self, namespace: &str, name: &str) -> StoreResult<()> {
        self.record("delete", name)?;
        self.inner.delete(namespace, name).await
    }

    async fn list(&self, namespace: &str) -> StoreResult<InstanceList> {
        self.record("list", namespace)?;
        self.inner.list(namespace).await
    }

    async fn watch(&self, namespace: &str) -> StoreResult<mpsc::Receiver<StoreEvent>> {
        self.record("watch", namespace)?;
        self.inner.watch(namespace).await
    }
}
