//! List/watch informer
//!
//! The informer keeps a watch open on one namespace and forwards additions
//! and deletions to a single ordered channel. Every `resync` interval it
//! relists the namespace and re-delivers every live instance as `Added`, so
//! consumers must treat `Added` idempotently. When the watch drops, the
//! informer resubscribes and relists straight away.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use osb_types::ServiceInstance;

use crate::traits::{InstanceStore, StoreEvent};

/// Delay before retrying a failed watch subscription
const WATCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// An instance lifecycle event as seen by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceEvent {
    /// A new instance, or a live instance re-delivered by a relist
    Added(ServiceInstance),
    /// An instance that has been removed from the store
    Deleted(ServiceInstance),
}

/// Why a watch session ended
enum SessionEnd {
    /// Resubscribe and relist
    Disconnected,
    /// Shutdown was requested or nobody is listening any more
    Stop,
}

/// Feeds [`InstanceEvent`]s for one namespace from an [`InstanceStore`]
pub struct Informer<S: InstanceStore + ?Sized> {
    store: Arc<S>,
    namespace: String,
    resync: Duration,
    /// Last snapshot seen per name, used to emit deletions a relist reveals
    known: HashMap<String, ServiceInstance>,
}

impl<S: InstanceStore + ?Sized> Informer<S> {
    pub fn new(store: Arc<S>, namespace: impl Into<String>, resync: Duration) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            resync,
            known: HashMap::new(),
        }
    }

    /// Run until `shutdown` flips to true or the event receiver is dropped
    pub async fn run(
        mut self,
        events: mpsc::Sender<InstanceEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::info!(
            namespace = %self.namespace,
            resync_secs = self.resync.as_secs(),
            "Informer started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let stream = match self.store.watch(&self.namespace).await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to open instance watch, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(WATCH_RETRY_DELAY) => continue,
                        _ = shutdown.changed() => break,
                    }
                }
            };

            match self.session(stream, &events, &mut shutdown).await {
                SessionEnd::Disconnected => {
                    tracing::warn!(namespace = %self.namespace, "Instance watch closed, resubscribing");
                }
                SessionEnd::Stop => break,
            }
        }

        tracing::info!(namespace = %self.namespace, "Informer stopped");
    }

    /// One watch subscription: initial relist, then watch events interleaved
    /// with periodic relists.
    async fn session(
        &mut self,
        mut stream: mpsc::Receiver<StoreEvent>,
        events: &mpsc::Sender<InstanceEvent>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        if !self.relist(events).await {
            return SessionEnd::Stop;
        }

        let mut ticker = interval_at(Instant::now() + self.resync, self.resync);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return SessionEnd::Stop;
                    }
                }
                _ = ticker.tick() => {
                    if !self.relist(events).await {
                        return SessionEnd::Stop;
                    }
                }
                event = stream.recv() => {
                    let Some(event) = event else {
                        return SessionEnd::Disconnected;
                    };
                    if !self.observe(event, events).await {
                        return SessionEnd::Stop;
                    }
                }
            }
        }
    }

    /// Apply one watch event. Returns false once the receiver is gone.
    async fn observe(&mut self, event: StoreEvent, events: &mpsc::Sender<InstanceEvent>) -> bool {
        match event {
            StoreEvent::Added(si) => {
                self.known.insert(si.name().to_string(), si.clone());
                events.send(InstanceEvent::Added(si)).await.is_ok()
            }
            StoreEvent::Modified(si) => {
                self.known.insert(si.name().to_string(), si);
                true
            }
            StoreEvent::Deleted(si) => {
                self.known.remove(si.name());
                events.send(InstanceEvent::Deleted(si)).await.is_ok()
            }
        }
    }

    /// Re-deliver every live instance and emit deletions for instances that
    /// disappeared while unobserved. Returns false once the receiver is gone.
    async fn relist(&mut self, events: &mpsc::Sender<InstanceEvent>) -> bool {
        let list = match self.store.list(&self.namespace).await {
            Ok(list) => list,
            Err(e) => {
                tracing::error!(error = %e, "Relist failed, waiting for next resync");
                return true;
            }
        };

        tracing::debug!(
            namespace = %self.namespace,
            count = list.items.len(),
            resource_version = list.resource_version,
            "Relisted instances"
        );

        let mut previous = std::mem::take(&mut self.known);
        for si in list.items {
            previous.remove(si.name());
            self.known.insert(si.name().to_string(), si.clone());
            if events.send(InstanceEvent::Added(si)).await.is_err() {
                return false;
            }
        }

        for (_, gone) in previous {
            if events.send(InstanceEvent::Deleted(gone)).await.is_err() {
                return false;
            }
        }

        true
    }
}
