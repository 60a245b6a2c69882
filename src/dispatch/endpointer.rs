//! Endpoint cache: keeps live endpoints in sync with instance membership.
//!
//! A single spawned task consumes directory notifications and diffs each
//! full snapshot against the live map; request-handling workers only ever
//! read a published snapshot. The snapshot is produced then published
//! behind an `RwLock<Arc<Vec<_>>>`, so a reader's view is never mutated
//! while it is held.

use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::dispatch::directory::{Directory, InstanceSet};
use crate::dispatch::endpoint::SharedEndpoint;
use crate::dispatch::factory::{EndpointFactory, EndpointHandle};

/// Closes an endpoint cache, releasing every live handle. Object-safe so a
/// heterogeneous set of caches can be shut down together.
pub trait EndpointCache: Send + Sync {
    fn close(&self);
}

struct EndpointerInner<Req, Resp> {
    factory: Arc<dyn EndpointFactory<Req, Resp>>,
    /// Instance -> handle. Mutated only by the subscriber task (single
    /// writer); at most one handle per live instance.
    live: Mutex<BTreeMap<String, EndpointHandle<Req, Resp>>>,
    /// The published snapshot, replaced wholesale after each update cycle.
    snapshot: RwLock<Arc<Vec<SharedEndpoint<Req, Resp>>>>,
}

/// Subscribes to a [`Directory`] and incrementally opens/closes endpoints
/// as the address set changes, exposing a coherent snapshot of live
/// endpoints to the balancer.
pub struct Endpointer<Req, Resp> {
    inner: Arc<EndpointerInner<Req, Resp>>,
}

impl<Req, Resp> Clone for Endpointer<Req, Resp> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<Req, Resp> Endpointer<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + Sync + 'static,
{
    pub fn new(factory: Arc<dyn EndpointFactory<Req, Resp>>) -> Self {
        Self {
            inner: Arc::new(EndpointerInner {
                factory,
                live: Mutex::new(BTreeMap::new()),
                snapshot: RwLock::new(Arc::new(Vec::new())),
            }),
        }
    }

    /// Start tracking `directory`, applying its current membership
    /// immediately and every subsequent notification after that. The update
    /// task exits when the directory is dropped.
    pub fn subscribe(&self, directory: &Directory) {
        let mut rx = directory.subscribe();
        let endpointer = self.clone();
        tokio::spawn(async move {
            loop {
                let set = rx.borrow_and_update().clone();
                endpointer.apply(&set).await;
                if rx.changed().await.is_err() {
                    debug!("instance directory closed; endpointer task exiting");
                    break;
                }
            }
        });
    }

    /// Reconcile the live map against a full membership snapshot.
    ///
    /// Added instances are built through the factory; a build failure drops
    /// the instance from the live set (it is retried naturally on the next
    /// notification, not actively re-probed). Removed instances have their
    /// handles released. The published snapshot is rebuilt afterwards.
    pub async fn apply(&self, instances: &InstanceSet) {
        let current: Vec<String> = self.inner.live.lock().keys().cloned().collect();

        let added: Vec<String> = instances
            .iter()
            .filter(|i| !current.contains(*i))
            .cloned()
            .collect();
        let removed: Vec<String> = current
            .iter()
            .filter(|i| !instances.contains(*i))
            .cloned()
            .collect();

        if added.is_empty() && removed.is_empty() {
            return;
        }

        // Dial new instances before touching the live map; the factory may
        // block on the network and readers must keep a usable snapshot.
        let mut built = Vec::with_capacity(added.len());
        for instance in added {
            match self.inner.factory.build(&instance).await {
                Ok(handle) => built.push((instance, handle)),
                Err(e) => warn!(instance = %instance, error = %e, "failed to build endpoint"),
            }
        }

        let mut live = self.inner.live.lock();
        for instance in &removed {
            // Dropping the handle runs its release hook.
            live.remove(instance);
            debug!(instance = instance.as_str(), "released endpoint");
        }
        for (instance, handle) in built {
            live.insert(instance, handle);
        }

        let snapshot: Vec<SharedEndpoint<Req, Resp>> =
            live.values().map(|h| h.endpoint()).collect();
        *self.inner.snapshot.write() = Arc::new(snapshot);
    }

    /// The current snapshot: a stable, coherent view for one balancer
    /// selection. Cloning the `Arc` is the whole read path.
    pub fn snapshot(&self) -> Arc<Vec<SharedEndpoint<Req, Resp>>> {
        self.inner.snapshot.read().clone()
    }

    /// Number of live endpoints.
    pub fn len(&self) -> usize {
        self.inner.live.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Req, Resp> EndpointCache for Endpointer<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + Sync + 'static,
{
    /// Release every live handle and publish an empty snapshot.
    fn close(&self) {
        self.inner.live.lock().clear();
        *self.inner.snapshot.write() = Arc::new(Vec::new());
    }
}
