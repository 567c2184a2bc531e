//! Time-boxed visual effects (highlight, hover).
//!
//! Each `(target, kind)` pair owns one slot. Starting an effect on an occupied
//! slot aborts the pending cleanup task and runs its cleanup immediately, so
//! the new effect always starts from the unaffected state and only one timer
//! per slot is ever live.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::host::{ElementHandle, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Highlight,
    Hover,
}

type Cleanup = Box<dyn FnOnce() + Send + 'static>;
type SharedCleanup = Arc<Mutex<Option<Cleanup>>>;

struct Slot {
    generation: u64,
    cleanup: SharedCleanup,
    task: Option<JoinHandle<()>>,
}

impl Slot {
    fn settle(self) {
        if let Some(task) = self.task {
            task.abort();
        }
        if let Some(cleanup) = self.cleanup.lock().take() {
            cleanup();
        }
    }
}

type Slots = Arc<Mutex<HashMap<(NodeId, EffectKind), Slot>>>;

#[derive(Clone, Default)]
pub struct ActiveEffects {
    slots: Slots,
    generation: Arc<AtomicU64>,
}

impl ActiveEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settles any effect of the same kind on `target`, applies the new one,
    /// and schedules its cleanup after `duration`. Returns whether a previous
    /// effect was superseded.
    ///
    /// The whole replacement runs under the slots lock, so concurrent starts on
    /// one slot are serialised and every applied effect is eventually settled.
    /// `apply` and the cleanup it returns must not call back into this registry.
    pub fn start<A, C>(
        &self,
        target: &ElementHandle,
        kind: EffectKind,
        duration: Duration,
        apply: A,
    ) -> bool
    where
        A: FnOnce() -> C,
        C: FnOnce() + Send + 'static,
    {
        let key = (target.node_id(), kind);
        let mut slots = self.slots.lock();
        let previous = slots.remove(&key);
        let superseded = previous.is_some();
        if let Some(slot) = previous {
            slot.settle();
        }

        let boxed: Cleanup = Box::new(apply());
        let cleanup: SharedCleanup = Arc::new(Mutex::new(Some(boxed)));
        let generation = self.generation.fetch_add(1, Ordering::Relaxed);

        let task = match Handle::try_current() {
            Ok(handle) => {
                let shared = Arc::clone(&self.slots);
                let pending = Arc::clone(&cleanup);
                Some(handle.spawn(async move {
                    tokio::time::sleep(duration).await;
                    let expired = {
                        let mut slots = shared.lock();
                        match slots.get(&key) {
                            Some(slot) if slot.generation == generation => slots.remove(&key),
                            _ => None,
                        }
                    };
                    if expired.is_some() {
                        if let Some(cleanup) = pending.lock().take() {
                            cleanup();
                        }
                    }
                }))
            }
            Err(_) => {
                warn!(
                    target = "helm::effects",
                    node = key.0.0,
                    ?kind,
                    "no async runtime; effect cleanup will not be scheduled"
                );
                None
            }
        };

        debug!(
            target = "helm::effects",
            node = key.0.0,
            ?kind,
            ?duration,
            superseded,
            "effect started"
        );
        slots.insert(
            key,
            Slot {
                generation,
                cleanup,
                task,
            },
        );
        superseded
    }

    /// Ends the effect now, running its cleanup. Returns false if none was active.
    pub fn cancel(&self, target: &ElementHandle, kind: EffectKind) -> bool {
        let slot = self.slots.lock().remove(&(target.node_id(), kind));
        match slot {
            Some(slot) => {
                slot.settle();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, target: &ElementHandle, kind: EffectKind) -> bool {
        self.slots.lock().contains_key(&(target.node_id(), kind))
    }

    pub fn pending(&self) -> usize {
        self.slots.lock().len()
    }
}
