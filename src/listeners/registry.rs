//! # Listener registry: scoped and global fan-out of task events.
//!
//! ## Architecture
//! ```text
//! notify_*(event)
//!     │
//!     ├─► snapshot()  (Arc clone under a short read lock)
//!     │
//!     ├─► scoped[event.task_type] ──► listener.on_*()   (each isolated)
//!     └─► global                  ──► listener.on_*()   (each isolated)
//! ```
//!
//! ## Rules
//! - **Copy-on-write**: add/remove clone the current listener sets, modify the
//!   clone and swap it in. A notification in progress keeps iterating its own
//!   snapshot and never sees a half-updated set.
//! - **Non-blocking registration**: writers only wait for the pointer swap,
//!   never for a fan-out in progress.
//! - **Set semantics**: a listener is identified by its `Arc` allocation;
//!   adding it twice to the same scope is a no-op.
//! - **Order**: type-scoped listeners first, then global ones, each in
//!   registration order.
//! - **Isolation**: a panicking listener is logged and skipped.
//! - **Batches**: `notify_tasks_removed` groups events by task type; a scoped
//!   listener gets only its subset, a global listener gets the whole batch.
//!   Each receives a single call.

use std::collections::BTreeMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;

use crate::events::TaskEvent;
use crate::listeners::TaskListener;
use crate::status::TaskType;

/// Shared handle to a listener.
pub type ListenerRef = Arc<dyn TaskListener>;

#[derive(Default, Clone)]
struct Listeners {
    global: Vec<ListenerRef>,
    scoped: BTreeMap<TaskType, Vec<ListenerRef>>,
}

fn same(a: &ListenerRef, b: &ListenerRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn insert_unique(set: &mut Vec<ListenerRef>, listener: &ListenerRef) -> bool {
    if set.iter().any(|l| same(l, listener)) {
        return false;
    }
    set.push(Arc::clone(listener));
    true
}

/// Explicitly owned pub/sub hub for [`TaskEvent`]s.
///
/// Create one per application (or per test), share it as `Arc<ListenerRegistry>`
/// with every executor, and call [`clear`](Self::clear) on teardown.
#[derive(Default)]
pub struct ListenerRegistry {
    current: RwLock<Arc<Listeners>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self) -> Arc<Listeners> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Listeners) -> R) -> R {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Listeners::clone(&guard);
        let out = f(&mut next);
        *guard = Arc::new(next);
        out
    }

    /// Subscribes `listener` to events of every task type.
    ///
    /// Returns `false` if it was already subscribed globally.
    pub fn add_listener(&self, listener: ListenerRef) -> bool {
        self.mutate(|l| insert_unique(&mut l.global, &listener))
    }

    /// Subscribes `listener` to events of `task_type` only.
    ///
    /// Returns `false` if it was already subscribed to that type.
    pub fn add_listener_for(&self, listener: ListenerRef, task_type: TaskType) -> bool {
        self.mutate(|l| insert_unique(l.scoped.entry(task_type).or_default(), &listener))
    }

    /// Unsubscribes `listener` from the global scope and every type scope.
    ///
    /// Empty type buckets are pruned. Returns whether anything was removed.
    pub fn remove_listener(&self, listener: &ListenerRef) -> bool {
        self.mutate(|l| {
            let before = l.global.len() + l.scoped.values().map(Vec::len).sum::<usize>();
            l.global.retain(|x| !same(x, listener));
            for set in l.scoped.values_mut() {
                set.retain(|x| !same(x, listener));
            }
            l.scoped.retain(|_, set| !set.is_empty());
            let after = l.global.len() + l.scoped.values().map(Vec::len).sum::<usize>();
            before != after
        })
    }

    /// Drops every subscription. Intended for shutdown and test teardown.
    pub fn clear(&self) {
        self.mutate(|l| *l = Listeners::default());
    }

    /// Number of global subscriptions.
    pub fn global_count(&self) -> usize {
        self.snapshot().global.len()
    }

    /// Number of subscriptions scoped to `task_type`.
    pub fn scoped_count(&self, task_type: TaskType) -> usize {
        self.snapshot()
            .scoped
            .get(&task_type)
            .map_or(0, Vec::len)
    }

    /// Task types that currently have at least one scoped listener.
    pub fn scoped_types(&self) -> Vec<TaskType> {
        self.snapshot().scoped.keys().copied().collect()
    }

    pub async fn notify_task_added(&self, event: &TaskEvent) {
        let snap = self.snapshot();
        for l in snap.targets(event.task_type()) {
            guarded(l, "on_task_added", l.on_task_added(event)).await;
        }
    }

    pub async fn notify_task_status_changed(&self, event: &TaskEvent) {
        let snap = self.snapshot();
        for l in snap.targets(event.task_type()) {
            guarded(l, "on_task_status_changed", l.on_task_status_changed(event)).await;
        }
    }

    pub async fn notify_tasks_removed(&self, events: &[TaskEvent]) {
        if events.is_empty() {
            return;
        }
        let snap = self.snapshot();

        let mut by_type: BTreeMap<TaskType, Vec<TaskEvent>> = BTreeMap::new();
        for ev in events {
            by_type.entry(ev.task_type()).or_default().push(ev.clone());
        }
        for (task_type, subset) in &by_type {
            for l in snap.scoped.get(task_type).into_iter().flatten() {
                guarded(l, "on_tasks_removed", l.on_tasks_removed(subset)).await;
            }
        }
        for l in &snap.global {
            guarded(l, "on_tasks_removed", l.on_tasks_removed(events)).await;
        }
    }
}

impl Listeners {
    /// Scoped listeners for `task_type`, then global ones.
    fn targets(&self, task_type: TaskType) -> impl Iterator<Item = &ListenerRef> {
        self.scoped
            .get(&task_type)
            .into_iter()
            .flatten()
            .chain(self.global.iter())
    }
}

/// Awaits one listener hook, converting a panic into a log line.
async fn guarded<F>(listener: &ListenerRef, hook: &'static str, fut: F)
where
    F: Future<Output = ()>,
{
    if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
        let info = if let Some(msg) = panic.downcast_ref::<&'static str>() {
            (*msg).to_string()
        } else if let Some(msg) = panic.downcast_ref::<String>() {
            msg.clone()
        } else {
            "unknown panic".to_string()
        };
        tracing::warn!(listener = listener.name(), hook, %info, "listener panicked");
    }
}
