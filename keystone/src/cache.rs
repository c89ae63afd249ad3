//! Storage for singleton and scoped instances

use crate::{token::Key, utils::lock};
use tokio::sync::OnceCell;
use std::{
    any::Any,
    collections::HashMap,
    sync::{Arc, Mutex},
};

pub(crate) type ArcService = Arc<
    dyn Any
    + Send
    + Sync
>;

/// A single-flight cell: the first resolver initializes it,
/// concurrent resolvers wait for that initialization to finish.
pub(crate) type ServiceCell = Arc<OnceCell<ArcService>>;

#[derive(Clone)]
struct Slot {
    /// Version of the binding the instance is built from
    version: u64,
    cell: ServiceCell,
}

impl Slot {
    #[inline]
    fn new(version: u64) -> Self {
        Self { version, cell: Arc::new(OnceCell::new()) }
    }
}

/// Cache of already created instances keyed by service.
///
/// The root container keeps one for singletons and every scope keeps its own
/// for scoped services. Transient services never land here.
#[derive(Default)]
pub(crate) struct LifecycleCache {
    slots: Mutex<HashMap<Key, Slot>>,
}

impl LifecycleCache {
    /// Returns the cell that holds (or will hold) the instance built from the given binding version.
    ///
    /// A slot built from an older binding is replaced. A resolver that still holds an older
    /// binding than the cached one receives a detached cell, so its instance is never cached.
    pub(crate) fn slot(&self, key: &Key, version: u64) -> ServiceCell {
        let mut slots = lock(&self.slots);
        match slots.get(key) {
            Some(slot) if slot.version == version => slot.cell.clone(),
            Some(slot) if slot.version > version => Slot::new(version).cell,
            _ => {
                let slot = Slot::new(version);
                let cell = slot.cell.clone();
                slots.insert(key.clone(), slot);
                cell
            }
        }
    }

    /// Returns an already constructed instance, if any
    #[cfg(test)]
    pub(crate) fn get(&self, key: &Key) -> Option<ArcService> {
        lock(&self.slots)
            .get(key)
            .and_then(|slot| slot.cell.get().cloned())
    }

    /// Removes a cached instance so the next resolution rebuilds it
    pub(crate) fn evict(&self, key: &Key) -> bool {
        let evicted = lock(&self.slots).remove(key);
        evicted.is_some()
    }

    /// Drops every cached instance
    pub(crate) fn clear(&self) {
        // instances are dropped outside of the lock since their `Drop` may call back into the container
        let slots = std::mem::take(&mut *lock(&self.slots));
        drop(slots);
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        lock(&self.slots).len()
    }
}
