//! Units of work that own scoped instances

use crate::cache::LifecycleCache;
use std::{
    fmt::{self, Display, Formatter},
    sync::atomic::{AtomicBool, Ordering},
};

/// Identifies a scope created by [`Container::create_scope`](crate::Container::create_scope)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u64);

impl ScopeId {
    #[inline]
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw numeric value of the scope id
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Display for ScopeId {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of one scope: its scoped instances and whether it is still alive
pub(crate) struct ScopeState {
    id: ScopeId,
    cache: LifecycleCache,
    disposed: AtomicBool,
}

impl ScopeState {
    #[inline]
    pub(crate) fn new(id: ScopeId) -> Self {
        Self {
            id,
            cache: LifecycleCache::default(),
            disposed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> ScopeId {
        self.id
    }

    #[inline]
    pub(crate) fn cache(&self) -> &LifecycleCache {
        &self.cache
    }

    #[inline]
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Marks the scope as disposed, returns `false` if it already was
    #[inline]
    pub(crate) fn close(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }
}
