//! Registry of service bindings

use crate::{
    binding::{Binding, ErasedBinding},
    error::Error,
    token::Key,
};
use indexmap::IndexMap;
use std::sync::Arc;

/// Defines what happens when a service is registered again after the container is built
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// The new binding replaces the old one and cached instances of the old one are evicted.
    ///
    /// Useful to substitute services with mocks in tests.
    #[default]
    Replace,
    /// Registration of an already registered service fails with [`Error::AlreadyRegistered`]
    Reject,
}

/// Maps keys to bindings, preserving the registration order
#[derive(Default)]
pub(crate) struct Registry {
    bindings: IndexMap<Key, Arc<ErasedBinding>>,
    version: u64,
    policy: OverwritePolicy,
}

impl Registry {
    #[inline]
    pub(crate) fn set_policy(&mut self, policy: OverwritePolicy) {
        self.policy = policy;
    }

    /// Registers a binding honoring the [`OverwritePolicy`].
    ///
    /// Returns the registered binding and whether it replaced another one.
    pub(crate) fn insert<T>(&mut self, key: Key, binding: Binding<T>) -> Result<(Arc<ErasedBinding>, bool), Error> {
        key.validate()?;
        if self.policy == OverwritePolicy::Reject && self.bindings.contains_key(&key) {
            return Err(Error::AlreadyRegistered(key));
        }
        Ok(self.put(key, binding))
    }

    /// Registers a binding replacing the existing one, if any
    pub(crate) fn replace<T>(&mut self, key: Key, binding: Binding<T>) -> Result<(Arc<ErasedBinding>, bool), Error> {
        key.validate()?;
        Ok(self.put(key, binding))
    }

    fn put<T>(&mut self, key: Key, binding: Binding<T>) -> (Arc<ErasedBinding>, bool) {
        self.version += 1;
        let binding = Arc::new(binding.erase(self.version));
        let replaced = self.bindings
            .insert(key, binding.clone())
            .is_some();
        (binding, replaced)
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key) -> Option<Arc<ErasedBinding>> {
        self.bindings.get(key).cloned()
    }

    #[inline]
    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.bindings.contains_key(key)
    }

    /// Returns registered keys in registration order
    #[inline]
    pub(crate) fn keys(&self) -> Vec<Key> {
        self.bindings.keys().cloned().collect()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
