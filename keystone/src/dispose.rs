//! Ordered teardown of disposable services

use crate::{
    binding::Lifecycle,
    cache::ArcService,
    error::{DisposalFailure, Error},
    scope::ScopeId,
    token::Key,
    utils::lock,
};
use futures_util::{FutureExt, future::BoxFuture};
use std::{
    any::Any,
    cmp::Reverse,
    future::Future,
    sync::{Arc, Mutex, Weak},
};

/// A capability of a service that holds resources which must be released explicitly
///
/// A binding opts into it with [`Binding::disposable`](crate::Binding::disposable).
/// The container calls [`Dispose::dispose`] exactly once, when the owning scope
/// or the whole container is disposed. Services are disposed in reverse order of
/// their construction, so a service is always disposed before its dependencies.
///
/// # Example
/// ```no_run
/// use keystone::{Binding, ContainerBuilder, Dispose, Token, error::Error};
///
/// struct Connection;
///
/// impl Dispose for Connection {
///     async fn dispose(&self) -> Result<(), Error> {
///         // close the connection
///         Ok(())
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Error> {
/// let mut builder = ContainerBuilder::new();
/// builder.register(Token::new(), Binding::factory(|| Connection).singleton().disposable())?;
///
/// let container = builder.build();
/// let _conn = container.resolve_shared::<Connection>().await?;
///
/// container.dispose().await
/// # }
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Releases resources held by the service
    fn dispose(&self) -> impl Future<Output = Result<(), Error>> + Send;
}

/// A deferred call of [`Dispose::dispose`]
pub(crate) struct DisposeHook {
    /// `Some` when the hook references the service weakly
    target: Option<Weak<dyn Any + Send + Sync>>,
    call: Box<dyn FnOnce() -> BoxFuture<'static, Result<(), Error>> + Send>,
}

impl DisposeHook {
    /// A hook that keeps the service alive until it is disposed
    pub(crate) fn owned<F>(call: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, Result<(), Error>> + Send + 'static,
    {
        Self { target: None, call: Box::new(call) }
    }

    /// Returns `false` once a weakly referenced service has been dropped
    #[inline]
    fn is_live(&self) -> bool {
        self.target
            .as_ref()
            .is_none_or(|target| target.strong_count() > 0)
    }

    #[inline]
    fn call(self) -> BoxFuture<'static, Result<(), Error>> {
        (self.call)()
    }
}

/// Creates a [`DisposeHook`] for a type-erased service
pub(crate) type MakeDisposer = fn(&ArcService, Lifecycle) -> Option<DisposeHook>;

/// Builds a disposal hook for a service of the given lifecycle.
///
/// Singletons, scoped services and instances are owned by the container, the hook
/// holds them until teardown. A transient belongs to the caller, the hook references
/// it weakly and is skipped once the caller drops it.
pub(crate) fn make_disposer<T: Dispose>(service: &ArcService, lifecycle: Lifecycle) -> Option<DisposeHook> {
    let service = service.clone().downcast::<T>().ok()?;
    if lifecycle != Lifecycle::Transient {
        return Some(DisposeHook::owned(move || {
            async move { service.dispose().await }.boxed()
        }));
    }

    let weak = Arc::downgrade(&service);
    let target: Weak<dyn Any + Send + Sync> = weak.clone();
    Some(DisposeHook {
        target: Some(target),
        call: Box::new(move || {
            async move {
                match weak.upgrade() {
                    Some(service) => service.dispose().await,
                    None => Ok(()),
                }
            }.boxed()
        }),
    })
}

struct DisposalRecord {
    order: u64,
    token: Key,
    scope: Option<ScopeId>,
    hook: DisposeHook,
}

/// Record count that triggers pruning of dropped transients
const PRUNE_THRESHOLD: usize = 64;

#[derive(Default)]
struct Records {
    next: u64,
    prune_at: usize,
    items: Vec<DisposalRecord>,
}

/// Keeps disposable services in construction order and releases them in reverse.
#[derive(Default)]
pub(crate) struct DisposalCoordinator {
    records: Mutex<Records>,
}

impl DisposalCoordinator {
    /// Appends a disposable service.
    ///
    /// `scope` is `None` for services that live as long as the container.
    pub(crate) fn push(&self, token: Key, scope: Option<ScopeId>, hook: DisposeHook) {
        let mut records = lock(&self.records);
        let order = records.next;
        records.next += 1;
        if records.items.len() >= records.prune_at {
            records.items.retain(|record| record.hook.is_live());
            records.prune_at = (records.items.len() * 2).max(PRUNE_THRESHOLD);
        }
        records.items.push(DisposalRecord { order, token, scope, hook });
    }

    /// Disposes records of a single scope or, if `scope` is `None`, every record left.
    ///
    /// Each record is taken out before its hook runs, so it is never disposed twice.
    /// Failures do not stop the teardown, they are collected into
    /// [`Error::DisposalAggregate`] once every hook has run.
    pub(crate) async fn dispose(&self, scope: Option<ScopeId>) -> Result<(), Error> {
        let mut taken = {
            let mut records = lock(&self.records);
            let (taken, kept): (Vec<_>, Vec<_>) = records.items
                .drain(..)
                .partition(|record| scope.is_none() || record.scope == scope);
            records.items = kept;
            taken
        };

        taken.sort_unstable_by_key(|record| Reverse(record.order));

        let mut failures = Vec::new();
        for record in taken {
            #[cfg(feature = "tracing")]
            tracing::trace!(service = %record.token, order = record.order, "disposing service");

            if let Err(error) = record.hook.call().await {
                #[cfg(feature = "tracing")]
                tracing::warn!(service = %record.token, "failed to dispose service: {error}");
                failures.push(DisposalFailure { token: record.token, error });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::DisposalAggregate(failures))
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        lock(&self.records).items.len()
    }
}
