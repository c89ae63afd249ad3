//! Resolution of services and their dependency graphs

use crate::{
    binding::{BindingKind, ErasedBinding, Lifecycle},
    cache::{ArcService, ServiceCell},
    container::Shared,
    error::Error,
    scope::{ScopeId, ScopeState},
    token::{Key, Token},
};
use futures_util::{FutureExt, future::BoxFuture};
use smallvec::SmallVec;
use std::{
    any::type_name,
    borrow::Cow,
    fmt::{self, Debug, Formatter},
    sync::Arc,
};

/// Services that are under construction within one top-level resolution
type ResolutionStack = SmallVec<[Key; 8]>;

/// Context shared by every nested resolution of one top-level `resolve` call
struct ResolutionContext {
    scope: Arc<ScopeState>,
    stack: ResolutionStack,
}

/// A handle that resolves services on behalf of a service under construction
///
/// Factories and [`Inject`](crate::Inject) implementations receive a `Resolver`
/// bound to the current resolution, so nested resolutions share the scope
/// and the stack that is used to detect circular dependencies.
#[derive(Clone)]
pub struct Resolver {
    shared: Arc<Shared>,
    ctx: Arc<ResolutionContext>,
}

impl Debug for Resolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("scope", &self.ctx.scope.id())
            .field("stack", &self.ctx.stack)
            .finish()
    }
}

impl Resolver {
    /// Creates a resolver for a top-level resolution with an empty stack
    #[inline]
    pub(crate) fn new(shared: Arc<Shared>, scope: Arc<ScopeState>) -> Self {
        let ctx = ResolutionContext { scope, stack: ResolutionStack::new() };
        Self { shared, ctx: Arc::new(ctx) }
    }

    /// Creates a resolver for dependencies of `key`
    #[inline]
    fn child(&self, key: &Key) -> Self {
        let mut stack = self.ctx.stack.clone();
        stack.push(key.clone());
        let ctx = ResolutionContext { scope: self.ctx.scope.clone(), stack };
        Self { shared: self.shared.clone(), ctx: Arc::new(ctx) }
    }

    /// Returns the id of the scope this resolution belongs to
    #[inline]
    pub fn scope_id(&self) -> ScopeId {
        self.ctx.scope.id()
    }

    /// Returns services that are currently under construction, outermost first
    #[inline]
    pub fn stack(&self) -> &[Key] {
        &self.ctx.stack
    }

    /// Resolves a service and returns a cloned instance.
    /// `T` must implement [`Clone`] otherwise use [`resolve_shared`](Self::resolve_shared) method
    /// that returns a shared pointer.
    #[inline]
    pub async fn resolve<T: Send + Sync + Clone + 'static>(&self) -> Result<T, Error> {
        self.resolve_shared::<T>()
            .await
            .map(|s| s.as_ref().clone())
    }

    /// Resolves a service and returns a shared pointer
    #[inline]
    pub fn resolve_shared<T: Send + Sync + 'static>(&self) -> impl Future<Output = Result<Arc<T>, Error>> + Send + '_ {
        self.resolve_as::<T>(Key::of::<T>())
    }

    /// Resolves a named service and returns a shared pointer
    #[inline]
    pub fn resolve_named<T: Send + Sync + 'static>(&self, name: impl Into<Cow<'static, str>>) -> impl Future<Output = Result<Arc<T>, Error>> + Send + '_ {
        self.resolve_as::<T>(Key::named::<T>(name))
    }

    /// Resolves a service named by a typed token
    #[inline]
    pub fn resolve_token<T: Send + Sync + 'static>(&self, token: &Token<T>) -> impl Future<Output = Result<Arc<T>, Error>> + Send + '_ {
        self.resolve_as::<T>(token.key().clone())
    }

    async fn resolve_as<T: Send + Sync + 'static>(&self, key: Key) -> Result<Arc<T>, Error> {
        self.resolve_key(key)
            .await?
            .downcast::<T>()
            .map_err(|_| Error::ResolveFailed(type_name::<T>()))
    }

    /// Resolves a type-erased service
    pub(crate) fn resolve_key(&self, key: Key) -> BoxFuture<'_, Result<ArcService, Error>> {
        async move {
            if self.ctx.stack.contains(&key) {
                let mut chain = self.ctx.stack.to_vec();
                chain.push(key);
                return Err(Error::CircularDependency(chain));
            }

            if self.shared.is_disposed() {
                return Err(Error::ContainerDisposed);
            }

            let scope = &self.ctx.scope;
            if scope.is_disposed() {
                return Err(Error::ScopeDisposed(scope.id()));
            }

            let binding = self.shared
                .binding(&key)
                .ok_or_else(|| Error::NotRegistered(key.clone()))?;

            if let BindingKind::Instance(instance) = &binding.kind {
                return Ok(instance.clone());
            }

            match binding.lifecycle {
                Lifecycle::Singleton => {
                    let cell = self.shared.singletons().slot(&key, binding.version);
                    self.resolve_cached(cell, &key, &binding, None).await
                }
                Lifecycle::Scoped => {
                    let cell = scope.cache().slot(&key, binding.version);
                    self.resolve_cached(cell, &key, &binding, Some(scope.id())).await
                }
                Lifecycle::Transient => self.construct(&key, &binding, Some(scope.id())).await,
            }
        }.boxed()
    }

    /// Returns the cached instance or constructs it.
    ///
    /// Concurrent resolvers of the same cell wait for the first one. If construction fails
    /// or the future is dropped the cell stays empty and the next resolver retries.
    async fn resolve_cached(
        &self,
        cell: ServiceCell,
        key: &Key,
        binding: &ErasedBinding,
        owner: Option<ScopeId>,
    ) -> Result<ArcService, Error> {
        if let Some(instance) = cell.get() {
            #[cfg(feature = "tracing")]
            tracing::trace!(service = %key, lifecycle = %binding.lifecycle, "resolved from cache");
            return Ok(instance.clone());
        }

        cell.get_or_try_init(|| self.construct(key, binding, owner))
            .await
            .cloned()
    }

    /// Builds a new instance and hands it over to the disposal coordinator if needed.
    ///
    /// `owner` is the scope whose disposal releases the instance, `None` means the container.
    async fn construct(
        &self,
        key: &Key,
        binding: &ErasedBinding,
        owner: Option<ScopeId>,
    ) -> Result<ArcService, Error> {
        let resolver_fn = match &binding.kind {
            BindingKind::Factory(resolver_fn) | BindingKind::Constructor(resolver_fn) => resolver_fn,
            BindingKind::Instance(instance) => return Ok(instance.clone()),
        };

        let instance = resolver_fn(self.child(key))
            .await
            .map_err(|err| err.within(key))?;

        if let Some(make_disposer) = binding.disposer {
            if let Some(hook) = make_disposer(&instance, binding.lifecycle) {
                self.shared.disposal().push(key.clone(), owner, hook);
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            service = %key,
            lifecycle = %binding.lifecycle,
            scope = %self.ctx.scope.id(),
            "service constructed"
        );

        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Binding, ContainerBuilder, Lifecycle, Resolver, Token, error::Error, token::Key};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[derive(Debug)]
    struct A;
    #[derive(Debug)]
    struct B;
    struct C;

    #[tokio::test]
    async fn it_detects_direct_cycles() {
        let mut builder = ContainerBuilder::new();
        builder.register_transient_factory(|_: Arc<B>| Ok(A));
        builder.register_transient_factory(|_: Arc<A>| Ok(B));
        let container = builder.build();

        let err = container.resolve_shared::<A>().await.unwrap_err();

        match err {
            Error::CircularDependency(chain) => {
                assert_eq!(chain, vec![Key::of::<A>(), Key::of::<B>(), Key::of::<A>()]);
            }
            _ => panic!("Expected CircularDependency error"),
        }
    }

    #[tokio::test]
    async fn it_detects_self_dependency() {
        let mut builder = ContainerBuilder::new();
        builder.register_singleton_factory(|_: Arc<A>| Ok(A));
        let container = builder.build();

        let err = container.resolve_shared::<A>().await.unwrap_err();

        assert!(matches!(err, Error::CircularDependency(chain) if chain == vec![Key::of::<A>(), Key::of::<A>()]));
    }

    #[tokio::test]
    async fn it_detects_indirect_cycles_through_singletons() {
        let mut builder = ContainerBuilder::new();
        builder.register_singleton_factory(|_: Arc<B>| Ok(A));
        builder.register_scoped_factory(|_: Arc<C>| Ok(B));
        builder.register_transient_factory(|_: Arc<A>| Ok(C));
        let container = builder.build();

        let err = container.resolve_shared::<B>().await.unwrap_err();

        assert!(matches!(
            err,
            Error::CircularDependency(chain) if chain == vec![Key::of::<B>(), Key::of::<C>(), Key::of::<A>(), Key::of::<B>()]
        ));
    }

    #[tokio::test]
    async fn it_allows_diamond_dependencies() {
        struct Top;
        struct Left;
        struct Right;

        let mut builder = ContainerBuilder::new();
        builder.register_singleton_factory(|| C);
        builder.register_transient_factory(|_: Arc<C>| Ok(Left));
        builder.register_transient_factory(|_: Arc<C>| Ok(Right));
        builder.register_transient_factory(|_: Arc<Left>, _: Arc<Right>| Ok(Top));
        let container = builder.build();

        assert!(container.resolve_shared::<Top>().await.is_ok());
    }

    #[tokio::test]
    async fn it_shares_the_stack_with_nested_resolvers() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_in_factory = seen.clone();

        let mut builder = ContainerBuilder::new();
        builder.register_transient_factory(move |r: Resolver| {
            seen_in_factory.lock().unwrap().extend(r.stack().iter().cloned());
            Ok(C)
        });
        builder.register_transient_factory(|_: Arc<C>| Ok(B));
        let container = builder.build();

        container.resolve_shared::<B>().await.unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![Key::of::<B>(), Key::of::<C>()]);
    }

    #[tokio::test]
    async fn it_passes_nested_resolution_errors_through() {
        let mut builder = ContainerBuilder::new();
        builder.register_transient_factory(|_: Arc<B>| Ok(A));
        let container = builder.build();

        let err = container.resolve_shared::<A>().await.unwrap_err();

        assert!(matches!(err, Error::NotRegistered(key) if key == Key::of::<B>()));
    }

    #[tokio::test]
    async fn it_does_not_cache_failed_singletons() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();

        let mut builder = ContainerBuilder::new();
        builder.register(
            Token::<A>::new(),
            Binding::factory(move |_: ()| {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::Other("not ready yet"))
                } else {
                    Ok(A)
                }
            })
            .with_lifecycle(Lifecycle::Singleton),
        ).unwrap();
        let container = builder.build();

        let err = container.resolve_shared::<A>().await.unwrap_err();
        assert!(matches!(err, Error::Construction { .. }));

        let first = container.resolve_shared::<A>().await.unwrap();
        let second = container.resolve_shared::<A>().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
