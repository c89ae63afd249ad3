//! Dependency Injection container and tools

use crate::{
    binding::{Binding, Lifecycle},
    cache::LifecycleCache,
    dispose::{DisposalCoordinator, DisposeHook},
    error::Error,
    inject::Inject,
    registry::{OverwritePolicy, Registry},
    resolver::Resolver,
    scope::{ScopeId, ScopeState},
    token::{Key, Token},
    utils::{lock, read, write},
};
use std::{
    borrow::Cow,
    collections::HashMap,
    fmt::{self, Debug, Formatter},
    sync::{
        Arc, Mutex, RwLock, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

pub use self::{
    factory::{AsyncFactory, GenericFactory},
    from_resolver::FromResolver,
};

pub mod factory;
pub mod from_resolver;

/// State shared by the root container and all of its scopes
pub(crate) struct Shared {
    registry: RwLock<Registry>,
    singletons: LifecycleCache,
    disposal: DisposalCoordinator,
    /// Scopes created by [`Container::create_scope`] that are not disposed yet
    scopes: Mutex<HashMap<ScopeId, Weak<ScopeState>>>,
    next_scope: AtomicU64,
    disposed: AtomicBool,
}

impl Shared {
    fn new(registry: Registry) -> Self {
        Self {
            registry: RwLock::new(registry),
            singletons: LifecycleCache::default(),
            disposal: DisposalCoordinator::default(),
            scopes: Mutex::new(HashMap::new()),
            next_scope: AtomicU64::new(1),
            disposed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn binding(&self, key: &Key) -> Option<Arc<crate::binding::ErasedBinding>> {
        read(&self.registry).get(key)
    }

    #[inline]
    pub(crate) fn singletons(&self) -> &LifecycleCache {
        &self.singletons
    }

    #[inline]
    pub(crate) fn disposal(&self) -> &DisposalCoordinator {
        &self.disposal
    }

    #[inline]
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    #[inline]
    fn next_scope_id(&self) -> ScopeId {
        ScopeId::new(self.next_scope.fetch_add(1, Ordering::Relaxed))
    }
}

/// Represents a DI container builder,
/// that is able to add/register dependencies with a specific lifetimes.
pub struct ContainerBuilder {
    /// Configurable registry of dependencies
    registry: Registry,
    /// Disposers of disposable instances in registration order
    instance_disposers: Vec<(Key, DisposeHook)>,
}

impl Debug for ContainerBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("services", &self.registry.len())
            .finish()
    }
}

impl Default for ContainerBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    /// Creates a new DI container builder
    #[inline]
    pub fn new() -> Self {
        Self {
            registry: Registry::default(),
            instance_disposers: Vec::new(),
        }
    }

    /// Configures what happens when a service is registered again in a built container
    ///
    /// Default: [`OverwritePolicy::Replace`]
    pub fn with_overwrite_policy(mut self, policy: OverwritePolicy) -> Self {
        self.registry.set_policy(policy);
        self
    }

    /// Build a DI container
    pub fn build(self) -> Container {
        let shared = Shared::new(self.registry);
        for (key, hook) in self.instance_disposers {
            shared.disposal.push(key, None, hook);
        }
        Container { shared: Arc::new(shared), scope: None }
    }

    /// Registers a binding under the given token.
    ///
    /// While the container is being built a later registration always replaces an earlier one.
    pub fn register<T: Send + Sync + 'static>(&mut self, token: Token<T>, binding: Binding<T>) -> Result<(), Error> {
        let (binding, _) = self.registry.replace(token.key().clone(), binding)?;
        if let Some(hook) = binding.instance_disposer() {
            self.instance_disposers.push((token.into_key(), hook));
        }
        Ok(())
    }

    /// Registers a ready-made value under the given token
    #[inline]
    pub fn register_instance<T: Send + Sync + 'static>(&mut self, token: Token<T>, instance: T) -> Result<(), Error> {
        self.register(token, Binding::instance(instance))
    }

    /// Register a singleton service
    #[inline]
    pub fn register_singleton<T: Send + Sync + 'static>(&mut self, instance: T) {
        self.register_typed(Binding::instance(instance));
    }

    /// Register a singleton service that is lazily created by the factory
    #[inline]
    pub fn register_singleton_factory<T, F, Args>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        F: GenericFactory<Args, Output = T>,
        Args: FromResolver + 'static
    {
        self.register_typed(Binding::factory(factory).singleton());
    }

    /// Register a singleton service that is lazily created by the asynchronous factory
    #[inline]
    pub fn register_singleton_async_factory<T, F, Args>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        F: AsyncFactory<Args, Output = T>,
        Args: FromResolver + 'static
    {
        self.register_typed(Binding::async_factory(factory).singleton());
    }

    /// Register a scoped service
    #[inline]
    pub fn register_scoped_factory<T, F, Args>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        F: GenericFactory<Args, Output = T>,
        Args: FromResolver + 'static
    {
        self.register_typed(Binding::factory(factory).scoped());
    }

    /// Register a scoped service created by the asynchronous factory
    #[inline]
    pub fn register_scoped_async_factory<T, F, Args>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        F: AsyncFactory<Args, Output = T>,
        Args: FromResolver + 'static
    {
        self.register_typed(Binding::async_factory(factory).scoped());
    }

    /// Register a scoped service that required to be resolved as [`Default`]
    #[inline]
    pub fn register_scoped_default<T>(&mut self)
    where
        T: Default + Send + Sync + 'static
    {
        self.register_scoped_factory(T::default);
    }

    /// Register a scoped service that required to be resolved as [`Inject`]
    #[inline]
    pub fn register_scoped<T: Inject + 'static>(&mut self) {
        self.register_typed(Binding::<T>::constructor().scoped());
    }

    /// Register a transient service
    #[inline]
    pub fn register_transient_factory<T, F, Args>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        F: GenericFactory<Args, Output = T>,
        Args: FromResolver + 'static
    {
        self.register_typed(Binding::factory(factory));
    }

    /// Register a transient service created by the asynchronous factory
    #[inline]
    pub fn register_transient_async_factory<T, F, Args>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        F: AsyncFactory<Args, Output = T>,
        Args: FromResolver + 'static
    {
        self.register_typed(Binding::async_factory(factory));
    }

    /// Register a transient service that required to be resolved as [`Default`]
    #[inline]
    pub fn register_transient_default<T>(&mut self)
    where
        T: Default + Send + Sync + 'static
    {
        self.register_transient_factory(T::default);
    }

    /// Register a transient service that required to be resolved as [`Inject`]
    #[inline]
    pub fn register_transient<T: Inject + 'static>(&mut self) {
        self.register_typed(Binding::<T>::constructor());
    }

    #[inline]
    fn register_typed<T: Send + Sync + 'static>(&mut self, binding: Binding<T>) {
        let registered = self.register(Token::<T>::new(), binding);
        debug_assert!(registered.is_ok(), "a type token has no name, so it is always valid");
    }
}

/// Represents a DI container, that is able to resolve generic dependencies
///
/// Cloning is cheap, clones share registrations, singletons and disposables.
/// A container created by [`create_scope`](Container::create_scope) additionally
/// owns its scoped instances.
///
/// # Example
/// ```no_run
/// use keystone::ContainerBuilder;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct Logger { id: usize }
/// struct RequestId { id: usize }
///
/// static COUNTER: AtomicUsize = AtomicUsize::new(0);
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), keystone::error::Error> {
/// let mut builder = ContainerBuilder::new();
/// builder.register_singleton_factory(|| Logger { id: COUNTER.fetch_add(1, Ordering::SeqCst) });
/// builder.register_transient_factory(|| RequestId { id: COUNTER.fetch_add(1, Ordering::SeqCst) });
///
/// let container = builder.build();
///
/// let a = container.resolve_shared::<Logger>().await?;
/// let b = container.resolve_shared::<Logger>().await?;
/// assert_eq!(a.id, b.id);
///
/// let a = container.resolve_shared::<RequestId>().await?;
/// let b = container.resolve_shared::<RequestId>().await?;
/// assert_ne!(a.id, b.id);
///
/// container.dispose().await
/// # }
/// ```
#[derive(Clone)]
pub struct Container {
    shared: Arc<Shared>,
    /// `None` for the root container
    scope: Option<Arc<ScopeState>>,
}

impl Debug for Container {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("scope", &self.scope_id())
            .field("services", &self.len())
            .field("singletons", &self.shared.singletons.len())
            .field("disposables", &self.shared.disposal.len())
            .finish()
    }
}

impl Container {
    /// Creates a new child dependency-injection scope that inherits all service
    /// registrations from its parent:
    ///
    /// - **Singleton** services are shared: the child scope reuses the root
    ///   singleton instances.
    /// - **Scoped** services are isolated: they are lazily created the first time
    ///   they are resolved within this scope and released by [`dispose`](Container::dispose).
    /// - **Transient** services preserve their lifetime semantics: each resolution
    ///   returns a newly constructed instance.
    ///
    /// This method is typically used to create request-level or operation-level
    /// scopes. Calling it on a scope creates a sibling scope.
    pub fn create_scope(&self) -> Self {
        let state = Arc::new(ScopeState::new(self.shared.next_scope_id()));
        {
            let mut scopes = lock(&self.shared.scopes);
            scopes.retain(|_, scope| scope.strong_count() > 0);
            scopes.insert(state.id(), Arc::downgrade(&state));
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(scope = %state.id(), "scope created");

        Self { shared: self.shared.clone(), scope: Some(state) }
    }

    /// Returns the id of this scope or `None` for the root container
    #[inline]
    pub fn scope_id(&self) -> Option<ScopeId> {
        self.scope.as_ref().map(|scope| scope.id())
    }

    /// Returns a resolver for a new top-level resolution.
    ///
    /// On the root container every resolver gets its own short-lived scope,
    /// so scoped services resolved from the root are not shared between calls.
    pub fn resolver(&self) -> Resolver {
        let scope = match &self.scope {
            Some(scope) => scope.clone(),
            None => Arc::new(ScopeState::new(self.shared.next_scope_id())),
        };
        Resolver::new(self.shared.clone(), scope)
    }

    /// Resolves a service and returns a cloned instance.
    /// `T` must implement [`Clone`] otherwise use [`resolve_shared`](Self::resolve_shared) method
    /// that returns a shared pointer.
    #[inline]
    pub async fn resolve<T: Send + Sync + Clone + 'static>(&self) -> Result<T, Error> {
        self.resolver().resolve::<T>().await
    }

    /// Resolves a service and returns a shared pointer
    #[inline]
    pub async fn resolve_shared<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, Error> {
        self.resolver().resolve_shared::<T>().await
    }

    /// Resolves a named service and returns a shared pointer
    #[inline]
    pub async fn resolve_named<T: Send + Sync + 'static>(&self, name: impl Into<Cow<'static, str>>) -> Result<Arc<T>, Error> {
        self.resolver().resolve_named::<T>(name).await
    }

    /// Resolves a service named by a typed token
    #[inline]
    pub async fn resolve_token<T: Send + Sync + 'static>(&self, token: &Token<T>) -> Result<Arc<T>, Error> {
        self.resolver().resolve_token(token).await
    }

    /// Checks whether a service is registered under the given key
    #[inline]
    pub fn has(&self, key: &Key) -> bool {
        read(&self.shared.registry).contains(key)
    }

    /// Checks whether a service of type `T` is registered
    #[inline]
    pub fn contains<T: 'static>(&self) -> bool {
        self.has(&Key::of::<T>())
    }

    /// Returns registered keys in registration order
    #[inline]
    pub fn keys(&self) -> Vec<Key> {
        read(&self.shared.registry).keys()
    }

    /// Returns the number of registered services
    #[inline]
    pub fn len(&self) -> usize {
        read(&self.shared.registry).len()
    }

    /// Returns `true` if no service is registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        read(&self.shared.registry).is_empty()
    }

    /// Registers a binding in a built container.
    ///
    /// Depending on the [`OverwritePolicy`] an existing binding is either replaced or
    /// the registration fails. When replaced, a cached singleton of the old binding is evicted
    /// and scoped instances of the old binding are no longer handed out. Instances that were
    /// already resolved are not affected.
    pub fn register<T: Send + Sync + 'static>(&self, token: Token<T>, binding: Binding<T>) -> Result<(), Error> {
        if self.shared.is_disposed() {
            return Err(Error::ContainerDisposed);
        }

        let key = token.into_key();
        let (binding, replaced) = write(&self.shared.registry).insert(key.clone(), binding)?;

        if replaced {
            self.shared.singletons.evict(&key);

            #[cfg(feature = "tracing")]
            tracing::debug!(service = %key, lifecycle = %binding.lifecycle, "service binding replaced");
        }

        if let Some(hook) = binding.instance_disposer() {
            self.shared.disposal.push(key, None, hook);
        }
        Ok(())
    }

    /// Binds a ready-made value as a singleton
    #[inline]
    pub fn register_instance<T: Send + Sync + 'static>(&self, token: Token<T>, instance: T) -> Result<(), Error> {
        self.register(token, Binding::instance(instance))
    }

    /// Binds a factory with the given lifecycle
    #[inline]
    pub fn register_factory<T, F, Args>(&self, token: Token<T>, factory: F, lifecycle: Lifecycle) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        F: GenericFactory<Args, Output = T>,
        Args: FromResolver + 'static
    {
        self.register(token, Binding::factory(factory).with_lifecycle(lifecycle))
    }

    /// Binds an asynchronous factory with the given lifecycle
    #[inline]
    pub fn register_async_factory<T, F, Args>(&self, token: Token<T>, factory: F, lifecycle: Lifecycle) -> Result<(), Error>
    where
        T: Send + Sync + 'static,
        F: AsyncFactory<Args, Output = T>,
        Args: FromResolver + 'static
    {
        self.register(token, Binding::async_factory(factory).with_lifecycle(lifecycle))
    }

    /// Binds a type that constructs itself through [`Inject`] with the given lifecycle
    #[inline]
    pub fn register_class<T: Inject + 'static>(&self, token: Token<T>, lifecycle: Lifecycle) -> Result<(), Error> {
        self.register(token, Binding::constructor().with_lifecycle(lifecycle))
    }

    /// Resolves every registered service once, so configuration errors surface at startup.
    ///
    /// Resolution happens in a temporary scope that is disposed afterwards.
    /// Singletons stay cached, so this also warms the container up.
    pub async fn validate(&self) -> Result<(), Error> {
        let keys = self.keys();
        let scope = self.create_scope();
        let resolver = scope.resolver();

        let mut result = Ok(());
        for key in keys {
            if let Err(err) = resolver.resolve_key(key).await {
                result = Err(err);
                break;
            }
        }

        let disposed = scope.dispose().await;
        result.and(disposed)
    }

    /// Tears down this scope or, if called on the root container, the whole container.
    ///
    /// Disposable services are disposed in reverse order of their construction.
    /// Each one is disposed at most once, so repeated calls are no-ops.
    /// Failures of individual disposers don't stop the teardown and are reported
    /// together as [`Error::DisposalAggregate`].
    pub async fn dispose(&self) -> Result<(), Error> {
        match &self.scope {
            Some(scope) => self.dispose_scope_state(scope).await,
            None => self.dispose_root().await,
        }
    }

    /// Tears down a single scope by its id.
    ///
    /// Disposables of a scope whose handles are already dropped are released as well.
    pub async fn dispose_scope(&self, id: ScopeId) -> Result<(), Error> {
        let scope = lock(&self.shared.scopes)
            .get(&id)
            .and_then(Weak::upgrade);
        match scope {
            Some(scope) => self.dispose_scope_state(&scope).await,
            None => self.shared.disposal.dispose(Some(id)).await,
        }
    }

    async fn dispose_scope_state(&self, scope: &ScopeState) -> Result<(), Error> {
        if !scope.close() {
            return Ok(());
        }
        lock(&self.shared.scopes).remove(&scope.id());

        #[cfg(feature = "tracing")]
        tracing::debug!(scope = %scope.id(), "disposing scope");

        let result = self.shared.disposal.dispose(Some(scope.id())).await;
        scope.cache().clear();
        result
    }

    async fn dispose_root(&self) -> Result<(), Error> {
        if self.shared.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        #[cfg(feature = "tracing")]
        tracing::info!(disposables = self.shared.disposal.len(), "disposing container");

        let scopes = lock(&self.shared.scopes)
            .drain()
            .filter_map(|(_, scope)| scope.upgrade())
            .collect::<Vec<_>>();
        for scope in &scopes {
            scope.close();
        }

        let result = self.shared.disposal.dispose(None).await;

        for scope in scopes {
            scope.cache().clear();
        }
        self.shared.singletons.clear();
        result
    }
}
