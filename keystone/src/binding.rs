//! Recipes that describe how a service is produced

use crate::{
    cache::ArcService,
    container::{factory::{AsyncFactory, GenericFactory}, from_resolver::FromResolver},
    dispose::{Dispose, DisposeHook, MakeDisposer, make_disposer},
    error::Error,
    inject::Inject,
    resolver::Resolver,
};
use futures_util::{FutureExt, future::BoxFuture};
use std::{
    fmt::{self, Debug, Display, Formatter},
    marker::PhantomData,
    sync::Arc,
};

/// Describes how long a resolved instance is reused
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// One instance for the whole lifetime of the container
    Singleton,
    /// One instance per scope
    Scoped,
    /// A new instance on every resolution
    #[default]
    Transient,
}

impl Display for Lifecycle {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Lifecycle::Singleton => f.write_str("singleton"),
            Lifecycle::Scoped => f.write_str("scoped"),
            Lifecycle::Transient => f.write_str("transient"),
        }
    }
}

pub(crate) type ResolverFn = Arc<
    dyn Fn(Resolver) -> BoxFuture<'static, Result<ArcService, Error>>
    + Send
    + Sync
>;

pub(crate) enum BindingKind {
    /// A ready-made value
    Instance(ArcService),
    /// A factory function
    Factory(ResolverFn),
    /// A type constructed through [`Inject`]
    Constructor(ResolverFn),
}

/// A typed recipe for producing a service of type `T`
///
/// # Example
/// ```no_run
/// use keystone::{Binding, ContainerBuilder, Lifecycle, Token};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct RequestId(usize);
///
/// static COUNTER: AtomicUsize = AtomicUsize::new(0);
///
/// # fn main() -> Result<(), keystone::error::Error> {
/// let mut builder = ContainerBuilder::new();
/// builder.register(
///     Token::new(),
///     Binding::factory(|| RequestId(COUNTER.fetch_add(1, Ordering::Relaxed)))
///         .with_lifecycle(Lifecycle::Transient)
/// )?;
/// # Ok(())
/// # }
/// ```
pub struct Binding<T> {
    kind: BindingKind,
    lifecycle: Lifecycle,
    disposer: Option<MakeDisposer>,
    _marker: PhantomData<fn() -> T>,
}

impl BindingKind {
    #[inline]
    fn name(&self) -> &'static str {
        match self {
            BindingKind::Instance(_) => "Instance",
            BindingKind::Factory(_) => "Factory",
            BindingKind::Constructor(_) => "Constructor",
        }
    }
}

impl<T> Debug for Binding<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("kind", &self.kind.name())
            .field("lifecycle", &self.lifecycle)
            .field("disposable", &self.disposer.is_some())
            .finish()
    }
}

impl<T: Send + Sync + 'static> Binding<T> {
    #[inline]
    fn new(kind: BindingKind, lifecycle: Lifecycle) -> Self {
        Self { kind, lifecycle, disposer: None, _marker: PhantomData }
    }

    /// Binds a ready-made value. Such a binding is always a singleton.
    #[inline]
    pub fn instance(value: T) -> Self {
        Self::new(BindingKind::Instance(Arc::new(value)), Lifecycle::Singleton)
    }

    /// Binds a synchronous factory. The lifecycle defaults to [`Lifecycle::Transient`].
    #[inline]
    pub fn factory<F, Args>(factory: F) -> Self
    where
        F: GenericFactory<Args, Output = T>,
        Args: FromResolver + 'static,
    {
        Self::new(BindingKind::Factory(make_resolver_fn(factory)), Lifecycle::Transient)
    }

    /// Binds an asynchronous factory. The lifecycle defaults to [`Lifecycle::Transient`].
    #[inline]
    pub fn async_factory<F, Args>(factory: F) -> Self
    where
        F: AsyncFactory<Args, Output = T>,
        Args: FromResolver + 'static,
    {
        Self::new(BindingKind::Factory(make_async_resolver_fn(factory)), Lifecycle::Transient)
    }

    /// Binds a type that constructs itself through [`Inject`].
    /// The lifecycle defaults to [`Lifecycle::Transient`].
    #[inline]
    pub fn constructor() -> Self
    where
        T: Inject,
    {
        let resolver_fn: ResolverFn = Arc::new(|resolver: Resolver| {
            async move {
                T::inject(&resolver)
                    .await
                    .map(|t| Arc::new(t) as ArcService)
            }.boxed()
        });
        Self::new(BindingKind::Constructor(resolver_fn), Lifecycle::Transient)
    }

    /// Sets the lifecycle. Has no effect on an [`instance`](Self::instance) binding.
    #[inline]
    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        if !matches!(self.kind, BindingKind::Instance(_)) {
            self.lifecycle = lifecycle;
        }
        self
    }

    /// Shortcut for `with_lifecycle(Lifecycle::Singleton)`
    #[inline]
    pub fn singleton(self) -> Self {
        self.with_lifecycle(Lifecycle::Singleton)
    }

    /// Shortcut for `with_lifecycle(Lifecycle::Scoped)`
    #[inline]
    pub fn scoped(self) -> Self {
        self.with_lifecycle(Lifecycle::Scoped)
    }

    /// Shortcut for `with_lifecycle(Lifecycle::Transient)`
    #[inline]
    pub fn transient(self) -> Self {
        self.with_lifecycle(Lifecycle::Transient)
    }

    /// Makes the container call [`Dispose::dispose`] on every instance produced by this binding
    #[inline]
    pub fn disposable(mut self) -> Self
    where
        T: Dispose,
    {
        self.disposer = Some(make_disposer::<T>);
        self
    }
}

impl<T> Binding<T> {
    /// Returns the lifecycle of the binding
    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[inline]
    pub(crate) fn erase(self, version: u64) -> ErasedBinding {
        ErasedBinding {
            kind: self.kind,
            lifecycle: self.lifecycle,
            disposer: self.disposer,
            version,
        }
    }
}

/// A type-erased [`Binding`] owned by the registry
pub(crate) struct ErasedBinding {
    pub(crate) kind: BindingKind,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) disposer: Option<MakeDisposer>,
    /// Every registration gets a new version, cached instances of older versions are stale
    pub(crate) version: u64,
}

impl Debug for ErasedBinding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedBinding")
            .field("kind", &self.kind.name())
            .field("lifecycle", &self.lifecycle)
            .field("version", &self.version)
            .finish()
    }
}

impl ErasedBinding {
    /// Returns a disposal hook for a disposable instance binding
    #[inline]
    pub(crate) fn instance_disposer(&self) -> Option<DisposeHook> {
        match (&self.kind, self.disposer) {
            (BindingKind::Instance(value), Some(make)) => make(value, self.lifecycle),
            _ => None,
        }
    }
}

#[inline]
fn make_resolver_fn<T, F, Args>(factory: F) -> ResolverFn
where
    T: Send + Sync + 'static,
    F: GenericFactory<Args, Output = T>,
    Args: FromResolver + 'static,
{
    let factory = Arc::new(factory);
    Arc::new(move |resolver: Resolver| {
        let factory = factory.clone();
        async move {
            let args = Args::from_resolver(&resolver).await?;
            factory.call(args).map(|t| Arc::new(t) as ArcService)
        }.boxed()
    })
}

#[inline]
fn make_async_resolver_fn<T, F, Args>(factory: F) -> ResolverFn
where
    T: Send + Sync + 'static,
    F: AsyncFactory<Args, Output = T>,
    Args: FromResolver + 'static,
{
    let factory = Arc::new(factory);
    Arc::new(move |resolver: Resolver| {
        let factory = factory.clone();
        async move {
            let args = Args::from_resolver(&resolver).await?;
            factory
                .call(args)
                .await
                .map(|t| Arc::new(t) as ArcService)
        }.boxed()
    })
}
