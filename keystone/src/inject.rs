//! Utilities to inject and resolve dependencies

use crate::{error::Error, resolver::Resolver};
use futures_util::future::ready;
use std::future::Future;

/// A trait that adds the ability to inject dependencies when resolving a type from the DI container
///
/// It plays the role of a constructor: [`Binding::constructor`](crate::Binding::constructor)
/// and `register_scoped`/`register_transient` build a service by calling [`Inject::inject`].
///
/// If there is no need to inject other dependencies, the `struct` must implement the `Default` trait
///
/// # Example
/// ```no_run
/// use keystone::ContainerBuilder;
///
/// #[derive(Default, Clone)]
/// struct ScopedService;
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_scoped::<ScopedService>();
/// ```
///
/// If it's required to construct a `struct` from other dependencies, the `Inject` can be implemented manually
///
/// # Example
/// ```no_run
/// use keystone::{ContainerBuilder, Inject, Resolver, error::Error};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct ScopedService;
///
/// struct TransientService {
///     service: Arc<ScopedService>
/// }
///
/// impl Inject for TransientService {
///     async fn inject(resolver: &Resolver) -> Result<Self, Error> {
///         let service = resolver.resolve_shared::<ScopedService>().await?;
///         Ok(Self { service })
///     }
/// }
///
/// let mut builder = ContainerBuilder::new();
/// builder.register_scoped::<ScopedService>();
/// builder.register_transient::<TransientService>();
/// ```
///
/// With the `macros` feature the same implementation can be derived with `#[derive(Inject)]`.
pub trait Inject: Sized + Send + Sync {
    /// Constructs `Self` resolving its dependencies from the given resolver
    fn inject(resolver: &Resolver) -> impl Future<Output = Result<Self, Error>> + Send;
}

impl<T: Default + Send + Sync> Inject for T {
    #[inline]
    fn inject(_: &Resolver) -> impl Future<Output = Result<Self, Error>> + Send {
        ready(Ok(Self::default()))
    }
}
