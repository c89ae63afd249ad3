//! Extractors for fetching factory arguments from DI container

use super::Error;
use crate::{resolver::Resolver, token::Key};
use futures_util::future::ready;
use std::{future::Future, sync::Arc};

/// A trait that defines how to extract the `Self` from DI container
/// while another service is being constructed
pub trait FromResolver: Sized + Send + Sync {
    /// Extracts `Self` from DI container
    fn from_resolver(resolver: &Resolver) -> impl Future<Output = Result<Self, Error>> + Send;
}

impl FromResolver for Resolver {
    #[inline]
    fn from_resolver(resolver: &Resolver) -> impl Future<Output = Result<Self, Error>> + Send {
        ready(Ok(resolver.clone()))
    }
}

impl FromResolver for () {
    #[inline]
    fn from_resolver(_: &Resolver) -> impl Future<Output = Result<Self, Error>> + Send {
        ready(Ok(()))
    }
}

impl<T: Send + Sync + 'static> FromResolver for Arc<T> {
    #[inline]
    fn from_resolver(resolver: &Resolver) -> impl Future<Output = Result<Self, Error>> + Send {
        resolver.resolve_shared::<T>()
    }
}

/// Resolves to `None` if the service itself is not registered.
///
/// Missing dependencies of a registered service are still reported as errors.
impl<T: Send + Sync + 'static> FromResolver for Option<Arc<T>> {
    fn from_resolver(resolver: &Resolver) -> impl Future<Output = Result<Self, Error>> + Send {
        async move {
            match resolver.resolve_shared::<T>().await {
                Ok(service) => Ok(Some(service)),
                Err(Error::NotRegistered(key)) if key == Key::of::<T>() => Ok(None),
                Err(err) => Err(err),
            }
        }
    }
}

macro_rules! define_generic_from_resolver {
    ($($T: ident),*) => {
        impl<$($T: FromResolver),+> FromResolver for ($($T,)+) {
            #[inline]
            #[allow(non_snake_case)]
            fn from_resolver(resolver: &Resolver) -> impl Future<Output = Result<Self, Error>> + Send {
                async move {
                    let tuple = (
                        $(
                        $T::from_resolver(resolver).await?,
                        )*
                    );
                    Ok(tuple)
                }
            }
        }
    }
}

define_generic_from_resolver! { T1 }
define_generic_from_resolver! { T1, T2 }
define_generic_from_resolver! { T1, T2, T3 }
define_generic_from_resolver! { T1, T2, T3, T4 }
define_generic_from_resolver! { T1, T2, T3, T4, T5 }
