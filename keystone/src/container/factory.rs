//! Generic factories for resolving types

use super::Error;
use std::future::Future;

/// A trait that describes a generic factory function
/// that can resolve objects registered in DI container
pub trait GenericFactory<Args>: Send + Sync + 'static {
    /// A type of object that will be resolved
    type Output;

    /// Calls a generic function and returns either resolved object or error
    fn call(&self, args: Args) -> Result<Self::Output, Error>;
}

/// A trait that describes an asynchronous factory function,
/// e.g. one that opens a connection before the service can be used
pub trait AsyncFactory<Args>: Send + Sync + 'static {
    /// A type of object that will be resolved
    type Output;

    /// Calls a generic function and returns a future of either resolved object or error
    fn call(&self, args: Args) -> impl Future<Output = Result<Self::Output, Error>> + Send;
}

impl<F, R> GenericFactory<()> for F
where
    F: Fn() -> R + Send + Sync + 'static
{
    type Output = R;

    #[inline]
    fn call(&self, _: ()) -> Result<Self::Output, Error> {
        Ok(self())
    }
}

impl<F, Fut, R> AsyncFactory<()> for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, Error>> + Send + 'static,
{
    type Output = R;

    #[inline]
    fn call(&self, _: ()) -> impl Future<Output = Result<Self::Output, Error>> + Send {
        self()
    }
}

macro_rules! define_generic_factory ({ $($param:ident)* } => {
    impl<F, R, $($param,)*> GenericFactory<($($param,)*)> for F
    where
        F: Fn($($param),*) -> Result<R, Error> + Send + Sync + 'static,
    {
        type Output = R;

        #[inline]
        #[allow(non_snake_case)]
        fn call(&self, ($($param,)*): ($($param,)*)) -> Result<Self::Output, Error> {
            (self)($($param,)*)
        }
    }

    impl<F, Fut, R, $($param,)*> AsyncFactory<($($param,)*)> for F
    where
        F: Fn($($param),*) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, Error>> + Send + 'static,
    {
        type Output = R;

        #[inline]
        #[allow(non_snake_case)]
        fn call(&self, ($($param,)*): ($($param,)*)) -> impl Future<Output = Result<Self::Output, Error>> + Send {
            (self)($($param,)*)
        }
    }
});

define_generic_factory! { T1 }
define_generic_factory! { T1 T2 }
define_generic_factory! { T1 T2 T3 }
define_generic_factory! { T1 T2 T3 T4 }
define_generic_factory! { T1 T2 T3 T4 T5 }
