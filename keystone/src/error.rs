//! Describes dependency injection errors

use crate::{scope::ScopeId, token::Key};
use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
    sync::Arc,
};

/// An error that happened while registering, resolving or disposing services
#[derive(Debug, Clone)]
pub enum Error {
    /// A registration used an empty or blank service name
    InvalidToken(&'static str),
    /// There is no binding for the requested service
    NotRegistered(Key),
    /// The container rejects overwriting an existing binding
    AlreadyRegistered(Key),
    /// The dependency graph loops back onto a service that is still under construction.
    ///
    /// Holds the chain of services from the outermost one to the repeated one.
    CircularDependency(Vec<Key>),
    /// A factory or an [`Inject`](crate::Inject) implementation failed
    Construction {
        /// A service that failed to construct
        token: Key,
        /// The original failure
        cause: Box<Error>,
    },
    /// A resolved instance has an unexpected type
    ResolveFailed(&'static str),
    /// The scope has already been disposed
    ScopeDisposed(ScopeId),
    /// The container has already been disposed
    ContainerDisposed,
    /// There is no DI container in the request extensions
    ContainerMissing,
    /// One or more disposers failed
    DisposalAggregate(Vec<DisposalFailure>),
    /// A plain error message
    Other(&'static str),
    /// An error produced by user code
    Custom(Arc<dyn StdError + Send + Sync>),
}

/// A failure of a single disposer
#[derive(Debug, Clone)]
pub struct DisposalFailure {
    /// A service whose disposer failed
    pub token: Key,
    /// The failure itself
    pub error: Error,
}

impl Error {
    /// Wraps any error produced by user code
    #[inline]
    pub fn custom<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(err))
    }

    /// Returns `true` if this error was produced by the resolution machinery
    /// rather than by a factory.
    #[inline]
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidToken(_)
                | Error::NotRegistered(_)
                | Error::CircularDependency(_)
                | Error::Construction { .. }
                | Error::ResolveFailed(_)
                | Error::ScopeDisposed(_)
                | Error::ContainerDisposed
        )
    }

    /// Attributes a factory failure to the service that was being constructed.
    ///
    /// Errors that came from resolving nested dependencies are passed through as is,
    /// so the caller sees the original `NotRegistered` or `CircularDependency`.
    #[inline]
    pub(crate) fn within(self, token: &Key) -> Self {
        if self.is_resolution_error() {
            self
        } else {
            Error::Construction { token: token.clone(), cause: Box::new(self) }
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidToken(type_name) => write!(f, "Services Error: invalid token for the service: {type_name}"),
            Error::NotRegistered(key) => write!(f, "Services Error: service not registered: {key}"),
            Error::AlreadyRegistered(key) => write!(f, "Services Error: service already registered: {key}"),
            Error::CircularDependency(chain) => {
                f.write_str("Services Error: circular dependency detected: ")?;
                for (i, key) in chain.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" -> ")?;
                    }
                    write!(f, "{key}")?;
                }
                Ok(())
            }
            Error::Construction { token, cause } => write!(f, "Services Error: unable to construct the service {token}: {cause}"),
            Error::ResolveFailed(type_name) => write!(f, "Services Error: unable to resolve the service: {type_name}"),
            Error::ScopeDisposed(id) => write!(f, "Services Error: scope {id} has been disposed"),
            Error::ContainerDisposed => f.write_str("Services Error: DI container has been disposed"),
            Error::ContainerMissing => f.write_str("Services Error: DI container is missing"),
            Error::DisposalAggregate(failures) => {
                write!(f, "Services Error: {} disposer(s) failed", failures.len())?;
                for failure in failures {
                    write!(f, "; {}: {}", failure.token, failure.error)?;
                }
                Ok(())
            }
            Error::Other(msg) => f.write_str(msg),
            Error::Custom(err) => Display::fmt(err, f),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Construction { cause, .. } => Some(cause.as_ref()),
            Error::Custom(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}
