//! Async dependency injection container
//!
//! Services are registered under [`Token`]s together with a [`Binding`] that says how
//! to produce them and for how long to reuse them ([`Lifecycle`]). Resolution is
//! asynchronous, detects circular dependencies and constructs each singleton
//! at most once even under concurrent access.
//!
//! # Example
//! ```no_run
//! use keystone::{ContainerBuilder, Inject, Resolver, error::Error};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Config { url: String }
//!
//! struct Repository { config: Arc<Config> }
//!
//! impl Inject for Repository {
//!     async fn inject(resolver: &Resolver) -> Result<Self, Error> {
//!         let config = resolver.resolve_shared::<Config>().await?;
//!         Ok(Self { config })
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Error> {
//! let mut builder = ContainerBuilder::new();
//! builder.register_singleton(Config { url: "postgres://localhost".into() });
//! builder.register_scoped::<Repository>();
//!
//! let container = builder.build();
//! let scope = container.create_scope();
//!
//! let repo = scope.resolve_shared::<Repository>().await?;
//! assert_eq!(repo.config.url, "postgres://localhost");
//!
//! scope.dispose().await?;
//! container.dispose().await
//! # }
//! ```

pub use crate::{
    binding::{Binding, Lifecycle},
    container::{AsyncFactory, Container, ContainerBuilder, FromResolver, GenericFactory},
    dispose::Dispose,
    inject::Inject,
    registry::OverwritePolicy,
    resolver::Resolver,
    scope::ScopeId,
    token::{Key, Token},
};

#[cfg(feature = "macros")]
pub use keystone_macros::Inject;

pub mod binding;
pub mod container;
pub mod dispose;
pub mod error;
pub mod inject;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod token;

#[cfg(feature = "http")]
pub mod http;

pub(crate) mod cache;
pub(crate) mod utils;
