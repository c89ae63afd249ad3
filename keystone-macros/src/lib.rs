//! Proc-Macros implementations for the Keystone dependency injection container
//!

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod inject;

/// Implements the `Inject` trait for a struct by resolving every field from the container
///
/// Each field is resolved through `FromResolver`, so fields are typically `Arc<T>`,
/// `Option<Arc<T>>` or a `Resolver`. Field attributes:
/// - `#[inject(name = "...")]` resolves an `Arc<T>` registered under a named token
/// - `#[inject(default)]` fills the field with `Default::default()` instead of resolving it
///
/// # Example
/// ```ignore
/// use keystone::Inject;
/// use std::sync::Arc;
///
/// #[derive(Inject)]
/// struct Repository {
///     #[inject(name = "primary")]
///     connection: Arc<String>,
///     logger: Arc<Logger>,
///     #[inject(default)]
///     retries: u32,
/// }
///
/// // This expands to:
/// // impl Inject for Repository {
/// //     async fn inject(resolver: &Resolver) -> Result<Self, Error> {
/// //         let connection = resolver.resolve_token(&Token::named("primary")).await?;
/// //         let logger = <Arc<Logger> as FromResolver>::from_resolver(resolver).await?;
/// //         let retries = Default::default();
/// //         Ok(Self { connection, logger, retries })
/// //     }
/// // }
/// ```
#[proc_macro_derive(Inject, attributes(inject))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as syn::DeriveInput);
    inject::expand_inject(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
