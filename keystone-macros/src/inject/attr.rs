//! Field attribute helpers

use syn::{Attribute, LitStr, Result};

/// Describes where the value of a field comes from.
///
/// Parsed from the `#[inject(...)]` field attribute:
/// - no attribute: the field is resolved through `FromResolver`
/// - `#[inject(name = "primary")]`: the field is resolved by a named token
/// - `#[inject(default)]`: the field is set to `Default::default()`
pub(crate) enum FieldSource {
    /// Resolved through `FromResolver`
    Resolve,

    /// Resolved by a named token
    Named(LitStr),

    /// Not resolved at all
    Default,
}

impl FieldSource {
    /// Parses the `#[inject(...)]` attributes of a field.
    ///
    /// Returns an error on unknown options, an empty name or more than one option.
    pub(crate) fn from_attrs(attrs: &[Attribute]) -> Result<Self> {
        let mut source = FieldSource::Resolve;
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
            attr.parse_nested_meta(|meta| {
                if !matches!(source, FieldSource::Resolve) {
                    return Err(meta.error("only one `inject` option is allowed per field"));
                }
                if meta.path.is_ident("name") {
                    let name: LitStr = meta.value()?.parse()?;
                    if name.value().trim().is_empty() {
                        return Err(syn::Error::new(name.span(), "service name must not be empty"));
                    }
                    source = FieldSource::Named(name);
                    Ok(())
                } else if meta.path.is_ident("default") {
                    source = FieldSource::Default;
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"` or `default`"))
                }
            })?;
        }
        Ok(source)
    }
}
