//! Macros for dependency injection

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Field, Fields, Ident};

use self::attr::FieldSource;

pub(crate) mod attr;

/// Creates a derive-macro for the `Inject` trait
pub(super) fn expand_inject(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "`Inject` can only be derived for structs"));
    };

    let resolver = format_ident!("__resolver");
    let mut bindings = Vec::with_capacity(data.fields.len());

    let construct = match &data.fields {
        Fields::Named(fields) => {
            let mut idents = Vec::with_capacity(fields.named.len());
            for field in &fields.named {
                let Some(ident) = field.ident.clone() else {
                    return Err(syn::Error::new_spanned(field, "expected a named field"));
                };
                bindings.push(bind_field(&ident, field, &resolver)?);
                idents.push(ident);
            }
            quote! { Self { #(#idents),* } }
        }
        Fields::Unnamed(fields) => {
            let mut idents = Vec::with_capacity(fields.unnamed.len());
            for (i, field) in fields.unnamed.iter().enumerate() {
                let ident = format_ident!("__field{}", i);
                bindings.push(bind_field(&ident, field, &resolver)?);
                idents.push(ident);
            }
            quote! { Self(#(#idents),*) }
        }
        Fields::Unit => quote! { Self },
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::keystone::Inject for #name #ty_generics #where_clause {
            async fn inject(#resolver: &::keystone::Resolver) -> ::core::result::Result<Self, ::keystone::error::Error> {
                #(#bindings)*
                ::core::result::Result::Ok(#construct)
            }
        }
    })
}

fn bind_field(ident: &Ident, field: &Field, resolver: &Ident) -> syn::Result<TokenStream> {
    let ty = &field.ty;
    let value = match FieldSource::from_attrs(&field.attrs)? {
        FieldSource::Resolve => quote! {
            <#ty as ::keystone::FromResolver>::from_resolver(#resolver).await?
        },
        FieldSource::Named(name) => quote! {
            #resolver.resolve_token(&::keystone::Token::named(#name)).await?
        },
        FieldSource::Default => quote! {
            ::core::default::Default::default()
        },
    };
    Ok(quote! { let #ident: #ty = #value; })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn it_expands_named_struct() {
        let input: DeriveInput = parse_quote! {
            struct Repository {
                #[inject(name = "primary")]
                connection: Arc<String>,
                logger: Arc<Logger>,
                #[inject(default)]
                retries: u32,
            }
        };

        let expanded = expand_inject(&input).unwrap().to_string();

        assert!(expanded.contains("impl :: keystone :: Inject for Repository"));
        assert!(expanded.contains("resolve_token (& :: keystone :: Token :: named (\"primary\"))"));
        assert!(expanded.contains("< Arc < Logger > as :: keystone :: FromResolver > :: from_resolver (__resolver)"));
        assert!(expanded.contains("let retries : u32 = :: core :: default :: Default :: default ()"));
        assert!(expanded.contains("Self { connection , logger , retries }"));
    }

    #[test]
    fn it_expands_tuple_struct() {
        let input: DeriveInput = parse_quote! {
            struct Handler(Arc<Service>, Resolver);
        };

        let expanded = expand_inject(&input).unwrap().to_string();

        assert!(expanded.contains("let __field0 : Arc < Service >"));
        assert!(expanded.contains("let __field1 : Resolver"));
        assert!(expanded.contains("Self (__field0 , __field1)"));
    }

    #[test]
    fn it_expands_unit_struct() {
        let input: DeriveInput = parse_quote! {
            struct Marker;
        };

        let expanded = expand_inject(&input).unwrap().to_string();

        assert!(expanded.contains(":: core :: result :: Result :: Ok (Self)"));
    }

    #[test]
    fn it_keeps_generics() {
        let input: DeriveInput = parse_quote! {
            struct Repository<T: Send + Sync + 'static> {
                inner: Arc<T>,
            }
        };

        let expanded = expand_inject(&input).unwrap().to_string();

        assert!(expanded.contains("impl < T : Send + Sync + 'static > :: keystone :: Inject for Repository < T >"));
    }

    #[test]
    fn it_rejects_enums() {
        let input: DeriveInput = parse_quote! {
            enum Service { A, B }
        };

        let err = expand_inject(&input).unwrap_err();

        assert_eq!(err.to_string(), "`Inject` can only be derived for structs");
    }
}
