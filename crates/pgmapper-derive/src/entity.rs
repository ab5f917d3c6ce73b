//! Entity derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

/// How a struct field is reachable by path.
enum Access {
    Value,
    Nested,
    Skip,
}

struct FieldAttrs {
    property: Option<String>,
    access: Access,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let name_str = name.to_string();
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let mut get_arms = Vec::new();
    let mut set_arms = Vec::new();

    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(field)?;
        let property = attrs
            .property
            .unwrap_or_else(|| field_ident.to_string());

        match attrs.access {
            Access::Skip => {}
            Access::Value => {
                get_arms.push(quote! {
                    (#property, None) => Ok(pgmapper::Value::from(
                        ::core::clone::Clone::clone(&self.#field_ident),
                    )),
                });
                set_arms.push(quote! {
                    (#property, None) => {
                        self.#field_ident = pgmapper::FromValue::from_value(value)?;
                        Ok(())
                    }
                });
            }
            Access::Nested => {
                get_arms.push(quote! {
                    (#property, Some(rest)) => pgmapper::Entity::get(&self.#field_ident, rest),
                });
                set_arms.push(quote! {
                    (#property, Some(rest)) => pgmapper::Entity::set(&mut self.#field_ident, rest, value),
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics pgmapper::Entity for #name #ty_generics #where_clause {
            fn get(&self, path: &str) -> pgmapper::OrmResult<pgmapper::Value> {
                match pgmapper::entity::split_path(path) {
                    #(#get_arms)*
                    _ => Err(pgmapper::entity::unknown_property(#name_str, path)),
                }
            }

            fn set(&mut self, path: &str, value: pgmapper::Value) -> pgmapper::OrmResult<()> {
                match pgmapper::entity::split_path(path) {
                    #(#set_arms)*
                    _ => {
                        let _ = value;
                        Err(pgmapper::entity::unknown_property(#name_str, path))
                    }
                }
            }
        }
    })
}

fn parse_field_attrs(field: &syn::Field) -> Result<FieldAttrs> {
    let mut attrs = FieldAttrs {
        property: None,
        access: Access::Value,
    };

    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("property") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.property = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("skip") {
                attrs.access = Access::Skip;
                Ok(())
            } else if meta.path.is_ident("nested") {
                attrs.access = Access::Nested;
                Ok(())
            } else {
                Err(meta.error("unknown orm attribute; expected `property`, `nested` or `skip`"))
            }
        })?;
    }

    if let Some(property) = &attrs.property {
        if property.is_empty() || property.contains('.') {
            return Err(syn::Error::new_spanned(
                field,
                "orm property names must be non-empty and cannot contain '.'",
            ));
        }
    }

    Ok(attrs)
}
