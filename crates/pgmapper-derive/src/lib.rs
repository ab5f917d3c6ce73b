//! Derive macro for pgmapper
//!
//! Provides `#[derive(Entity)]`, which implements `pgmapper::Entity` (property
//! get/set by path) for structs with named fields.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive `Entity` for a struct.
///
/// # Example
///
/// ```ignore
/// use pgmapper::Entity;
///
/// #[derive(Debug, Default, Entity)]
/// struct User {
///     id: i64,
///     #[orm(property = "mail")]
///     email: Option<String>,
///     #[orm(nested)]
///     address: Address,
///     #[orm(skip)]
///     session: Vec<u8>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(property = "name")]` - Expose the field under a different property name
/// - `#[orm(nested)]` - Delegate `name.rest` paths to the field's own `Entity` impl
/// - `#[orm(skip)]` - Not reachable by path
///
/// Plain fields must be `Clone + Into<Value>` and implement `FromValue`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
