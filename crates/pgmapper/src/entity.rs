//! Property access for mapped objects.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// An object whose properties can be read and written by path.
///
/// Paths are property names, optionally dotted into nested entities
/// (`"profile.email"`). Usually implemented with `#[derive(Entity)]`:
///
/// ```ignore
/// #[derive(Debug, Default, Entity)]
/// struct User {
///     id: i64,
///     #[orm(property = "mail")]
///     email: String,
///     #[orm(nested)]
///     profile: Profile,
///     #[orm(skip)]
///     cache: Vec<u8>,
/// }
/// ```
///
/// `Default` supplies the object denormalization starts from.
pub trait Entity: Default + Send + Sync + 'static {
    /// Read the value at `path`.
    fn get(&self, path: &str) -> OrmResult<Value>;

    /// Write `value` at `path`.
    fn set(&mut self, path: &str, value: Value) -> OrmResult<()>;
}

/// Error for a path the entity does not have.
pub fn unknown_property(entity: &str, path: &str) -> OrmError {
    OrmError::invalid(format!("unknown property '{path}' on {entity}"))
}

/// Split `"profile.email"` into `("profile", Some("email"))`.
pub fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}
