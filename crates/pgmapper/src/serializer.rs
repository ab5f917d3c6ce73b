//! Normalizer/denormalizer contract and a dispatch registry.
//!
//! A [`Serializer`] knows nothing about the types it converts. It asks each
//! registered implementation whether it supports an object (or a target type) and
//! hands the work to the first one that does. [`Repository`](crate::Repository)
//! is one implementation.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{OrmError, OrmResult};
use crate::value::RowData;

/// Options passed through a (de)normalization.
#[derive(Default)]
pub struct SerializerContext {
    /// Restrict to these fields. `None` means every declared field.
    pub fields: Option<Vec<String>>,
    /// Populate this object instead of a fresh default one.
    pub object_to_populate: Option<Box<dyn Any + Send>>,
}

impl SerializerContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn object_to_populate<T: Any + Send>(mut self, object: T) -> Self {
        self.object_to_populate = Some(Box::new(object));
        self
    }
}

impl fmt::Debug for SerializerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerContext")
            .field("fields", &self.fields)
            .field("object_to_populate", &self.object_to_populate.is_some())
            .finish()
    }
}

/// Converts objects into row-shaped data.
pub trait Normalizer: Send + Sync {
    fn supports_normalization(&self, object: &dyn Any, format: Option<&str>) -> bool;

    /// Fails with `UnsupportedType` when `object` is not supported.
    fn normalize(
        &self,
        object: &dyn Any,
        format: Option<&str>,
        context: &SerializerContext,
    ) -> OrmResult<RowData>;

    /// Whether `supports_normalization` depends only on the object's type and the format.
    fn has_cacheable_support(&self) -> bool {
        false
    }
}

/// Converts row-shaped data into objects.
pub trait Denormalizer: Send + Sync {
    fn supports_denormalization(&self, data: &dyn Any, target: TypeId, format: Option<&str>)
    -> bool;

    /// Fails with `UnsupportedType` when `data` or `target` is not supported.
    fn denormalize(
        &self,
        data: &dyn Any,
        target: TypeId,
        format: Option<&str>,
        context: SerializerContext,
    ) -> OrmResult<Box<dyn Any + Send>>;

    /// Whether `supports_denormalization` depends only on the data type, target and format.
    fn has_cacheable_support(&self) -> bool {
        false
    }
}

type NormalizeKey = (TypeId, Option<String>);
type DenormalizeKey = (TypeId, TypeId, Option<String>);

/// Dispatches to the first registered implementation that supports the input.
///
/// Probe results are cached per type and format when every implementation probed
/// for that key reports cacheable support.
#[derive(Default)]
pub struct Serializer {
    normalizers: Vec<Arc<dyn Normalizer>>,
    denormalizers: Vec<Arc<dyn Denormalizer>>,
    normalize_cache: RwLock<HashMap<NormalizeKey, Option<usize>>>,
    denormalize_cache: RwLock<HashMap<DenormalizeKey, Option<usize>>>,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizers.push(normalizer);
        self.clear_cache();
        self
    }

    pub fn with_denormalizer(mut self, denormalizer: Arc<dyn Denormalizer>) -> Self {
        self.denormalizers.push(denormalizer);
        self.clear_cache();
        self
    }

    fn clear_cache(&mut self) {
        self.normalize_cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.denormalize_cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Normalize any supported object.
    pub fn normalize(
        &self,
        object: &dyn Any,
        format: Option<&str>,
        context: &SerializerContext,
    ) -> OrmResult<RowData> {
        match self.find_normalizer(object, format) {
            Some(normalizer) => normalizer.normalize(object, format, context),
            None => Err(OrmError::unsupported(
                "no normalizer supports the given object",
            )),
        }
    }

    /// Denormalize `data` into a `T`.
    pub fn denormalize<T: Any>(
        &self,
        data: &dyn Any,
        format: Option<&str>,
        context: SerializerContext,
    ) -> OrmResult<T> {
        let target = TypeId::of::<T>();
        let Some(denormalizer) = self.find_denormalizer(data, target, format) else {
            return Err(OrmError::unsupported(format!(
                "no denormalizer supports {}",
                std::any::type_name::<T>()
            )));
        };
        denormalizer
            .denormalize(data, target, format, context)?
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| {
                OrmError::unsupported(format!(
                    "denormalizer returned something other than {}",
                    std::any::type_name::<T>()
                ))
            })
    }

    pub fn supports_normalization(&self, object: &dyn Any, format: Option<&str>) -> bool {
        self.find_normalizer(object, format).is_some()
    }

    pub fn supports_denormalization<T: Any>(&self, data: &dyn Any, format: Option<&str>) -> bool {
        self.find_denormalizer(data, TypeId::of::<T>(), format)
            .is_some()
    }

    fn find_normalizer(&self, object: &dyn Any, format: Option<&str>) -> Option<&Arc<dyn Normalizer>> {
        let key = (object.type_id(), format.map(str::to_string));
        if let Some(hit) = self
            .normalize_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return hit.map(|i| &self.normalizers[i]);
        }

        let mut cacheable = true;
        let mut found = None;
        for (i, normalizer) in self.normalizers.iter().enumerate() {
            cacheable &= normalizer.has_cacheable_support();
            if normalizer.supports_normalization(object, format) {
                found = Some(i);
                break;
            }
        }
        if cacheable {
            self.normalize_cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, found);
        }
        found.map(|i| &self.normalizers[i])
    }

    fn find_denormalizer(
        &self,
        data: &dyn Any,
        target: TypeId,
        format: Option<&str>,
    ) -> Option<&Arc<dyn Denormalizer>> {
        let key = (data.type_id(), target, format.map(str::to_string));
        if let Some(hit) = self
            .denormalize_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return hit.map(|i| &self.denormalizers[i]);
        }

        let mut cacheable = true;
        let mut found = None;
        for (i, denormalizer) in self.denormalizers.iter().enumerate() {
            cacheable &= denormalizer.has_cacheable_support();
            if denormalizer.supports_denormalization(data, target, format) {
                found = Some(i);
                break;
            }
        }
        if cacheable {
            self.denormalize_cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key, found);
        }
        found.map(|i| &self.denormalizers[i])
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("normalizers", &self.normalizers.len())
            .field("denormalizers", &self.denormalizers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Normalizes `u32` into `{"n": ...}`, counting probes.
    #[derive(Default)]
    struct Counting {
        probes: AtomicUsize,
        cacheable: bool,
    }

    impl Normalizer for Counting {
        fn supports_normalization(&self, object: &dyn Any, _format: Option<&str>) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            object.is::<u32>()
        }

        fn normalize(
            &self,
            object: &dyn Any,
            _format: Option<&str>,
            _context: &SerializerContext,
        ) -> OrmResult<RowData> {
            let n = object
                .downcast_ref::<u32>()
                .ok_or_else(|| OrmError::unsupported("expected u32"))?;
            Ok(RowData::from([("n".to_string(), Value::from(*n))]))
        }

        fn has_cacheable_support(&self) -> bool {
            self.cacheable
        }
    }

    #[test]
    fn dispatches_to_supporting_normalizer() {
        let serializer = Serializer::new().with_normalizer(Arc::new(Counting::default()));
        let row = serializer.normalize(&7u32, None, &SerializerContext::new()).unwrap();
        assert_eq!(row["n"], Value::Int(7));

        let err = serializer
            .normalize(&"text", None, &SerializerContext::new())
            .unwrap_err();
        assert!(err.is_unsupported_type());
    }

    #[test]
    fn caches_cacheable_probes_per_type_and_format() {
        let normalizer = Arc::new(Counting {
            probes: AtomicUsize::new(0),
            cacheable: true,
        });
        let serializer = Serializer::new().with_normalizer(normalizer.clone());

        assert!(serializer.supports_normalization(&1u32, None));
        assert!(serializer.supports_normalization(&2u32, None));
        assert!(!serializer.supports_normalization(&1i64, None));
        assert!(!serializer.supports_normalization(&2i64, None));
        assert_eq!(normalizer.probes.load(Ordering::SeqCst), 2);

        assert!(serializer.supports_normalization(&1u32, Some("json")));
        assert_eq!(normalizer.probes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn non_cacheable_probes_every_time() {
        let normalizer = Arc::new(Counting::default());
        let serializer = Serializer::new().with_normalizer(normalizer.clone());
        for _ in 0..3 {
            assert!(serializer.supports_normalization(&1u32, None));
        }
        assert_eq!(normalizer.probes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn denormalize_without_implementations_is_unsupported() {
        let err = Serializer::new()
            .denormalize::<u32>(&RowData::new(), None, SerializerContext::new())
            .unwrap_err();
        assert!(err.is_unsupported_type());
    }
}
