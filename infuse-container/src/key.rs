//! Dependency identification keys.
//!
//! [`DependencyKey`] names "the kind of thing being depended on". It is a
//! [`TypeId`] plus an optional name, so several values of the same type
//! can live side by side in one registry.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use infuse_support::rendering::shorten_type_name;

/// Identifies a dependency in a [`Registry`](crate::registry::Registry).
///
/// Keys compare by `TypeId` and name only. Keys for related types (a
/// trait object and one of its implementors, say) are unrelated keys.
///
/// # Examples
/// ```
/// use infuse_container::key::DependencyKey;
///
/// let key = DependencyKey::of::<String>();
/// assert_eq!(key.type_name(), "alloc::string::String");
/// assert_eq!(key.name(), None);
///
/// let primary = DependencyKey::named::<String>("primary_db");
/// assert_ne!(key, primary);
/// ```
#[derive(Clone, Copy)]
pub struct DependencyKey {
    type_id: TypeId,
    type_name: &'static str,
    name: Option<&'static str>,
}

impl DependencyKey {
    /// Key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: None,
        }
    }

    /// Key for type `T` under a binding name.
    #[inline]
    pub fn named<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            name: Some(name),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name, for messages.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Binding name, if this key is named.
    #[inline]
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// Returns true if this key carries a binding name.
    #[inline]
    pub fn is_named(&self) -> bool {
        self.name.is_some()
    }

    /// Returns true if values stored under this key are of type `T`.
    #[inline]
    pub fn holds<T: ?Sized + 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Type name with module paths stripped.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }
}

impl PartialEq for DependencyKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.name == other.name
    }
}

impl Eq for DependencyKey {}

impl Hash for DependencyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "DependencyKey({}, name={:?})", self.type_name, name),
            None => write!(f, "DependencyKey({})", self.type_name),
        }
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "{} (name={:?})", self.short_name(), name),
            None => f.write_str(&self.short_name()),
        }
    }
}
