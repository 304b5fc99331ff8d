//! Resolved dependencies handed to an initializer.

use std::fmt;
use std::sync::Arc;

use crate::error::{InfuseError, Result};
use crate::key::DependencyKey;
use crate::registry::{Shared, downcast};

/// The values resolved for one construction of one type.
///
/// Built by the injector from the type's [`Manifest`](crate::Manifest) and
/// passed by value to [`Injectable::initialize`](crate::Injectable::initialize).
/// Only the type's own declared fields are present.
pub struct Dependencies {
    target: &'static str,
    resolved: Vec<Resolved>,
}

struct Resolved {
    field: &'static str,
    key: DependencyKey,
    value: Shared,
}

impl Dependencies {
    pub(crate) fn new(target: &'static str) -> Self {
        Self {
            target,
            resolved: Vec::new(),
        }
    }

    pub(crate) fn with_capacity(target: &'static str, capacity: usize) -> Self {
        Self {
            target,
            resolved: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn insert(&mut self, field: &'static str, key: DependencyKey, value: Shared) {
        self.resolved.push(Resolved { field, key, value });
    }

    /// Returns the value injected into `field`.
    ///
    /// # Errors
    /// - [`InfuseError::UnresolvedField`] if `field` was not resolved for
    ///   this construction
    /// - [`InfuseError::TypeMismatch`] if it was resolved as another type
    pub fn get<T: Send + Sync + 'static>(&self, field: &str) -> Result<Arc<T>> {
        let resolved = self
            .resolved
            .iter()
            .find(|r| r.field == field)
            .ok_or_else(|| InfuseError::UnresolvedField {
                target: self.target,
                field: field.to_owned(),
            })?;

        downcast(resolved.key, resolved.value.clone())
    }

    /// Returns true if `field` was resolved.
    pub fn contains(&self, field: &str) -> bool {
        self.resolved.iter().any(|r| r.field == field)
    }

    /// Resolved field names, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resolved.iter().map(|r| r.field)
    }

    /// The type these dependencies were resolved for.
    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("target", &self.target)
            .field("fields", &self.fields().collect::<Vec<_>>())
            .finish()
    }
}
