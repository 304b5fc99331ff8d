//! Injection manifests: the fields a type asks to have injected.
//!
//! A [`Manifest`] lists `(field name, key)` pairs in declaration order, for
//! one type and only that type. A type that embeds another injectable type
//! does not repeat the embedded type's fields; those are resolved when the
//! embedded type is constructed.

use std::any::{TypeId, type_name};
use std::collections::HashSet;
use std::fmt;

use infuse_support::rendering::{render_fields, shorten_type_name};

use crate::error::{InfuseError, InjectionNotSupportedError, Result};
use crate::key::DependencyKey;

/// One declared dependency field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    name: &'static str,
    key: DependencyKey,
}

impl FieldSpec {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &DependencyKey {
        &self.key
    }
}

/// The dependency fields declared by one type.
///
/// # Examples
/// ```
/// use infuse_container::Manifest;
///
/// struct Clock;
/// struct Mailer;
/// struct Newsletter;
///
/// let manifest = Manifest::builder::<Newsletter>()
///     .field::<Clock>("clock")
///     .named_field::<Mailer>("mailer", "outbox")
///     .build();
///
/// assert_eq!(manifest.len(), 2);
/// assert_eq!(manifest.to_string(), "Newsletter { clock: Clock, mailer: Mailer }");
/// ```
#[derive(Debug, Clone)]
pub struct Manifest {
    target_id: TypeId,
    target: &'static str,
    fields: Vec<FieldSpec>,
}

impl Manifest {
    /// Starts a manifest describing type `T`.
    pub fn builder<T: 'static>() -> ManifestBuilder {
        ManifestBuilder {
            manifest: Self::empty::<T>(),
        }
    }

    /// A manifest for `T` that declares no dependencies.
    pub fn empty<T: 'static>() -> Self {
        Self {
            target_id: TypeId::of::<T>(),
            target: type_name::<T>(),
            fields: Vec::new(),
        }
    }

    /// Name of the described type.
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Returns true if this manifest describes `T`.
    pub fn describes<T: 'static>(&self) -> bool {
        self.target_id == TypeId::of::<T>()
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks that this manifest can describe the struct `T`.
    ///
    /// # Errors
    /// [`InfuseError::InjectionNotSupported`] if the manifest was built for
    /// another type, or a field name is empty or declared twice.
    pub(crate) fn validate_for<T: 'static>(&self) -> Result<()> {
        let unsupported = |reason: String| {
            Err(InfuseError::InjectionNotSupported(InjectionNotSupportedError {
                target: type_name::<T>(),
                reason,
            }))
        };

        if !self.describes::<T>() {
            return unsupported(format!(
                "its manifest describes {}",
                shorten_type_name(self.target)
            ));
        }

        let mut seen = HashSet::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.name.is_empty() {
                return unsupported(format!("a field of type {} has no name", field.key));
            }
            if !seen.insert(field.name) {
                return unsupported(format!("field `{}` is declared twice", field.name));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|field| (field.name, field.key.type_name()))
            .collect();

        let target = shorten_type_name(self.target);
        if pairs.is_empty() {
            write!(f, "{target} {{}}")
        } else {
            write!(f, "{target} {{ {} }}", render_fields(&pairs))
        }
    }
}

/// Builds a [`Manifest`] one field at a time.
#[derive(Debug)]
pub struct ManifestBuilder {
    manifest: Manifest,
}

impl ManifestBuilder {
    /// Declares `name` as a dependency on `D`.
    ///
    /// `D` is the registered type. A trait object cannot be registered, so
    /// declare the sized wrapper that was, such as `Box<dyn Clock>`:
    ///
    /// ```compile_fail
    /// use infuse_container::Manifest;
    ///
    /// trait Clock {}
    /// struct Scheduler;
    ///
    /// let _ = Manifest::builder::<Scheduler>().field::<dyn Clock>("clock");
    /// ```
    pub fn field<D: 'static>(self, name: &'static str) -> Self {
        self.key(name, DependencyKey::of::<D>())
    }

    /// Declares `name` as a dependency on the binding of `D` called `binding`.
    pub fn named_field<D: 'static>(self, name: &'static str, binding: &'static str) -> Self {
        self.key(name, DependencyKey::named::<D>(binding))
    }

    /// Declares `name` as a dependency on an explicit key.
    pub fn key(mut self, name: &'static str, key: DependencyKey) -> Self {
        self.manifest.fields.push(FieldSpec { name, key });
        self
    }

    pub fn build(self) -> Manifest {
        self.manifest
    }
}
