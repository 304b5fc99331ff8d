//! # The Injector: field injection for consumer types
//!
//! A consumer type declares which dependencies it needs through
//! [`Injectable::manifest`] and receives them, already resolved, in
//! [`Injectable::initialize`]. Applying an [`Injector`] to the type records
//! which registry those dependencies come from.
//!
//! # Flow
//! ```text
//! Injector::apply::<T>()   records (manifest, registry) for T
//!          │
//! construct::<T>(args)
//!          │  resolve T's own fields against T's registry
//!          ▼
//! T::initialize(deps, args)
//!          │  may call construct::<Base>(..) for an embedded type,
//!          ▼  which resolves Base's fields against Base's registry
//!          T
//! ```
//!
//! # Chained types
//! Rust has no inheritance; a "derived" type embeds its "base" and builds
//! it from its own initializer with [`construct`]. The base's fields are
//! resolved only if that call is made. An embedded base that is skipped
//! stays unset, and reading one of its fields through the base's
//! [`Dependencies`] reports [`InfuseError::UnresolvedField`], not a missing
//! registry entry.
//!
//! # Examples
//! ```
//! use std::sync::Arc;
//! use infuse_container::{Dependencies, Injectable, Injector, Manifest, Result};
//!
//! struct Clock;
//!
//! struct Greeter {
//!     clock: Arc<Clock>,
//!     greeting: String,
//! }
//!
//! impl Injectable for Greeter {
//!     type Args = &'static str;
//!
//!     fn manifest() -> Manifest {
//!         Manifest::builder::<Self>().field::<Clock>("clock").build()
//!     }
//!
//!     fn initialize(deps: Dependencies, greeting: &'static str) -> Result<Self> {
//!         Ok(Self { clock: deps.get("clock")?, greeting: greeting.to_string() })
//!     }
//! }
//!
//! let injector = Injector::new();
//! let greeter = injector.apply::<Greeter>().unwrap();
//! injector.registry().register_instance(Clock).unwrap();
//!
//! let hello = greeter.construct("hello").unwrap();
//! assert_eq!(hello.greeting, "hello");
//! ```

use std::any::{TypeId, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use tracing::{debug, trace, warn};

use crate::dependencies::Dependencies;
use crate::error::{BoxError, InfuseError, NotFoundError, Result};
use crate::global;
use crate::manifest::Manifest;
use crate::registry::Registry;

/// A type whose dependency fields are filled from a registry.
///
/// Usually derived with `#[derive(Injectable)]`; implement it by hand when
/// the initializer takes arguments or builds an embedded injectable type.
pub trait Injectable: Sized + 'static {
    /// Arguments the caller passes to [`construct`].
    type Args;

    /// The dependency fields this type declares for itself.
    ///
    /// Called once, when an injector is applied to the type.
    fn manifest() -> Manifest;

    /// The type's own initializer.
    ///
    /// Runs only after every field of [`manifest`](Self::manifest) was
    /// resolved; `deps` holds exactly those values.
    fn initialize(deps: Dependencies, args: Self::Args) -> Result<Self>;
}

/// Where an applied type gets its registry from.
#[derive(Clone)]
pub(crate) enum Binding {
    /// The registry of the injector that was applied.
    Fixed(Arc<Registry>),
    /// Whatever the process default registry is at construction time.
    Default,
}

impl Binding {
    fn registry(&self) -> Arc<Registry> {
        match self {
            Binding::Fixed(registry) => registry.clone(),
            Binding::Default => global::default_registry(),
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Fixed(registry) => f.debug_tuple("Fixed").field(registry).finish(),
            Binding::Default => f.write_str("Default"),
        }
    }
}

/// What applying an injector recorded for one type.
#[derive(Debug)]
struct Application {
    manifest: Manifest,
    binding: Binding,
}

/// Applied types, keyed by `TypeId`.
static APPLICATIONS: Lazy<DashMap<TypeId, Arc<Application>>> = Lazy::new(DashMap::new);

// ═══════════════════════════════════════════
// Injector
// ═══════════════════════════════════════════

/// Applies field injection to types, backed by one registry.
///
/// Cloning an injector shares its registry.
#[derive(Clone)]
pub struct Injector {
    registry: Arc<Registry>,
}

impl Injector {
    /// Creates an injector with a fresh, empty registry of its own.
    pub fn new() -> Self {
        Self::with_registry(Registry::shared())
    }

    /// Creates an injector backed by `registry`.
    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// The registry this injector resolves from.
    ///
    /// Register dependencies here before constructing applied types.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Applies injection to `T`.
    ///
    /// Captures this injector's registry for `T`: every later
    /// [`construct::<T>`](construct) resolves `T`'s fields against it.
    /// Applying again (with this or another injector) rebinds `T`; its
    /// initializer is never wrapped twice.
    ///
    /// # Errors
    /// [`InfuseError::InjectionNotSupported`] if `T`'s manifest does not
    /// describe `T` or declares a field twice.
    pub fn apply<T: Injectable>(&self) -> Result<Injected<T>> {
        apply_with::<T>(Binding::Fixed(self.registry.clone()))
    }
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injector")
            .field("registry", &self.registry)
            .finish()
    }
}

pub(crate) fn apply_with<T: Injectable>(binding: Binding) -> Result<Injected<T>> {
    let manifest = T::manifest();
    manifest.validate_for::<T>()?;

    debug!(
        target_type = type_name::<T>(),
        fields = manifest.len(),
        binding = ?binding,
        "Applied injection"
    );

    let application = Arc::new(Application { manifest, binding });
    if APPLICATIONS.insert(TypeId::of::<T>(), application).is_some() {
        debug!(target_type = type_name::<T>(), "Rebound previously applied type");
    }

    Ok(Injected { _marker: PhantomData })
}

// ═══════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════

/// Handle to an applied type, returned by [`Injector::apply`].
///
/// A thin, copyable marker; [`construct`] works just as well without it.
pub struct Injected<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Injected<T> {
    /// Resolves `T`'s fields and runs its initializer.
    pub fn construct(&self, args: T::Args) -> Result<T> {
        construct::<T>(args)
    }

    /// The manifest recorded when `T` was last applied.
    pub fn manifest(&self) -> Option<Manifest> {
        APPLICATIONS
            .get(&TypeId::of::<T>())
            .map(|application| application.manifest.clone())
    }
}

impl<T> Clone for Injected<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Injected<T> {}

impl<T> fmt::Debug for Injected<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Injected<{}>", type_name::<T>())
    }
}

/// Constructs `T`: resolves its declared fields, then runs its initializer.
///
/// Fields are resolved in declaration order against the registry bound when
/// `T` was applied. A type that was never applied gets empty
/// [`Dependencies`].
///
/// # Errors
/// - [`InfuseError::InjectionFailure`] if a field's key is not registered;
///   the initializer does not run
/// - [`InfuseError::Factory`] if a fallible factory failed, unchanged
/// - whatever `T::initialize` returns
pub fn construct<T: Injectable>(args: T::Args) -> Result<T> {
    let target = type_name::<T>();

    // Clone the record out so the map is not held while user code runs.
    let application = APPLICATIONS
        .get(&TypeId::of::<T>())
        .map(|entry| Arc::clone(entry.value()));

    let deps = match application {
        Some(application) => resolve(target, &application)?,
        None => {
            warn!(target_type = target, "Constructing a type that was never applied");
            Dependencies::new(target)
        }
    };

    trace!(target_type = target, resolved = deps.len(), "Running initializer");
    T::initialize(deps, args)
}

/// Returns true if an injector has been applied to `T`.
pub fn is_applied<T: 'static>() -> bool {
    APPLICATIONS.contains_key(&TypeId::of::<T>())
}

fn resolve(target: &'static str, application: &Application) -> Result<Dependencies> {
    let registry = application.binding.registry();
    let fields = application.manifest.fields();
    let mut deps = Dependencies::with_capacity(target, fields.len());

    for field in fields {
        let source = match registry.get_key(field.key()) {
            Ok(value) => {
                deps.insert(field.name(), *field.key(), value);
                continue;
            }
            Err(InfuseError::NotFound(source)) => source,
            // A factory that looked up a missing key of its own.
            Err(InfuseError::Factory(inner)) => match missing_inside_factory(inner) {
                Ok(source) => source,
                Err(other) => return Err(other),
            },
            Err(other) => return Err(other),
        };

        debug!(
            target_type = target,
            field = field.name(),
            key = %source.key,
            "Injection failed"
        );
        return Err(InfuseError::InjectionFailure {
            target,
            field: field.name(),
            source,
        });
    }

    Ok(deps)
}

/// Unwraps a factory error that is a [`InfuseError::NotFound`]; any other
/// factory error is handed back unchanged.
fn missing_inside_factory(inner: BoxError) -> std::result::Result<NotFoundError, InfuseError> {
    match inner.downcast::<InfuseError>() {
        Ok(nested) => match *nested {
            InfuseError::NotFound(source) => Ok(source),
            other => Err(InfuseError::Factory(Box::new(other))),
        },
        Err(inner) => Err(InfuseError::Factory(inner)),
    }
}
