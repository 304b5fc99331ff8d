//! The process default registry and the free-function API over it.
//!
//! # Lifecycle
//! - **init**: the default registry is created on first use by
//!   [`default_registry`] (or anything that forwards to it).
//! - **set**: [`set_default_registry`] replaces it wholesale.
//! - **reset**: [`reset_default_registry`] forgets it, so the next use
//!   creates a fresh one. Meant for test harnesses.
//!
//! Types applied with [`inject`] look the default registry up each time
//! they are constructed, so replacing it affects them immediately. Types
//! applied with an [`Injector`] keep the registry they captured.
//!
//! # Examples
//! ```
//! use infuse_container::global;
//!
//! struct Config { port: u16 }
//!
//! global::register(Config { port: 8080 }).unwrap();
//! assert_eq!(global::default_registry().get::<Config>().unwrap().port, 8080);
//! # global::reset_default_registry();
//! ```

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use tracing::debug;

use crate::error::Result;
use crate::injector::{Binding, Injectable, Injected, Injector, apply_with};
use crate::registry::Registry;

static DEFAULT_REGISTRY: Lazy<RwLock<Option<Arc<Registry>>>> = Lazy::new(|| RwLock::new(None));

/// Returns the default registry, creating it on first use.
pub fn default_registry() -> Arc<Registry> {
    let slot = DEFAULT_REGISTRY.upgradable_read();
    if let Some(registry) = slot.as_ref() {
        return registry.clone();
    }

    let mut slot = RwLockUpgradableReadGuard::upgrade(slot);
    debug!("Creating default registry");
    slot.get_or_insert_with(Registry::shared).clone()
}

/// Returns the default registry if one exists, without creating it.
pub fn current_default_registry() -> Option<Arc<Registry>> {
    DEFAULT_REGISTRY.read().clone()
}

/// Replaces the default registry.
pub fn set_default_registry(registry: Arc<Registry>) {
    debug!("Replacing default registry");
    *DEFAULT_REGISTRY.write() = Some(registry);
}

/// Forgets the default registry; the next use creates a new one.
#[doc(hidden)]
pub fn reset_default_registry() {
    *DEFAULT_REGISTRY.write() = None;
}

/// An injector over the current default registry.
pub fn default_injector() -> Injector {
    Injector::with_registry(default_registry())
}

/// Registers `instance` for `T` in the default registry.
pub fn register<T: Send + Sync + 'static>(instance: T) -> Result<()> {
    default_registry().register_instance(instance)
}

/// Registers a shared instance for `T` in the default registry.
pub fn register_shared<T: Send + Sync + 'static>(instance: Arc<T>) -> Result<()> {
    default_registry().register_shared(instance)
}

/// Registers a factory for `T` in the default registry.
pub fn register_factory<T, F>(factory: F) -> Result<()>
where
    T: Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    default_registry().register_factory(factory)
}

/// Registers a factory handing out shared values in the default registry.
pub fn register_shared_factory<T, F>(factory: F) -> Result<()>
where
    T: Send + Sync + 'static,
    F: Fn() -> Arc<T> + Send + Sync + 'static,
{
    default_registry().register_shared_factory(factory)
}

/// Empties the default registry.
pub fn clear_dependencies() {
    default_registry().clear();
}

/// Applies injection to `T`, resolving from the default registry.
///
/// The registry is looked up on every construction, not captured now.
pub fn inject<T: Injectable>() -> Result<Injected<T>> {
    apply_with::<T>(Binding::Default)
}

/// Applies injection to `T`, resolving from `registry`.
pub fn inject_with<T: Injectable>(registry: &Arc<Registry>) -> Result<Injected<T>> {
    apply_with::<T>(Binding::Fixed(registry.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependencies::Dependencies;
    use crate::error::InfuseError;
    use crate::injector::construct;
    use crate::manifest::Manifest;
    use serial_test::serial;

    #[derive(Debug)]
    struct Dependency;

    #[test]
    #[serial]
    fn default_registry_is_created_once() {
        reset_default_registry();
        assert!(current_default_registry().is_none());

        let registry = default_registry();
        assert!(Arc::ptr_eq(&registry, &default_registry()));
        assert!(Arc::ptr_eq(&registry, &current_default_registry().unwrap()));
    }

    #[test]
    #[serial]
    fn set_replaces_default_registry() {
        reset_default_registry();

        let registry = Registry::shared();
        set_default_registry(registry.clone());

        assert!(Arc::ptr_eq(&registry, &default_registry()));
        assert!(Arc::ptr_eq(&registry, default_injector().registry()));
    }

    #[test]
    #[serial]
    fn register_forwards_to_default_registry() {
        reset_default_registry();

        let instance = Arc::new(Dependency);
        register_shared(instance.clone()).unwrap();

        let got = default_registry().get::<Dependency>().unwrap();
        assert!(Arc::ptr_eq(&instance, &got));
        assert!(matches!(register(Dependency), Err(InfuseError::AlreadyRegistered(_))));
    }

    #[test]
    #[serial]
    fn register_factory_forwards_to_default_registry() {
        reset_default_registry();

        let instance = Arc::new(Dependency);
        register_shared_factory({
            let instance = instance.clone();
            move || instance.clone()
        })
        .unwrap();
        register_factory(|| 5u8).unwrap();

        assert!(Arc::ptr_eq(&instance, &default_registry().get::<Dependency>().unwrap()));
        assert_eq!(*default_registry().get::<u8>().unwrap(), 5);
    }

    #[test]
    #[serial]
    fn reset_discards_registrations() {
        reset_default_registry();
        register(Dependency).unwrap();

        reset_default_registry();
        assert!(default_registry().get::<Dependency>().unwrap_err().is_not_found());
    }

    #[derive(Debug)]
    struct Consumer {
        dep: Arc<Dependency>,
    }

    impl Injectable for Consumer {
        type Args = ();

        fn manifest() -> Manifest {
            Manifest::builder::<Self>().field::<Dependency>("dep").build()
        }

        fn initialize(deps: Dependencies, _: ()) -> Result<Self> {
            Ok(Self { dep: deps.get("dep")? })
        }
    }

    #[test]
    #[serial]
    fn injected_types_follow_the_current_default() {
        reset_default_registry();
        inject::<Consumer>().unwrap();

        let first = Arc::new(Dependency);
        register_shared(first.clone()).unwrap();
        assert!(Arc::ptr_eq(&first, &construct::<Consumer>(()).unwrap().dep));

        clear_dependencies();
        assert!(construct::<Consumer>(()).unwrap_err().is_injection_failure());

        let replacement = Registry::shared();
        let second = Arc::new(Dependency);
        replacement.register_shared(second.clone()).unwrap();
        set_default_registry(replacement);
        assert!(Arc::ptr_eq(&second, &construct::<Consumer>(()).unwrap().dep));
    }

    #[derive(Debug)]
    struct Pinned {
        dep: Arc<Dependency>,
    }

    impl Injectable for Pinned {
        type Args = ();

        fn manifest() -> Manifest {
            Manifest::builder::<Self>().field::<Dependency>("dep").build()
        }

        fn initialize(deps: Dependencies, _: ()) -> Result<Self> {
            Ok(Self { dep: deps.get("dep")? })
        }
    }

    #[test]
    #[serial]
    fn inject_with_pins_a_registry() {
        reset_default_registry();

        let registry = Registry::shared();
        let pinned = Arc::new(Dependency);
        registry.register_shared(pinned.clone()).unwrap();
        inject_with::<Pinned>(&registry).unwrap();

        register(Dependency).unwrap();
        assert!(Arc::ptr_eq(&pinned, &construct::<Pinned>(()).unwrap().dep));
    }
}
