//! Dependency registry: maps keys to instances or factories.
//!
//! A [`Registry`] holds at most one entry per [`DependencyKey`]. An entry is
//! either a stored instance, handed out as the same [`Arc`] on every
//! lookup, or a factory, called afresh on every lookup.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, instrument, trace};

use infuse_support::rendering::suggest_similar;

use crate::error::{AlreadyRegisteredError, BoxError, InfuseError, NotFoundError, Result};
use crate::key::DependencyKey;

/// Type-erased value handed out by a registry.
pub type Shared = Arc<dyn Any + Send + Sync>;

/// Type-erased factory stored in a registry.
///
/// `Arc` so a lookup can clone it out and release the lock before calling.
pub(crate) type FactoryFn = Arc<dyn Fn() -> std::result::Result<Shared, BoxError> + Send + Sync>;

const MAX_SUGGESTIONS: usize = 3;

/// One registration.
#[derive(Clone)]
pub(crate) enum Entry {
    Instance(Shared),
    Factory(FactoryFn),
}

impl Entry {
    fn factory<F>(factory: F) -> Self
    where
        F: Fn() -> std::result::Result<Shared, BoxError> + Send + Sync + 'static,
    {
        Entry::Factory(Arc::new(factory))
    }

    fn kind(&self) -> EntryKind {
        match self {
            Entry::Instance(_) => EntryKind::Instance,
            Entry::Factory(_) => EntryKind::Factory,
        }
    }
}

/// How a key is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// The same stored value on every lookup.
    Instance,
    /// A fresh value from a factory on every lookup.
    Factory,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Instance => write!(f, "instance"),
            EntryKind::Factory => write!(f, "factory"),
        }
    }
}

/// Serializable description of one registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub type_name: &'static str,
    pub name: Option<&'static str>,
    pub kind: EntryKind,
}

/// Stores dependency registrations.
///
/// All methods take `&self`; the map sits behind a read-biased lock so a
/// registry can be shared as `Arc<Registry>` between injectors and threads.
///
/// # Examples
/// ```
/// use infuse_container::Registry;
///
/// struct Clock { offset: i64 }
///
/// let registry = Registry::new();
/// registry.register_instance(Clock { offset: 3 }).unwrap();
///
/// let clock = registry.get::<Clock>().unwrap();
/// assert_eq!(clock.offset, 3);
/// ```
pub struct Registry {
    entries: RwLock<HashMap<DependencyKey, Entry>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an empty registry ready to be shared.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // ── Instances ──

    /// Registers `instance` as the value for `T`.
    ///
    /// # Errors
    /// [`InfuseError::AlreadyRegistered`] if `T` already has an entry.
    pub fn register_instance<T: Send + Sync + 'static>(&self, instance: T) -> Result<()> {
        self.register_shared(Arc::new(instance))
    }

    /// Registers an already shared instance; lookups return this very `Arc`.
    pub fn register_shared<T: Send + Sync + 'static>(&self, instance: Arc<T>) -> Result<()> {
        self.insert(DependencyKey::of::<T>(), Entry::Instance(instance))
    }

    /// Registers `instance` for `T` under a binding name.
    pub fn register_named_instance<T: Send + Sync + 'static>(
        &self,
        name: &'static str,
        instance: T,
    ) -> Result<()> {
        self.insert(DependencyKey::named::<T>(name), Entry::Instance(Arc::new(instance)))
    }

    // ── Factories ──

    /// Registers a factory for `T`, called on every lookup.
    ///
    /// # Errors
    /// [`InfuseError::AlreadyRegistered`] if `T` already has an entry.
    pub fn register_factory<T, F>(&self, factory: F) -> Result<()>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert(
            DependencyKey::of::<T>(),
            Entry::factory(move || Ok(Arc::new(factory()) as Shared)),
        )
    }

    /// Registers a factory that hands out shared values itself.
    pub fn register_shared_factory<T, F>(&self, factory: F) -> Result<()>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.insert(
            DependencyKey::of::<T>(),
            Entry::factory(move || Ok(factory() as Shared)),
        )
    }

    /// Registers a factory for `T` under a binding name.
    pub fn register_named_factory<T, F>(&self, name: &'static str, factory: F) -> Result<()>
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert(
            DependencyKey::named::<T>(name),
            Entry::factory(move || Ok(Arc::new(factory()) as Shared)),
        )
    }

    /// Registers a factory that may fail.
    ///
    /// Its error reaches the caller of [`get`](Self::get) as
    /// [`InfuseError::Factory`], unchanged.
    pub fn try_register_factory<T, E, F>(&self, factory: F) -> Result<()>
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn() -> std::result::Result<T, E> + Send + Sync + 'static,
    {
        self.insert(
            DependencyKey::of::<T>(),
            Entry::factory(move || {
                factory().map(|value| Arc::new(value) as Shared).map_err(Into::into)
            }),
        )
    }

    // ── Lookup ──

    /// Returns the value registered for `T`.
    ///
    /// # Errors
    /// - [`InfuseError::NotFound`] if nothing is registered for `T`
    /// - [`InfuseError::Factory`] if a fallible factory failed
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let key = DependencyKey::of::<T>();
        downcast(key, self.get_key(&key)?)
    }

    /// Returns the value registered for `T` under `name`.
    pub fn get_named<T: Send + Sync + 'static>(&self, name: &'static str) -> Result<Arc<T>> {
        let key = DependencyKey::named::<T>(name);
        downcast(key, self.get_key(&key)?)
    }

    /// Untyped lookup.
    ///
    /// The lock is released before a factory runs, so factories may look
    /// up other dependencies from the same registry.
    pub fn get_key(&self, key: &DependencyKey) -> Result<Shared> {
        let entry = self.entries.read().get(key).cloned();

        match entry {
            Some(Entry::Instance(value)) => {
                trace!(key = %key, "Resolved instance");
                Ok(value)
            }
            Some(Entry::Factory(factory)) => {
                trace!(key = %key, "Calling factory");
                factory().map_err(InfuseError::Factory)
            }
            None => {
                debug!(key = %key, "Dependency not found");
                Err(InfuseError::NotFound(NotFoundError {
                    key: *key,
                    suggestions: self.find_suggestions(key),
                }))
            }
        }
    }

    /// Returns true if `key` has an entry.
    pub fn contains(&self, key: &DependencyKey) -> bool {
        self.entries.read().contains_key(key)
    }

    // ── Housekeeping ──

    /// Forgets every entry.
    ///
    /// Values already handed out stay alive with their holders.
    #[instrument(skip(self), name = "registry_clear")]
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        debug!(removed = entries.len(), "Clearing registry");
        entries.clear();
    }

    /// Returns the number of registered dependencies.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if no dependencies are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the key of every registration, in no particular order.
    pub fn registered_keys(&self) -> Vec<DependencyKey> {
        self.entries.read().keys().copied().collect()
    }

    /// Describes every registration, sorted by type name then binding name.
    pub fn entries(&self) -> Vec<EntryInfo> {
        let mut infos: Vec<EntryInfo> = self
            .entries
            .read()
            .iter()
            .map(|(key, entry)| EntryInfo {
                type_name: key.type_name(),
                name: key.name(),
                kind: entry.kind(),
            })
            .collect();
        infos.sort_by(|a, b| a.type_name.cmp(b.type_name).then_with(|| a.name.cmp(&b.name)));
        infos
    }

    // ── Internal ──

    fn insert(&self, key: DependencyKey, entry: Entry) -> Result<()> {
        let mut entries = self.entries.write();

        if entries.contains_key(&key) {
            return Err(InfuseError::AlreadyRegistered(AlreadyRegisteredError { key }));
        }

        debug!(key = %key, kind = %entry.kind(), "Registered dependency");
        entries.insert(key, entry);
        Ok(())
    }

    /// Other bindings of the same type come first, then similarly named types.
    fn find_suggestions(&self, key: &DependencyKey) -> Vec<String> {
        let entries = self.entries.read();

        let mut same_type: Vec<String> = entries
            .keys()
            .filter(|k| DependencyKey::type_id(k) == key.type_id() && *k != key)
            .map(|k| match k.name() {
                Some(name) => format!("{} (name={:?})", k.type_name(), name),
                None => k.type_name().to_string(),
            })
            .collect();
        same_type.sort();
        same_type.truncate(MAX_SUGGESTIONS);

        let others: Vec<&str> = entries
            .keys()
            .filter(|k| DependencyKey::type_id(k) != key.type_id())
            .map(|k| k.type_name())
            .collect();
        let remaining = MAX_SUGGESTIONS - same_type.len();
        same_type.extend(suggest_similar(key.type_name(), &others, remaining));
        same_type
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("registered", &self.len())
            .finish()
    }
}

/// Recovers the concrete type of a value fetched under `key`.
pub(crate) fn downcast<T: Send + Sync + 'static>(key: DependencyKey, value: Shared) -> Result<Arc<T>> {
    value.downcast::<T>().map_err(|_| InfuseError::TypeMismatch {
        key,
        expected: type_name::<T>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Database {
        url: String,
    }

    #[derive(Debug)]
    struct Clock;

    #[test]
    fn instance_is_the_same_arc_every_time() {
        let registry = Registry::new();
        let db = Arc::new(Database { url: "postgres://localhost".into() });
        registry.register_shared(db.clone()).unwrap();

        let a = registry.get::<Database>().unwrap();
        let b = registry.get::<Database>().unwrap();
        assert!(Arc::ptr_eq(&db, &a));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.url, "postgres://localhost");
    }

    #[test]
    fn factory_called_once_per_lookup() {
        let registry = Registry::new();
        let calls = Arc::new(AtomicU32::new(0));

        registry
            .register_factory::<u32, _>({
                let calls = calls.clone();
                move || calls.fetch_add(1, Ordering::SeqCst)
            })
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(*registry.get::<u32>().unwrap(), 0);
        assert_eq!(*registry.get::<u32>().unwrap(), 1);
        assert_eq!(*registry.get::<u32>().unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn factory_results_are_not_cached() {
        let registry = Registry::new();
        registry
            .register_factory(|| Database { url: "sqlite::memory:".into() })
            .unwrap();

        let a = registry.get::<Database>().unwrap();
        let b = registry.get::<Database>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn shared_factory_keeps_identity() {
        let registry = Registry::new();
        let db = Arc::new(Database { url: "x".into() });
        registry
            .register_shared_factory({
                let db = db.clone();
                move || db.clone()
            })
            .unwrap();

        assert!(Arc::ptr_eq(&db, &registry.get::<Database>().unwrap()));
    }

    #[test]
    fn duplicate_registration_fails_for_every_combination() {
        fn instance(r: &Registry) -> Result<()> {
            r.register_instance(Clock)
        }
        fn factory(r: &Registry) -> Result<()> {
            r.register_factory(|| Clock)
        }

        let combos: [(fn(&Registry) -> Result<()>, fn(&Registry) -> Result<()>); 4] = [
            (instance, instance),
            (instance, factory),
            (factory, instance),
            (factory, factory),
        ];

        for (first, second) in combos {
            let registry = Registry::new();
            first(&registry).unwrap();

            let err = second(&registry).unwrap_err();
            assert!(matches!(err, InfuseError::AlreadyRegistered(ref e) if e.key == DependencyKey::of::<Clock>()));

            // The first entry survives.
            assert!(registry.get::<Clock>().is_ok());
            assert_eq!(registry.len(), 1);
        }
    }

    #[test]
    fn failed_registration_keeps_original_instance() {
        let registry = Registry::new();
        let first = Arc::new(Database { url: "first".into() });
        registry.register_shared(first.clone()).unwrap();

        assert!(registry.register_instance(Database { url: "second".into() }).is_err());
        assert!(Arc::ptr_eq(&first, &registry.get::<Database>().unwrap()));
    }

    #[test]
    fn missing_key_is_not_found() {
        let registry = Registry::new();

        match registry.get::<Database>().unwrap_err() {
            InfuseError::NotFound(e) => assert_eq!(e.key, DependencyKey::of::<Database>()),
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn clear_forgets_everything() {
        let registry = Registry::new();
        registry.register_instance(Clock).unwrap();
        registry.register_factory(|| 7u8).unwrap();
        let held = registry.get::<Clock>().unwrap();

        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.get::<Clock>().unwrap_err().is_not_found());
        assert!(registry.get::<u8>().unwrap_err().is_not_found());
        // Values handed out before the clear are still usable.
        assert_eq!(Arc::strong_count(&held), 1);

        // The key can be registered again afterwards.
        registry.register_instance(Clock).unwrap();
    }

    #[test]
    fn named_entries_are_separate_keys() {
        let registry = Registry::new();
        registry.register_named_instance("primary", Database { url: "p".into() }).unwrap();
        registry.register_named_factory("replica", || Database { url: "r".into() }).unwrap();

        assert_eq!(registry.get_named::<Database>("primary").unwrap().url, "p");
        assert_eq!(registry.get_named::<Database>("replica").unwrap().url, "r");
        assert!(registry.get::<Database>().unwrap_err().is_not_found());
        assert!(registry.register_named_instance("primary", Database { url: "again".into() }).is_err());
    }

    #[test]
    fn fallible_factory_error_propagates_unchanged() {
        #[derive(Debug, thiserror::Error)]
        #[error("connection refused")]
        struct ConnectError;

        let registry = Registry::new();
        registry
            .try_register_factory::<Database, _, _>(|| Err(ConnectError))
            .unwrap();

        match registry.get::<Database>().unwrap_err() {
            InfuseError::Factory(inner) => {
                assert!(inner.downcast_ref::<ConnectError>().is_some());
            }
            other => panic!("Expected Factory error, got: {other:?}"),
        }
    }

    #[test]
    fn factory_may_consult_its_registry() {
        let registry = Arc::new(Registry::new());
        registry.register_instance(String::from("postgres://db")).unwrap();

        let weak = Arc::downgrade(&registry);
        registry
            .try_register_factory(move || -> std::result::Result<Database, BoxError> {
                let registry = weak.upgrade().ok_or("registry dropped")?;
                let url = registry.get::<String>()?;
                Ok(Database { url: url.to_string() })
            })
            .unwrap();

        assert_eq!(registry.get::<Database>().unwrap().url, "postgres://db");
    }

    #[test]
    fn not_found_suggests_similar_types() {
        mod v1 {
            pub struct Clock;
        }

        let registry = Registry::new();
        registry.register_instance(v1::Clock).unwrap();

        match registry.get::<Clock>().unwrap_err() {
            InfuseError::NotFound(e) => {
                assert_eq!(e.suggestions.len(), 1);
                assert!(e.suggestions[0].ends_with("v1::Clock"));
            }
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn not_found_suggests_other_bindings_of_the_same_type() {
        let registry = Registry::new();
        registry.register_named_instance("utc", Clock).unwrap();
        registry.register_named_factory("local", || Clock).unwrap();

        match registry.get::<Clock>().unwrap_err() {
            InfuseError::NotFound(e) => assert_eq!(
                e.suggestions,
                vec![
                    format!("{} (name=\"local\")", type_name::<Clock>()),
                    format!("{} (name=\"utc\")", type_name::<Clock>()),
                ]
            ),
            other => panic!("Expected NotFound, got: {other:?}"),
        }

        registry.register_instance(Clock).unwrap();
        match registry.get_named::<Clock>("tz").unwrap_err() {
            InfuseError::NotFound(e) => {
                assert_eq!(e.suggestions.len(), 3);
                assert_eq!(e.suggestions[0], type_name::<Clock>());
            }
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn registered_keys_lists_every_binding() {
        let registry = Registry::new();
        registry.register_instance(Clock).unwrap();
        registry.register_named_factory("utc", || Clock).unwrap();

        let mut keys = registry.registered_keys();
        keys.sort_by_key(|k| k.name());
        assert_eq!(
            keys,
            vec![DependencyKey::of::<Clock>(), DependencyKey::named::<Clock>("utc")]
        );

        registry.clear();
        assert!(registry.registered_keys().is_empty());
    }

    #[test]
    fn entries_snapshot_serializes() {
        let registry = Registry::new();
        registry.register_instance(7u16).unwrap();
        registry.register_named_factory("boot", || 1u64).unwrap();

        let json = serde_json::to_value(registry.entries()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                { "type_name": "u16", "name": null, "kind": "instance" },
                { "type_name": "u64", "name": "boot", "kind": "factory" },
            ])
        );
    }

    #[test]
    fn debug_shows_count() {
        let registry = Registry::new();
        registry.register_instance(1i32).unwrap();
        let debug = format!("{registry:?}");
        assert!(debug.contains("Registry"));
        assert!(debug.contains('1'));
    }
}
