//! Core registry and injection machinery for infuse.

pub mod dependencies;
pub mod error;
pub mod global;
pub mod injector;
pub mod key;
pub mod manifest;
pub mod registry;

pub use dependencies::Dependencies;
pub use error::{BoxError, InfuseError, Result};
pub use global::{
    clear_dependencies, current_default_registry, default_injector, default_registry, inject,
    inject_with, register, register_factory, register_shared, register_shared_factory,
    reset_default_registry, set_default_registry,
};
pub use injector::{Injectable, Injected, Injector, construct, is_applied};
pub use key::DependencyKey;
pub use manifest::{FieldSpec, Manifest, ManifestBuilder};
pub use registry::{EntryInfo, EntryKind, Registry, Shared};

pub mod prelude {
    pub use crate::dependencies::Dependencies;
    pub use crate::error::{InfuseError, Result};
    pub use crate::injector::{Injectable, Injected, Injector, construct};
    pub use crate::key::DependencyKey;
    pub use crate::manifest::Manifest;
    pub use crate::registry::Registry;
}
