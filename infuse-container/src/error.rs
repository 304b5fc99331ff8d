//! Error types for registry and injection operations.
//!
//! Every failure is returned to the immediate caller. Only
//! [`InfuseError::InjectionFailure`] wraps another error, so a caller can
//! tell "this type could not be injected" apart from "this key is missing".

use std::error::Error as StdError;
use std::fmt;

use infuse_support::rendering::shorten_type_name;

use crate::key::DependencyKey;

/// Boxed error returned by fallible factories.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Main error type for all infuse operations.
#[derive(Debug, thiserror::Error)]
pub enum InfuseError {
    /// A lookup found no entry for the key.
    #[error("{}", .0)]
    NotFound(NotFoundError),

    /// A register call targeted a key that already has an entry.
    #[error("{}", .0)]
    AlreadyRegistered(AlreadyRegisteredError),

    /// Injection was applied to something that does not describe a struct.
    #[error("{}", .0)]
    InjectionNotSupported(InjectionNotSupportedError),

    /// Resolving the declared fields of `target` hit a missing dependency.
    #[error(
        "Failed to inject dependencies into {}: field `{field}` could not be resolved",
        shorten_type_name(.target)
    )]
    InjectionFailure {
        target: &'static str,
        field: &'static str,
        #[source]
        source: NotFoundError,
    },

    /// A field was read from [`Dependencies`](crate::Dependencies) but was
    /// never resolved for this construction.
    #[error(
        "Field `{field}` of {} was never injected\n  Hint: fields of a chained type are only set when its initializer calls construct::<T>()",
        shorten_type_name(.target)
    )]
    UnresolvedField {
        target: &'static str,
        field: String,
    },

    /// A stored value did not have the type it was requested as.
    #[error("Type mismatch for {key}: expected {}", shorten_type_name(.expected))]
    TypeMismatch {
        key: DependencyKey,
        expected: &'static str,
    },

    /// A fallible factory returned an error. Passed through untouched,
    /// except that a missing key looked up by the factory surfaces from
    /// [`construct`](crate::construct) as [`InfuseError::InjectionFailure`].
    #[error(transparent)]
    Factory(BoxError),
}

impl InfuseError {
    /// Returns the key that could not be found, looking through
    /// [`InfuseError::InjectionFailure`] to its cause.
    pub fn missing_key(&self) -> Option<&DependencyKey> {
        match self {
            InfuseError::NotFound(e) => Some(&e.key),
            InfuseError::InjectionFailure { source, .. } => Some(&source.key),
            _ => None,
        }
    }

    /// Returns true for [`InfuseError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, InfuseError::NotFound(_))
    }

    /// Returns true for [`InfuseError::InjectionFailure`].
    pub fn is_injection_failure(&self) -> bool {
        matches!(self, InfuseError::InjectionFailure { .. })
    }
}

/// Error when a key has no entry in the registry.
#[derive(Debug, Clone)]
pub struct NotFoundError {
    /// The dependency that was requested
    pub key: DependencyKey,
    /// Registered types with a similar name
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency {} has not been found in the registry", self.key)?;

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        Ok(())
    }
}

impl StdError for NotFoundError {}

/// Error when a key is registered a second time.
#[derive(Debug, Clone)]
pub struct AlreadyRegisteredError {
    pub key: DependencyKey,
}

impl fmt::Display for AlreadyRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency {} already registered", self.key)?;
        write!(
            f,
            "\n  Hint: call clear() first, or register under a named key"
        )
    }
}

/// Error when a manifest cannot describe the type it is applied to.
#[derive(Debug, Clone)]
pub struct InjectionNotSupportedError {
    /// The type injection was applied to
    pub target: &'static str,
    /// What is wrong with it
    pub reason: String,
}

impl fmt::Display for InjectionNotSupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unsupported injection target {}: {}",
            shorten_type_name(self.target),
            self.reason
        )
    }
}

/// Convenient Result type for infuse operations.
pub type Result<T> = std::result::Result<T, InfuseError>;
