//! Derive macros for infuse.
//!
//! Re-exports [`Injectable`](macro@Injectable) from `infuse-macros` so the
//! proc-macro crate stays an implementation detail.

pub use infuse_macros::Injectable;
