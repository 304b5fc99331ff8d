//! # infuse: registry-backed field injection
//!
//! Register instances or factories against a type, mark consumer types with
//! `#[derive(Injectable)]`, and have their `Arc` fields filled from the
//! registry right before their initializer runs.
//!
//! ```rust
//! use std::sync::Arc;
//! use infuse::{Injectable, Injector, construct};
//!
//! struct Clock;
//!
//! #[derive(Injectable)]
//! struct Scheduler {
//!     #[inject]
//!     clock: Arc<Clock>,
//!     queued: usize,
//! }
//!
//! let injector = Injector::new();
//! injector.apply::<Scheduler>().unwrap();
//! injector.registry().register_instance(Clock).unwrap();
//!
//! let scheduler = construct::<Scheduler>(()).unwrap();
//! assert_eq!(scheduler.queued, 0);
//! ```
//!
//! ## What can be derived
//!
//! Only structs with named fields take injection. Enums, unions and
//! tuple or unit structs are rejected as unsupported injection targets:
//!
//! ```compile_fail
//! use std::sync::Arc;
//! use infuse::Injectable;
//!
//! struct Clock;
//!
//! #[derive(Injectable)]
//! enum Trigger {
//!     Manual,
//!     Scheduled(Arc<Clock>),
//! }
//! ```
//!
//! ```compile_fail
//! use std::sync::Arc;
//! use infuse::Injectable;
//!
//! struct Clock;
//!
//! #[derive(Injectable)]
//! struct Ticker(Arc<Clock>);
//! ```
//!
//! ```compile_fail
//! use infuse::Injectable;
//!
//! #[derive(Injectable)]
//! struct Heartbeat;
//! ```
//!
//! ```compile_fail
//! use infuse::Injectable;
//!
//! #[derive(Injectable)]
//! union Word {
//!     bits: u32,
//!     value: f32,
//! }
//! ```
//!
//! An `#[inject]` field holds the shared value, so it must be an `Arc<T>`:
//!
//! ```compile_fail
//! use infuse::Injectable;
//!
//! struct Clock;
//!
//! #[derive(Injectable)]
//! struct Scheduler {
//!     #[inject]
//!     clock: Box<Clock>,
//! }
//! ```
//!
//! Generic parameters are bounded by `Send + Sync + 'static`, the same as
//! registered values, so borrowed type parameters are rejected:
//!
//! ```compile_fail
//! use std::sync::Arc;
//! use infuse::Injectable;
//!
//! #[derive(Injectable)]
//! struct Holder<'a, T> {
//!     #[inject]
//!     value: Arc<T>,
//!     label: &'a str,
//! }
//! ```

pub use infuse_container::*;
pub use infuse_derive::*;
pub use infuse_support::*;
