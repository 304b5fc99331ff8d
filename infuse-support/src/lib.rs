//! # Infuse Support
//!
//! Shared helpers for the infuse crates.
//!
//! This crate provides:
//! - Short, readable type names for error messages
//! - "Did you mean?" suggestions for missing dependencies

pub mod rendering;
