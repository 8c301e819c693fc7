//! Payload validation
//!
//! The reusable field validators live in [`validators`]; the ordered
//! per-resource check sequences are implemented on each resource type
//! (see `crate::resources`).

pub mod validators;

pub use validators::*;
