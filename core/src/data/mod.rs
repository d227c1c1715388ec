//! Lazy data structures.
//!
//! These are ordinary [`Object`](crate::values::Object)s that produce their
//! contents on demand and force to a strict equivalent.

pub mod list;

pub use list::{Items, LazyList};
