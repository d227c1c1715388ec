//! Errors raised while building or forcing deferred values.
//!
//! Errors produced by user functions travel through the engine untouched: the
//! engine never wraps an error it did not create, and a node whose forcing
//! failed stays pending so that a later attempt recomputes it.

use std::fmt;
use std::rc::Rc;

use ecow::EcoString;
use thiserror::Error;

use crate::values::Value;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A node was built (or forced) with a function that cannot be called.
    #[error("'{type_name}' object is not callable")]
    NotCallable { type_name: EcoString },

    /// An iteration step was requested on a value that is not an iterator.
    #[error("'{type_name}' object is not an iterator")]
    NotIterator { type_name: EcoString },

    /// The undefined sentinel (or a value built the same way) was forced.
    ///
    /// Carries the sentinel itself so handlers can recover its identity.
    #[error("undefined")]
    Undefined(Value),

    /// An operation was applied to operands of the wrong type.
    #[error("{0}")]
    Type(EcoString),

    #[error("'{type_name}' object has no attribute '{name}'")]
    Attribute { type_name: EcoString, name: EcoString },

    #[error("index {index} out of range for length {len}")]
    Index { index: i64, len: usize },

    #[error("key not found: {0}")]
    Key(EcoString),

    /// An operand had the right type but an unusable value.
    #[error("{0}")]
    Value(EcoString),

    #[error("division by zero")]
    ZeroDivision,

    #[error("integer overflow in {op}")]
    Overflow { op: &'static str },

    /// A node was forced again while its own forcing was still running.
    #[error("node forced while it was already being forced")]
    CyclicForce,

    /// Forcing nested deeper than the configured limit.
    #[error("forcing depth {depth} exceeds maximum of {max_depth}")]
    RecursionLimit { depth: usize, max_depth: usize },

    /// The node's references were released by the cycle collector.
    #[error("node was released by the cycle collector")]
    Released,

    /// An error raised by user code, passed through unchanged.
    #[error("{0}")]
    Domain(Rc<dyn std::error::Error>),
}

impl Error {
    /// Lift an arbitrary user error into the engine's error type.
    pub fn domain<E: std::error::Error + 'static>(error: E) -> Self {
        Error::Domain(Rc::new(error))
    }

    pub fn type_error(message: impl fmt::Display) -> Self {
        Error::Type(ecow::eco_format!("{}", message))
    }

    pub fn value_error(message: impl fmt::Display) -> Self {
        Error::Value(ecow::eco_format!("{}", message))
    }

    pub(crate) fn not_callable(value: &Value) -> Self {
        Error::NotCallable {
            type_name: value.type_name(),
        }
    }

    pub(crate) fn not_iterator(value: &Value) -> Self {
        Error::NotIterator {
            type_name: value.type_name(),
        }
    }

    pub(crate) fn no_attribute(value: &Value, name: &str) -> Self {
        Error::Attribute {
            type_name: value.type_name(),
            name: name.into(),
        }
    }

    /// Returns the sentinel carried by an [`Error::Undefined`].
    pub fn undefined_payload(&self) -> Option<&Value> {
        match self {
            Error::Undefined(value) => Some(value),
            _ => None,
        }
    }
}
