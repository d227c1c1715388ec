//! A deferred-computation engine.
//!
//! Values are built lazily as graphs of [`Thunk`]s, each a pending function
//! application. [`force`] evaluates a graph to normal form, memoizing every
//! node on the way. Operators applied to thunks build new thunks instead of
//! running, so laziness flows through arithmetic, comparison, attribute and
//! item access, calls and iteration.
//!
//! ```
//! use deferred_core::{Value, force, wrap_expression};
//!
//! let x = wrap_expression(Value::Int(5));
//! let sum = x.binary_op(deferred_core::ops::BinaryOp::Add, &Value::Int(3)).unwrap();
//! assert!(sum.is_thunk());
//! assert_eq!(force(&sum).unwrap(), Value::Int(8));
//! ```

pub mod data;
pub mod errors;
pub mod graph;
pub mod ops;
pub mod options;
pub mod strict;
pub mod thunk;
pub mod undefined;
pub mod values;

pub use data::LazyList;
pub use errors::{Error, Result};
pub use graph::{Children, CycleCollector, ExprTree, Trace, children};
pub use ops::{BinaryOp, CompareOp, OperatorWrapper, UnaryOp};
pub use options::ForceOptions;
pub use strict::{is_strict, normalize};
pub use thunk::{Evaluator, NodeKind, Thunk, force, make_node, seq, wrap_expression};
pub use undefined::{is_undefined, undefined};
pub use values::{Function, Key, Kwargs, Object, Value};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_memoization() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
