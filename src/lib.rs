//! Deferred - lazy values with transparent operators
//!
//! # Overview
//!
//! A deferred value is a pending function application. Nothing runs when it
//! is built; forcing it computes the value once and memoizes it. Operators
//! applied to deferred values build further deferred values, so ordinary
//! arithmetic, comparisons, attribute and item access, calls and iteration all
//! stay lazy until the result is forced.
//!
//! # Quick Start
//!
//! ```
//! use deferred::{Value, force, make_node, wrap_expression};
//!
//! fn double(args: &[Value], _kwargs: Option<&deferred::Kwargs>) -> deferred::Result<Value> {
//!     args[0].binary_op(deferred::BinaryOp::Mul, &Value::Int(2))
//! }
//!
//! let x = wrap_expression(Value::Int(20));
//! let doubled = make_node(Value::native("double", double), [x], None).unwrap();
//! let answer = doubled.binary_op(deferred::BinaryOp::Add, &Value::Int(2)).unwrap();
//!
//! assert!(answer.is_thunk());
//! assert_eq!(force(&answer).unwrap(), Value::Int(42));
//! ```
//!
//! # Escaping laziness
//!
//! Types that should never be deferred implement [`Object::is_strict`], and
//! types that know how to compute themselves implement
//! [`Object::normalize`]. The [`undefined`] sentinel is built from the latter:
//! forcing it always fails with [`Error::Undefined`].
//!
//! # Introspection
//!
//! [`children`] reports the recipe of a pending node or the value of a forced
//! one, and [`ExprTree`] converts whole graphs to explicit trees and back.
//!
//! # Lazy lists
//!
//! [`LazyList`] is a cons list whose rest is produced on first access. It
//! forces to the tuple of its forced elements.

// Re-export public API from deferred_core
pub use deferred_core::{
    BinaryOp, Children, CompareOp, CycleCollector, Error, Evaluator, ExprTree, ForceOptions,
    LazyList, NodeKind, OperatorWrapper, Result, Thunk, Trace, UnaryOp, children, force,
    is_strict, is_undefined, make_node, normalize, seq, undefined, wrap_expression,
};

// Re-export commonly used values
pub use deferred_core::values::{self, Closure, Function, Key, Kwargs, NativeFn, NativeFunction, Object, Value};

// Re-export operator registry
pub use deferred_core::ops::{self, wrapper};

pub use deferred_core::data;
