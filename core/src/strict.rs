//! Opting out of laziness.
//!
//! A value escapes laziness in one of two ways:
//!
//! 1. Its type is marked strict ([`Function::is_strict`], [`Object::is_strict`]).
//!    Strict constructors are called at node construction time instead of
//!    being deferred.
//! 2. The value knows how to normalize itself ([`Object::has_normalize`]).
//!    Forcing calls that hook instead of treating the value as normal.
//!
//! Neither is required: a value with no capability is simply already normal.
//!
//! [`Function::is_strict`]: crate::values::Function::is_strict
//! [`Object::is_strict`]: crate::values::Object::is_strict
//! [`Object::has_normalize`]: crate::values::Object::has_normalize

use crate::{errors::Result, thunk::force, values::Value};

/// Whether `value` is never wrapped in a node.
pub fn is_strict(value: &Value) -> bool {
    match value {
        Value::Function(function) => function.is_strict(),
        Value::Object(object) => object.is_strict() || object.has_normalize(),
        _ => false,
    }
}

/// Whether `value` carries its own normalization hook.
pub fn can_normalize(value: &Value) -> bool {
    matches!(value, Value::Object(object) if object.has_normalize())
}

/// Run the normalization hook once, if `value` has one.
pub(crate) fn normalize_step(value: &Value) -> Option<Result<Value>> {
    match value {
        Value::Object(object) if object.has_normalize() => Some(object.normalize(value)),
        _ => None,
    }
}

/// Bring a value to normal form: thunks are forced and normalization hooks
/// are applied until the value stops changing.
pub fn normalize(value: &Value) -> Result<Value> {
    force(value)
}
