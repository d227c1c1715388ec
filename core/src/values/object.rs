//! User-defined values.
//!
//! `Object` is the capability table of a user type. Every method has a default
//! that means "capability absent", so a type only implements what it
//! supports. The interception layer and the primitive operations consult these
//! methods instead of probing values at runtime.

use std::any::Any;
use std::fmt;

use ecow::{EcoString, eco_format};

use crate::{
    errors::{Error, Result},
    ops::{BinaryOp, CompareOp, UnaryOp},
    values::{Kwargs, Value},
};

/// Upcast helper so that `dyn Object` can be downcast to its concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub trait Object: AsAny + 'static {
    fn type_name(&self) -> &str;

    // ------------------------------------------------------------------------
    // Strictness
    // ------------------------------------------------------------------------

    /// The value's type is marked strict: it is never wrapped in a node, and
    /// when used as a node's function with arguments it is called at once.
    fn is_strict(&self) -> bool {
        false
    }

    /// The value knows how to force itself (see [`Object::normalize`]).
    fn has_normalize(&self) -> bool {
        false
    }

    /// Produce the normal form of this value. `this` is the value wrapping
    /// `self`. Only consulted when [`Object::has_normalize`] is true.
    fn normalize(&self, this: &Value) -> Result<Value> {
        Ok(this.clone())
    }

    // ------------------------------------------------------------------------
    // Attributes and items
    // ------------------------------------------------------------------------

    fn get_attr(&self, name: &str) -> Result<Value> {
        Err(Error::Attribute {
            type_name: self.type_name().into(),
            name: name.into(),
        })
    }

    fn set_attr(&self, name: &str, _value: Value) -> Result<()> {
        Err(Error::type_error(eco_format!(
            "'{}' object does not support attribute assignment ('{}')",
            self.type_name(),
            name
        )))
    }

    fn del_attr(&self, name: &str) -> Result<()> {
        Err(Error::type_error(eco_format!(
            "'{}' object does not support attribute deletion ('{}')",
            self.type_name(),
            name
        )))
    }

    fn get_item(&self, _key: &Value) -> Result<Value> {
        Err(unsupported(self.type_name(), "is not subscriptable"))
    }

    fn set_item(&self, _key: &Value, _value: Value) -> Result<()> {
        Err(unsupported(self.type_name(), "does not support item assignment"))
    }

    fn del_item(&self, _key: &Value) -> Result<()> {
        Err(unsupported(self.type_name(), "does not support item deletion"))
    }

    fn contains(&self, _item: &Value) -> Option<Result<bool>> {
        None
    }

    // ------------------------------------------------------------------------
    // Calls and iteration
    // ------------------------------------------------------------------------

    fn is_callable(&self) -> bool {
        false
    }

    fn call(&self, _args: &[Value], _kwargs: Option<&Kwargs>) -> Result<Value> {
        Err(Error::NotCallable {
            type_name: self.type_name().into(),
        })
    }

    /// Start iterating. Iterators return `this`.
    fn iter(&self, this: &Value) -> Result<Value> {
        if self.is_iterator() {
            Ok(this.clone())
        } else {
            Err(unsupported(self.type_name(), "is not iterable"))
        }
    }

    fn is_iterator(&self) -> bool {
        false
    }

    /// Advance the iterator. `Ok(None)` means exhausted.
    fn next(&self) -> Result<Option<Value>> {
        Err(Error::NotIterator {
            type_name: self.type_name().into(),
        })
    }

    // ------------------------------------------------------------------------
    // Conversions
    // ------------------------------------------------------------------------

    fn len(&self) -> Option<Result<usize>> {
        None
    }

    /// `None` hashes by identity.
    fn hash(&self) -> Option<Result<i64>> {
        None
    }

    fn to_bool(&self) -> Result<bool> {
        match self.len() {
            Some(len) => Ok(len? != 0),
            None => Ok(true),
        }
    }

    fn to_int(&self) -> Option<Result<i64>> {
        None
    }

    fn to_float(&self) -> Option<Result<f64>> {
        None
    }

    fn to_index(&self) -> Option<Result<i64>> {
        None
    }

    fn repr(&self) -> EcoString {
        eco_format!("<{} object>", self.type_name())
    }

    fn to_str(&self) -> EcoString {
        self.repr()
    }

    // ------------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------------

    /// Apply a binary operator with `self` as the left operand, or as the right
    /// one when `reflected` is set. `None` means "not implemented".
    fn binary_op(&self, _op: BinaryOp, _other: &Value, _reflected: bool) -> Option<Result<Value>> {
        None
    }

    fn unary_op(&self, _op: UnaryOp) -> Option<Result<Value>> {
        None
    }

    /// In-place variant. `None` falls back to [`Object::binary_op`].
    fn inplace_op(&self, _op: BinaryOp, _other: &Value) -> Option<Result<Value>> {
        None
    }

    /// `None` falls back to identity for `==`/`!=` and fails for orderings.
    fn compare(&self, _op: CompareOp, _other: &Value) -> Option<Result<bool>> {
        None
    }

    // ------------------------------------------------------------------------
    // Cycle collection
    // ------------------------------------------------------------------------

    /// Visit every value this object holds. Opaque objects keep everything
    /// they reference alive.
    fn trace(&self, _visit: &mut dyn FnMut(&Value)) {}

    /// Drop every value this object holds.
    fn clear(&self) {}
}

fn unsupported(type_name: &str, what: &str) -> Error {
    Error::type_error(eco_format!("'{}' object {}", type_name, what))
}

impl fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.repr())
    }
}
