//! Callable values.
//!
//! This module defines the `Function` trait implemented by every plain callable
//! that can sit in the function slot of a deferred node: native Rust function
//! pointers, boxed closures, and strict constructors.

use std::fmt;

use ecow::EcoString;

use crate::{
    errors::Result,
    values::{Kwargs, Value},
};

/// Trait for callable values.
///
/// The engine always hands a function fully forced arguments when it forces a
/// node. Direct calls through [`Value::call`] may pass deferred arguments; a
/// function that needs concrete inputs forces them itself.
pub trait Function {
    /// Stable name used for debugging and introspection.
    fn name(&self) -> &str;

    /// Call the function.
    ///
    /// `kwargs` is `None` when the call carries no keyword arguments at all.
    fn call(&self, args: &[Value], kwargs: Option<&Kwargs>) -> Result<Value>;

    /// Marks a strict constructor.
    ///
    /// Building a node from a strict constructor with arguments calls it
    /// immediately; building one without arguments yields the constructor
    /// itself.
    fn is_strict(&self) -> bool {
        false
    }

    /// Visit the values this function captures. Opaque by default.
    fn trace(&self, _visit: &mut dyn FnMut(&Value)) {}
}

/// Signature expected for Rust functions called from deferred nodes.
///
/// # Example
///
/// ```ignore
/// fn double(args: &[Value], _kwargs: Option<&Kwargs>) -> Result<Value, Error> {
///     let n = args[0].as_int().ok_or_else(|| Error::type_error("expected int"))?;
///     Ok(Value::Int(n * 2))
/// }
/// ```
pub type NativeFn = fn(args: &[Value], kwargs: Option<&Kwargs>) -> Result<Value>;

/// Wrapper for native Rust function pointers.
pub struct NativeFunction {
    name: EcoString,
    func: NativeFn,
    strict: bool,
}

impl NativeFunction {
    pub fn new(name: impl Into<EcoString>, func: NativeFn) -> Self {
        Self {
            name: name.into(),
            func,
            strict: false,
        }
    }

    /// A native function that acts as a strict constructor.
    pub fn strict(name: impl Into<EcoString>, func: NativeFn) -> Self {
        Self {
            name: name.into(),
            func,
            strict: true,
        }
    }
}

impl Function for NativeFunction {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, args: &[Value], kwargs: Option<&Kwargs>) -> Result<Value> {
        (self.func)(args, kwargs)
    }

    fn is_strict(&self) -> bool {
        self.strict
    }
}

type ClosureFn = dyn Fn(&[Value], Option<&Kwargs>) -> Result<Value>;

/// A boxed Rust closure.
///
/// Closures may capture state (counters, caches, other values), which is what
/// tests use to observe how often a node is computed.
pub struct Closure {
    name: EcoString,
    func: Box<ClosureFn>,
    strict: bool,
}

impl Closure {
    pub fn new<F>(name: impl Into<EcoString>, func: F) -> Self
    where
        F: Fn(&[Value], Option<&Kwargs>) -> Result<Value> + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
            strict: false,
        }
    }

    /// Mark this closure as a strict constructor.
    pub fn into_strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

impl Function for Closure {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, args: &[Value], kwargs: Option<&Kwargs>) -> Result<Value> {
        (self.func)(args, kwargs)
    }

    fn is_strict(&self) -> bool {
        self.strict
    }
}

impl fmt::Debug for dyn Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<function {}>", self.name())
    }
}

impl Value {
    /// Wrap a native function pointer.
    pub fn native(name: impl Into<EcoString>, func: NativeFn) -> Value {
        Value::function(NativeFunction::new(name, func))
    }

    /// Wrap a closure.
    pub fn closure<F>(name: impl Into<EcoString>, func: F) -> Value
    where
        F: Fn(&[Value], Option<&Kwargs>) -> Result<Value> + 'static,
    {
        Value::function(Closure::new(name, func))
    }
}
