//! Operator interception.
//!
//! Operations applied to a thunk build new thunks whose function is the
//! matching [`OperatorWrapper`] and whose arguments are the original, unforced
//! operands. Only operations that mutate, or whose answer drives control flow
//! (truthiness, hashing, coercions, length, string forms), force the receiver.
//!
//! The same surface exists on [`Value`]: there it runs eagerly on normal
//! operands and defers as soon as any operand is a thunk.

use ecow::EcoString;
use smallvec::smallvec;

use crate::{
    errors::{Error, Result},
    ops::{
        BinaryOp, CompareOp, OperatorWrapper, UnaryOp, arith,
        protocol::{self, TYPE_ATTR},
        wrapper,
    },
    thunk::{NodeKind, Thunk, force},
    values::{Args, Kwargs, Value},
};

/// A pending application of an operator wrapper.
fn defer(kind: NodeKind, wrapper: &'static OperatorWrapper, args: Args) -> Thunk {
    Thunk::pending(kind, Value::Operator(wrapper), args, None)
}

/// Kind of the first deferred operand.
fn kind_of(operands: &[&Value]) -> Option<NodeKind> {
    operands
        .iter()
        .find_map(|operand| operand.as_thunk().map(Thunk::kind))
}

// ============================================================================
// Thunk surface
// ============================================================================

impl Thunk {
    fn defer_with(&self, wrapper: &'static OperatorWrapper, args: Args) -> Thunk {
        defer(self.kind(), wrapper, args)
    }

    fn this(&self) -> Value {
        Value::Thunk(self.clone())
    }

    // ------------------------------------------------------------------------
    // Arithmetic (deferred)
    // ------------------------------------------------------------------------

    /// `self <op> other`.
    pub fn binary_op(&self, op: BinaryOp, other: impl Into<Value>) -> Thunk {
        self.defer_with(wrapper::binary(op), smallvec![self.this(), other.into()])
    }

    /// `other <op> self`: the thunk is the right operand.
    pub fn reflected_op(&self, op: BinaryOp, other: impl Into<Value>) -> Thunk {
        self.defer_with(wrapper::binary(op), smallvec![other.into(), self.this()])
    }

    pub fn unary_op(&self, op: UnaryOp) -> Thunk {
        self.defer_with(wrapper::unary(op), smallvec![self.this()])
    }

    pub fn floor_div(&self, other: impl Into<Value>) -> Thunk {
        self.binary_op(BinaryOp::FloorDiv, other)
    }

    pub fn divmod(&self, other: impl Into<Value>) -> Thunk {
        self.binary_op(BinaryOp::DivMod, other)
    }

    pub fn matmul(&self, other: impl Into<Value>) -> Thunk {
        self.binary_op(BinaryOp::MatMul, other)
    }

    pub fn pow(&self, exp: impl Into<Value>) -> Thunk {
        self.binary_op(BinaryOp::Pow, exp)
    }

    /// `pow(self, exp, modulus)`.
    pub fn pow_mod(&self, exp: impl Into<Value>, modulus: impl Into<Value>) -> Thunk {
        self.defer_with(
            &wrapper::POW_MOD,
            smallvec![self.this(), exp.into(), modulus.into()],
        )
    }

    pub fn pos(&self) -> Thunk {
        self.unary_op(UnaryOp::Pos)
    }

    pub fn abs(&self) -> Thunk {
        self.unary_op(UnaryOp::Abs)
    }

    pub fn invert(&self) -> Thunk {
        self.unary_op(UnaryOp::Invert)
    }

    pub fn round(&self) -> Thunk {
        self.unary_op(UnaryOp::Round)
    }

    pub fn floor(&self) -> Thunk {
        self.unary_op(UnaryOp::Floor)
    }

    pub fn ceil(&self) -> Thunk {
        self.unary_op(UnaryOp::Ceil)
    }

    pub fn trunc(&self) -> Thunk {
        self.unary_op(UnaryOp::Trunc)
    }

    // ------------------------------------------------------------------------
    // Comparisons (deferred)
    // ------------------------------------------------------------------------

    /// Deferred comparison selecting the wrapper for `op`.
    pub fn rich_compare(&self, op: CompareOp, other: impl Into<Value>) -> Thunk {
        self.defer_with(wrapper::compare(op), smallvec![self.this(), other.into()])
    }

    pub fn lt(&self, other: impl Into<Value>) -> Thunk {
        self.rich_compare(CompareOp::Lt, other)
    }

    pub fn le(&self, other: impl Into<Value>) -> Thunk {
        self.rich_compare(CompareOp::Le, other)
    }

    pub fn eq(&self, other: impl Into<Value>) -> Thunk {
        self.rich_compare(CompareOp::Eq, other)
    }

    pub fn ne(&self, other: impl Into<Value>) -> Thunk {
        self.rich_compare(CompareOp::Ne, other)
    }

    pub fn gt(&self, other: impl Into<Value>) -> Thunk {
        self.rich_compare(CompareOp::Gt, other)
    }

    pub fn ge(&self, other: impl Into<Value>) -> Thunk {
        self.rich_compare(CompareOp::Ge, other)
    }

    // ------------------------------------------------------------------------
    // Attributes and items
    // ------------------------------------------------------------------------

    /// Deferred attribute read. Reading `__type__` forces the receiver and
    /// answers at once.
    pub fn get_attr(&self, name: &str) -> Result<Value> {
        if name == TYPE_ATTR {
            return protocol::get_attr(&force(&self.this())?, name);
        }
        Ok(Value::Thunk(self.defer_with(
            &wrapper::GETATTR,
            smallvec![self.this(), Value::str(name)],
        )))
    }

    /// Force the receiver, then write the attribute.
    pub fn set_attr(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        protocol::set_attr(&force(&self.this())?, name, value.into())
    }

    pub fn del_attr(&self, name: &str) -> Result<()> {
        protocol::del_attr(&force(&self.this())?, name)
    }

    pub fn get_item(&self, key: impl Into<Value>) -> Thunk {
        self.defer_with(&wrapper::GETITEM, smallvec![self.this(), key.into()])
    }

    /// Force the receiver, then write the item.
    pub fn set_item(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        protocol::set_item(&force(&self.this())?, &key.into(), value.into())
    }

    pub fn del_item(&self, key: impl Into<Value>) -> Result<()> {
        protocol::del_item(&force(&self.this())?, &key.into())
    }

    /// Deferred membership test, `item in self`.
    pub fn contains(&self, item: impl Into<Value>) -> Thunk {
        self.defer_with(&wrapper::CONTAINS, smallvec![self.this(), item.into()])
    }

    // ------------------------------------------------------------------------
    // Calls and iteration
    // ------------------------------------------------------------------------

    /// Deferred call: the new node's function is this (unforced) thunk.
    pub fn call(&self, args: impl IntoIterator<Item = Value>, kwargs: Option<Kwargs>) -> Thunk {
        Thunk::pending(self.kind(), self.this(), args.into_iter().collect(), kwargs)
    }

    /// Deferred iteration start.
    pub fn iter(&self) -> Thunk {
        self.defer_with(&wrapper::ITER, smallvec![self.this()])
    }

    /// Advance the iterator this thunk evaluates to.
    ///
    /// The step itself is eager, one raw element per call. The element comes
    /// back wrapped in a pending node so its own value stays lazy. `Ok(None)`
    /// means the iterator is exhausted.
    pub fn next(&self) -> Result<Option<Value>> {
        let iterator = force(&self.this())?;
        if !protocol::is_iterator(&iterator) {
            return Err(Error::not_iterator(&iterator));
        }
        Ok(protocol::next(&iterator)?
            .map(|element| Value::Thunk(self.defer_with(&wrapper::IDENTITY, smallvec![element]))))
    }

    // ------------------------------------------------------------------------
    // Eager conversions
    // ------------------------------------------------------------------------

    pub fn to_bool(&self) -> Result<bool> {
        protocol::to_bool(&force(&self.this())?)
    }

    pub fn hash_value(&self) -> Result<i64> {
        protocol::hash(&force(&self.this())?)
    }

    pub fn to_int(&self) -> Result<i64> {
        protocol::to_int(&force(&self.this())?)
    }

    pub fn to_float(&self) -> Result<f64> {
        protocol::to_float(&force(&self.this())?)
    }

    pub fn to_index(&self) -> Result<i64> {
        protocol::to_index(&force(&self.this())?)
    }

    pub fn len(&self) -> Result<usize> {
        protocol::len(&force(&self.this())?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn to_str(&self) -> Result<EcoString> {
        Ok(protocol::to_str(&force(&self.this())?))
    }

    pub fn repr(&self) -> Result<EcoString> {
        Ok(protocol::repr(&force(&self.this())?))
    }

    // ------------------------------------------------------------------------
    // In-place operators (eager)
    // ------------------------------------------------------------------------

    /// Force the receiver and apply the in-place operator to it; `other` is
    /// passed unforced.
    pub fn inplace_op(&self, op: BinaryOp, other: impl Into<Value>) -> Result<Value> {
        arith::inplace(op, &force(&self.this())?, &other.into())
    }
}

// ============================================================================
// Value surface
// ============================================================================

impl Value {
    pub fn binary_op(&self, op: BinaryOp, other: &Value) -> Result<Value> {
        match kind_of(&[self, other]) {
            Some(kind) => Ok(Value::Thunk(defer(
                kind,
                wrapper::binary(op),
                smallvec![self.clone(), other.clone()],
            ))),
            None => arith::binary(op, self, other),
        }
    }

    pub fn unary_op(&self, op: UnaryOp) -> Result<Value> {
        match self {
            Value::Thunk(thunk) => Ok(Value::Thunk(thunk.unary_op(op))),
            _ => arith::unary(op, self),
        }
    }

    /// `self ** exp`, or `pow(self, exp, modulus)`.
    pub fn power(&self, exp: &Value, modulus: Option<&Value>) -> Result<Value> {
        let Some(modulus) = modulus else {
            return self.binary_op(BinaryOp::Pow, exp);
        };
        match kind_of(&[self, exp, modulus]) {
            Some(kind) => Ok(Value::Thunk(defer(
                kind,
                &wrapper::POW_MOD,
                smallvec![self.clone(), exp.clone(), modulus.clone()],
            ))),
            None => arith::power(self, exp, modulus),
        }
    }

    /// Comparison; a `Bool` on normal operands, a thunk otherwise.
    pub fn compare(&self, op: CompareOp, other: &Value) -> Result<Value> {
        match kind_of(&[self, other]) {
            Some(kind) => Ok(Value::Thunk(defer(
                kind,
                wrapper::compare(op),
                smallvec![self.clone(), other.clone()],
            ))),
            None => Ok(Value::Bool(arith::compare(op, self, other)?)),
        }
    }

    pub fn get_attr(&self, name: &str) -> Result<Value> {
        match self {
            Value::Thunk(thunk) => thunk.get_attr(name),
            _ => protocol::get_attr(self, name),
        }
    }

    pub fn set_attr(&self, name: &str, value: Value) -> Result<()> {
        protocol::set_attr(&force(self)?, name, value)
    }

    pub fn del_attr(&self, name: &str) -> Result<()> {
        protocol::del_attr(&force(self)?, name)
    }

    pub fn get_item(&self, key: &Value) -> Result<Value> {
        match kind_of(&[self, key]) {
            Some(kind) => Ok(Value::Thunk(defer(
                kind,
                &wrapper::GETITEM,
                smallvec![self.clone(), key.clone()],
            ))),
            None => protocol::get_item(self, key),
        }
    }

    pub fn set_item(&self, key: &Value, value: Value) -> Result<()> {
        protocol::set_item(&force(self)?, key, value)
    }

    pub fn del_item(&self, key: &Value) -> Result<()> {
        protocol::del_item(&force(self)?, key)
    }

    /// Membership test, `item in self`.
    pub fn contains(&self, item: &Value) -> Result<Value> {
        match kind_of(&[self, item]) {
            Some(kind) => Ok(Value::Thunk(defer(
                kind,
                &wrapper::CONTAINS,
                smallvec![self.clone(), item.clone()],
            ))),
            None => Ok(Value::Bool(protocol::contains(self, item)?)),
        }
    }

    /// Call the value. Calling a thunk defers the call.
    pub fn call(&self, args: &[Value], kwargs: Option<&Kwargs>) -> Result<Value> {
        match self {
            Value::Thunk(thunk) => Ok(Value::Thunk(
                thunk.call(args.iter().cloned(), kwargs.cloned()),
            )),
            _ => protocol::call(self, args, kwargs),
        }
    }

    pub fn iter(&self) -> Result<Value> {
        match self {
            Value::Thunk(thunk) => Ok(Value::Thunk(thunk.iter())),
            _ => protocol::iter(self),
        }
    }

    /// Advance an iterator. Elements pulled through a thunk come back wrapped.
    pub fn next(&self) -> Result<Option<Value>> {
        match self {
            Value::Thunk(thunk) => thunk.next(),
            _ => protocol::next(self),
        }
    }

    pub fn to_bool(&self) -> Result<bool> {
        protocol::to_bool(&force(self)?)
    }

    pub fn hash_value(&self) -> Result<i64> {
        protocol::hash(&force(self)?)
    }

    pub fn to_int(&self) -> Result<i64> {
        protocol::to_int(&force(self)?)
    }

    pub fn to_float(&self) -> Result<f64> {
        protocol::to_float(&force(self)?)
    }

    pub fn to_index(&self) -> Result<i64> {
        protocol::to_index(&force(self)?)
    }

    pub fn len(&self) -> Result<usize> {
        protocol::len(&force(self)?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn to_str(&self) -> Result<EcoString> {
        Ok(protocol::to_str(&force(self)?))
    }

    pub fn repr(&self) -> Result<EcoString> {
        Ok(protocol::repr(&force(self)?))
    }

    pub fn inplace_op(&self, op: BinaryOp, other: &Value) -> Result<Value> {
        arith::inplace(op, &force(self)?, other)
    }
}
