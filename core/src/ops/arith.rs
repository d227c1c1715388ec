//! Arithmetic and comparison on normal values.
//!
//! Integer arithmetic is checked: overflow is an error rather than a wrap or a
//! panic. Floor division and modulo round towards negative infinity, so the
//! remainder takes the sign of the divisor.

use std::cmp::Ordering;
use std::rc::Rc;

use ecow::eco_format;

use crate::{
    errors::{Error, Result},
    ops::{BinaryOp, CompareOp, UnaryOp, protocol},
    thunk::force,
    values::{Value, Visit, Walk, describe},
};

enum Num {
    Int(i64),
    Float(f64),
}

fn num(value: &Value) -> Option<Num> {
    match value {
        Value::Int(i) => Some(Num::Int(*i)),
        Value::Bool(b) => Some(Num::Int(*b as i64)),
        Value::Float(x) => Some(Num::Float(*x)),
        _ => None,
    }
}

// ============================================================================
// Binary operators
// ============================================================================

/// Apply a binary operator to two normal values.
///
/// Objects get the first say (left operand, then right operand reflected);
/// built-in types are tried in between.
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    if let Value::Object(object) = lhs {
        if let Some(result) = object.binary_op(op, rhs, false) {
            return result;
        }
    }
    if let Some(result) = builtin_binary(op, lhs, rhs) {
        return result;
    }
    if let Value::Object(object) = rhs {
        if let Some(result) = object.binary_op(op, lhs, true) {
            return result;
        }
    }
    Err(unsupported_operands(op.symbol(), lhs, rhs))
}

fn builtin_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Result<Value>> {
    if let (Value::Bool(a), Value::Bool(b)) = (lhs, rhs) {
        match op {
            BinaryOp::And => return Some(Ok(Value::Bool(*a & *b))),
            BinaryOp::Or => return Some(Ok(Value::Bool(*a | *b))),
            BinaryOp::Xor => return Some(Ok(Value::Bool(*a ^ *b))),
            _ => {}
        }
    }
    match (num(lhs), num(rhs)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => return binary_int(op, a, b),
        (Some(a), Some(b)) => {
            let a = match a {
                Num::Int(i) => i as f64,
                Num::Float(x) => x,
            };
            let b = match b {
                Num::Int(i) => i as f64,
                Num::Float(x) => x,
            };
            return binary_float(op, a, b);
        }
        _ => {}
    }
    binary_sequence(op, lhs, rhs)
}

/// Evaluate a binary operation on two integers.
fn binary_int(op: BinaryOp, a: i64, b: i64) -> Option<Result<Value>> {
    let overflow = Error::Overflow { op: op.name() };
    let result = match op {
        BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or(overflow),
        BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or(overflow),
        BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or(overflow),
        BinaryOp::TrueDiv => {
            if b == 0 {
                Err(Error::ZeroDivision)
            } else {
                Ok(Value::Float(a as f64 / b as f64))
            }
        }
        BinaryOp::FloorDiv => floor_div_int(a, b).map(Value::Int),
        BinaryOp::Mod => mod_int(a, b).map(Value::Int),
        BinaryOp::DivMod => floor_div_int(a, b)
            .and_then(|q| Ok(Value::tuple([Value::Int(q), Value::Int(mod_int(a, b)?)]))),
        BinaryOp::Pow => pow_int(a, b),
        BinaryOp::LShift => {
            if b < 0 {
                Err(Error::value_error("negative shift count"))
            } else if a == 0 {
                Ok(Value::Int(0))
            } else if b >= 63 {
                Err(overflow)
            } else {
                let shifted = a << b;
                if shifted >> b == a {
                    Ok(Value::Int(shifted))
                } else {
                    Err(overflow)
                }
            }
        }
        BinaryOp::RShift => {
            if b < 0 {
                Err(Error::value_error("negative shift count"))
            } else {
                Ok(Value::Int(a >> b.min(63)))
            }
        }
        BinaryOp::And => Ok(Value::Int(a & b)),
        BinaryOp::Or => Ok(Value::Int(a | b)),
        BinaryOp::Xor => Ok(Value::Int(a ^ b)),
        BinaryOp::MatMul => return None,
    };
    Some(result)
}

fn floor_div_int(a: i64, b: i64) -> Result<i64> {
    if b == 0 {
        return Err(Error::ZeroDivision);
    }
    let q = a.checked_div(b).ok_or(Error::Overflow { op: "floordiv" })?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(q - 1)
    } else {
        Ok(q)
    }
}

fn mod_int(a: i64, b: i64) -> Result<i64> {
    if b == 0 {
        return Err(Error::ZeroDivision);
    }
    // i64::MIN % -1 overflows in Rust but is 0 mathematically.
    let r = a.checked_rem(b).unwrap_or(0);
    if r != 0 && ((r < 0) != (b < 0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

fn pow_int(a: i64, b: i64) -> Result<Value> {
    if b < 0 {
        if a == 0 {
            return Err(Error::ZeroDivision);
        }
        return Ok(Value::Float((a as f64).powf(b as f64)));
    }
    match a {
        0 | 1 => return Ok(Value::Int(if b == 0 { 1 } else { a })),
        -1 => return Ok(Value::Int(if b % 2 == 0 { 1 } else { -1 })),
        _ => {}
    }
    u32::try_from(b)
        .ok()
        .and_then(|b| a.checked_pow(b))
        .map(Value::Int)
        .ok_or(Error::Overflow { op: "pow" })
}

/// Evaluate a binary operation on two floats.
///
/// Follows IEEE 754 except that division and modulo by zero are errors.
fn binary_float(op: BinaryOp, a: f64, b: f64) -> Option<Result<Value>> {
    let result = match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::TrueDiv => {
            if b == 0.0 {
                Err(Error::ZeroDivision)
            } else {
                Ok(Value::Float(a / b))
            }
        }
        BinaryOp::FloorDiv => floor_div_float(a, b).map(Value::Float),
        BinaryOp::Mod => mod_float(a, b).map(Value::Float),
        BinaryOp::DivMod => floor_div_float(a, b)
            .and_then(|q| Ok(Value::tuple([Value::Float(q), Value::Float(mod_float(a, b)?)]))),
        BinaryOp::Pow => {
            if a == 0.0 && b < 0.0 {
                Err(Error::ZeroDivision)
            } else {
                Ok(Value::Float(a.powf(b)))
            }
        }
        _ => return None,
    };
    Some(result)
}

fn floor_div_float(a: f64, b: f64) -> Result<f64> {
    if b == 0.0 {
        return Err(Error::ZeroDivision);
    }
    Ok((a / b).floor())
}

fn mod_float(a: f64, b: f64) -> Result<f64> {
    if b == 0.0 {
        return Err(Error::ZeroDivision);
    }
    let r = a % b;
    if r != 0.0 && ((r < 0.0) != (b < 0.0)) {
        Ok(r + b)
    } else {
        Ok(r)
    }
}

/// Concatenation and repetition of strings, tuples and lists.
fn binary_sequence(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Result<Value>> {
    match (op, lhs, rhs) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Some(Ok(Value::Str(eco_format!("{a}{b}")))),
        (BinaryOp::Add, Value::Tuple(a), Value::Tuple(b)) => {
            Some(Ok(Value::tuple(a.iter().chain(b.iter()).cloned())))
        }
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let items: Vec<Value> = a.borrow().iter().chain(b.borrow().iter()).cloned().collect();
            Some(Ok(Value::from(items)))
        }
        (BinaryOp::Mul, seq, Value::Int(n)) | (BinaryOp::Mul, Value::Int(n), seq) => {
            repeat(seq, *n)
        }
        _ => None,
    }
}

fn repeat(seq: &Value, n: i64) -> Option<Result<Value>> {
    let result = match seq {
        Value::Str(s) => repeat_str(s, n).map(Value::str),
        Value::Tuple(items) => repeat_items(items, n).map(Value::tuple),
        Value::List(items) => repeat_items(&items.borrow(), n).map(Value::from),
        _ => return None,
    };
    Some(result)
}

/// Length of `len` repeated `n` times; a negative count repeats zero times.
/// Lengths that cannot be allocated are an overflow.
fn repeated_len(len: usize, n: i64) -> Result<usize> {
    let n = usize::try_from(n.max(0)).map_err(|_| Error::Overflow { op: "mul" })?;
    len.checked_mul(n)
        .filter(|total| *total <= isize::MAX as usize)
        .ok_or(Error::Overflow { op: "mul" })
}

fn repeat_str(s: &str, n: i64) -> Result<String> {
    let total = repeated_len(s.len(), n)?;
    let mut out = String::new();
    out.try_reserve_exact(total)
        .map_err(|_| Error::Overflow { op: "mul" })?;
    while out.len() < total {
        out.push_str(s);
    }
    Ok(out)
}

fn repeat_items(items: &[Value], n: i64) -> Result<Vec<Value>> {
    let total = repeated_len(items.len(), n)?;
    let mut out = Vec::new();
    out.try_reserve_exact(total)
        .map_err(|_| Error::Overflow { op: "mul" })?;
    while out.len() < total {
        out.extend(items.iter().cloned());
    }
    Ok(out)
}

fn unsupported_operands(symbol: &str, lhs: &Value, rhs: &Value) -> Error {
    Error::type_error(eco_format!(
        "unsupported operand type(s) for {}: {} and {}",
        symbol,
        describe(lhs),
        describe(rhs)
    ))
}

/// Three-argument power: `base ** exp % modulus` on integers.
pub fn power(base: &Value, exp: &Value, modulus: &Value) -> Result<Value> {
    if let Value::None = modulus {
        return binary(BinaryOp::Pow, base, exp);
    }
    let (Some(Num::Int(base)), Some(Num::Int(exp)), Some(Num::Int(modulus))) =
        (num(base), num(exp), num(modulus))
    else {
        return Err(Error::type_error(
            "pow() 3rd argument not allowed unless all arguments are integers",
        ));
    };
    if modulus == 0 {
        return Err(Error::value_error("pow() 3rd argument cannot be 0"));
    }
    if exp < 0 {
        return Err(Error::value_error(
            "pow() negative exponent not supported with a modulus",
        ));
    }
    let m = modulus as i128;
    let mut result: i128 = 1;
    let mut b = (base as i128).rem_euclid(m);
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = (result * b).rem_euclid(m);
        }
        b = (b * b).rem_euclid(m);
        e >>= 1;
    }
    // Result takes the sign of the modulus.
    let result = if result != 0 && m < 0 { result + m } else { result };
    Ok(Value::Int(result as i64))
}

// ============================================================================
// Unary operators
// ============================================================================

pub fn unary(op: UnaryOp, value: &Value) -> Result<Value> {
    if let Value::Object(object) = value {
        if let Some(result) = object.unary_op(op) {
            return result;
        }
    }
    match num(value) {
        Some(Num::Int(i)) => {
            let overflow = Error::Overflow { op: op.name() };
            match op {
                UnaryOp::Neg => i.checked_neg().map(Value::Int).ok_or(overflow),
                UnaryOp::Abs => i.checked_abs().map(Value::Int).ok_or(overflow),
                UnaryOp::Invert => Ok(Value::Int(!i)),
                UnaryOp::Pos | UnaryOp::Round | UnaryOp::Floor | UnaryOp::Ceil | UnaryOp::Trunc => {
                    Ok(Value::Int(i))
                }
            }
        }
        Some(Num::Float(x)) => match op {
            UnaryOp::Neg => Ok(Value::Float(-x)),
            UnaryOp::Pos => Ok(Value::Float(x)),
            UnaryOp::Abs => Ok(Value::Float(x.abs())),
            UnaryOp::Invert => Err(bad_operand(op, value)),
            UnaryOp::Round => float_to_int(x.round_ties_even()),
            UnaryOp::Floor => float_to_int(x.floor()),
            UnaryOp::Ceil => float_to_int(x.ceil()),
            UnaryOp::Trunc => float_to_int(x.trunc()),
        },
        None => Err(bad_operand(op, value)),
    }
}

fn bad_operand(op: UnaryOp, value: &Value) -> Error {
    Error::type_error(eco_format!(
        "bad operand type for {}(): {}",
        op.name(),
        describe(value)
    ))
}

pub(crate) fn float_to_int(x: f64) -> Result<Value> {
    if x.is_nan() {
        Err(Error::value_error("cannot convert float nan to integer"))
    } else if !x.is_finite() || x < i64::MIN as f64 || x >= i64::MAX as f64 {
        Err(Error::Overflow { op: "int" })
    } else {
        Ok(Value::Int(x as i64))
    }
}

// ============================================================================
// In-place operators
// ============================================================================

/// Apply an in-place operator to an already forced receiver.
///
/// Lists are mutated in place for `+=` and `*=`; objects may implement their
/// own in-place behaviour. Everything else falls back to the plain binary
/// operator, which defers if `rhs` is a thunk.
pub fn inplace(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match (op, lhs) {
        (BinaryOp::Add, Value::List(items)) => {
            let extra = protocol::collect(rhs)?;
            items.borrow_mut().extend(extra);
            return Ok(lhs.clone());
        }
        (BinaryOp::Mul, Value::List(items)) => {
            let n = protocol::to_index(&force(rhs)?)?;
            let repeated = repeat_items(&items.borrow(), n)?;
            *items.borrow_mut() = repeated;
            return Ok(lhs.clone());
        }
        (_, Value::Object(object)) => {
            if let Some(result) = object.inplace_op(op, rhs) {
                return result;
            }
        }
        _ => {}
    }
    lhs.binary_op(op, rhs)
}

// ============================================================================
// Comparisons
// ============================================================================

/// Compare two values, forcing them first.
///
/// Elements of tuples and lists are forced as the comparison reaches them.
pub fn compare(op: CompareOp, lhs: &Value, rhs: &Value) -> Result<bool> {
    if lhs.is_thunk() || rhs.is_thunk() {
        return compare(op, &force(lhs)?, &force(rhs)?);
    }
    if let Value::Object(object) = lhs {
        if let Some(result) = object.compare(op, rhs) {
            return result;
        }
    }
    if let Value::Object(object) = rhs {
        if let Some(result) = object.compare(op.swapped(), lhs) {
            return result;
        }
    }
    match op {
        CompareOp::Eq => structural_eq(lhs, rhs),
        CompareOp::Ne => Ok(!structural_eq(lhs, rhs)?),
        _ => match ordering(lhs, rhs)? {
            Some(ordering) => Ok(op.from_ordering(ordering)),
            // Unordered floats (NaN) fail every ordering.
            None => Ok(false),
        },
    }
}

/// `lhs == rhs`, forcing as needed.
pub fn equals(lhs: &Value, rhs: &Value) -> Result<bool> {
    compare(CompareOp::Eq, lhs, rhs)
}

fn structural_eq(lhs: &Value, rhs: &Value) -> Result<bool> {
    match (lhs, rhs) {
        (Value::Tuple(a), Value::Tuple(b)) => items_equal(a, b),
        (Value::List(a), Value::List(b)) => {
            if Rc::ptr_eq(a, b) {
                return Ok(true);
            }
            // A pair already being compared further up is assumed equal.
            let Some(_visit) = Visit::enter(Walk::Eq, lhs, rhs) else {
                return Ok(true);
            };
            let (a, b) = (a.borrow().clone(), b.borrow().clone());
            items_equal(&a, &b)
        }
        _ => Ok(lhs == rhs),
    }
}

fn items_equal(a: &[Value], b: &[Value]) -> Result<bool> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (x, y) in a.iter().zip(b.iter()) {
        if !equals(x, y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn ordering(lhs: &Value, rhs: &Value) -> Result<Option<Ordering>> {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::Tuple(a), Value::Tuple(b)) => items_ordering(a, b),
        (Value::List(a), Value::List(b)) => {
            let Some(_visit) = Visit::enter(Walk::Order, lhs, rhs) else {
                return Err(Error::value_error("cannot order lists that contain themselves"));
            };
            let (a, b) = (a.borrow().clone(), b.borrow().clone());
            items_ordering(&a, &b)
        }
        _ => match (num(lhs), num(rhs)) {
            (Some(Num::Int(a)), Some(Num::Int(b))) => Ok(Some(a.cmp(&b))),
            (Some(_), Some(_)) => Ok(lhs
                .as_float()
                .zip(rhs.as_float())
                .and_then(|(a, b)| a.partial_cmp(&b))),
            _ => Err(Error::type_error(eco_format!(
                "ordering not supported between {} and {}",
                describe(lhs),
                describe(rhs)
            ))),
        },
    }
}

fn items_ordering(a: &[Value], b: &[Value]) -> Result<Option<Ordering>> {
    for (x, y) in a.iter().zip(b.iter()) {
        if !equals(x, y)? {
            let (x, y) = (force(x)?, force(y)?);
            return ordering(&x, &y);
        }
    }
    Ok(Some(a.len().cmp(&b.len())))
}
