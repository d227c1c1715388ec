//! Protocol operations on normal values: attributes, items, conversions,
//! iteration and calls.
//!
//! The receiver is expected to be forced already. Secondary operands (keys,
//! membership candidates) may still be deferred and are forced here when their
//! concrete value is needed.

use ecow::{EcoString, eco_format};

use crate::{
    errors::{Error, Result},
    ops::arith,
    thunk::force,
    values::{Key, Kwargs, SeqIter, Value, describe},
};

/// Name of the attribute that reports a value's type.
pub const TYPE_ATTR: &str = "__type__";

// ============================================================================
// Attributes
// ============================================================================

pub fn get_attr(value: &Value, name: &str) -> Result<Value> {
    if name == TYPE_ATTR {
        return Ok(Value::Str(value.type_name()));
    }
    match value {
        Value::Object(object) => object.get_attr(name),
        _ => Err(Error::no_attribute(value, name)),
    }
}

pub fn set_attr(value: &Value, name: &str, new: Value) -> Result<()> {
    match value {
        Value::Object(object) => object.set_attr(name, new),
        _ => Err(Error::type_error(eco_format!(
            "cannot set attribute '{}' on {}",
            name,
            describe(value)
        ))),
    }
}

pub fn del_attr(value: &Value, name: &str) -> Result<()> {
    match value {
        Value::Object(object) => object.del_attr(name),
        _ => Err(Error::type_error(eco_format!(
            "cannot delete attribute '{}' of {}",
            name,
            describe(value)
        ))),
    }
}

// ============================================================================
// Items
// ============================================================================

/// Resolve a possibly negative index against a sequence length.
fn normalize_index(index: i64, len: usize) -> Result<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved >= len as i64 {
        Err(Error::Index { index, len })
    } else {
        Ok(resolved as usize)
    }
}

fn key_error(key: &Key) -> Error {
    Error::Key(eco_format!("{}", key))
}

pub fn get_item(container: &Value, key: &Value) -> Result<Value> {
    match container {
        Value::Tuple(items) => {
            let index = normalize_index(to_index(&force(key)?)?, items.len())?;
            Ok(items[index].clone())
        }
        Value::List(items) => {
            let index = to_index(&force(key)?)?;
            let items = items.borrow();
            Ok(items[normalize_index(index, items.len())?].clone())
        }
        Value::Str(s) => {
            let index = to_index(&force(key)?)?;
            let len = s.chars().count();
            let index = normalize_index(index, len)?;
            let c = s.chars().nth(index).ok_or(Error::Index {
                index: index as i64,
                len,
            })?;
            Ok(Value::Str(c.into()))
        }
        Value::Dict(entries) => {
            let key = Key::from_value(key)?;
            entries
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| key_error(&key))
        }
        Value::Object(object) => object.get_item(key),
        _ => Err(Error::type_error(eco_format!(
            "{} object is not subscriptable",
            describe(container)
        ))),
    }
}

pub fn set_item(container: &Value, key: &Value, new: Value) -> Result<()> {
    match container {
        Value::List(items) => {
            let index = to_index(&force(key)?)?;
            let mut items = items.borrow_mut();
            let index = normalize_index(index, items.len())?;
            items[index] = new;
            Ok(())
        }
        Value::Dict(entries) => {
            let key = Key::from_value(key)?;
            entries.borrow_mut().insert(key, new);
            Ok(())
        }
        Value::Object(object) => object.set_item(key, new),
        _ => Err(Error::type_error(eco_format!(
            "{} object does not support item assignment",
            describe(container)
        ))),
    }
}

pub fn del_item(container: &Value, key: &Value) -> Result<()> {
    match container {
        Value::List(items) => {
            let index = to_index(&force(key)?)?;
            let mut items = items.borrow_mut();
            let index = normalize_index(index, items.len())?;
            items.remove(index);
            Ok(())
        }
        Value::Dict(entries) => {
            let key = Key::from_value(key)?;
            match entries.borrow_mut().remove(&key) {
                Some(_) => Ok(()),
                None => Err(key_error(&key)),
            }
        }
        Value::Object(object) => object.del_item(key),
        _ => Err(Error::type_error(eco_format!(
            "{} object does not support item deletion",
            describe(container)
        ))),
    }
}

/// Membership test, `item in container`.
pub fn contains(container: &Value, item: &Value) -> Result<bool> {
    match container {
        Value::Tuple(items) => any_equal(items, item),
        Value::List(items) => {
            let items = items.borrow().clone();
            any_equal(&items, item)
        }
        Value::Str(s) => match force(item)? {
            Value::Str(needle) => Ok(s.contains(needle.as_str())),
            other => Err(Error::type_error(eco_format!(
                "'in <str>' requires string as left operand, not {}",
                describe(&other)
            ))),
        },
        Value::Dict(entries) => {
            let key = Key::from_value(item)?;
            Ok(entries.borrow().contains_key(&key))
        }
        Value::Object(object) => match object.contains(item) {
            Some(result) => result,
            None => {
                let iterator = iter(container)?;
                while let Some(element) = next(&iterator)? {
                    if arith::equals(&element, item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        },
        _ => Err(Error::type_error(eco_format!(
            "argument of type {} is not iterable",
            describe(container)
        ))),
    }
}

fn any_equal(items: &[Value], item: &Value) -> Result<bool> {
    for element in items {
        if arith::equals(element, item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

// ============================================================================
// Conversions
// ============================================================================

pub fn len(value: &Value) -> Result<usize> {
    match value {
        Value::Str(s) => Ok(s.chars().count()),
        Value::Tuple(items) => Ok(items.len()),
        Value::List(items) => Ok(items.borrow().len()),
        Value::Dict(entries) => Ok(entries.borrow().len()),
        Value::Object(object) => object.len().unwrap_or_else(|| Err(no_len(value))),
        _ => Err(no_len(value)),
    }
}

fn no_len(value: &Value) -> Error {
    Error::type_error(eco_format!("object of type {} has no len()", describe(value)))
}

/// Hash of a normal value.
///
/// Objects without a hash of their own, functions and operators hash by
/// identity. Lists and dicts are unhashable.
pub fn hash(value: &Value) -> Result<i64> {
    match value {
        Value::Object(object) => match object.hash() {
            Some(hash) => hash,
            None => Ok(identity_hash(value)),
        },
        Value::Function(_) | Value::Operator(_) => Ok(identity_hash(value)),
        _ => Ok(Key::from_value(value)?.hash_value()),
    }
}

fn identity_hash(value: &Value) -> i64 {
    Key::Int(value.addr().unwrap_or_default() as i64).hash_value()
}

pub fn to_bool(value: &Value) -> Result<bool> {
    match value {
        Value::None => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        Value::Float(x) => Ok(*x != 0.0),
        Value::Str(s) => Ok(!s.is_empty()),
        Value::Tuple(items) => Ok(!items.is_empty()),
        Value::List(items) => Ok(!items.borrow().is_empty()),
        Value::Dict(entries) => Ok(!entries.borrow().is_empty()),
        Value::Function(_) | Value::Operator(_) => Ok(true),
        Value::Object(object) => object.to_bool(),
        Value::Thunk(_) => to_bool(&force(value)?),
    }
}

pub fn to_int(value: &Value) -> Result<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(*b as i64),
        Value::Float(x) => match arith::float_to_int(x.trunc())? {
            Value::Int(i) => Ok(i),
            _ => Err(Error::Overflow { op: "int" }),
        },
        Value::Str(s) => s.trim().parse::<i64>().map_err(|_| {
            Error::value_error(eco_format!("invalid literal for int(): {:?}", s.as_str()))
        }),
        Value::Object(object) => object
            .to_int()
            .unwrap_or_else(|| Err(conversion_error("int", value))),
        _ => Err(conversion_error("int", value)),
    }
}

pub fn to_float(value: &Value) -> Result<f64> {
    match value {
        Value::Int(_) | Value::Bool(_) | Value::Float(_) => {
            value.as_float().ok_or_else(|| conversion_error("float", value))
        }
        Value::Str(s) => s.trim().parse::<f64>().map_err(|_| {
            Error::value_error(eco_format!(
                "could not convert string to float: {:?}",
                s.as_str()
            ))
        }),
        Value::Object(object) => object
            .to_float()
            .unwrap_or_else(|| Err(conversion_error("float", value))),
        _ => Err(conversion_error("float", value)),
    }
}

/// Lossless integer coercion, as used for sequence indices.
pub fn to_index(value: &Value) -> Result<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(*b as i64),
        Value::Object(object) => object.to_index().unwrap_or_else(|| Err(not_index(value))),
        _ => Err(not_index(value)),
    }
}

fn not_index(value: &Value) -> Error {
    Error::type_error(eco_format!(
        "{} object cannot be interpreted as an integer",
        describe(value)
    ))
}

fn conversion_error(target: &str, value: &Value) -> Error {
    Error::type_error(eco_format!(
        "{}() argument must be a string or a number, not {}",
        target,
        describe(value)
    ))
}

/// Informal string form: strings are returned without quotes.
pub fn to_str(value: &Value) -> EcoString {
    match value {
        Value::Str(s) => s.clone(),
        Value::Object(object) => object.to_str(),
        _ => eco_format!("{}", value),
    }
}

pub fn repr(value: &Value) -> EcoString {
    eco_format!("{}", value)
}

// ============================================================================
// Iteration and calls
// ============================================================================

/// Start iterating over `value`.
pub fn iter(value: &Value) -> Result<Value> {
    match value {
        Value::Object(object) => object.iter(value),
        _ => match SeqIter::new(value) {
            Some(iterator) => Ok(Value::object(iterator)),
            None => Err(Error::type_error(eco_format!(
                "{} object is not iterable",
                describe(value)
            ))),
        },
    }
}

/// Advance an iterator. `Ok(None)` means exhausted.
pub fn next(value: &Value) -> Result<Option<Value>> {
    match value {
        Value::Object(object) if object.is_iterator() => object.next(),
        _ => Err(Error::not_iterator(value)),
    }
}

/// Whether `value` is an iterator (as opposed to merely iterable).
pub fn is_iterator(value: &Value) -> bool {
    matches!(value, Value::Object(object) if object.is_iterator())
}

/// Call a normal callable directly.
pub fn call(function: &Value, args: &[Value], kwargs: Option<&Kwargs>) -> Result<Value> {
    match function {
        Value::Function(function) => function.call(args, kwargs),
        Value::Operator(wrapper) => wrapper.call(args, kwargs),
        Value::Object(object) if object.is_callable() => object.call(args, kwargs),
        _ => Err(Error::not_callable(function)),
    }
}

/// Force `value` and drain it into a vector, forcing nothing else.
pub fn collect(value: &Value) -> Result<Vec<Value>> {
    let value = force(value)?;
    match &value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Tuple(items) => Ok(items.to_vec()),
        _ => {
            let iterator = iter(&value)?;
            let mut out = Vec::new();
            while let Some(item) = next(&iterator)? {
                out.push(item);
            }
            Ok(out)
        }
    }
}
