//! Hashable projection of values, used for dictionary keys and hashing.

use std::fmt;
use std::hash::BuildHasher;
use std::rc::Rc;

use ecow::EcoString;
use once_cell::sync::Lazy;

use crate::{
    errors::{Error, Result},
    thunk::force,
    values::{Value, describe},
};

/// A value that can be hashed.
///
/// Integral floats and booleans collapse onto the equal integer so that
/// `1`, `1.0` and `true` address the same dictionary slot.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Key {
    None,
    Int(i64),
    /// Bit pattern of a float with a fractional part (or a non-finite float).
    Float(u64),
    Str(EcoString),
    Tuple(Rc<[Key]>),
}

static HASHER: Lazy<hashbrown::DefaultHashBuilder> = Lazy::new(Default::default);

impl Key {
    /// Project a value onto a key, forcing it first if it is deferred.
    pub fn from_value(value: &Value) -> Result<Key> {
        match value {
            Value::None => Ok(Key::None),
            Value::Bool(b) => Ok(Key::Int(*b as i64)),
            Value::Int(i) => Ok(Key::Int(*i)),
            Value::Float(x) => Ok(float_key(*x)),
            Value::Str(s) => Ok(Key::Str(s.clone())),
            Value::Tuple(items) => Ok(Key::Tuple(
                items.iter().map(Key::from_value).collect::<Result<_>>()?,
            )),
            Value::Thunk(_) => Key::from_value(&force(value)?),
            _ => Err(Error::type_error(format_args!(
                "unhashable type: {}",
                describe(value)
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::None => Value::None,
            Key::Int(i) => Value::Int(*i),
            Key::Float(bits) => Value::Float(f64::from_bits(*bits)),
            Key::Str(s) => Value::Str(s.clone()),
            Key::Tuple(items) => Value::tuple(items.iter().map(Key::to_value)),
        }
    }

    /// Stable (per process) hash of the key.
    pub fn hash_value(&self) -> i64 {
        HASHER.hash_one(self) as i64
    }
}

fn float_key(x: f64) -> Key {
    if x.is_finite() && x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Key::Int(x as i64)
    } else if x.is_nan() {
        Key::Float(f64::NAN.to_bits())
    } else {
        Key::Float(x.to_bits())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.into())
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
