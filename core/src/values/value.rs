use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ecow::{EcoString, eco_format};
use hashbrown::{HashMap, HashSet};
use static_assertions::const_assert;

use crate::{
    ops::OperatorWrapper,
    thunk::Thunk,
    values::{Function, Key, Object},
};

/// Keyword arguments of a pending application.
pub type Kwargs = HashMap<EcoString, Value>;

/// Positional arguments. Operator nodes hold one to three operands inline.
pub type Args = smallvec::SmallVec<[Value; 2]>;

/// Every value that can flow through a deferred graph.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(EcoString),
    Tuple(Rc<[Value]>),
    List(Rc<RefCell<Vec<Value>>>),
    Dict(Rc<RefCell<HashMap<Key, Value>>>),
    Function(Rc<dyn Function>),
    Operator(&'static OperatorWrapper),
    Object(Rc<dyn Object>),
    Thunk(Thunk),
}

const_assert!(core::mem::size_of::<Value>() <= 3 * core::mem::size_of::<usize>());

impl Value {
    // ========================================================================
    // Construction
    // ========================================================================

    pub fn str(s: impl Into<EcoString>) -> Self {
        Value::Str(s.into())
    }

    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn dict(entries: impl IntoIterator<Item = (Key, Value)>) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    pub fn function<F: Function + 'static>(function: F) -> Self {
        Value::Function(Rc::new(function))
    }

    pub fn object<O: Object>(object: O) -> Self {
        Value::Object(Rc::new(object))
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Name of the value's type, without forcing.
    ///
    /// A thunk reports `"thunk"`; use [`Thunk::type_name`] for the forced type.
    pub fn type_name(&self) -> EcoString {
        match self {
            Value::None => "none".into(),
            Value::Bool(_) => "bool".into(),
            Value::Int(_) => "int".into(),
            Value::Float(_) => "float".into(),
            Value::Str(_) => "str".into(),
            Value::Tuple(_) => "tuple".into(),
            Value::List(_) => "list".into(),
            Value::Dict(_) => "dict".into(),
            Value::Function(_) => "function".into(),
            Value::Operator(_) => "operator".into(),
            Value::Object(object) => object.type_name().into(),
            Value::Thunk(_) => "thunk".into(),
        }
    }

    pub fn is_thunk(&self) -> bool {
        matches!(self, Value::Thunk(_))
    }

    pub fn as_thunk(&self) -> Option<&Thunk> {
        match self {
            Value::Thunk(thunk) => Some(thunk),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Bool(b) => Some(*b as i64 as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Rc<dyn Object>> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Downcast an object value to its concrete type.
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        let object: &dyn Object = &**self.as_object()?;
        object.as_any().downcast_ref::<T>()
    }

    /// Whether the value can be used as the function of a node.
    ///
    /// Thunks count as callable: calling one defers the call.
    pub fn is_callable(&self) -> bool {
        match self {
            Value::Function(_) | Value::Operator(_) | Value::Thunk(_) => true,
            Value::Object(object) => object.is_callable(),
            _ => false,
        }
    }

    /// Identity comparison for reference values; scalars never share identity.
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a.as_ptr() == b.as_ptr() && a.len() == b.len(),
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(a, b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Operator(a), Value::Operator(b)) => core::ptr::eq(*a, *b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Thunk(a), Value::Thunk(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Address of the shared allocation behind a reference value.
    pub(crate) fn addr(&self) -> Option<usize> {
        match self {
            Value::Tuple(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::List(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Dict(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Function(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Operator(wrapper) => Some(*wrapper as *const OperatorWrapper as usize),
            Value::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Thunk(thunk) => Some(thunk.addr()),
            _ => None,
        }
    }
}

// ============================================================================
// Equality
// ============================================================================

/// Structural equality for normal values; identity for callables, objects and
/// thunks. This never forces.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Float(_), _) | (_, Value::Float(_)) => {
                match (self.as_float(), other.as_float()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
                self.as_int() == other.as_int()
            }
            (Value::Tuple(a), Value::Tuple(b)) => a[..] == b[..],
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                // A pair already being compared further up is assumed equal.
                match Visit::enter(Walk::Eq, self, other) {
                    Some(_visit) => *a.borrow() == *b.borrow(),
                    None => true,
                }
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                match Visit::enter(Walk::Eq, self, other) {
                    Some(_visit) => *a.borrow() == *b.borrow(),
                    None => true,
                }
            }
            _ => self.is(other),
        }
    }
}

// ============================================================================
// Recursion guard
// ============================================================================

/// Kind of recursive walk over containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Walk {
    Repr,
    Eq,
    Order,
}

thread_local! {
    static ACTIVE: RefCell<HashSet<(Walk, usize, usize)>> = RefCell::new(HashSet::new());
}

/// Marks a container (or a pair of containers) as being walked on this
/// thread. Lists and dicts can contain themselves; walks that meet a marked
/// container again stop there instead of recursing forever.
pub(crate) struct Visit {
    key: (Walk, usize, usize),
}

impl Visit {
    /// `None` if the same walk is already inside `lhs` (paired with `rhs`).
    pub(crate) fn enter(walk: Walk, lhs: &Value, rhs: &Value) -> Option<Visit> {
        let key = (
            walk,
            lhs.addr().unwrap_or_default(),
            rhs.addr().unwrap_or_default(),
        );
        ACTIVE
            .with(|active| active.borrow_mut().insert(key))
            .then_some(Visit { key })
    }
}

impl Drop for Visit {
    fn drop(&mut self) {
        ACTIVE.with(|active| {
            active.borrow_mut().remove(&self.key);
        });
    }
}

// ============================================================================
// Formatting
// ============================================================================

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Thunk(thunk) => write!(f, "{:?}", thunk),
            Value::Function(function) => write!(f, "<function {}>", function.name()),
            Value::Operator(wrapper) => write!(f, "<operator {}>", wrapper.name()),
            _ => fmt::Display::fmt(self, f),
        }
    }
}

/// Renders the representation of a normal value. Thunks are shown with a
/// placeholder; formatting never forces.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => format_float(f, *x),
            Value::Str(s) => write!(f, "{:?}", s.as_str()),
            Value::Tuple(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::List(items) => match (items.try_borrow(), Visit::enter(Walk::Repr, self, self)) {
                (Ok(items), Some(_visit)) => {
                    write!(f, "[")?;
                    write_items(f, &items)?;
                    write!(f, "]")
                }
                _ => write!(f, "[...]"),
            },
            Value::Dict(entries) => match (entries.try_borrow(), Visit::enter(Walk::Repr, self, self)) {
                (Ok(entries), Some(_visit)) => {
                    write!(f, "{{")?;
                    for (i, (key, value)) in entries.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}: {}", key, value)?;
                    }
                    write!(f, "}}")
                }
                _ => write!(f, "{{...}}"),
            },
            Value::Function(function) => write!(f, "<function {}>", function.name()),
            Value::Operator(wrapper) => write!(f, "<operator {}>", wrapper.name()),
            Value::Object(object) => write!(f, "{}", object.repr()),
            Value::Thunk(_) => write!(f, "<thunk>"),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Format a float so that it always reads back as a float.
fn format_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        write!(f, "nan")
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            write!(f, "inf")
        } else {
            write!(f, "-inf")
        }
    } else {
        let s = value.to_string();
        if s.contains('.') || s.contains('e') || s.contains('E') {
            write!(f, "{}", s)
        } else {
            write!(f, "{}.0", s)
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<EcoString> for Value {
    fn from(value: EcoString) -> Self {
        Value::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }
}

impl From<Thunk> for Value {
    fn from(thunk: Thunk) -> Self {
        Value::Thunk(thunk)
    }
}

impl From<&Thunk> for Value {
    fn from(thunk: &Thunk) -> Self {
        Value::Thunk(thunk.clone())
    }
}

impl From<&'static OperatorWrapper> for Value {
    fn from(wrapper: &'static OperatorWrapper) -> Self {
        Value::Operator(wrapper)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        key.to_value()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::None,
        }
    }
}

/// Shorthand used by error messages.
pub(crate) fn describe(value: &Value) -> EcoString {
    eco_format!("'{}'", value.type_name())
}
