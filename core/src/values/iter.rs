//! Built-in iterator objects.

use std::cell::{Cell, RefCell};

use crate::{
    errors::Result,
    values::{Object, Value},
};

/// Index-based iterator over a list or tuple.
///
/// Lists are read live, so items appended while iterating are seen.
pub struct SeqIter {
    source: Value,
    index: Cell<usize>,
}

impl SeqIter {
    /// Iterate over a list or tuple. Strings iterate by character and dicts
    /// over a snapshot of their keys.
    pub fn new(source: &Value) -> Option<SeqIter> {
        let source = match source {
            Value::List(_) | Value::Tuple(_) => source.clone(),
            Value::Str(s) => Value::tuple(s.chars().map(|c| Value::Str(c.into()))),
            Value::Dict(entries) => Value::tuple(entries.borrow().keys().map(|key| key.to_value())),
            _ => return None,
        };
        Some(SeqIter {
            source,
            index: Cell::new(0),
        })
    }
}

impl Object for SeqIter {
    fn type_name(&self) -> &str {
        "seq_iterator"
    }

    fn is_iterator(&self) -> bool {
        true
    }

    fn next(&self) -> Result<Option<Value>> {
        let index = self.index.get();
        let item = match &self.source {
            Value::List(items) => items.borrow().get(index).cloned(),
            Value::Tuple(items) => items.get(index).cloned(),
            _ => None,
        };
        if item.is_some() {
            self.index.set(index + 1);
        }
        Ok(item)
    }

    fn trace(&self, visit: &mut dyn FnMut(&Value)) {
        visit(&self.source);
    }
}

type NextFn = dyn FnMut() -> Result<Option<Value>>;

/// An iterator driven by a closure; each step calls it once.
pub struct FnIter {
    next: RefCell<Box<NextFn>>,
}

impl FnIter {
    pub fn new<F>(next: F) -> Self
    where
        F: FnMut() -> Result<Option<Value>> + 'static,
    {
        FnIter {
            next: RefCell::new(Box::new(next)),
        }
    }
}

impl Object for FnIter {
    fn type_name(&self) -> &str {
        "fn_iterator"
    }

    fn is_iterator(&self) -> bool {
        true
    }

    fn next(&self) -> Result<Option<Value>> {
        (self.next.borrow_mut())()
    }
}

impl Value {
    /// An iterator value whose steps are produced by `next`.
    pub fn iterator_from_fn<F>(next: F) -> Value
    where
        F: FnMut() -> Result<Option<Value>> + 'static,
    {
        Value::object(FnIter::new(next))
    }
}
