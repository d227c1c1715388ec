//! Introspection and memory management of deferred graphs.
//!
//! [`children`] exposes the current shape of a node without forcing anything.
//! [`gc`] holds the visit/clear protocol and the cycle collector, and [`tree`]
//! converts graphs to and from explicit expression trees.

pub mod gc;
pub mod tree;

pub use gc::{CycleCollector, Trace};
pub use tree::{ExprTree, TreeNode};

use ecow::eco_format;

use crate::{
    errors::{Error, Result},
    thunk::{State, Thunk},
    values::{Kwargs, Value, describe},
};

#[cfg(test)]
mod tree_test;

/// Current shape of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Children {
    /// Not computed yet. A node without keyword arguments reports an empty
    /// mapping.
    Pending {
        function: Value,
        args: Vec<Value>,
        kwargs: Kwargs,
    },
    /// Computed; the recipe is gone.
    Normal(Value),
}

impl Thunk {
    /// See [`children`].
    pub fn children(&self) -> Result<Children> {
        match &*self.state() {
            State::Pending(recipe) | State::Forcing(recipe) => Ok(Children::Pending {
                function: recipe.function.clone(),
                args: recipe.args.to_vec(),
                kwargs: recipe.kwargs.clone().unwrap_or_default(),
            }),
            State::Done(value) => Ok(Children::Normal(value.clone())),
            State::Released => Err(Error::Released),
        }
    }
}

/// Read the shape of a thunk. Fails with a type error for any other value.
pub fn children(value: &Value) -> Result<Children> {
    match value {
        Value::Thunk(thunk) => thunk.children(),
        _ => Err(Error::type_error(eco_format!(
            "children() expects a thunk, not {}",
            describe(value)
        ))),
    }
}
