//! Deferred nodes ("thunks").
//!
//! A [`Thunk`] is a shared handle to a node that is either a pending function
//! application or a memoized normal value. Nodes move from pending to done
//! exactly once, on successful forcing, and release their recipe when they do.
//!
//! # State machine
//!
//! ```text
//! Pending(recipe) --force--> Forcing(recipe) --ok--> Done(value)
//!                                  |
//!                                  +--error--> Pending(recipe)
//! ```
//!
//! Any state can be moved to `Released` by the cycle collector.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ecow::EcoString;
use tracing::trace;

use crate::{
    errors::{Error, Result},
    ops::protocol,
    strict,
    values::{Args, Kwargs, Value},
};

mod force;
mod intercept;
mod std_ops;

pub use force::{Evaluator, force, seq};


/// Runtime tag of a node.
///
/// Every node derived from another one by the interception layer inherits the
/// tag of its deferred operand, so specialised node families survive operator
/// application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKind(&'static str);

impl NodeKind {
    pub const DEFAULT: NodeKind = NodeKind("thunk");

    pub const fn new(name: &'static str) -> Self {
        NodeKind(name)
    }

    pub fn name(self) -> &'static str {
        self.0
    }
}

impl Default for NodeKind {
    fn default() -> Self {
        NodeKind::DEFAULT
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A pending function application.
pub(crate) struct Recipe {
    pub(crate) function: Value,
    pub(crate) args: Args,
    pub(crate) kwargs: Option<Kwargs>,
}

pub(crate) enum State {
    Pending(Rc<Recipe>),
    /// Being forced. The recipe is kept so a failure can restore it.
    Forcing(Rc<Recipe>),
    Done(Value),
    Released,
}

pub(crate) struct Node {
    kind: NodeKind,
    state: RefCell<State>,
}

/// Dropping a long chain would otherwise recurse once per node. Values this
/// node owns alone are moved onto a local stack and dismantled there.
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        take_owned(self.state.get_mut(), &mut stack);
        while let Some(value) = stack.pop() {
            match value {
                Value::Thunk(Thunk(node)) => {
                    if let Ok(mut node) = Rc::try_unwrap(node) {
                        take_owned(node.state.get_mut(), &mut stack);
                    }
                }
                Value::List(items) => {
                    if let Ok(items) = Rc::try_unwrap(items) {
                        stack.extend(items.into_inner());
                    }
                }
                _ => {}
            }
        }
    }
}

fn take_owned(state: &mut State, stack: &mut Vec<Value>) {
    match std::mem::replace(state, State::Released) {
        State::Pending(recipe) | State::Forcing(recipe) => {
            if let Ok(recipe) = Rc::try_unwrap(recipe) {
                stack.push(recipe.function);
                stack.extend(recipe.args);
                if let Some(kwargs) = recipe.kwargs {
                    stack.extend(kwargs.into_values());
                }
            }
        }
        State::Done(value) => stack.push(value),
        State::Released => {}
    }
}

/// Shared handle to a deferred node.
#[derive(Clone)]
pub struct Thunk(Rc<Node>);

/// Weak handle to a node, as held by the cycle collector.
#[derive(Clone)]
pub(crate) struct WeakThunk(Weak<Node>);

impl WeakThunk {
    pub(crate) fn upgrade(&self) -> Option<Thunk> {
        self.0.upgrade().map(Thunk)
    }
}

pub(crate) enum Begin {
    Done(Value),
    Recipe(Rc<Recipe>),
}

impl Thunk {
    /// Build a pending node without any checks.
    pub(crate) fn pending(
        kind: NodeKind,
        function: Value,
        args: Args,
        kwargs: Option<Kwargs>,
    ) -> Thunk {
        trace!(%kind, arity = args.len(), "node created");
        Thunk(Rc::new(Node {
            kind,
            state: RefCell::new(State::Pending(Rc::new(Recipe {
                function,
                args,
                kwargs,
            }))),
        }))
    }

    /// A pending node of the default kind.
    ///
    /// Unlike [`make_node`], strict constructors are not called eagerly here:
    /// the result is always a node.
    pub fn new(
        function: Value,
        args: impl IntoIterator<Item = Value>,
        kwargs: Option<Kwargs>,
    ) -> Result<Thunk> {
        Thunk::with_kind(NodeKind::DEFAULT, function, args, kwargs)
    }

    /// A pending node of a specific kind.
    pub fn with_kind(
        kind: NodeKind,
        function: Value,
        args: impl IntoIterator<Item = Value>,
        kwargs: Option<Kwargs>,
    ) -> Result<Thunk> {
        if !function.is_callable() {
            return Err(Error::not_callable(&function));
        }
        Ok(Thunk::pending(kind, function, args.into_iter().collect(), kwargs))
    }

    /// An already memoized node.
    pub fn done(value: Value) -> Thunk {
        Thunk::done_with_kind(NodeKind::DEFAULT, value)
    }

    pub fn done_with_kind(kind: NodeKind, value: Value) -> Thunk {
        trace!(%kind, "memoized node created");
        Thunk(Rc::new(Node {
            kind,
            state: RefCell::new(State::Done(value)),
        }))
    }

    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }

    /// Whether the node holds its memoized value.
    pub fn is_forced(&self) -> bool {
        matches!(&*self.0.state.borrow(), State::Done(_))
    }

    /// Whether the cycle collector released this node.
    pub fn is_released(&self) -> bool {
        matches!(&*self.0.state.borrow(), State::Released)
    }

    /// The memoized value, without forcing.
    pub fn memo(&self) -> Option<Value> {
        match &*self.0.state.borrow() {
            State::Done(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Type name of the forced value.
    pub fn type_name(&self) -> Result<EcoString> {
        Ok(force(&Value::Thunk(self.clone()))?.type_name())
    }

    pub fn ptr_eq(&self, other: &Thunk) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub(crate) fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub(crate) fn downgrade(&self) -> WeakThunk {
        WeakThunk(Rc::downgrade(&self.0))
    }

    pub(crate) fn state(&self) -> Ref<'_, State> {
        self.0.state.borrow()
    }

    /// Enter forcing: hand out the memo or the recipe to compute.
    pub(crate) fn begin_force(&self) -> Result<Begin> {
        let mut state = self.0.state.borrow_mut();
        match &*state {
            State::Done(value) => Ok(Begin::Done(value.clone())),
            State::Pending(recipe) => {
                let recipe = recipe.clone();
                *state = State::Forcing(recipe.clone());
                Ok(Begin::Recipe(recipe))
            }
            State::Forcing(_) => Err(Error::CyclicForce),
            State::Released => Err(Error::Released),
        }
    }

    /// Memoize `value`, dropping the recipe.
    pub(crate) fn finish_force(&self, value: Value) {
        // The old state is dropped outside the borrow.
        let _ = self.0.state.replace(State::Done(value));
    }

    /// Return to pending after a failed attempt.
    pub(crate) fn abort_force(&self, recipe: Rc<Recipe>) {
        let mut state = self.0.state.borrow_mut();
        if let State::Forcing(_) = &*state {
            *state = State::Pending(recipe);
        }
    }

    /// Drop everything the node references.
    pub(crate) fn release(&self) {
        let _ = self.0.state.replace(State::Released);
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.0.kind;
        match self.0.state.try_borrow().as_deref() {
            Ok(State::Pending(recipe)) => match &recipe.function {
                Value::Function(function) => write!(f, "<{} pending {}>", kind, function.name()),
                Value::Operator(wrapper) => write!(f, "<{} pending {}>", kind, wrapper.name()),
                _ => write!(f, "<{} pending>", kind),
            },
            Ok(State::Forcing(_)) | Err(_) => write!(f, "<{} forcing>", kind),
            Ok(State::Done(value)) => write!(f, "<{} = {}>", kind, value),
            Ok(State::Released) => write!(f, "<{} released>", kind),
        }
    }
}

// ============================================================================
// Construction entry points
// ============================================================================

/// Smart constructor for deferred applications.
///
/// - A non-callable `function` is rejected with [`Error::NotCallable`].
/// - A strict constructor with arguments is called right away and its result
///   forced; with no arguments the constructor itself is returned.
/// - Anything else yields a pending node. Arguments are retained as given.
pub fn make_node(
    function: Value,
    args: impl IntoIterator<Item = Value>,
    kwargs: Option<Kwargs>,
) -> Result<Value> {
    if !function.is_callable() {
        return Err(Error::not_callable(&function));
    }
    let args: Args = args.into_iter().collect();
    if strict::is_strict(&function) {
        if args.is_empty() {
            return Ok(function);
        }
        trace!(args = args.len(), "calling strict constructor");
        let result = protocol::call(&function, &args, kwargs.as_ref())?;
        return force(&result);
    }
    Ok(Value::Thunk(Thunk::pending(
        NodeKind::DEFAULT,
        function,
        args,
        kwargs,
    )))
}

/// Lift a plain value into the lazy layer as a memoized node.
///
/// Thunks and strict values are returned unchanged.
pub fn wrap_expression(value: Value) -> Value {
    if value.is_thunk() || strict::is_strict(&value) {
        value
    } else {
        Value::Thunk(Thunk::done(value))
    }
}
