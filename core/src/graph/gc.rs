//! Visit/clear protocol and cycle collection.
//!
//! Values are reference counted, so a cycle (a pending node whose arguments
//! reach back to it through a list, say) is never freed on its own. The
//! [`CycleCollector`] finds such garbage by trial deletion: within the subgraph
//! reachable from its candidates it subtracts every internal reference from
//! the `Rc` strong counts. Whatever still has references left is held from
//! outside, and so is everything it reaches. The rest is cleared, which breaks
//! the cycles and lets reference counting free it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use hashbrown::HashMap;
use tracing::debug;

use crate::{
    thunk::{State, Thunk, WeakThunk},
    values::{Key, Value},
};

/// The visit/clear duality every container implements.
pub trait Trace {
    /// Visit each value directly owned.
    fn trace(&self, visit: &mut dyn FnMut(&Value));

    /// Drop every owned value.
    fn clear(&self);
}

impl Trace for Thunk {
    fn trace(&self, visit: &mut dyn FnMut(&Value)) {
        match &*self.state() {
            State::Pending(recipe) | State::Forcing(recipe) => {
                visit(&recipe.function);
                recipe.args.iter().for_each(&mut *visit);
                if let Some(kwargs) = &recipe.kwargs {
                    kwargs.values().for_each(&mut *visit);
                }
            }
            State::Done(value) => visit(value),
            State::Released => {}
        }
    }

    fn clear(&self) {
        self.release();
    }
}

impl Trace for Value {
    fn trace(&self, visit: &mut dyn FnMut(&Value)) {
        match self {
            Value::Tuple(items) => items.iter().for_each(visit),
            Value::List(items) => items.borrow().iter().for_each(visit),
            Value::Dict(entries) => entries.borrow().values().for_each(visit),
            Value::Function(function) => function.trace(visit),
            Value::Object(object) => object.trace(visit),
            Value::Thunk(thunk) => thunk.trace(visit),
            _ => {}
        }
    }

    fn clear(&self) {
        match self {
            // Contents are dropped after the borrow ends.
            Value::List(items) => {
                let taken = std::mem::take(&mut *items.borrow_mut());
                drop(taken);
            }
            Value::Dict(entries) => {
                let taken = std::mem::take(&mut *entries.borrow_mut());
                drop(taken);
            }
            Value::Object(object) => object.clear(),
            Value::Thunk(thunk) => thunk.clear(),
            _ => {}
        }
    }
}

/// Number of strong references to the allocation behind a reference value.
fn strong_count(value: &Value) -> Option<usize> {
    match value {
        Value::Tuple(rc) => Some(Rc::strong_count(rc)),
        Value::List(rc) => Some(Rc::strong_count(rc)),
        Value::Dict(rc) => Some(Rc::strong_count(rc)),
        Value::Function(rc) => Some(Rc::strong_count(rc)),
        Value::Object(rc) => Some(Rc::strong_count(rc)),
        Value::Thunk(thunk) => Some(thunk.strong_count()),
        _ => None,
    }
}

/// Whether clearing the value breaks references.
fn clearable(value: &Value) -> bool {
    matches!(
        value,
        Value::List(_) | Value::Dict(_) | Value::Object(_) | Value::Thunk(_)
    )
}

type WeakList = Weak<RefCell<Vec<Value>>>;
type WeakDict = Weak<RefCell<HashMap<Key, Value>>>;

#[derive(Clone)]
enum Candidate {
    Thunk(WeakThunk),
    List(WeakList),
    Dict(WeakDict),
}

impl Candidate {
    fn upgrade(&self) -> Option<Value> {
        match self {
            Candidate::Thunk(weak) => weak.upgrade().map(Value::Thunk),
            Candidate::List(weak) => weak.upgrade().map(Value::List),
            Candidate::Dict(weak) => weak.upgrade().map(Value::Dict),
        }
    }
}

struct Entry {
    /// Held for the duration of a collection; accounts for one strong count.
    value: Value,
    internal: usize,
    edges: Vec<usize>,
    live: bool,
}

/// Collects unreachable cycles among registered containers.
///
/// Holds only weak handles, so registering a value never keeps it alive.
#[derive(Default)]
pub struct CycleCollector {
    candidates: Vec<Candidate>,
}

impl CycleCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a value that may end up in a cycle. Thunks, lists and dicts are
    /// tracked; other values are ignored.
    pub fn register(&mut self, value: &Value) {
        let candidate = match value {
            Value::Thunk(thunk) => Candidate::Thunk(thunk.downgrade()),
            Value::List(rc) => Candidate::List(Rc::downgrade(rc)),
            Value::Dict(rc) => Candidate::Dict(Rc::downgrade(rc)),
            _ => return,
        };
        self.candidates.push(candidate);
    }

    /// Number of tracked values still alive.
    pub fn tracked(&self) -> usize {
        self.candidates
            .iter()
            .filter(|candidate| candidate.upgrade().is_some())
            .count()
    }

    /// Clear every tracked container that is only reachable from garbage
    /// cycles. Returns the number of containers cleared.
    pub fn collect(&mut self) -> usize {
        let roots: Vec<Value> = self
            .candidates
            .iter()
            .filter_map(Candidate::upgrade)
            .collect();
        self.candidates.retain(|candidate| candidate.upgrade().is_some());

        let mut index: HashMap<usize, usize> = HashMap::new();
        let mut entries: Vec<Entry> = Vec::new();
        let mut queue = VecDeque::new();

        let mut intern = |value: &Value, entries: &mut Vec<Entry>, queue: &mut VecDeque<usize>| {
            let addr = value.addr()?;
            strong_count(value)?;
            Some(*index.entry(addr).or_insert_with(|| {
                entries.push(Entry {
                    value: value.clone(),
                    internal: 0,
                    edges: Vec::new(),
                    live: false,
                });
                queue.push_back(entries.len() - 1);
                entries.len() - 1
            }))
        };

        for root in &roots {
            intern(root, &mut entries, &mut queue);
        }
        drop(roots);

        // Discover the reachable subgraph and count internal references.
        while let Some(current) = queue.pop_front() {
            let value = entries[current].value.clone();
            let mut children = Vec::new();
            value.trace(&mut |child| children.push(child.clone()));
            for child in &children {
                if let Some(target) = intern(child, &mut entries, &mut queue) {
                    entries[target].internal += 1;
                    entries[current].edges.push(target);
                }
            }
        }

        // Anything referenced from outside the subgraph is live, as is
        // everything it reaches. Each entry holds one handle of its own.
        let mut pending: Vec<usize> = Vec::new();
        for (i, entry) in entries.iter_mut().enumerate() {
            let strong = strong_count(&entry.value).unwrap_or(0);
            if strong.saturating_sub(1) > entry.internal {
                entry.live = true;
                pending.push(i);
            }
        }
        while let Some(current) = pending.pop() {
            let edges = std::mem::take(&mut entries[current].edges);
            for target in edges {
                if !entries[target].live {
                    entries[target].live = true;
                    pending.push(target);
                }
            }
        }

        let garbage: Vec<Value> = entries
            .iter()
            .filter(|entry| !entry.live && clearable(&entry.value))
            .map(|entry| entry.value.clone())
            .collect();
        let visited = entries.len();
        drop(entries);

        for value in &garbage {
            value.clear();
        }
        debug!(visited, cleared = garbage.len(), "cycle collection finished");
        garbage.len()
    }
}
