//! Forcing: evaluation of deferred values to normal form.

use std::cell::Cell;

use tracing::{debug, trace};

use crate::{
    errors::{Error, Result},
    ops::protocol,
    options::ForceOptions,
    strict,
    thunk::{Begin, Recipe, Thunk},
    values::{Args, Kwargs, Value},
};

thread_local! {
    /// Nodes currently being forced on this thread, across all evaluators.
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// One level of thunk forcing. Dropping it leaves the level, also when a user
/// function unwinds.
struct DepthGuard;

impl DepthGuard {
    fn enter(max_depth: usize) -> Result<DepthGuard> {
        DEPTH.with(|depth| {
            let current = depth.get();
            if current >= max_depth {
                return Err(Error::RecursionLimit {
                    depth: current,
                    max_depth,
                });
            }
            depth.set(current + 1);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Forces deferred values, memoizing every node it computes.
///
/// Nesting depth is counted per thread, so a user function that forces values
/// through its own evaluator still draws on the same budget.
pub struct Evaluator {
    options: ForceOptions,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new(ForceOptions::default())
    }
}

impl Evaluator {
    pub fn new(options: ForceOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ForceOptions {
        &self.options
    }

    /// Force `value` to normal form.
    ///
    /// Thunks are computed (or their memo returned); values that know how to
    /// normalize themselves are normalized until a fixed point; anything else
    /// is already normal.
    pub fn force(&mut self, value: &Value) -> Result<Value> {
        let mut current = value.clone();
        loop {
            if let Value::Thunk(thunk) = &current {
                return self.force_thunk(thunk);
            }
            match strict::normalize_step(&current) {
                None => return Ok(current),
                Some(next) => {
                    let next = next?;
                    // A value that normalizes to itself is normal.
                    if next.is(&current) {
                        return Ok(current);
                    }
                    current = next;
                }
            }
        }
    }

    fn force_thunk(&mut self, thunk: &Thunk) -> Result<Value> {
        let recipe = match thunk.begin_force()? {
            Begin::Done(value) => {
                trace!(kind = %thunk.kind(), "memo hit");
                return Ok(value);
            }
            Begin::Recipe(recipe) => recipe,
        };

        let result =
            DepthGuard::enter(self.options.max_depth).and_then(|_guard| self.compute(&recipe));

        match result {
            Ok(value) => {
                debug!(kind = %thunk.kind(), "node forced");
                thunk.finish_force(value.clone());
                Ok(value)
            }
            Err(error) => {
                debug!(kind = %thunk.kind(), %error, "forcing failed, node left pending");
                thunk.abort_force(recipe);
                Err(error)
            }
        }
    }

    /// Force the function, then the arguments left to right, then the keyword
    /// arguments; apply; and chase the result to normal form.
    fn compute(&mut self, recipe: &Recipe) -> Result<Value> {
        let function = self.force(&recipe.function)?;

        let mut args = Args::with_capacity(recipe.args.len());
        for arg in &recipe.args {
            args.push(self.force(arg)?);
        }

        let kwargs = match &recipe.kwargs {
            Some(kwargs) => {
                let mut forced = Kwargs::with_capacity(kwargs.len());
                for (name, value) in kwargs {
                    forced.insert(name.clone(), self.force(value)?);
                }
                Some(forced)
            }
            None => None,
        };

        let result = protocol::call(&function, &args, kwargs.as_ref())?;
        self.force(&result)
    }
}

/// Force `value` with default options.
pub fn force(value: &Value) -> Result<Value> {
    Evaluator::default().force(value)
}

/// Force `first` for its effects, then return `second` unforced.
pub fn seq(first: &Value, second: &Value) -> Result<Value> {
    force(first)?;
    Ok(second.clone())
}
