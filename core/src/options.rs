//! Configuration options for the forcing engine.

/// Options controlling how deferred values are forced.
///
/// # Example
///
/// ```
/// use deferred_core::{Evaluator, ForceOptions, Value, wrap_expression};
///
/// let options = ForceOptions { max_depth: 64 };
/// let mut evaluator = Evaluator::new(options);
/// let value = evaluator.force(&wrap_expression(Value::Int(3))).unwrap();
/// assert_eq!(value, Value::Int(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceOptions {
    /// Maximum nesting of node forcing (for recursion protection).
    ///
    /// Every level costs a few native frames, so the default stays well
    /// inside a 2 MiB thread stack.
    ///
    /// Default: 256
    pub max_depth: usize,
}

impl Default for ForceOptions {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}
