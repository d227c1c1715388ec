//! Runtime values.
//!
//! [`Value`] is the tagged union that flows through deferred graphs. Built-in
//! kinds are matched directly; user types plug in through the [`Function`] and
//! [`Object`] capability traits.

pub mod function;
pub mod iter;
pub mod key;
pub mod object;
mod value;

pub use function::{Closure, Function, NativeFn, NativeFunction};
pub use iter::{FnIter, SeqIter};
pub use key::Key;
pub use object::{AsAny, Object};
pub use value::{Args, Kwargs, Value};

pub(crate) use value::{Visit, Walk, describe};
