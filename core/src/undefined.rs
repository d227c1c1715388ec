//! The `undefined` sentinel: a placeholder that fails whenever it is forced.

use ecow::EcoString;

use crate::{
    errors::{Error, Result},
    values::{Object, Value},
};

/// Type of the sentinel. The only instance lives behind [`undefined()`].
pub struct Undefined(());

impl Object for Undefined {
    fn type_name(&self) -> &str {
        "undefined"
    }

    fn has_normalize(&self) -> bool {
        true
    }

    /// Always fails, carrying the sentinel itself.
    fn normalize(&self, this: &Value) -> Result<Value> {
        Err(Error::Undefined(this.clone()))
    }

    fn repr(&self) -> EcoString {
        "undefined".into()
    }
}

thread_local! {
    static UNDEFINED: Value = Value::object(Undefined(()));
}

/// The sentinel. Every call on a thread returns the same instance.
pub fn undefined() -> Value {
    UNDEFINED.with(Value::clone)
}

pub fn is_undefined(value: &Value) -> bool {
    value.downcast_ref::<Undefined>().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        thunk::{force, make_node, wrap_expression},
        values::Kwargs,
    };

    #[test]
    fn test_sentinel_is_a_singleton() {
        assert!(undefined().is(&undefined()));
        assert!(is_undefined(&undefined()));
        assert!(!is_undefined(&Value::None));
    }

    #[test]
    fn test_forcing_fails_with_itself_every_time() {
        let sentinel = undefined();
        for _ in 0..3 {
            let error = force(&sentinel).unwrap_err();
            let payload = error.undefined_payload().expect("undefined payload");
            assert!(payload.is(&sentinel));
        }
    }

    #[test]
    fn test_wrap_expression_keeps_sentinel() {
        assert!(wrap_expression(undefined()).is(&undefined()));
    }

    #[test]
    fn test_node_depending_on_sentinel_fails() {
        fn first(args: &[Value], _kwargs: Option<&Kwargs>) -> Result<Value> {
            Ok(args[0].clone())
        }
        let node = make_node(Value::native("first", first), [undefined()], None).unwrap();
        let error = force(&node).unwrap_err();
        assert!(matches!(error, Error::Undefined(ref payload) if payload.is(&undefined())));
        // Still pending, so the failure repeats.
        assert!(force(&node).is_err());
    }

    #[test]
    fn test_eager_operations_fail() {
        assert!(matches!(undefined().to_bool(), Err(Error::Undefined(_))));
        assert_eq!(format!("{}", undefined()), "undefined");
    }
}
