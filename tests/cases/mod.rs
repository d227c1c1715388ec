use deferred::{Kwargs, Result, Value, make_node, wrap_expression};

/// Declare a test that builds a deferred value, checks that building it did
/// not compute anything, and checks what forcing it produces.
///
/// `forced:` expects a value; `error:` expects a pattern over the error.
#[macro_export]
macro_rules! test_case {
    ($name:ident, input: $input:expr, forced: $forced:expr $(,)?) => {
        #[test]
        fn $name() {
            let input: deferred::Value = $input;
            assert!(input.is_thunk(), "input should be deferred: {:?}", input);
            pretty_assertions::assert_eq!(deferred::force(&input).unwrap(), $forced);
        }
    };
    ($name:ident, input: $input:expr, error: $error:pat $(,)?) => {
        #[test]
        fn $name() {
            let input: deferred::Value = $input;
            assert!(input.is_thunk(), "input should be deferred: {:?}", input);
            match deferred::force(&input) {
                Err($error) => {}
                other => panic!("unexpected {:?}", other),
            }
        }
    };
}

/// A deferred wrapper around `value`.
pub fn lazy(value: impl Into<Value>) -> Value {
    wrap_expression(value.into())
}

fn identity(args: &[Value], _kwargs: Option<&Kwargs>) -> Result<Value> {
    Ok(args[0].clone())
}

/// A pending node that computes `value` when forced.
pub fn pending(value: impl Into<Value>) -> Value {
    make_node(Value::native("identity", identity), [value.into()], None)
        .expect("native functions are callable")
}
