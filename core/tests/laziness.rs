//! End-to-end behaviour of deferred graphs through the public API.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use deferred_core::{
    BinaryOp, Children, Error, Kwargs, Object, Result, Value, children, force, make_node,
    ops::{protocol, wrapper},
    undefined, values::Closure, wrap_expression,
};
use pretty_assertions::assert_eq;

/// A function that counts its calls and returns `result`.
fn counting(calls: &Rc<Cell<usize>>, result: Value) -> Value {
    let calls = calls.clone();
    Value::closure("counting", move |_args, _kwargs| {
        calls.set(calls.get() + 1);
        Ok(result.clone())
    })
}

fn add(args: &[Value], _kwargs: Option<&Kwargs>) -> Result<Value> {
    args[0].binary_op(BinaryOp::Add, &args[1])
}

#[test]
fn forcing_twice_computes_once() {
    let calls = Rc::new(Cell::new(0));
    let node = make_node(counting(&calls, Value::Int(1)), [], None).unwrap();
    let first = force(&node).unwrap();
    let second = force(&node).unwrap();
    assert_eq!(first, second);
    assert_eq!(calls.get(), 1);
}

#[test]
fn construction_never_calls() {
    let calls = Rc::new(Cell::new(0));
    let node = make_node(counting(&calls, Value::Int(1)), [Value::Int(2)], None).unwrap();
    assert_eq!(calls.get(), 0);
    force(&node).unwrap();
    assert_eq!(calls.get(), 1);
}

#[test]
fn strict_constructor_runs_before_make_node_returns() {
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let strict = Value::function(
        Closure::new("point", move |args, _kwargs| {
            seen.set(seen.get() + 1);
            Ok(Value::tuple(args.iter().cloned()))
        })
        .into_strict(),
    );
    let point = make_node(strict, [Value::Int(1), Value::Int(2)], None).unwrap();
    assert_eq!(calls.get(), 1);
    assert!(!point.is_thunk());
    assert_eq!(point, Value::tuple([Value::Int(1), Value::Int(2)]));
}

#[test]
fn operators_are_transparent() {
    let n = wrap_expression(Value::Int(5));
    let sum = n.binary_op(BinaryOp::Add, &Value::Int(3)).unwrap();
    assert!(sum.is_thunk());
    assert_eq!(force(&sum).unwrap(), Value::Int(8));

    let thunk = n.as_thunk().unwrap();
    let expr = (thunk + 3) * 2 - thunk;
    assert_eq!(force(&Value::from(expr)).unwrap(), Value::Int(11));
}

#[test]
fn undefined_fails_every_time_with_the_same_payload() {
    let sentinel = undefined();
    for _ in 0..3 {
        match force(&sentinel) {
            Err(Error::Undefined(payload)) => assert!(payload.is(&sentinel)),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn nested_deferral_is_chased() {
    let inner = wrap_expression(Value::Int(42));
    let f = {
        let inner = inner.clone();
        Value::closure("f", move |_args, _kwargs| Ok(inner.clone()))
    };
    let node = make_node(f, [], None).unwrap();
    let value = force(&node).unwrap();
    assert!(!value.is_thunk());
    assert_eq!(value, Value::Int(42));
}

#[test]
fn iteration_pulls_one_element_per_step() {
    let pulled = Rc::new(Cell::new(0));
    let source = {
        let pulled = pulled.clone();
        let items = RefCell::new(vec![Value::Int(3), Value::Int(2), Value::Int(1)]);
        Value::iterator_from_fn(move || {
            pulled.set(pulled.get() + 1);
            Ok(items.borrow_mut().pop())
        })
    };
    let iterator = wrap_expression(source);

    let mut elements = Vec::new();
    for expected in 1..=3 {
        let element = iterator.next().unwrap().unwrap();
        assert_eq!(pulled.get(), expected);
        assert!(element.is_thunk());
        elements.push(element);
    }
    assert!(iterator.next().unwrap().is_none());

    let forced: Vec<Value> = elements.iter().map(|e| force(e).unwrap()).collect();
    assert_eq!(forced, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}

#[test]
fn iterating_a_deferred_list() {
    let list = wrap_expression(Value::list([Value::Int(1), Value::Int(2), Value::Int(3)]));
    let iterator = list.iter().unwrap();
    assert!(iterator.is_thunk());
    let mut seen = Vec::new();
    while let Some(element) = iterator.next().unwrap() {
        seen.push(force(&element).unwrap());
    }
    assert_eq!(seen, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
}

#[test]
fn writes_take_effect_immediately() {
    let list = Value::list([Value::Int(0), Value::Int(0)]);
    let deferred = make_node(
        Value::native("same", |args, _kwargs| Ok(args[0].clone())),
        [list.clone()],
        None,
    )
    .unwrap();
    deferred.set_item(&Value::Int(1), Value::Int(7)).unwrap();
    assert_eq!(list, Value::list([Value::Int(0), Value::Int(7)]));

    struct Record(RefCell<Option<Value>>);
    impl Object for Record {
        fn type_name(&self) -> &str {
            "record"
        }
        fn set_attr(&self, _name: &str, value: Value) -> Result<()> {
            *self.0.borrow_mut() = Some(value);
            Ok(())
        }
    }
    let record = Value::object(Record(RefCell::new(None)));
    wrap_expression(record.clone())
        .set_attr("x", Value::Int(1))
        .unwrap();
    let written = record.downcast_ref::<Record>().unwrap().0.borrow().clone();
    assert_eq!(written, Some(Value::Int(1)));
}

#[test]
fn children_before_and_after_forcing() {
    let function = Value::native("add", add);
    let mut kwargs = Kwargs::new();
    kwargs.insert("unused".into(), Value::None);
    let node = make_node(
        function.clone(),
        [Value::Int(1), Value::Int(2)],
        Some(kwargs.clone()),
    )
    .unwrap();

    match children(&node).unwrap() {
        Children::Pending {
            function: reported,
            args,
            kwargs: reported_kwargs,
        } => {
            assert!(reported.is(&function));
            assert_eq!(args, vec![Value::Int(1), Value::Int(2)]);
            assert_eq!(reported_kwargs, kwargs);
        }
        other => panic!("unexpected {:?}", other),
    }

    force(&node).unwrap();
    assert_eq!(children(&node).unwrap(), Children::Normal(Value::Int(3)));
}

#[test]
fn registry_exposes_every_wrapper_by_name() {
    for wrapper in wrapper::all() {
        let found = wrapper::lookup(wrapper.name()).unwrap();
        assert!(std::ptr::eq(found, *wrapper));
    }
    assert_eq!(wrapper::lookup("add").unwrap().arity(), 2);
    assert_eq!(wrapper::lookup("identity").unwrap().arity(), 1);
    assert!(wrapper::lookup("nope").is_none());
}

#[test]
fn failures_propagate_and_leave_nodes_retryable() {
    let attempts = Rc::new(Cell::new(0));
    let seen = attempts.clone();
    let flaky = Value::closure("flaky", move |_args, _kwargs| {
        seen.set(seen.get() + 1);
        if seen.get() == 1 {
            Err(Error::value_error("first attempt"))
        } else {
            Ok(Value::Int(1))
        }
    });
    let node = make_node(flaky, [], None).unwrap();
    let sum = node.binary_op(BinaryOp::Add, &Value::Int(1)).unwrap();
    assert!(matches!(force(&sum), Err(Error::Value(_))));
    assert_eq!(force(&sum).unwrap(), Value::Int(2));
    assert_eq!(attempts.get(), 2);
}

#[test]
fn membership_on_deferred_containers() {
    let list = wrap_expression(Value::list([Value::Int(1), Value::Int(2)]));
    let test = list.contains(&Value::Int(2)).unwrap();
    assert!(test.is_thunk());
    assert_eq!(force(&test).unwrap(), Value::Bool(true));
    assert!(protocol::contains(&force(&list).unwrap(), &Value::Int(2)).unwrap());
}
