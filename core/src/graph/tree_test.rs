//! Unit tests for expression trees.

use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::*;
use crate::{
    ops::BinaryOp,
    options::ForceOptions,
    thunk::{NodeKind, Thunk, force, make_node, wrap_expression},
    values::{Kwargs, Value},
};

fn add() -> Value {
    Value::native("add", |args, _kwargs| args[0].binary_op(BinaryOp::Add, &args[1]))
}

fn mul() -> Value {
    Value::native("mul", |args, _kwargs| args[0].binary_op(BinaryOp::Mul, &args[1]))
}

fn leaf(value: impl Into<Value>) -> ExprTree {
    ExprTree::normal(value.into())
}

#[test]
fn test_parse_pending_graph() {
    let x = make_node(add(), [Value::Int(1), Value::Int(2)], None).unwrap();
    let y = make_node(mul(), [x.clone(), Value::Int(4)], None).unwrap();
    let tree = ExprTree::parse(&y).unwrap();
    assert!(tree.is_call());
    assert_eq!(tree.to_string(), "mul(add(1, 2), 4)");
    // Parsing never forces.
    assert!(!x.as_thunk().unwrap().is_forced());
}

#[test]
fn test_forced_nodes_become_leaves() {
    let x = make_node(add(), [Value::Int(1), Value::Int(2)], None).unwrap();
    let y = make_node(mul(), [x.clone(), x.clone()], None).unwrap();
    force(&x).unwrap();
    assert_eq!(ExprTree::parse(&y).unwrap().to_string(), "mul(3, 3)");
    force(&y).unwrap();
    let tree = ExprTree::parse(&y).unwrap();
    assert!(!tree.is_call());
    assert_eq!(tree, leaf(9));
}

#[test]
fn test_normal_values_are_leaves() {
    let tree = ExprTree::parse(&Value::list([Value::Int(1)])).unwrap();
    assert!(!tree.is_call());
    assert_eq!(tree.to_string(), "[1]");
}

#[test]
fn test_shared_nodes_become_shared_subtrees() {
    let x = make_node(add(), [Value::Int(1), Value::Int(2)], None).unwrap();
    let y = make_node(mul(), [x.clone(), x], None).unwrap();
    let tree = ExprTree::parse(&y).unwrap();
    let TreeNode::Call { args, .. } = tree.node() else {
        panic!("expected a call");
    };
    assert!(args[0].ptr_eq(&args[1]));
}

#[test]
fn test_compile_round_trips_through_force() {
    let x = make_node(add(), [Value::Int(1), Value::Int(2)], None).unwrap();
    let y = make_node(mul(), [x.clone(), Value::Int(4)], None).unwrap();
    let compiled = ExprTree::parse(&y).unwrap().compile();
    assert!(compiled.is_thunk());
    assert!(!compiled.is(&y));
    assert_eq!(force(&compiled).unwrap(), Value::Int(12));
    // The original graph is untouched.
    assert!(!y.as_thunk().unwrap().is_forced());
    assert_eq!(force(&y).unwrap(), Value::Int(12));
}

#[test]
fn test_compiled_diamond_is_computed_once() {
    let calls = Rc::new(Cell::new(0));
    let seen = calls.clone();
    let counted = Value::closure("counted", move |args, _kwargs| {
        seen.set(seen.get() + 1);
        Ok(args[0].clone())
    });
    let shared = make_node(counted, [Value::Int(5)], None).unwrap();
    let top = make_node(add(), [shared.clone(), shared], None).unwrap();
    let compiled = ExprTree::parse(&top).unwrap().compile();
    assert_eq!(force(&compiled).unwrap(), Value::Int(10));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_build_and_compile_by_hand() {
    let inner = ExprTree::call(leaf(add()), [leaf(2), leaf(3)], []);
    let tree = ExprTree::call(leaf(mul()), [inner.clone(), inner], []);
    assert_eq!(tree.to_string(), "mul(add(2, 3), add(2, 3))");
    assert_eq!(force(&tree.compile()).unwrap(), Value::Int(25));
}

#[test]
fn test_keyword_arguments_are_sorted() {
    let scaled = Value::native("scaled", |args, kwargs| {
        let get = |name: &str| {
            kwargs
                .and_then(|kwargs| kwargs.get(name))
                .and_then(Value::as_int)
                .unwrap_or_default()
        };
        Ok(Value::Int(args[0].as_int().unwrap_or_default() * get("a") + get("b")))
    });
    let tree = ExprTree::call(
        leaf(scaled.clone()),
        [leaf(2)],
        [("b".into(), leaf(1)), ("a".into(), leaf(10))],
    );
    assert_eq!(tree.to_string(), "scaled(2, a=10, b=1)");
    assert_eq!(force(&tree.compile()).unwrap(), Value::Int(21));

    let mut kwargs = Kwargs::new();
    kwargs.insert("b".into(), Value::Int(1));
    kwargs.insert("a".into(), Value::Int(10));
    let node = make_node(scaled, [Value::Int(2)], Some(kwargs)).unwrap();
    let parsed = ExprTree::parse(&node).unwrap();
    assert_eq!(parsed, tree);
}

#[test]
fn test_operator_nodes_display_their_name() {
    let x = wrap_expression(Value::Int(5));
    let sum = x.binary_op(BinaryOp::Add, &Value::Int(3)).unwrap();
    assert_eq!(ExprTree::parse(&sum).unwrap().to_string(), "add(5, 3)");
}

#[test]
fn test_kind_survives_parse_and_compile() {
    const SPECIAL: NodeKind = NodeKind::new("special");
    let node = Thunk::with_kind(SPECIAL, add(), [Value::Int(1), Value::Int(1)], None).unwrap();
    let tree = ExprTree::parse(&Value::Thunk(node)).unwrap();
    let TreeNode::Call { kind, .. } = tree.node() else {
        panic!("expected a call");
    };
    assert_eq!(*kind, SPECIAL);
    let compiled = tree.compile();
    assert_eq!(compiled.as_thunk().unwrap().kind(), SPECIAL);
}

#[test]
fn test_traverse_is_pre_order() {
    let g = ExprTree::call(leaf("g"), [leaf("b")], []);
    let tree = ExprTree::call(leaf("f"), [leaf("a"), g], [("k".into(), leaf("c"))]);
    let order: Vec<String> = tree.traverse().map(|subtree| subtree.to_string()).collect();
    assert_eq!(
        order,
        vec![
            "\"f\"(\"a\", \"g\"(\"b\"), k=\"c\")",
            "\"f\"",
            "\"a\"",
            "\"g\"(\"b\")",
            "\"g\"",
            "\"b\"",
            "\"c\"",
        ]
    );
}

#[test]
fn test_subs_replaces_matching_subtrees() {
    let x = make_node(add(), [Value::Int(1), Value::Int(2)], None).unwrap();
    let y = make_node(mul(), [x, Value::Int(4)], None).unwrap();
    let tree = ExprTree::parse(&y).unwrap();
    let replaced = tree.subs(&mut |subtree| {
        (*subtree == leaf(1)).then(|| leaf(10))
    });
    assert_eq!(replaced.to_string(), "mul(add(10, 2), 4)");
    assert_eq!(force(&replaced.compile()).unwrap(), Value::Int(48));
    // The original is unchanged.
    assert_eq!(tree.to_string(), "mul(add(1, 2), 4)");
}

#[test]
fn test_contains_is_structural() {
    let f = add();
    let tree = ExprTree::call(
        leaf(f.clone()),
        [ExprTree::call(leaf(f.clone()), [leaf(1), leaf(2)], []), leaf(3)],
        [],
    );
    assert!(tree.contains(&ExprTree::call(leaf(f.clone()), [leaf(1), leaf(2)], [])));
    assert!(tree.contains(&leaf(3)));
    assert!(!tree.contains(&leaf(4)));
    // Functions compare by identity.
    assert!(!tree.contains(&ExprTree::call(leaf(add()), [leaf(1), leaf(2)], [])));
}

#[test]
fn test_released_nodes_cannot_be_parsed() {
    let node = make_node(add(), [Value::Int(1), Value::Int(2)], None).unwrap();
    node.as_thunk().unwrap().release();
    assert!(matches!(
        ExprTree::parse(&node),
        Err(crate::errors::Error::Released)
    ));
}

#[test]
fn test_parse_depth_is_bounded() {
    let chain = |length: usize| {
        let mut node = Value::Int(0);
        for _ in 0..length {
            node = make_node(add(), [node, Value::Int(1)], None).unwrap();
        }
        node
    };
    let node = chain(20);
    assert!(matches!(
        ExprTree::parse_with(&node, &ForceOptions { max_depth: 10 }),
        Err(Error::RecursionLimit { max_depth: 10, .. })
    ));
    assert!(ExprTree::parse_with(&node, &ForceOptions { max_depth: 20 }).is_ok());

    let max_depth = ForceOptions::default().max_depth;
    assert!(matches!(
        ExprTree::parse(&chain(max_depth + 1)),
        Err(Error::RecursionLimit { .. })
    ));
}
