//! Unit tests for arithmetic and comparison on normal values.

use pretty_assertions::assert_eq;

use super::arith::{binary, compare, equals, inplace, power, unary};
use super::*;
use crate::{
    errors::{Error, Result},
    thunk::{force, wrap_expression},
    values::Value,
};

fn int(i: i64) -> Value {
    Value::Int(i)
}

fn float(x: f64) -> Value {
    Value::Float(x)
}

fn run(op: BinaryOp, a: impl Into<Value>, b: impl Into<Value>) -> Result<Value> {
    binary(op, &a.into(), &b.into())
}

#[test]
fn test_integer_arithmetic() {
    assert_eq!(run(BinaryOp::Add, 2, 3).unwrap(), int(5));
    assert_eq!(run(BinaryOp::Sub, 2, 3).unwrap(), int(-1));
    assert_eq!(run(BinaryOp::Mul, 4, -3).unwrap(), int(-12));
    assert_eq!(run(BinaryOp::TrueDiv, 7, 2).unwrap(), float(3.5));
    assert_eq!(run(BinaryOp::Pow, 2, 10).unwrap(), int(1024));
    assert_eq!(run(BinaryOp::And, 6, 3).unwrap(), int(2));
    assert_eq!(run(BinaryOp::Or, 6, 3).unwrap(), int(7));
    assert_eq!(run(BinaryOp::Xor, 6, 3).unwrap(), int(5));
    assert_eq!(run(BinaryOp::LShift, 1, 4).unwrap(), int(16));
    assert_eq!(run(BinaryOp::RShift, -16, 2).unwrap(), int(-4));
    assert_eq!(run(BinaryOp::RShift, -1, 200).unwrap(), int(-1));
}

#[test]
fn test_floor_semantics() {
    assert_eq!(run(BinaryOp::FloorDiv, 7, 2).unwrap(), int(3));
    assert_eq!(run(BinaryOp::FloorDiv, -7, 2).unwrap(), int(-4));
    assert_eq!(run(BinaryOp::FloorDiv, 7, -2).unwrap(), int(-4));
    assert_eq!(run(BinaryOp::Mod, -7, 2).unwrap(), int(1));
    assert_eq!(run(BinaryOp::Mod, 7, -2).unwrap(), int(-1));
    assert_eq!(
        run(BinaryOp::DivMod, -7, 2).unwrap(),
        Value::tuple([int(-4), int(1)])
    );
    assert_eq!(run(BinaryOp::Mod, -7.5, 2.0).unwrap(), float(0.5));
    assert_eq!(run(BinaryOp::FloorDiv, -7.5, 2.0).unwrap(), float(-4.0));
}

#[test]
fn test_zero_division() {
    for op in [BinaryOp::TrueDiv, BinaryOp::FloorDiv, BinaryOp::Mod, BinaryOp::DivMod] {
        assert!(matches!(run(op, 1, 0), Err(Error::ZeroDivision)), "{:?}", op);
        assert!(matches!(run(op, 1.0, 0.0), Err(Error::ZeroDivision)), "{:?}", op);
    }
    assert!(matches!(run(BinaryOp::Pow, 0, -1), Err(Error::ZeroDivision)));
}

#[test]
fn test_overflow_is_an_error() {
    assert!(matches!(
        run(BinaryOp::Add, i64::MAX, 1),
        Err(Error::Overflow { op: "add" })
    ));
    assert!(matches!(
        run(BinaryOp::Mul, i64::MAX, 2),
        Err(Error::Overflow { op: "mul" })
    ));
    assert!(matches!(
        run(BinaryOp::Pow, 10, 40),
        Err(Error::Overflow { .. })
    ));
    assert!(matches!(
        run(BinaryOp::LShift, 1, 64),
        Err(Error::Overflow { .. })
    ));
    assert!(matches!(
        unary(UnaryOp::Neg, &int(i64::MIN)),
        Err(Error::Overflow { op: "neg" })
    ));
    assert_eq!(run(BinaryOp::Mod, i64::MIN, -1).unwrap(), int(0));
}

#[test]
fn test_negative_shift() {
    assert!(matches!(run(BinaryOp::LShift, 1, -1), Err(Error::Value(_))));
    assert!(matches!(run(BinaryOp::RShift, 1, -1), Err(Error::Value(_))));
}

#[test]
fn test_mixed_numbers() {
    assert_eq!(run(BinaryOp::Add, 1, 0.5).unwrap(), float(1.5));
    assert_eq!(run(BinaryOp::Mul, true, 3).unwrap(), int(3));
    assert_eq!(run(BinaryOp::Pow, 2, -1).unwrap(), float(0.5));
    assert_eq!(run(BinaryOp::Pow, 4.0, 0.5).unwrap(), float(2.0));
}

#[test]
fn test_booleans() {
    assert_eq!(run(BinaryOp::And, true, false).unwrap(), Value::Bool(false));
    assert_eq!(run(BinaryOp::Or, true, false).unwrap(), Value::Bool(true));
    assert_eq!(run(BinaryOp::Xor, true, true).unwrap(), Value::Bool(false));
    assert_eq!(run(BinaryOp::Add, true, true).unwrap(), int(2));
}

#[test]
fn test_sequences() {
    assert_eq!(run(BinaryOp::Add, "ab", "cd").unwrap(), Value::str("abcd"));
    assert_eq!(run(BinaryOp::Mul, "ab", 3).unwrap(), Value::str("ababab"));
    assert_eq!(run(BinaryOp::Mul, 2, "x").unwrap(), Value::str("xx"));
    assert_eq!(run(BinaryOp::Mul, "x", -1).unwrap(), Value::str(""));
    assert_eq!(
        run(
            BinaryOp::Add,
            Value::tuple([int(1)]),
            Value::tuple([int(2)])
        )
        .unwrap(),
        Value::tuple([int(1), int(2)])
    );
    let list = Value::list([int(1)]);
    let doubled = run(BinaryOp::Mul, list.clone(), 2).unwrap();
    assert_eq!(doubled, Value::list([int(1), int(1)]));
    // A new list, not the original.
    assert!(!doubled.is(&list));
}

#[test]
fn test_unsupported_operands() {
    let error = run(BinaryOp::Sub, "a", 1).unwrap_err();
    assert_eq!(
        error.to_string(),
        "unsupported operand type(s) for -: 'str' and 'int'"
    );
    assert!(matches!(run(BinaryOp::MatMul, 1, 2), Err(Error::Type(_))));
    assert!(matches!(run(BinaryOp::And, 1.0, 2), Err(Error::Type(_))));
}

#[test]
fn test_unary() {
    assert_eq!(unary(UnaryOp::Neg, &int(3)).unwrap(), int(-3));
    assert_eq!(unary(UnaryOp::Pos, &float(-1.5)).unwrap(), float(-1.5));
    assert_eq!(unary(UnaryOp::Abs, &float(-1.5)).unwrap(), float(1.5));
    assert_eq!(unary(UnaryOp::Invert, &int(0)).unwrap(), int(-1));
    assert_eq!(unary(UnaryOp::Round, &float(3.5)).unwrap(), int(4));
    assert_eq!(unary(UnaryOp::Round, &float(-2.5)).unwrap(), int(-2));
    assert_eq!(unary(UnaryOp::Floor, &float(-0.5)).unwrap(), int(-1));
    assert_eq!(unary(UnaryOp::Ceil, &float(-0.5)).unwrap(), int(0));
    assert_eq!(unary(UnaryOp::Trunc, &float(-1.9)).unwrap(), int(-1));
    assert_eq!(unary(UnaryOp::Floor, &int(4)).unwrap(), int(4));
    assert!(matches!(unary(UnaryOp::Invert, &float(1.0)), Err(Error::Type(_))));
    assert!(matches!(unary(UnaryOp::Round, &float(f64::NAN)), Err(Error::Value(_))));
    assert!(matches!(
        unary(UnaryOp::Floor, &float(f64::INFINITY)),
        Err(Error::Overflow { .. })
    ));
    assert!(matches!(unary(UnaryOp::Neg, &Value::str("a")), Err(Error::Type(_))));
}

#[test]
fn test_power_with_modulus() {
    assert_eq!(power(&int(3), &int(4), &int(5)).unwrap(), int(1));
    assert_eq!(power(&int(-2), &int(3), &int(5)).unwrap(), int(2));
    assert_eq!(power(&int(2), &int(3), &int(-5)).unwrap(), int(-2));
    assert_eq!(power(&int(2), &int(3), &Value::None).unwrap(), int(8));
    assert!(matches!(power(&int(2), &int(3), &int(0)), Err(Error::Value(_))));
    assert!(matches!(power(&int(2), &int(-1), &int(5)), Err(Error::Value(_))));
    assert!(matches!(power(&float(2.0), &int(3), &int(5)), Err(Error::Type(_))));
}

#[test]
fn test_comparisons() {
    assert!(compare(CompareOp::Lt, &int(1), &float(1.5)).unwrap());
    assert!(compare(CompareOp::Eq, &int(1), &float(1.0)).unwrap());
    assert!(compare(CompareOp::Ge, &Value::str("b"), &Value::str("a")).unwrap());
    assert!(
        compare(
            CompareOp::Lt,
            &Value::tuple([int(1), int(2)]),
            &Value::tuple([int(1), int(3)])
        )
        .unwrap()
    );
    assert!(
        compare(
            CompareOp::Lt,
            &Value::list([int(1)]),
            &Value::list([int(1), int(0)])
        )
        .unwrap()
    );
    assert!(!compare(CompareOp::Lt, &float(f64::NAN), &float(1.0)).unwrap());
    assert!(compare(CompareOp::Ne, &int(1), &Value::str("1")).unwrap());
    assert!(!compare(CompareOp::Eq, &int(1), &Value::str("1")).unwrap());
    assert!(matches!(
        compare(CompareOp::Lt, &int(1), &Value::str("1")),
        Err(Error::Type(_))
    ));
}

#[test]
fn test_comparisons_force_container_elements() {
    let lazy_one = wrap_expression(int(1));
    let a = Value::tuple([lazy_one.clone(), int(2)]);
    let b = Value::tuple([int(1), int(2)]);
    assert!(equals(&a, &b).unwrap());
    // Plain `==` never forces, so it sees a thunk where `b` has an int.
    assert!(a != b);
    assert!(compare(CompareOp::Le, &a, &b).unwrap());
    assert!(equals(&lazy_one, &int(1)).unwrap());
}

#[test]
fn test_inplace_on_lists() {
    let list = Value::list([int(1)]);
    let result = inplace(BinaryOp::Add, &list, &Value::tuple([int(2), int(3)])).unwrap();
    assert!(result.is(&list));
    assert_eq!(list, Value::list([int(1), int(2), int(3)]));

    let result = inplace(BinaryOp::Mul, &list, &int(0)).unwrap();
    assert!(result.is(&list));
    assert_eq!(list, Value::list([]));

    // Non-mutable values produce a new value.
    assert_eq!(inplace(BinaryOp::Sub, &int(5), &int(2)).unwrap(), int(3));
    let deferred = inplace(BinaryOp::Sub, &int(5), &wrap_expression(int(2))).unwrap();
    assert_eq!(force(&deferred).unwrap(), int(3));
}

#[test]
fn test_huge_repetition_overflows() {
    let huge = int(i64::MAX);
    for seq in [
        Value::str("ab"),
        Value::tuple([int(1), int(2)]),
        Value::list([int(1)]),
    ] {
        assert!(matches!(
            binary(BinaryOp::Mul, &seq, &huge),
            Err(Error::Overflow { op: "mul" })
        ));
        assert!(matches!(
            binary(BinaryOp::Mul, &huge, &seq),
            Err(Error::Overflow { op: "mul" })
        ));
    }

    let list = Value::list([int(1), int(2)]);
    assert!(matches!(
        inplace(BinaryOp::Mul, &list, &huge),
        Err(Error::Overflow { op: "mul" })
    ));
    // A failed repetition leaves the list as it was.
    assert_eq!(list, Value::list([int(1), int(2)]));
}

#[test]
fn test_repeating_empty_sequences() {
    let huge = int(i64::MAX);
    assert_eq!(binary(BinaryOp::Mul, &Value::str(""), &huge).unwrap(), Value::str(""));
    assert_eq!(
        binary(BinaryOp::Mul, &Value::tuple([]), &huge).unwrap(),
        Value::tuple([])
    );
    assert_eq!(
        binary(BinaryOp::Mul, &Value::str("ab"), &int(-3)).unwrap(),
        Value::str("")
    );
    assert_eq!(
        binary(BinaryOp::Mul, &Value::str("ab"), &int(3)).unwrap(),
        Value::str("ababab")
    );
}
