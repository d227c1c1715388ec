//! Operator wrappers: named, callable adapters around primitive operations.
//!
//! Each supported operation has exactly one `static` wrapper. Deferred nodes
//! built by the interception layer use these as their function, which is what
//! makes the pending graph readable by introspection tools.

use std::fmt;

use ecow::eco_format;
use hashbrown::HashMap;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::{
    errors::{Error, Result},
    ops::{BinaryOp, CompareOp, UnaryOp},
    thunk::force,
    values::{Kwargs, Value, describe},
};

pub type UnaryFn = fn(&Value) -> Result<Value>;
pub type BinaryFn = fn(&Value, &Value) -> Result<Value>;
pub type TernaryFn = fn(&Value, &Value, &Value) -> Result<Value>;

/// A fixed-arity primitive operation.
#[derive(Clone, Copy)]
pub enum Operation {
    Unary(UnaryFn),
    Binary(BinaryFn),
    Ternary(TernaryFn),
}

impl Operation {
    pub fn arity(self) -> usize {
        match self {
            Operation::Unary(_) => 1,
            Operation::Binary(_) => 2,
            Operation::Ternary(_) => 3,
        }
    }
}

pub struct OperatorWrapper {
    name: &'static str,
    operation: Operation,
}

impl OperatorWrapper {
    pub const fn new(name: &'static str, operation: Operation) -> Self {
        Self { name, operation }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn arity(&self) -> usize {
        self.operation.arity()
    }

    /// Apply the operation. Keyword arguments are rejected and the number of
    /// positional arguments must match the arity exactly.
    pub fn call(&self, args: &[Value], kwargs: Option<&Kwargs>) -> Result<Value> {
        if kwargs.is_some_and(|kwargs| !kwargs.is_empty()) {
            return Err(Error::type_error(eco_format!(
                "{}() takes no keyword arguments",
                self.name
            )));
        }
        match (self.operation, args) {
            (Operation::Unary(f), [a]) => f(a),
            (Operation::Binary(f), [a, b]) => f(a, b),
            (Operation::Ternary(f), [a, b, c]) => f(a, b, c),
            _ => Err(Error::type_error(eco_format!(
                "{}() takes exactly {} argument(s) ({} given)",
                self.name,
                self.arity(),
                args.len()
            ))),
        }
    }
}

impl fmt::Debug for OperatorWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<operator {}/{}>", self.name, self.arity())
    }
}

impl PartialEq for OperatorWrapper {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other)
    }
}

// ============================================================================
// Singletons
// ============================================================================

macro_rules! unary_wrappers {
    ($($ident:ident = $name:literal => $op:ident;)*) => {
        $(
            pub static $ident: OperatorWrapper = OperatorWrapper::new(
                $name,
                Operation::Unary(|value| value.unary_op(UnaryOp::$op)),
            );
        )*
    };
}

macro_rules! binary_wrappers {
    ($($ident:ident = $name:literal => $op:ident;)*) => {
        $(
            pub static $ident: OperatorWrapper = OperatorWrapper::new(
                $name,
                Operation::Binary(|lhs, rhs| lhs.binary_op(BinaryOp::$op, rhs)),
            );
        )*
    };
}

macro_rules! compare_wrappers {
    ($($ident:ident = $name:literal => $op:ident;)*) => {
        $(
            pub static $ident: OperatorWrapper = OperatorWrapper::new(
                $name,
                Operation::Binary(|lhs, rhs| lhs.compare(CompareOp::$op, rhs)),
            );
        )*
    };
}

unary_wrappers! {
    NEG = "neg" => Neg;
    POS = "pos" => Pos;
    ABS = "abs" => Abs;
    INVERT = "invert" => Invert;
    ROUND = "round" => Round;
    FLOOR = "floor" => Floor;
    CEIL = "ceil" => Ceil;
    TRUNC = "trunc" => Trunc;
}

binary_wrappers! {
    ADD = "add" => Add;
    SUB = "sub" => Sub;
    MUL = "mul" => Mul;
    TRUEDIV = "truediv" => TrueDiv;
    FLOORDIV = "floordiv" => FloorDiv;
    MOD = "mod" => Mod;
    DIVMOD = "divmod" => DivMod;
    POW = "pow" => Pow;
    LSHIFT = "lshift" => LShift;
    RSHIFT = "rshift" => RShift;
    AND = "and" => And;
    OR = "or" => Or;
    XOR = "xor" => Xor;
    MATMUL = "matmul" => MatMul;
}

compare_wrappers! {
    LT = "lt" => Lt;
    LE = "le" => Le;
    EQ = "eq" => Eq;
    NE = "ne" => Ne;
    GT = "gt" => Gt;
    GE = "ge" => Ge;
}

/// `pow(base, exp, modulus)`.
pub static POW_MOD: OperatorWrapper = OperatorWrapper::new(
    "pow_mod",
    Operation::Ternary(|base, exp, modulus| base.power(exp, Some(modulus))),
);

pub static GETATTR: OperatorWrapper = OperatorWrapper::new(
    "getattr",
    Operation::Binary(|value, name| match force(name)? {
        Value::Str(name) => value.get_attr(&name),
        other => Err(Error::type_error(eco_format!(
            "attribute name must be string, not {}",
            describe(&other)
        ))),
    }),
);

pub static GETITEM: OperatorWrapper =
    OperatorWrapper::new("getitem", Operation::Binary(|value, key| value.get_item(key)));

pub static CONTAINS: OperatorWrapper = OperatorWrapper::new(
    "contains",
    Operation::Binary(|container, item| container.contains(item)),
);

pub static ITER: OperatorWrapper =
    OperatorWrapper::new("iter", Operation::Unary(|value| value.iter()));

/// Returns its argument. Wraps iterator elements so each stays lazy.
pub static IDENTITY: OperatorWrapper =
    OperatorWrapper::new("identity", Operation::Unary(|value| Ok(value.clone())));

static ALL: [&OperatorWrapper; 34] = [
    &NEG, &POS, &ABS, &INVERT, &ROUND, &FLOOR, &CEIL, &TRUNC, &ADD, &SUB, &MUL, &TRUEDIV,
    &FLOORDIV, &MOD, &DIVMOD, &POW, &LSHIFT, &RSHIFT, &AND, &OR, &XOR, &MATMUL, &LT, &LE, &EQ,
    &NE, &GT, &GE, &POW_MOD, &GETATTR, &GETITEM, &CONTAINS, &ITER, &IDENTITY,
];

static REGISTRY: Lazy<HashMap<&'static str, &'static OperatorWrapper>> = Lazy::new(|| {
    let registry: HashMap<_, _> = ALL.iter().map(|wrapper| (wrapper.name, *wrapper)).collect();
    debug!(count = registry.len(), "operator registry initialised");
    registry
});

/// Find a wrapper by its stable name.
pub fn lookup(name: &str) -> Option<&'static OperatorWrapper> {
    REGISTRY.get(name).copied()
}

/// Every registered wrapper.
pub fn all() -> &'static [&'static OperatorWrapper] {
    &ALL
}

/// The wrapper applying `op`.
pub fn binary(op: BinaryOp) -> &'static OperatorWrapper {
    match op {
        BinaryOp::Add => &ADD,
        BinaryOp::Sub => &SUB,
        BinaryOp::Mul => &MUL,
        BinaryOp::TrueDiv => &TRUEDIV,
        BinaryOp::FloorDiv => &FLOORDIV,
        BinaryOp::Mod => &MOD,
        BinaryOp::DivMod => &DIVMOD,
        BinaryOp::Pow => &POW,
        BinaryOp::LShift => &LSHIFT,
        BinaryOp::RShift => &RSHIFT,
        BinaryOp::And => &AND,
        BinaryOp::Or => &OR,
        BinaryOp::Xor => &XOR,
        BinaryOp::MatMul => &MATMUL,
    }
}

pub fn unary(op: UnaryOp) -> &'static OperatorWrapper {
    match op {
        UnaryOp::Neg => &NEG,
        UnaryOp::Pos => &POS,
        UnaryOp::Abs => &ABS,
        UnaryOp::Invert => &INVERT,
        UnaryOp::Round => &ROUND,
        UnaryOp::Floor => &FLOOR,
        UnaryOp::Ceil => &CEIL,
        UnaryOp::Trunc => &TRUNC,
    }
}

pub fn compare(op: CompareOp) -> &'static OperatorWrapper {
    match op {
        CompareOp::Lt => &LT,
        CompareOp::Le => &LE,
        CompareOp::Eq => &EQ,
        CompareOp::Ne => &NE,
        CompareOp::Gt => &GT,
        CompareOp::Ge => &GE,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_names_are_unique() {
        assert_eq!(REGISTRY.len(), ALL.len());
    }

    #[test]
    fn test_lookup() {
        assert!(std::ptr::eq(lookup("getitem").unwrap(), &GETITEM));
        assert_eq!(lookup("pow_mod").unwrap().arity(), 3);
        assert!(lookup("__add__").is_none());
    }

    #[test]
    fn test_op_tables_agree_with_names() {
        assert_eq!(binary(BinaryOp::FloorDiv).name(), BinaryOp::FloorDiv.name());
        assert_eq!(unary(UnaryOp::Trunc).name(), UnaryOp::Trunc.name());
        assert_eq!(compare(CompareOp::Ge).name(), CompareOp::Ge.name());
    }

    #[test]
    fn test_call() {
        assert_eq!(ADD.call(&[Value::Int(2), Value::Int(3)], None).unwrap(), Value::Int(5));
        assert_eq!(NEG.call(&[Value::Int(2)], None).unwrap(), Value::Int(-2));
        assert_eq!(
            LT.call(&[Value::Int(2), Value::Int(3)], None).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            POW_MOD
                .call(&[Value::Int(2), Value::Int(10), Value::Int(1000)], None)
                .unwrap(),
            Value::Int(24)
        );
        assert_eq!(
            GETATTR
                .call(&[Value::Int(1), Value::str("__type__")], None)
                .unwrap(),
            Value::str("int")
        );
    }

    #[test]
    fn test_call_checks_arity_and_keywords() {
        let error = ADD.call(&[Value::Int(1)], None).unwrap_err();
        assert_eq!(
            error.to_string(),
            "add() takes exactly 2 argument(s) (1 given)"
        );

        let mut kwargs = Kwargs::new();
        kwargs.insert("x".into(), Value::Int(1));
        let error = NEG.call(&[Value::Int(1)], Some(&kwargs)).unwrap_err();
        assert_eq!(error.to_string(), "neg() takes no keyword arguments");

        // An empty mapping is the same as none.
        assert!(NEG.call(&[Value::Int(1)], Some(&Kwargs::new())).is_ok());
    }

    #[test]
    fn test_getattr_requires_a_string_name() {
        assert!(matches!(
            GETATTR.call(&[Value::Int(1), Value::Int(2)], None),
            Err(Error::Type(_))
        ));
    }

    #[test]
    fn test_debug() {
        assert_eq!(format!("{:?}", IDENTITY), "<operator identity/1>");
        assert_eq!(format!("{:?}", Value::Operator(&IDENTITY)), "<operator identity>");
    }
}
