//! `std::ops` operators on thunks. Every operator builds a new pending node.

use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Neg, Not, Rem, Shl, Shr, Sub};

use crate::{
    ops::{BinaryOp, UnaryOp},
    thunk::Thunk,
    values::Value,
};

macro_rules! binary_operators {
    ($($Trait:ident :: $method:ident => $op:ident;)*) => {
        $(
            impl<T: Into<Value>> $Trait<T> for Thunk {
                type Output = Thunk;

                fn $method(self, rhs: T) -> Thunk {
                    self.binary_op(BinaryOp::$op, rhs)
                }
            }

            impl<T: Into<Value>> $Trait<T> for &Thunk {
                type Output = Thunk;

                fn $method(self, rhs: T) -> Thunk {
                    self.binary_op(BinaryOp::$op, rhs)
                }
            }

            impl $Trait<Thunk> for i64 {
                type Output = Thunk;

                fn $method(self, rhs: Thunk) -> Thunk {
                    rhs.reflected_op(BinaryOp::$op, self)
                }
            }

            impl $Trait<&Thunk> for i64 {
                type Output = Thunk;

                fn $method(self, rhs: &Thunk) -> Thunk {
                    rhs.reflected_op(BinaryOp::$op, self)
                }
            }

            impl $Trait<Thunk> for f64 {
                type Output = Thunk;

                fn $method(self, rhs: Thunk) -> Thunk {
                    rhs.reflected_op(BinaryOp::$op, self)
                }
            }

            impl $Trait<&Thunk> for f64 {
                type Output = Thunk;

                fn $method(self, rhs: &Thunk) -> Thunk {
                    rhs.reflected_op(BinaryOp::$op, self)
                }
            }
        )*
    };
}

binary_operators! {
    Add::add => Add;
    Sub::sub => Sub;
    Mul::mul => Mul;
    Div::div => TrueDiv;
    Rem::rem => Mod;
    BitAnd::bitand => And;
    BitOr::bitor => Or;
    BitXor::bitxor => Xor;
    Shl::shl => LShift;
    Shr::shr => RShift;
}

impl Neg for Thunk {
    type Output = Thunk;

    fn neg(self) -> Thunk {
        self.unary_op(UnaryOp::Neg)
    }
}

impl Neg for &Thunk {
    type Output = Thunk;

    fn neg(self) -> Thunk {
        self.unary_op(UnaryOp::Neg)
    }
}

/// Bitwise inversion (`~x`).
impl Not for Thunk {
    type Output = Thunk;

    fn not(self) -> Thunk {
        self.unary_op(UnaryOp::Invert)
    }
}

impl Not for &Thunk {
    type Output = Thunk;

    fn not(self) -> Thunk {
        self.unary_op(UnaryOp::Invert)
    }
}
