//! Numeric tower and operator lifting
//!
//! Three representations with one-way promotion Integer -> Rational ->
//! Float. Binary operators dispatch on the promoted pair through a single
//! generic routine; operators whose integral and fractional semantics
//! diverge (division, modulus, exponentiation) name their
//! representation-specific primitive in that routine rather than being
//! overloaded per call site.

use std::cmp::Ordering;
use std::fmt;

use num_rational::Rational64;
use num_traits::{Signed, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Binary numeric operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumericOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl fmt::Display for NumericOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sym = match self {
            NumericOp::Add => "+",
            NumericOp::Sub => "-",
            NumericOp::Mul => "*",
            NumericOp::Div => "/",
            NumericOp::Mod => "%",
            NumericOp::Pow => "**",
        };
        write!(f, "{sym}")
    }
}

/// Unary numeric transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Abs,
}

/// Boolean-returning relations of the equality/ordering family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl RelOp {
    /// Decide the relation from a total-order result
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            RelOp::Lt => ord == Ordering::Less,
            RelOp::Le => ord != Ordering::Greater,
            RelOp::Gt => ord == Ordering::Greater,
            RelOp::Ge => ord != Ordering::Less,
            RelOp::Eq => ord == Ordering::Equal,
            RelOp::Ne => ord != Ordering::Equal,
        }
    }
}

/// Comparison mode: a concrete boolean relation, or the generalized
/// ("spaceship") relation returning -1/0/1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    Concrete(RelOp),
    Generalized,
}

/// A number in one of the tower's representations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Rational(Rational64),
    Float(f64),
}

/// Arithmetic failure inside the tower
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberError {
    DivisionByZero,
    Overflow,
}

impl NumberError {
    pub fn message(self) -> &'static str {
        match self {
            NumberError::DivisionByZero => "division by zero",
            NumberError::Overflow => "integer overflow",
        }
    }
}

impl Number {
    pub fn type_name(&self) -> &'static str {
        match self {
            Number::Integer(_) => "integer",
            Number::Rational(_) => "rational",
            Number::Float(_) => "float",
        }
    }

    fn as_rational(&self) -> Rational64 {
        match self {
            Number::Integer(n) => Rational64::from_integer(*n),
            Number::Rational(r) => *r,
            // never called on floats; promotion only moves upward
            Number::Float(_) => unreachable!("float demotion"),
        }
    }

    fn as_float(&self) -> f64 {
        match self {
            Number::Integer(n) => *n as f64,
            Number::Rational(r) => r.to_f64().unwrap_or(f64::NAN),
            Number::Float(f) => *f,
        }
    }

    /// Promote both operands to the higher representation of the pair.
    /// The result pair always shares one representation.
    pub fn promote(a: Number, b: Number) -> (Number, Number) {
        use Number::*;
        match (a, b) {
            (Integer(_), Integer(_)) | (Rational(_), Rational(_)) | (Float(_), Float(_)) => (a, b),
            (Float(_), _) => (a, Float(b.as_float())),
            (_, Float(_)) => (Float(a.as_float()), b),
            _ => (Rational(a.as_rational()), Rational(b.as_rational())),
        }
    }

    /// Apply one binary operator after promotion. The same routine serves
    /// every operator; Div/Mod/Pow pick the representation-specific
    /// primitive inside the per-representation arm.
    pub fn binary(op: NumericOp, a: Number, b: Number) -> Result<Number, NumberError> {
        use Number::*;
        match Number::promote(a, b) {
            (Integer(x), Integer(y)) => integer_op(op, x, y),
            (Rational(x), Rational(y)) => rational_op(op, x, y),
            (Float(x), Float(y)) => Ok(Float(float_op(op, x, y))),
            _ => unreachable!("promotion yields a shared representation"),
        }
    }

    /// Apply one unary transform in the operand's own representation.
    pub fn unary(op: UnaryOp, n: Number) -> Result<Number, NumberError> {
        use Number::*;
        Ok(match (op, n) {
            (UnaryOp::Neg, Integer(x)) => Integer(x.checked_neg().ok_or(NumberError::Overflow)?),
            (UnaryOp::Neg, Rational(x)) => Rational(-x),
            (UnaryOp::Neg, Float(x)) => Float(-x),
            (UnaryOp::Abs, Integer(x)) => Integer(x.checked_abs().ok_or(NumberError::Overflow)?),
            (UnaryOp::Abs, Rational(x)) => Rational(x.abs()),
            (UnaryOp::Abs, Float(x)) => Float(x.abs()),
        })
    }

    /// Compare after promotion. `None` only for unordered floats (NaN).
    pub fn compare(a: Number, b: Number) -> Option<Ordering> {
        use Number::*;
        match Number::promote(a, b) {
            (Integer(x), Integer(y)) => Some(x.cmp(&y)),
            (Rational(x), Rational(y)) => Some(x.cmp(&y)),
            (Float(x), Float(y)) => x.partial_cmp(&y),
            _ => unreachable!("promotion yields a shared representation"),
        }
    }
}

fn integer_op(op: NumericOp, x: i64, y: i64) -> Result<Number, NumberError> {
    let n = match op {
        NumericOp::Add => x.checked_add(y).ok_or(NumberError::Overflow)?,
        NumericOp::Sub => x.checked_sub(y).ok_or(NumberError::Overflow)?,
        NumericOp::Mul => x.checked_mul(y).ok_or(NumberError::Overflow)?,
        // integral division truncates; exact division lives in Rational
        NumericOp::Div => x.checked_div(y).ok_or(NumberError::DivisionByZero)?,
        NumericOp::Mod => x.checked_rem(y).ok_or(NumberError::DivisionByZero)?,
        NumericOp::Pow => {
            if y < 0 {
                // negative exponent leaves the integers
                let exp = u32::try_from(y.unsigned_abs()).map_err(|_| NumberError::Overflow)?;
                let base = x.checked_pow(exp).ok_or(NumberError::Overflow)?;
                if base == 0 {
                    return Err(NumberError::DivisionByZero);
                }
                return Ok(Number::Rational(Rational64::new(1, base)));
            }
            let exp = u32::try_from(y).map_err(|_| NumberError::Overflow)?;
            x.checked_pow(exp).ok_or(NumberError::Overflow)?
        }
    };
    Ok(Number::Integer(n))
}

fn rational_op(op: NumericOp, x: Rational64, y: Rational64) -> Result<Number, NumberError> {
    use num_traits::Zero;
    let r = match op {
        NumericOp::Add => x + y,
        NumericOp::Sub => x - y,
        NumericOp::Mul => x * y,
        NumericOp::Div => {
            if y.is_zero() {
                return Err(NumberError::DivisionByZero);
            }
            x / y
        }
        NumericOp::Mod => {
            if y.is_zero() {
                return Err(NumberError::DivisionByZero);
            }
            x % y
        }
        NumericOp::Pow => {
            if y.is_integer() {
                let exp = i32::try_from(y.to_integer()).map_err(|_| NumberError::Overflow)?;
                if exp < 0 && x.is_zero() {
                    return Err(NumberError::DivisionByZero);
                }
                x.pow(exp)
            } else {
                // fractional exponent falls through to floats
                let f = x.to_f64().unwrap_or(f64::NAN);
                let g = y.to_f64().unwrap_or(f64::NAN);
                return Ok(Number::Float(f.powf(g)));
            }
        }
    };
    Ok(Number::Rational(r))
}

fn float_op(op: NumericOp, x: f64, y: f64) -> f64 {
    match op {
        NumericOp::Add => x + y,
        NumericOp::Sub => x - y,
        NumericOp::Mul => x * y,
        NumericOp::Div => x / y,
        NumericOp::Mod => x % y,
        NumericOp::Pow => x.powf(y),
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(n) => write!(f, "{n}"),
            Number::Rational(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            Number::Float(x) => write!(f, "{x}"),
        }
    }
}
