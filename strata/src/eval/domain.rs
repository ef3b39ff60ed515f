//! The value abstraction
//!
//! Everything the evaluator knows about values goes through this trait:
//! the same rules for conditionals, loops, application, and imports run
//! against a concrete runtime domain or a type-inference domain. Methods
//! receive the whole evaluator so a domain can re-enter evaluation
//! (closures, branch exploration) and reach its own state at
//! `ev.domain`.

use std::fmt;

use num_rational::Rational64;

use super::control::Outcome;
use super::env::Environment;
use super::Evaluator;
use crate::error::EngineError;
use crate::number::{Comparator, NumericOp, UnaryOp};
use crate::syntax::Node;

/// One abstract domain: what "value" means during evaluation
pub trait Domain: Sized {
    type Value: Clone + fmt::Debug + PartialEq;

    // Primitive constructors; total.
    fn unit(ev: &mut Evaluator<'_, Self>) -> Self::Value;
    fn boolean(ev: &mut Evaluator<'_, Self>, b: bool) -> Self::Value;
    fn integer(ev: &mut Evaluator<'_, Self>, n: i64) -> Self::Value;
    fn rational(ev: &mut Evaluator<'_, Self>, r: Rational64) -> Self::Value;
    fn float(ev: &mut Evaluator<'_, Self>, f: f64) -> Self::Value;
    fn string(ev: &mut Evaluator<'_, Self>, s: &str) -> Self::Value;
    fn tuple(ev: &mut Evaluator<'_, Self>, items: Vec<Self::Value>) -> Self::Value;

    /// Unary numeric transform; `Type` error on non-numeric operands.
    fn lift_numeric(
        ev: &mut Evaluator<'_, Self>,
        op: UnaryOp,
        v: Self::Value,
    ) -> Result<Self::Value, EngineError>;

    /// Binary numeric operator after promotion along the tower
    /// Integer -> Rational -> Float; the result representation is the
    /// promoted one.
    fn lift_numeric2(
        ev: &mut Evaluator<'_, Self>,
        op: NumericOp,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> Result<Self::Value, EngineError>;

    /// Comparison in either concrete (boolean) or generalized
    /// (-1/0/1 spaceship) mode.
    fn lift_comparison(
        ev: &mut Evaluator<'_, Self>,
        mode: Comparator,
        lhs: Self::Value,
        rhs: Self::Value,
    ) -> Result<Self::Value, EngineError>;

    /// Branch decision for `if`/loops. `Some(b)` runs exactly one
    /// suspended branch; `None` means the domain cannot pick a path
    /// statically, so the evaluator runs every branch and `merge`s.
    /// `Type` error when the value is not boolean-coercible.
    fn condition(
        ev: &mut Evaluator<'_, Self>,
        v: Self::Value,
    ) -> Result<Option<bool>, EngineError>;

    /// Join of two branch results; only reached after `condition`
    /// answered `None`.
    fn merge(
        ev: &mut Evaluator<'_, Self>,
        a: Self::Value,
        b: Self::Value,
    ) -> Result<Self::Value, EngineError>;

    /// Build a function value from parameter names and an unevaluated
    /// body. Captures the current environment (concrete) or mints fresh
    /// type variables per parameter (types); never runs the body as the
    /// call site will.
    fn closure(
        ev: &mut Evaluator<'_, Self>,
        params: &[String],
        body: &Node,
    ) -> Outcome<Self::Value, Self::Value>;

    /// Apply a function value to already-evaluated arguments (the
    /// evaluator evaluates argument terms left-to-right). The `return`
    /// signal unwinds to exactly this boundary.
    fn apply(
        ev: &mut Evaluator<'_, Self>,
        callee: Self::Value,
        args: Vec<Self::Value>,
    ) -> Outcome<Self::Value, Self::Value>;

    /// Bundle a value with a snapshot of the current environment
    /// ("module as value").
    fn interface(ev: &mut Evaluator<'_, Self>, v: Self::Value) -> Self::Value;

    /// Project the environment back out of an interface value; the empty
    /// environment for anything else. Total.
    fn environment(ev: &Evaluator<'_, Self>, v: &Self::Value) -> Environment;

    /// Recovery hook for unresolved declarations. `err` is always a
    /// resumable `LookupPath`; a domain may substitute a value and
    /// resume. The default propagates, aborting the current chain.
    fn unresolved(
        _ev: &mut Evaluator<'_, Self>,
        _name: &str,
        err: EngineError,
    ) -> Outcome<Self::Value, Self::Value> {
        Err(err.into())
    }
}
