//! Type-inference domain
//!
//! The second instantiation of the value abstraction: evaluation computes
//! types instead of runtime values, with unification-based inference.
//! Branches cannot be picked statically, so both are explored and their
//! types unified; unresolved names become fresh type variables so
//! analysis keeps going where a concrete run would abort.

use std::collections::HashMap;
use std::fmt;
use std::mem;

use num_rational::Rational64;

use crate::error::EngineError;
use crate::eval::{Domain, Environment, Evaluator, Outcome, Signal, Unwind};
use crate::number::{Comparator, NumericOp, UnaryOp};
use crate::syntax::{Node, Span};

/// A type variable, freshly minted per binder instantiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeVarId(u32);

/// An inferred type
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Unit,
    Bool,
    Int,
    Rational,
    Float,
    Str,
    Product(Vec<Type>),
    Var(TypeVarId),
    /// Parameters (always a Product) and result
    Arrow(Box<Type>, Box<Type>),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Unit => write!(f, "Unit"),
            Type::Bool => write!(f, "Bool"),
            Type::Int => write!(f, "Int"),
            Type::Rational => write!(f, "Rational"),
            Type::Float => write!(f, "Float"),
            Type::Str => write!(f, "Str"),
            Type::Var(TypeVarId(n)) => write!(f, "t{n}"),
            Type::Product(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Type::Arrow(params, ret) => match params.as_ref() {
                Type::Product(_) => write!(f, "{params} -> {ret}"),
                other => write!(f, "({other}) -> {ret}"),
            },
        }
    }
}

/// Inference state: the substitution from type variables to types
#[derive(Debug, Default)]
pub struct Inference {
    table: HashMap<TypeVarId, Type>,
    next: u32,
}

impl Inference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh type variable
    pub fn fresh(&mut self) -> Type {
        let id = TypeVarId(self.next);
        self.next += 1;
        Type::Var(id)
    }

    /// Follow the substitution at the top level only
    fn shallow(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        while let Type::Var(id) = current {
            match self.table.get(&id) {
                Some(bound) => current = bound.clone(),
                None => return Type::Var(id),
            }
        }
        current
    }

    /// Fully apply the substitution
    pub fn zonk(&self, ty: &Type) -> Type {
        match self.shallow(ty) {
            Type::Product(items) => Type::Product(items.iter().map(|t| self.zonk(t)).collect()),
            Type::Arrow(params, ret) => {
                Type::Arrow(Box::new(self.zonk(&params)), Box::new(self.zonk(&ret)))
            }
            other => other,
        }
    }

    fn occurs(&self, var: TypeVarId, ty: &Type) -> bool {
        match self.shallow(ty) {
            Type::Var(id) => id == var,
            Type::Product(items) => items.iter().any(|t| self.occurs(var, t)),
            Type::Arrow(params, ret) => self.occurs(var, &params) || self.occurs(var, &ret),
            _ => false,
        }
    }

    /// Structural unification. Variables bind (with the occurs check
    /// rejecting infinite types); Product/Arrow unify component-wise;
    /// primitives unify only with themselves or a variable.
    pub fn unify(&mut self, a: &Type, b: &Type, span: Span) -> Result<Type, EngineError> {
        let a = self.shallow(a);
        let b = self.shallow(b);
        match (a, b) {
            (Type::Var(x), Type::Var(y)) if x == y => Ok(Type::Var(x)),
            (Type::Var(x), t) | (t, Type::Var(x)) => {
                if self.occurs(x, &t) {
                    return Err(EngineError::occurs_check(
                        Type::Var(x).to_string(),
                        self.zonk(&t).to_string(),
                        span,
                    ));
                }
                self.table.insert(x, t.clone());
                Ok(t)
            }
            (Type::Unit, Type::Unit) => Ok(Type::Unit),
            (Type::Bool, Type::Bool) => Ok(Type::Bool),
            (Type::Int, Type::Int) => Ok(Type::Int),
            (Type::Rational, Type::Rational) => Ok(Type::Rational),
            (Type::Float, Type::Float) => Ok(Type::Float),
            (Type::Str, Type::Str) => Ok(Type::Str),
            (Type::Product(xs), Type::Product(ys)) => {
                if xs.len() != ys.len() {
                    return Err(EngineError::unification(
                        Type::Product(xs).to_string(),
                        Type::Product(ys).to_string(),
                        span,
                    ));
                }
                let items = xs
                    .iter()
                    .zip(ys.iter())
                    .map(|(x, y)| self.unify(x, y, span))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Type::Product(items))
            }
            (Type::Arrow(p1, r1), Type::Arrow(p2, r2)) => {
                let params = self.unify(&p1, &p2, span)?;
                let ret = self.unify(&r1, &r2, span)?;
                Ok(Type::Arrow(Box::new(params), Box::new(ret)))
            }
            (left, right) => Err(EngineError::unification(
                self.zonk(&left).to_string(),
                self.zonk(&right).to_string(),
                span,
            )),
        }
    }

    fn expect_numeric(&self, ty: &Type, op: &str, span: Span) -> Result<(), EngineError> {
        match self.shallow(ty) {
            Type::Int | Type::Rational | Type::Float | Type::Var(_) => Ok(()),
            other => Err(EngineError::type_error(
                format!("`{op}` expects numbers, got {}", self.zonk(&other)),
                span,
            )),
        }
    }
}

impl Domain for Inference {
    type Value = Type;

    fn unit(_ev: &mut Evaluator<'_, Self>) -> Type {
        Type::Unit
    }

    fn boolean(_ev: &mut Evaluator<'_, Self>, _b: bool) -> Type {
        Type::Bool
    }

    fn integer(_ev: &mut Evaluator<'_, Self>, _n: i64) -> Type {
        Type::Int
    }

    fn rational(_ev: &mut Evaluator<'_, Self>, _r: Rational64) -> Type {
        Type::Rational
    }

    fn float(_ev: &mut Evaluator<'_, Self>, _f: f64) -> Type {
        Type::Float
    }

    fn string(_ev: &mut Evaluator<'_, Self>, _s: &str) -> Type {
        Type::Str
    }

    fn tuple(_ev: &mut Evaluator<'_, Self>, items: Vec<Type>) -> Type {
        Type::Product(items)
    }

    fn lift_numeric(
        ev: &mut Evaluator<'_, Self>,
        op: UnaryOp,
        v: Type,
    ) -> Result<Type, EngineError> {
        let span = ev.span;
        let op_name = match op {
            UnaryOp::Neg => "-",
            UnaryOp::Abs => "abs",
        };
        ev.domain.expect_numeric(&v, op_name, span)?;
        Ok(ev.domain.shallow(&v))
    }

    fn lift_numeric2(
        ev: &mut Evaluator<'_, Self>,
        op: NumericOp,
        lhs: Type,
        rhs: Type,
    ) -> Result<Type, EngineError> {
        let span = ev.span;
        let joined = ev.domain.unify(&lhs, &rhs, span)?;
        ev.domain.expect_numeric(&joined, &op.to_string(), span)?;
        Ok(joined)
    }

    fn lift_comparison(
        ev: &mut Evaluator<'_, Self>,
        mode: Comparator,
        lhs: Type,
        rhs: Type,
    ) -> Result<Type, EngineError> {
        let span = ev.span;
        let joined = ev.domain.unify(&lhs, &rhs, span)?;
        match ev.domain.shallow(&joined) {
            Type::Product(_) | Type::Arrow(..) => {
                return Err(EngineError::type_error(
                    format!("cannot compare values of type {}", ev.domain.zonk(&joined)),
                    span,
                ));
            }
            _ => {}
        }
        Ok(match mode {
            Comparator::Concrete(_) => Type::Bool,
            Comparator::Generalized => Type::Int,
        })
    }

    fn condition(ev: &mut Evaluator<'_, Self>, v: Type) -> Result<Option<bool>, EngineError> {
        let span = ev.span;
        ev.domain.unify(&v, &Type::Bool, span)?;
        // static analysis cannot pick a path
        Ok(None)
    }

    fn merge(ev: &mut Evaluator<'_, Self>, a: Type, b: Type) -> Result<Type, EngineError> {
        let span = ev.span;
        ev.domain.unify(&a, &b, span)
    }

    fn closure(
        ev: &mut Evaluator<'_, Self>,
        params: &[String],
        body: &Node,
    ) -> Outcome<Type, Type> {
        // fresh variable per parameter, then check the body under them
        let mut param_types = Vec::with_capacity(params.len());
        let mut bindings = Vec::with_capacity(params.len());
        for param in params {
            let var = ev.domain.fresh();
            let addr = ev.store.alloc();
            ev.store.assign(addr, var.clone());
            param_types.push(var);
            bindings.push((param.clone(), addr));
        }

        let call_env = ev.env.extend(bindings);
        let saved_env = mem::replace(&mut ev.env, call_env);
        let saved_target = ev.decl_target.take();
        let result = ev.eval(body);
        ev.env = saved_env;
        ev.decl_target = saved_target;

        let body_ty = match result {
            Ok(t) => t,
            Err(Unwind::Signal(Signal::Return(t))) => t,
            Err(Unwind::Signal(signal)) => {
                return Err(EngineError::type_error(
                    format!("{} outside of a loop", signal.describe()),
                    ev.span,
                )
                .into());
            }
            Err(other) => return Err(other),
        };
        Ok(Type::Arrow(
            Box::new(Type::Product(param_types)),
            Box::new(body_ty),
        ))
    }

    fn apply(ev: &mut Evaluator<'_, Self>, callee: Type, args: Vec<Type>) -> Outcome<Type, Type> {
        let span = ev.span;
        let ret = ev.domain.fresh();
        let expected = Type::Arrow(Box::new(Type::Product(args)), Box::new(ret.clone()));
        ev.domain.unify(&callee, &expected, span)?;
        Ok(ev.domain.shallow(&ret))
    }

    fn interface(_ev: &mut Evaluator<'_, Self>, v: Type) -> Type {
        v
    }

    fn environment(_ev: &Evaluator<'_, Self>, _v: &Type) -> Environment {
        Environment::new()
    }

    /// The resumable path: a missing declaration becomes an unknown type
    /// and analysis of the rest of the program continues.
    fn unresolved(
        ev: &mut Evaluator<'_, Self>,
        _name: &str,
        _err: EngineError,
    ) -> Outcome<Type, Type> {
        Ok(ev.domain.fresh())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 1)
    }

    #[test]
    fn test_unify_primitives() {
        let mut inf = Inference::new();
        assert_eq!(inf.unify(&Type::Int, &Type::Int, span()).unwrap(), Type::Int);
        assert!(inf.unify(&Type::Int, &Type::Str, span()).is_err());
    }

    #[test]
    fn test_unify_var_binds() {
        let mut inf = Inference::new();
        let var = inf.fresh();
        inf.unify(&var, &Type::Float, span()).unwrap();
        assert_eq!(inf.zonk(&var), Type::Float);
    }

    #[test]
    fn test_unify_var_transitively() {
        let mut inf = Inference::new();
        let a = inf.fresh();
        let b = inf.fresh();
        inf.unify(&a, &b, span()).unwrap();
        inf.unify(&b, &Type::Bool, span()).unwrap();
        assert_eq!(inf.zonk(&a), Type::Bool);
    }

    #[test]
    fn test_occurs_check_rejects_infinite_type() {
        let mut inf = Inference::new();
        let var = inf.fresh();
        let arrow = Type::Arrow(
            Box::new(Type::Product(vec![var.clone()])),
            Box::new(Type::Int),
        );
        let err = inf.unify(&var, &arrow, span()).unwrap_err();
        assert!(matches!(err, EngineError::OccursCheck { .. }));
    }

    #[test]
    fn test_product_arity_mismatch() {
        let mut inf = Inference::new();
        let err = inf
            .unify(
                &Type::Product(vec![Type::Int]),
                &Type::Product(vec![Type::Int, Type::Int]),
                span(),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Unification { .. }));
    }

    #[test]
    fn test_arrow_unifies_componentwise() {
        let mut inf = Inference::new();
        let var = inf.fresh();
        let left = Type::Arrow(
            Box::new(Type::Product(vec![Type::Int])),
            Box::new(var.clone()),
        );
        let right = Type::Arrow(
            Box::new(Type::Product(vec![Type::Int])),
            Box::new(Type::Bool),
        );
        inf.unify(&left, &right, span()).unwrap();
        assert_eq!(inf.zonk(&var), Type::Bool);
    }

    #[test]
    fn test_display() {
        let arrow = Type::Arrow(
            Box::new(Type::Product(vec![Type::Int, Type::Bool])),
            Box::new(Type::Float),
        );
        assert_eq!(arrow.to_string(), "(Int, Bool) -> Float");
        assert_eq!(Type::Var(TypeVarId(3)).to_string(), "t3");
    }

    #[test]
    fn test_zonk_goes_deep() {
        let mut inf = Inference::new();
        let var = inf.fresh();
        inf.unify(&var, &Type::Int, span()).unwrap();
        let nested = Type::Product(vec![var, Type::Str]);
        assert_eq!(inf.zonk(&nested), Type::Product(vec![Type::Int, Type::Str]));
    }
}
