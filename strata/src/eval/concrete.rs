//! Concrete runtime domain
//!
//! Values a real execution produces. Closures own a snapshot of their
//! defining environment; interface values bundle a value with the
//! environment it was produced in, which is what makes "module as value"
//! and member access work.

use std::fmt;
use std::mem;
use std::rc::Rc;

use num_rational::Rational64;

use super::control::{Outcome, Signal, Unwind};
use super::domain::Domain;
use super::env::Environment;
use super::Evaluator;
use crate::error::EngineError;
use crate::number::{Comparator, Number, NumericOp, RelOp, UnaryOp};
use crate::syntax::Node;

/// The concrete domain (stateless; all state lives in the evaluator)
#[derive(Debug, Default)]
pub struct Concrete;

/// A concrete runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Boolean(bool),
    Integer(i64),
    Rational(Rational64),
    Float(f64),
    Text(Rc<String>),
    Tuple(Vec<Value>),
    Closure {
        params: Rc<Vec<String>>,
        body: Rc<Node>,
        env: Environment,
    },
    Interface {
        value: Box<Value>,
        env: Environment,
    },
}

impl Value {
    /// Type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Rational(_) => "rational",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Tuple(_) => "tuple",
            Value::Closure { .. } => "closure",
            Value::Interface { .. } => "interface",
        }
    }

    fn as_number(&self) -> Option<Number> {
        match self {
            Value::Integer(n) => Some(Number::Integer(*n)),
            Value::Rational(r) => Some(Number::Rational(*r)),
            Value::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    fn from_number(n: Number) -> Value {
        match n {
            Number::Integer(n) => Value::Integer(n),
            Number::Rational(r) => Value::Rational(r),
            Number::Float(f) => Value::Float(f),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Rational(a), Value::Rational(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            // closures are equal only when they are the same closure
            (Value::Closure { body: a, .. }, Value::Closure { body: b, .. }) => Rc::ptr_eq(a, b),
            (Value::Interface { value: a, .. }, Value::Interface { value: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "nil"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Rational(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::Closure { params, .. } => write!(f, "#<closure/{}>", params.len()),
            Value::Interface { value, .. } => write!(f, "#<interface {value}>"),
        }
    }
}

fn compare(
    ev: &Evaluator<'_, Concrete>,
    lhs: &Value,
    rhs: &Value,
) -> Result<std::cmp::Ordering, EngineError> {
    use std::cmp::Ordering;
    match (lhs, rhs) {
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
        (Value::Unit, Value::Unit) => Ok(Ordering::Equal),
        _ => match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => Number::compare(a, b).ok_or_else(|| {
                EngineError::arithmetic("unordered float comparison", ev.span)
            }),
            _ => Err(EngineError::type_error(
                format!("cannot compare {} with {}", lhs.type_name(), rhs.type_name()),
                ev.span,
            )),
        },
    }
}

impl Domain for Concrete {
    type Value = Value;

    fn unit(_ev: &mut Evaluator<'_, Self>) -> Value {
        Value::Unit
    }

    fn boolean(_ev: &mut Evaluator<'_, Self>, b: bool) -> Value {
        Value::Boolean(b)
    }

    fn integer(_ev: &mut Evaluator<'_, Self>, n: i64) -> Value {
        Value::Integer(n)
    }

    fn rational(_ev: &mut Evaluator<'_, Self>, r: Rational64) -> Value {
        Value::Rational(r)
    }

    fn float(_ev: &mut Evaluator<'_, Self>, f: f64) -> Value {
        Value::Float(f)
    }

    fn string(_ev: &mut Evaluator<'_, Self>, s: &str) -> Value {
        Value::Text(Rc::new(s.to_string()))
    }

    fn tuple(_ev: &mut Evaluator<'_, Self>, items: Vec<Value>) -> Value {
        Value::Tuple(items)
    }

    fn lift_numeric(
        ev: &mut Evaluator<'_, Self>,
        op: UnaryOp,
        v: Value,
    ) -> Result<Value, EngineError> {
        let n = v.as_number().ok_or_else(|| {
            EngineError::type_error(format!("expected a number, got {}", v.type_name()), ev.span)
        })?;
        Number::unary(op, n)
            .map(Value::from_number)
            .map_err(|e| EngineError::arithmetic(e.message(), ev.span))
    }

    fn lift_numeric2(
        ev: &mut Evaluator<'_, Self>,
        op: NumericOp,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, EngineError> {
        let (a, b) = match (lhs.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(EngineError::type_error(
                    format!(
                        "`{op}` expects numbers, got {} and {}",
                        lhs.type_name(),
                        rhs.type_name()
                    ),
                    ev.span,
                ));
            }
        };
        Number::binary(op, a, b)
            .map(Value::from_number)
            .map_err(|e| EngineError::arithmetic(e.message(), ev.span))
    }

    fn lift_comparison(
        ev: &mut Evaluator<'_, Self>,
        mode: Comparator,
        lhs: Value,
        rhs: Value,
    ) -> Result<Value, EngineError> {
        // equality can answer even when no order exists (NaN)
        if let Comparator::Concrete(rel @ (RelOp::Eq | RelOp::Ne)) = mode
            && lhs.as_number().is_some()
            && rhs.as_number().is_some()
        {
            let equal = matches!(
                Number::compare(lhs.as_number().unwrap(), rhs.as_number().unwrap()),
                Some(std::cmp::Ordering::Equal)
            );
            return Ok(Value::Boolean(if rel == RelOp::Eq { equal } else { !equal }));
        }
        let ord = compare(ev, &lhs, &rhs)?;
        Ok(match mode {
            Comparator::Concrete(rel) => Value::Boolean(rel.holds(ord)),
            Comparator::Generalized => Value::Integer(match ord {
                std::cmp::Ordering::Less => -1,
                std::cmp::Ordering::Equal => 0,
                std::cmp::Ordering::Greater => 1,
            }),
        })
    }

    fn condition(ev: &mut Evaluator<'_, Self>, v: Value) -> Result<Option<bool>, EngineError> {
        match v {
            Value::Boolean(b) => Ok(Some(b)),
            Value::Unit => Ok(Some(false)),
            other => Err(EngineError::type_error(
                format!("expected a boolean, got {}", other.type_name()),
                ev.span,
            )),
        }
    }

    fn merge(ev: &mut Evaluator<'_, Self>, _a: Value, _b: Value) -> Result<Value, EngineError> {
        // concrete branch decisions are always definite
        Err(EngineError::type_error(
            "cannot merge branches of a concrete evaluation",
            ev.span,
        ))
    }

    fn closure(
        ev: &mut Evaluator<'_, Self>,
        params: &[String],
        body: &Node,
    ) -> Outcome<Value, Value> {
        Ok(Value::Closure {
            params: Rc::new(params.to_vec()),
            body: Rc::new(body.clone()),
            env: ev.env.clone(),
        })
    }

    fn apply(
        ev: &mut Evaluator<'_, Self>,
        callee: Value,
        args: Vec<Value>,
    ) -> Outcome<Value, Value> {
        let (params, body, captured) = match callee {
            Value::Closure { params, body, env } => (params, body, env),
            other => {
                return Err(EngineError::not_a_function(
                    format!("cannot call a {}", other.type_name()),
                    ev.span,
                )
                .into());
            }
        };
        if args.len() != params.len() {
            return Err(EngineError::type_error(
                format!(
                    "function expects {} argument(s), got {}",
                    params.len(),
                    args.len()
                ),
                ev.span,
            )
            .into());
        }

        // one fresh address per parameter, bound over the captured env
        let mut bindings = Vec::with_capacity(params.len());
        for (param, arg) in params.iter().zip(args) {
            let addr = ev.store.alloc();
            ev.store.assign(addr, arg);
            bindings.push((param.clone(), addr));
        }
        let call_env = captured.extend(bindings);

        let saved_env = mem::replace(&mut ev.env, call_env);
        let saved_target = ev.decl_target.take();
        let result = ev.eval(&body);
        ev.env = saved_env;
        ev.decl_target = saved_target;

        match result {
            Ok(v) => Ok(v),
            // the call boundary is where early return lands
            Err(Unwind::Signal(Signal::Return(v))) => Ok(v),
            Err(Unwind::Signal(signal)) => Err(EngineError::type_error(
                format!("{} outside of a loop", signal.describe()),
                ev.span,
            )
            .into()),
            Err(other) => Err(other),
        }
    }

    fn interface(ev: &mut Evaluator<'_, Self>, v: Value) -> Value {
        Value::Interface {
            value: Box::new(v),
            env: ev.env.clone(),
        }
    }

    fn environment(_ev: &Evaluator<'_, Self>, v: &Value) -> Environment {
        match v {
            Value::Interface { env, .. } => env.clone(),
            _ => Environment::new(),
        }
    }
}
