//! The closed constructor set every front-end lowers into.
//!
//! Shapes follow the engine's external syntax boundary: leaves carry atomic
//! data, `Statements`/`Tuple` are indexed lists, operator nodes are
//! fixed-arity, and `Class` is a keyed scope whose member keys are unique
//! text identifiers (comments in a keyed scope are keyed on their literal
//! text). A new source-language construct is added by extending this set,
//! not by touching the evaluator loop.

use serde::{Deserialize, Serialize};

use super::Spanned;
use crate::number::{Comparator, NumericOp, UnaryOp};

/// A syntax node with its source span
pub type Node = Spanned<Term>;

/// One syntax constructor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Term {
    // Leaves
    Integer(i64),
    /// Rational literal; the denominator is always 1 at the syntax level
    /// (`3r`), exact arithmetic produces the interesting denominators.
    Rational(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
    Unit,
    Identifier(String),
    /// A comment kept in the tree; inside a class body it is a keyed
    /// member under its literal text.
    Comment(String),

    // Indexed
    Statements(Vec<Node>),
    Tuple(Vec<Node>),

    // Fixed arity
    Arith {
        op: NumericOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Compare {
        op: Comparator,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    If {
        cond: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    While {
        cond: Box<Node>,
        body: Box<Node>,
    },
    DoWhile {
        body: Box<Node>,
        cond: Box<Node>,
    },
    For {
        init: Box<Node>,
        cond: Box<Node>,
        step: Box<Node>,
        body: Box<Node>,
    },
    Break(Option<Box<Node>>),
    Next,
    Return(Option<Box<Node>>),

    Function {
        name: Option<String>,
        params: Vec<String>,
        body: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    Assignment {
        target: String,
        value: Box<Node>,
    },
    MemberAccess {
        object: Box<Node>,
        member: String,
    },

    // Keyed
    Class {
        name: String,
        superclass: Option<String>,
        members: Vec<(String, Node)>,
    },

    Require {
        path: Box<Node>,
    },
    Load {
        path: Box<Node>,
    },
}

impl Term {
    /// Short constructor name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Term::Integer(_) => "integer",
            Term::Rational(_) => "rational",
            Term::Float(_) => "float",
            Term::Boolean(_) => "boolean",
            Term::Text(_) => "string",
            Term::Unit => "unit",
            Term::Identifier(_) => "identifier",
            Term::Comment(_) => "comment",
            Term::Statements(_) => "statements",
            Term::Tuple(_) => "tuple",
            Term::Arith { .. } => "arithmetic",
            Term::Unary { .. } => "unary",
            Term::Compare { .. } => "comparison",
            Term::If { .. } => "if",
            Term::While { .. } => "while",
            Term::DoWhile { .. } => "do-while",
            Term::For { .. } => "for",
            Term::Break(_) => "break",
            Term::Next => "next",
            Term::Return(_) => "return",
            Term::Function { .. } => "function",
            Term::Call { .. } => "call",
            Term::Assignment { .. } => "assignment",
            Term::MemberAccess { .. } => "member access",
            Term::Class { .. } => "class",
            Term::Require { .. } => "require",
            Term::Load { .. } => "load",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Span;

    #[test]
    fn test_kind_names() {
        assert_eq!(Term::Integer(1).kind(), "integer");
        assert_eq!(Term::Unit.kind(), "unit");
        assert_eq!(Term::Next.kind(), "next");
        assert_eq!(Term::Statements(vec![]).kind(), "statements");
    }

    #[test]
    fn test_term_serializes() {
        let node = Node::new(
            Term::Assignment {
                target: "x".to_string(),
                value: Box::new(Node::new(Term::Integer(1), Span::new(4, 5))),
            },
            Span::new(0, 5),
        );
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("Assignment"));
    }
}
