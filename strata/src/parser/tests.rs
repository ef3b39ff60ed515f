use super::parse;
use crate::lexer::tokenize;
use crate::number::{Comparator, NumericOp, RelOp};
use crate::syntax::{Node, Term};

fn parse_source(source: &str) -> Node {
    let tokens = tokenize(source).unwrap();
    parse("test.sta", source, tokens).unwrap()
}

fn parse_error(source: &str) -> bool {
    let tokens = match tokenize(source) {
        Ok(t) => t,
        Err(_) => return true,
    };
    parse("test.sta", source, tokens).is_err()
}

fn single(source: &str) -> Term {
    match parse_source(source).node {
        Term::Statements(mut stmts) => {
            assert_eq!(stmts.len(), 1, "expected one statement in {source:?}");
            stmts.remove(0).node
        }
        other => panic!("program did not parse to statements: {other:?}"),
    }
}

#[test]
fn test_parse_literals() {
    assert!(matches!(single("42"), Term::Integer(42)));
    assert!(matches!(single("3r"), Term::Rational(3)));
    assert!(matches!(single("1.5"), Term::Float(_)));
    assert!(matches!(single("true"), Term::Boolean(true)));
    assert!(matches!(single("nil"), Term::Unit));
    assert!(matches!(single(r#""hi""#), Term::Text(s) if s == "hi"));
}

#[test]
fn test_parse_precedence() {
    // 1 + 2 * 3 groups the product first
    let Term::Arith { op, rhs, .. } = single("1 + 2 * 3") else {
        panic!("not arithmetic");
    };
    assert_eq!(op, NumericOp::Add);
    assert!(matches!(
        rhs.node,
        Term::Arith {
            op: NumericOp::Mul,
            ..
        }
    ));
}

#[test]
fn test_parse_power_right_assoc() {
    let Term::Arith { op, lhs, rhs } = single("2 ** 3 ** 2") else {
        panic!("not arithmetic");
    };
    assert_eq!(op, NumericOp::Pow);
    assert!(matches!(lhs.node, Term::Integer(2)));
    assert!(matches!(
        rhs.node,
        Term::Arith {
            op: NumericOp::Pow,
            ..
        }
    ));
}

#[test]
fn test_parse_comparison_modes() {
    assert!(matches!(
        single("1 < 2"),
        Term::Compare {
            op: Comparator::Concrete(RelOp::Lt),
            ..
        }
    ));
    assert!(matches!(
        single("1 <=> 2"),
        Term::Compare {
            op: Comparator::Generalized,
            ..
        }
    ));
}

#[test]
fn test_parse_assignment() {
    let Term::Assignment { target, value } = single("x = 1 + 2") else {
        panic!("not an assignment");
    };
    assert_eq!(target, "x");
    assert!(matches!(value.node, Term::Arith { .. }));
}

#[test]
fn test_parse_invalid_assignment_target() {
    assert!(parse_error("1 = 2"));
}

#[test]
fn test_parse_and_or_desugar_to_if() {
    assert!(matches!(single("a and b"), Term::If { .. }));
    assert!(matches!(single("a or b"), Term::If { .. }));
    assert!(matches!(single("not a"), Term::If { .. }));
}

#[test]
fn test_parse_if_else() {
    let term = single("if x < 3 then 1 else 2 end");
    let Term::If {
        cond, else_branch, ..
    } = term
    else {
        panic!("not an if");
    };
    assert!(matches!(cond.node, Term::Compare { .. }));
    assert!(else_branch.is_some());
}

#[test]
fn test_parse_if_without_else() {
    let Term::If { else_branch, .. } = single("if x then 1 end") else {
        panic!("not an if");
    };
    assert!(else_branch.is_none());
}

#[test]
fn test_parse_while() {
    let term = single("while x < 10 do x = x + 1 end");
    assert!(matches!(term, Term::While { .. }));
}

#[test]
fn test_parse_do_while() {
    let term = single("do x = x + 1 while x < 10");
    assert!(matches!(term, Term::DoWhile { .. }));
}

#[test]
fn test_parse_for() {
    let term = single("for i = 0; i < 5; i = i + 1 do total = total + i end");
    let Term::For { init, cond, step, .. } = term else {
        panic!("not a for loop");
    };
    assert!(matches!(init.node, Term::Assignment { .. }));
    assert!(matches!(cond.node, Term::Compare { .. }));
    assert!(matches!(step.node, Term::Assignment { .. }));
}

#[test]
fn test_parse_break_with_and_without_value() {
    assert!(matches!(single("break 3"), Term::Break(Some(_))));
    assert!(matches!(single("break"), Term::Break(None)));
    assert!(matches!(single("next"), Term::Next));
    assert!(matches!(single("return 123"), Term::Return(Some(_))));
}

#[test]
fn test_parse_def() {
    let Term::Function { name, params, .. } = single("def add(a, b) a + b end") else {
        panic!("not a function");
    };
    assert_eq!(name.as_deref(), Some("add"));
    assert_eq!(params, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn test_parse_anonymous_fn() {
    let Term::Function { name, params, .. } = single("fn (x) x * 2 end") else {
        panic!("not a function");
    };
    assert!(name.is_none());
    assert_eq!(params, vec!["x".to_string()]);
}

#[test]
fn test_parse_call_and_member_access() {
    let Term::Call { callee, args } = single("foo(1, 2)") else {
        panic!("not a call");
    };
    assert!(matches!(callee.node, Term::Identifier(ref n) if n == "foo"));
    assert_eq!(args.len(), 2);

    let Term::Call { callee, .. } = single("Foo.baz()") else {
        panic!("not a call");
    };
    assert!(matches!(callee.node, Term::MemberAccess { .. }));
}

#[test]
fn test_parse_tuple_and_group() {
    assert!(matches!(single("(1, 2, 3)"), Term::Tuple(items) if items.len() == 3));
    assert!(matches!(single("(1 + 2)"), Term::Arith { .. }));
    assert!(matches!(single("()"), Term::Unit));
}

#[test]
fn test_parse_class_with_members() {
    let source = "class Bar < Foo\n  def baz() 1 end\n  # internal\n  def inspect() 2 end\nend";
    let Term::Class {
        name,
        superclass,
        members,
    } = single(source)
    else {
        panic!("not a class");
    };
    assert_eq!(name, "Bar");
    assert_eq!(superclass.as_deref(), Some("Foo"));
    let keys: Vec<_> = members.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["baz", "# internal", "inspect"]);
}

#[test]
fn test_parse_require_and_load() {
    assert!(matches!(single(r#"require_relative "foo""#), Term::Require { .. }));
    assert!(matches!(single(r#"load "foo""#), Term::Load { .. }));
}

#[test]
fn test_parse_statement_sequence() {
    let Term::Statements(stmts) = parse_source("x = 1\ny = 2\nx + y").node else {
        panic!("not statements");
    };
    assert_eq!(stmts.len(), 3);
}

#[test]
fn test_parse_operator_continues_across_newline() {
    let Term::Statements(stmts) = parse_source("1 +\n2").node else {
        panic!("not statements");
    };
    assert_eq!(stmts.len(), 1);
    assert!(matches!(stmts[0].node, Term::Arith { .. }));
}

#[test]
fn test_parse_identifier_span_is_exact() {
    let Term::Statements(stmts) = parse_source("x = 1\nghost").node else {
        panic!("not statements");
    };
    let reference = &stmts[1];
    assert!(matches!(reference.node, Term::Identifier(ref n) if n == "ghost"));
    assert_eq!(reference.span.start, 6);
    assert_eq!(reference.span.end, 11);
}

#[test]
fn test_parse_errors() {
    assert!(parse_error("if x then 1"));
    assert!(parse_error("def () 1 end"));
    assert!(parse_error(")"));
}

#[test]
fn test_parse_class_body_rejects_statements() {
    assert!(parse_error("class Foo\n x = 1\nend"));
}
