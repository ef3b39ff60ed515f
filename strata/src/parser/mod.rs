//! Parser for the bundled script language
//!
//! Hand-written recursive descent over the token vector; binary operators
//! use Pratt-style binding powers. `and`/`or`/`not` are desugared to `if`
//! at parse time so short-circuiting falls out of the conditional rule.
//! Newlines are statement separators; a binary operator at end of line
//! continues the expression.

#[cfg(test)]
mod tests;

use crate::error::{EngineError, Result};
use crate::lexer::Token;
use crate::number::{Comparator, NumericOp, RelOp, UnaryOp};
use crate::syntax::{Node, Span, Term};

/// Parse tokens into a syntax tree
pub fn parse(_filename: &str, _source: &str, tokens: Vec<(Token, Span)>) -> Result<Node> {
    let mut parser = Parser { tokens, pos: 0 };
    let program = parser.program()?;
    parser.skip_separators();
    if let Some(tok) = parser.peek() {
        return Err(EngineError::parser(
            format!("unexpected token {tok:?}"),
            parser.peek_span(),
        ));
    }
    Ok(program)
}

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

/// Binding powers for infix operators; a right-associative operator has
/// a lower right power than left power.
fn infix_bp(tok: &Token) -> Option<(u8, u8)> {
    Some(match tok {
        Token::Assign => (2, 1),
        Token::Or => (3, 4),
        Token::And => (5, 6),
        Token::EqEq | Token::NotEq | Token::Spaceship => (7, 8),
        Token::Lt | Token::Le | Token::Gt | Token::Ge => (9, 10),
        Token::Plus | Token::Minus => (11, 12),
        Token::Star | Token::Slash | Token::Percent => (13, 14),
        Token::StarStar => (18, 17),
        _ => return None,
    })
}

const PREFIX_BP: u8 = 15;

fn starts_expression(tok: &Token) -> bool {
    matches!(
        tok,
        Token::IntLit(_)
            | Token::RatLit(_)
            | Token::FloatLit(_)
            | Token::StringLit(_)
            | Token::Ident(_)
            | Token::True
            | Token::False
            | Token::Nil
            | Token::LParen
            | Token::Minus
            | Token::Not
            | Token::If
            | Token::While
            | Token::Do
            | Token::For
            | Token::Def
            | Token::Fn
            | Token::Class
            | Token::Break
            | Token::Next
            | Token::Return
            | Token::RequireRelative
            | Token::Load
    )
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        match self.tokens.get(self.pos) {
            Some((_, span)) => *span,
            None => {
                let end = self.tokens.last().map(|(_, s)| s.end).unwrap_or(0);
                Span::new(end, end)
            }
        }
    }

    fn advance(&mut self) -> Option<(Token, Span)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<Span> {
        if self.peek() == Some(expected) {
            let (_, span) = self.advance().unwrap();
            return Ok(span);
        }
        let detail = match self.peek() {
            Some(tok) => format!("{what}, got {tok:?}"),
            None => format!("{what}, got end of input"),
        };
        Err(EngineError::parser(detail, self.peek_span()))
    }

    fn ident(&mut self, what: &str) -> Result<(String, Span)> {
        match self.advance() {
            Some((Token::Ident(name), span)) => Ok((name, span)),
            Some((tok, span)) => Err(EngineError::parser(format!("{what}, got {tok:?}"), span)),
            None => Err(EngineError::parser(
                format!("{what}, got end of input"),
                self.peek_span(),
            )),
        }
    }

    /// Skip statement separators (newlines, semicolons) and free comments
    fn skip_separators(&mut self) {
        while matches!(
            self.peek(),
            Some(Token::Newline | Token::Semicolon | Token::Comment(_))
        ) {
            self.advance();
        }
    }

    /// Skip line breaks only; semicolons stay significant
    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Some(Token::Newline | Token::Comment(_))) {
            self.advance();
        }
    }

    fn program(&mut self) -> Result<Node> {
        let start = self.peek_span();
        let stmts = self.statements(&[])?;
        let span = match (stmts.first(), stmts.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => start,
        };
        Ok(Node::new(Term::Statements(stmts), span))
    }

    fn statements(&mut self, terminators: &[Token]) -> Result<Vec<Node>> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                None => break,
                Some(tok) if terminators.contains(tok) => break,
                _ => {}
            }
            stmts.push(self.expr(0)?);
        }
        Ok(stmts)
    }

    /// A statement block up to (but not consuming) one of `terminators`
    fn block(&mut self, terminators: &[Token]) -> Result<Node> {
        let start = self.peek_span();
        let stmts = self.statements(terminators)?;
        let span = match (stmts.first(), stmts.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => Span::new(start.start, start.start),
        };
        Ok(Node::new(Term::Statements(stmts), span))
    }

    fn expr(&mut self, min_bp: u8) -> Result<Node> {
        let mut lhs = self.primary()?;
        loop {
            let Some(tok) = self.peek().cloned() else { break };

            // postfix: call and member access bind tightest
            match tok {
                Token::LParen => {
                    self.advance();
                    let args = self.call_args()?;
                    let end = self.expect(&Token::RParen, "expected `)` after arguments")?;
                    let span = lhs.span.merge(end);
                    lhs = Node::new(
                        Term::Call {
                            callee: Box::new(lhs),
                            args,
                        },
                        span,
                    );
                    continue;
                }
                Token::Dot => {
                    self.advance();
                    let (member, mspan) = self.ident("expected member name after `.`")?;
                    let span = lhs.span.merge(mspan);
                    lhs = Node::new(
                        Term::MemberAccess {
                            object: Box::new(lhs),
                            member,
                        },
                        span,
                    );
                    continue;
                }
                _ => {}
            }

            let Some((lbp, rbp)) = infix_bp(&tok) else { break };
            if lbp < min_bp {
                break;
            }
            self.advance();
            self.skip_newlines();
            let rhs = self.expr(rbp)?;
            lhs = self.combine(tok, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn combine(&mut self, op: Token, lhs: Node, rhs: Node) -> Result<Node> {
        let span = lhs.span.merge(rhs.span);
        let term = match op {
            Token::Assign => match lhs.node {
                Term::Identifier(target) => Term::Assignment {
                    target,
                    value: Box::new(rhs),
                },
                other => {
                    return Err(EngineError::parser(
                        format!("invalid assignment target: {}", other.kind()),
                        lhs.span,
                    ));
                }
            },
            // short-circuit logic desugars to the conditional rule
            Token::And => Term::If {
                cond: Box::new(lhs),
                then_branch: Box::new(rhs),
                else_branch: Some(Box::new(Node::new(Term::Boolean(false), span))),
            },
            Token::Or => Term::If {
                cond: Box::new(lhs),
                then_branch: Box::new(Node::new(Term::Boolean(true), span)),
                else_branch: Some(Box::new(rhs)),
            },
            Token::Plus => self.arith(NumericOp::Add, lhs, rhs),
            Token::Minus => self.arith(NumericOp::Sub, lhs, rhs),
            Token::Star => self.arith(NumericOp::Mul, lhs, rhs),
            Token::Slash => self.arith(NumericOp::Div, lhs, rhs),
            Token::Percent => self.arith(NumericOp::Mod, lhs, rhs),
            Token::StarStar => self.arith(NumericOp::Pow, lhs, rhs),
            Token::EqEq => self.compare(Comparator::Concrete(RelOp::Eq), lhs, rhs),
            Token::NotEq => self.compare(Comparator::Concrete(RelOp::Ne), lhs, rhs),
            Token::Lt => self.compare(Comparator::Concrete(RelOp::Lt), lhs, rhs),
            Token::Le => self.compare(Comparator::Concrete(RelOp::Le), lhs, rhs),
            Token::Gt => self.compare(Comparator::Concrete(RelOp::Gt), lhs, rhs),
            Token::Ge => self.compare(Comparator::Concrete(RelOp::Ge), lhs, rhs),
            Token::Spaceship => self.compare(Comparator::Generalized, lhs, rhs),
            other => {
                return Err(EngineError::parser(
                    format!("unexpected operator {other:?}"),
                    span,
                ));
            }
        };
        Ok(Node::new(term, span))
    }

    fn arith(&self, op: NumericOp, lhs: Node, rhs: Node) -> Term {
        Term::Arith {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn compare(&self, op: Comparator, lhs: Node, rhs: Node) -> Term {
        Term::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn call_args(&mut self) -> Result<Vec<Node>> {
        let mut args = Vec::new();
        self.skip_newlines();
        if matches!(self.peek(), Some(Token::RParen)) {
            return Ok(args);
        }
        loop {
            args.push(self.expr(0)?);
            self.skip_newlines();
            if matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
                self.skip_newlines();
            } else {
                break;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Node> {
        let Some((tok, span)) = self.advance() else {
            return Err(EngineError::parser(
                "unexpected end of input",
                self.peek_span(),
            ));
        };
        match tok {
            Token::IntLit(n) => Ok(Node::new(Term::Integer(n), span)),
            Token::RatLit(n) => Ok(Node::new(Term::Rational(n), span)),
            Token::FloatLit(f) => Ok(Node::new(Term::Float(f), span)),
            Token::StringLit(s) => Ok(Node::new(Term::Text(s), span)),
            Token::True => Ok(Node::new(Term::Boolean(true), span)),
            Token::False => Ok(Node::new(Term::Boolean(false), span)),
            Token::Nil => Ok(Node::new(Term::Unit, span)),
            Token::Ident(name) => Ok(Node::new(Term::Identifier(name), span)),
            Token::Comment(text) => Ok(Node::new(Term::Comment(text), span)),

            Token::Minus => {
                let operand = self.expr(PREFIX_BP)?;
                let span = span.merge(operand.span);
                Ok(Node::new(
                    Term::Unary {
                        op: UnaryOp::Neg,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }

            Token::Not => {
                let operand = self.expr(PREFIX_BP)?;
                let span = span.merge(operand.span);
                Ok(Node::new(
                    Term::If {
                        cond: Box::new(operand),
                        then_branch: Box::new(Node::new(Term::Boolean(false), span)),
                        else_branch: Some(Box::new(Node::new(Term::Boolean(true), span))),
                    },
                    span,
                ))
            }

            Token::LParen => self.group_or_tuple(span),

            Token::If => self.if_expr(span),

            Token::While => {
                let cond = self.expr(0)?;
                self.skip_newlines();
                self.expect(&Token::Do, "expected `do` after loop condition")?;
                let body = self.block(&[Token::End])?;
                let end = self.expect(&Token::End, "expected `end` after loop body")?;
                Ok(Node::new(
                    Term::While {
                        cond: Box::new(cond),
                        body: Box::new(body),
                    },
                    span.merge(end),
                ))
            }

            Token::Do => {
                let body = self.block(&[Token::While])?;
                self.expect(&Token::While, "expected `while` after `do` body")?;
                let cond = self.expr(0)?;
                let span = span.merge(cond.span);
                Ok(Node::new(
                    Term::DoWhile {
                        body: Box::new(body),
                        cond: Box::new(cond),
                    },
                    span,
                ))
            }

            Token::For => {
                let init = self.expr(0)?;
                self.expect(&Token::Semicolon, "expected `;` after loop initializer")?;
                let cond = self.expr(0)?;
                self.expect(&Token::Semicolon, "expected `;` after loop condition")?;
                let step = self.expr(0)?;
                self.skip_newlines();
                self.expect(&Token::Do, "expected `do` after loop header")?;
                let body = self.block(&[Token::End])?;
                let end = self.expect(&Token::End, "expected `end` after loop body")?;
                Ok(Node::new(
                    Term::For {
                        init: Box::new(init),
                        cond: Box::new(cond),
                        step: Box::new(step),
                        body: Box::new(body),
                    },
                    span.merge(end),
                ))
            }

            Token::Def => self.def_expr(span),

            Token::Fn => {
                let params = self.params()?;
                let body = self.block(&[Token::End])?;
                let end = self.expect(&Token::End, "expected `end` after function body")?;
                Ok(Node::new(
                    Term::Function {
                        name: None,
                        params,
                        body: Box::new(body),
                    },
                    span.merge(end),
                ))
            }

            Token::Class => self.class_expr(span),

            Token::Break => {
                let value = self.optional_value()?;
                let span = match &value {
                    Some(v) => span.merge(v.span),
                    None => span,
                };
                Ok(Node::new(Term::Break(value.map(Box::new)), span))
            }

            Token::Next => Ok(Node::new(Term::Next, span)),

            Token::Return => {
                let value = self.optional_value()?;
                let span = match &value {
                    Some(v) => span.merge(v.span),
                    None => span,
                };
                Ok(Node::new(Term::Return(value.map(Box::new)), span))
            }

            Token::RequireRelative => {
                let path = self.expr(PREFIX_BP)?;
                let span = span.merge(path.span);
                Ok(Node::new(
                    Term::Require {
                        path: Box::new(path),
                    },
                    span,
                ))
            }

            Token::Load => {
                let path = self.expr(PREFIX_BP)?;
                let span = span.merge(path.span);
                Ok(Node::new(
                    Term::Load {
                        path: Box::new(path),
                    },
                    span,
                ))
            }

            other => Err(EngineError::parser(
                format!("unexpected token {other:?}"),
                span,
            )),
        }
    }

    fn optional_value(&mut self) -> Result<Option<Node>> {
        if self.peek().is_some_and(starts_expression) {
            Ok(Some(self.expr(0)?))
        } else {
            Ok(None)
        }
    }

    fn group_or_tuple(&mut self, start: Span) -> Result<Node> {
        self.skip_newlines();
        if matches!(self.peek(), Some(Token::RParen)) {
            let end = self.advance().map(|(_, s)| s).unwrap();
            return Ok(Node::new(Term::Unit, start.merge(end)));
        }
        let first = self.expr(0)?;
        self.skip_newlines();
        if matches!(self.peek(), Some(Token::Comma)) {
            let mut items = vec![first];
            while matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
                self.skip_newlines();
                if matches!(self.peek(), Some(Token::RParen)) {
                    break;
                }
                items.push(self.expr(0)?);
                self.skip_newlines();
            }
            let end = self.expect(&Token::RParen, "expected `)` after tuple")?;
            Ok(Node::new(Term::Tuple(items), start.merge(end)))
        } else {
            self.expect(&Token::RParen, "expected `)` after expression")?;
            Ok(first)
        }
    }

    fn if_expr(&mut self, start: Span) -> Result<Node> {
        let cond = self.expr(0)?;
        self.skip_newlines();
        self.expect(&Token::Then, "expected `then` after condition")?;
        let then_branch = self.block(&[Token::Else, Token::End])?;
        let else_branch = if matches!(self.peek(), Some(Token::Else)) {
            self.advance();
            Some(Box::new(self.block(&[Token::End])?))
        } else {
            None
        };
        let end = self.expect(&Token::End, "expected `end` after conditional")?;
        Ok(Node::new(
            Term::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            start.merge(end),
        ))
    }

    fn def_expr(&mut self, start: Span) -> Result<Node> {
        let (name, _) = self.ident("expected function name after `def`")?;
        let params = self.params()?;
        let body = self.block(&[Token::End])?;
        let end = self.expect(&Token::End, "expected `end` after function body")?;
        Ok(Node::new(
            Term::Function {
                name: Some(name),
                params,
                body: Box::new(body),
            },
            start.merge(end),
        ))
    }

    fn params(&mut self) -> Result<Vec<String>> {
        self.expect(&Token::LParen, "expected `(` before parameters")?;
        let mut params = Vec::new();
        self.skip_newlines();
        if !matches!(self.peek(), Some(Token::RParen)) {
            loop {
                let (name, _) = self.ident("expected parameter name")?;
                params.push(name);
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.advance();
                    self.skip_newlines();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "expected `)` after parameters")?;
        Ok(params)
    }

    fn class_expr(&mut self, start: Span) -> Result<Node> {
        let (name, _) = self.ident("expected class name after `class`")?;
        let superclass = if matches!(self.peek(), Some(Token::Lt)) {
            self.advance();
            Some(self.ident("expected superclass name after `<`")?.0)
        } else {
            None
        };
        let mut members = Vec::new();
        loop {
            while matches!(self.peek(), Some(Token::Newline | Token::Semicolon)) {
                self.advance();
            }
            match self.peek() {
                Some(Token::End) => break,
                // a comment in a keyed scope is a member under its text
                Some(Token::Comment(_)) => {
                    let Some((Token::Comment(text), cspan)) = self.advance() else {
                        unreachable!()
                    };
                    members.push((text.clone(), Node::new(Term::Comment(text), cspan)));
                }
                Some(Token::Def) => {
                    let (_, dspan) = self.advance().unwrap();
                    let node = self.def_expr(dspan)?;
                    let method = match &node.node {
                        Term::Function {
                            name: Some(name), ..
                        } => name.clone(),
                        _ => unreachable!("def always yields a named function"),
                    };
                    members.push((method, node));
                }
                _ => {
                    return Err(EngineError::parser(
                        "expected `def`, a comment, or `end` in class body",
                        self.peek_span(),
                    ));
                }
            }
        }
        let end = self.expect(&Token::End, "expected `end` after class body")?;
        Ok(Node::new(
            Term::Class {
                name,
                superclass,
                members,
            },
            start.merge(end),
        ))
    }
}
