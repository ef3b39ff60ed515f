//! Lexer implementation using logos

mod token;

pub use token::Token;

use crate::error::{EngineError, Result};
use crate::syntax::Span;
use logos::Logos;

/// Tokenize source code
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => {
                return Err(EngineError::lexer(
                    format!("unexpected character: {:?}", lexer.slice()),
                    span,
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_empty() {
        let tokens = tokenize("").unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_tokenize_keywords() {
        let tokens = tokenize("if while def class end").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            kinds,
            vec![Token::If, Token::While, Token::Def, Token::Class, Token::End]
        );
    }

    #[test]
    fn test_tokenize_integer_literal() {
        let tokens = tokenize("42").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0].0, Token::IntLit(n) if *n == 42));
    }

    #[test]
    fn test_tokenize_rational_literal() {
        let tokens = tokenize("3r").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0].0, Token::RatLit(n) if *n == 3));
    }

    #[test]
    fn test_tokenize_float_literal() {
        let tokens = tokenize("1.5").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0].0, Token::FloatLit(n) if (*n - 1.5).abs() < f64::EPSILON));
    }

    #[test]
    fn test_tokenize_string_literal() {
        let tokens = tokenize(r#""hello world""#).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0].0, Token::StringLit(s) if s == "hello world"));
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("+ - * / % **").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
                Token::StarStar
            ]
        );
    }

    #[test]
    fn test_tokenize_comparisons() {
        let tokens = tokenize("== != < > <= >= <=>").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::Lt,
                Token::Gt,
                Token::Le,
                Token::Ge,
                Token::Spaceship
            ]
        );
    }

    #[test]
    fn test_tokenize_comment_is_kept() {
        let tokens = tokenize("# a note").unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(matches!(&tokens[0].0, Token::Comment(text) if text == "# a note"));
    }

    #[test]
    fn test_tokenize_newline_is_significant() {
        let tokens = tokenize("1\n2").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            kinds,
            vec![Token::IntLit(1), Token::Newline, Token::IntLit(2)]
        );
    }

    #[test]
    fn test_tokenize_require_relative() {
        let tokens = tokenize(r#"require_relative "foo""#).unwrap();
        assert!(matches!(&tokens[0].0, Token::RequireRelative));
        assert!(matches!(&tokens[1].0, Token::StringLit(s) if s == "foo"));
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("x = 1").unwrap();
        assert_eq!(tokens[0].1, Span::new(0, 1));
        assert_eq!(tokens[1].1, Span::new(2, 3));
        assert_eq!(tokens[2].1, Span::new(4, 5));
    }

    #[test]
    fn test_tokenize_rejects_unknown() {
        assert!(tokenize("@").is_err());
    }
}
