//! Engine errors and reporting
//!
//! Non-local control transfer (`break`/`next`/`return`) is NOT an error
//! and never appears here; it travels as `eval::control::Signal` so that
//! no recovery path can swallow it by accident.

use thiserror::Error;

use crate::modules::Language;
use crate::syntax::Span;

/// Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;

/// Evaluation failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// An operator applied to operand shapes it does not support
    #[error("Type error at {span}: {message}")]
    Type { message: String, span: Span },

    /// Call target is not a closure
    #[error("Not a function at {span}: {message}")]
    NotAFunction { message: String, span: Span },

    /// Scope-graph resolution found no reachable declaration. Resumable:
    /// a caller may substitute a default value and continue.
    #[error("Unresolved name `{name}` in module {module} ({language}) at {span}")]
    LookupPath {
        name: String,
        module: String,
        language: Language,
        span: Span,
    },

    /// Structural mismatch in the type domain
    #[error("Type mismatch at {span}: cannot unify {left} with {right}")]
    Unification {
        left: String,
        right: String,
        span: Span,
    },

    /// Infinite type rejected by the occurs check
    #[error("Infinite type at {span}: {var} occurs in {ty}")]
    OccursCheck { var: String, ty: String, span: Span },

    /// Division by zero and friends
    #[error("Arithmetic error at {span}: {message}")]
    Arithmetic { message: String, span: Span },

    #[error("Lexer error at {span}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span}: {message}")]
    Parser { message: String, span: Span },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl EngineError {
    pub fn type_error(message: impl Into<String>, span: Span) -> Self {
        Self::Type {
            message: message.into(),
            span,
        }
    }

    pub fn not_a_function(message: impl Into<String>, span: Span) -> Self {
        Self::NotAFunction {
            message: message.into(),
            span,
        }
    }

    pub fn lookup_path(
        name: impl Into<String>,
        module: impl Into<String>,
        language: Language,
        span: Span,
    ) -> Self {
        Self::LookupPath {
            name: name.into(),
            module: module.into(),
            language,
            span,
        }
    }

    pub fn unification(left: impl Into<String>, right: impl Into<String>, span: Span) -> Self {
        Self::Unification {
            left: left.into(),
            right: right.into(),
            span,
        }
    }

    pub fn occurs_check(var: impl Into<String>, ty: impl Into<String>, span: Span) -> Self {
        Self::OccursCheck {
            var: var.into(),
            ty: ty.into(),
            span,
        }
    }

    pub fn arithmetic(message: impl Into<String>, span: Span) -> Self {
        Self::Arithmetic {
            message: message.into(),
            span,
        }
    }

    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Whether a recovery handler may substitute a value for this error
    /// and resume. Only missing-declaration lookups qualify.
    pub fn is_resumable(&self) -> bool {
        matches!(self, Self::LookupPath { .. })
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Type { span, .. }
            | Self::NotAFunction { span, .. }
            | Self::LookupPath { span, .. }
            | Self::Unification { span, .. }
            | Self::OccursCheck { span, .. }
            | Self::Arithmetic { span, .. }
            | Self::Lexer { span, .. }
            | Self::Parser { span, .. } => Some(*span),
            Self::Io { .. } => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Type { message, .. }
            | Self::NotAFunction { message, .. }
            | Self::Arithmetic { message, .. }
            | Self::Lexer { message, .. }
            | Self::Parser { message, .. }
            | Self::Io { message } => message.clone(),
            Self::LookupPath { name, .. } => format!("unresolved name `{name}`"),
            Self::Unification { left, right, .. } => format!("cannot unify {left} with {right}"),
            Self::OccursCheck { var, ty, .. } => format!("{var} occurs in {ty}"),
        }
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &EngineError) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    let kind = match error {
        EngineError::Type { .. } => "Type",
        EngineError::NotAFunction { .. } => "Call",
        EngineError::LookupPath { .. } => "Resolution",
        EngineError::Unification { .. } | EngineError::OccursCheck { .. } => "Inference",
        EngineError::Arithmetic { .. } => "Arithmetic",
        EngineError::Lexer { .. } => "Lexer",
        EngineError::Parser { .. } => "Parser",
        EngineError::Io { .. } => "IO",
    };

    if let Some(span) = error.span() {
        Report::build(ReportKind::Error, (filename, span.start..span.end))
            .with_message(format!("{kind} error"))
            .with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(error.message())
                    .with_color(Color::Red),
            )
            .finish()
            .print((filename, Source::from(source)))
            .unwrap();
    } else {
        Report::build(ReportKind::Error, (filename, 0..0))
            .with_message(format!("{kind} error: {}", error.message()))
            .finish()
            .print((filename, Source::from(source)))
            .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_error() {
        let err = EngineError::type_error("expected integer, got string", Span::new(3, 9));
        assert_eq!(err.span(), Some(Span::new(3, 9)));
        assert!(err.message().contains("expected integer"));
        assert!(!err.is_resumable());
    }

    #[test]
    fn test_lookup_path_is_resumable() {
        let err = EngineError::lookup_path("foo", "main", Language::Script, Span::new(0, 3));
        assert!(err.is_resumable());
        assert!(format!("{err}").contains("`foo`"));
        assert!(format!("{err}").contains("main"));
    }

    #[test]
    fn test_only_lookup_path_is_resumable() {
        let span = Span::new(0, 1);
        let errors = [
            EngineError::type_error("t", span),
            EngineError::not_a_function("f", span),
            EngineError::unification("Int", "Str", span),
            EngineError::occurs_check("t0", "(t0) -> t1", span),
            EngineError::arithmetic("division by zero", span),
            EngineError::lexer("l", span),
            EngineError::parser("p", span),
            EngineError::io_error("gone"),
        ];
        for err in errors {
            assert!(!err.is_resumable(), "{err} must not be resumable");
        }
    }

    #[test]
    fn test_io_error_has_no_span() {
        assert_eq!(EngineError::io_error("missing").span(), None);
    }

    #[test]
    fn test_display_shapes() {
        let err = EngineError::unification("Int", "(Int) -> t0", Span::new(1, 2));
        let rendered = format!("{err}");
        assert!(rendered.contains("cannot unify Int with (Int) -> t0"));
    }
}
