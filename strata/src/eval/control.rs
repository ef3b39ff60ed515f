//! Non-local control transfer
//!
//! `break`/`next`/`return` unwind evaluation to the nearest loop or call
//! boundary. They are carried next to — never inside — `EngineError`, so
//! generic error recovery cannot catch them; only the loop and apply
//! rules match on `Signal`.

use crate::error::EngineError;

/// A control transfer in flight
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<V> {
    /// Terminate the nearest loop; the carried value is the loop's result
    Break(V),
    /// Abandon the rest of the current iteration's body
    Next,
    /// Abandon the rest of the function body; the carried value is the
    /// call's result
    Return(V),
}

impl<V> Signal<V> {
    pub fn describe(&self) -> &'static str {
        match self {
            Signal::Break(_) => "break",
            Signal::Next => "next",
            Signal::Return(_) => "return",
        }
    }
}

/// Why evaluation of the current chain stopped early
#[derive(Debug)]
pub enum Unwind<V> {
    Signal(Signal<V>),
    Fail(EngineError),
}

impl<V> From<EngineError> for Unwind<V> {
    fn from(err: EngineError) -> Self {
        Unwind::Fail(err)
    }
}

/// Result of evaluating one node
pub type Outcome<T, V> = Result<T, Unwind<V>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::Span;

    #[test]
    fn test_signal_describe() {
        assert_eq!(Signal::Break(1).describe(), "break");
        assert_eq!(Signal::<i64>::Next.describe(), "next");
        assert_eq!(Signal::Return(1).describe(), "return");
    }

    #[test]
    fn test_error_converts_to_fail() {
        let unwind: Unwind<i64> = EngineError::type_error("boom", Span::new(0, 1)).into();
        assert!(matches!(unwind, Unwind::Fail(_)));
    }

    #[test]
    fn test_signals_are_not_errors() {
        // A signal carries no EngineError and cannot be mistaken for one.
        let unwind: Unwind<i64> = Unwind::Signal(Signal::Break(3));
        match unwind {
            Unwind::Signal(Signal::Break(v)) => assert_eq!(v, 3),
            other => panic!("unexpected unwind: {other:?}"),
        }
    }
}
