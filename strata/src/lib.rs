//! Strata
//!
//! An abstract-interpretation engine: a generic evaluator over a
//! language-agnostic syntax representation, instantiated with a pluggable
//! value domain. The same evaluation rules compute concrete results or
//! inferred types, with scope-graph-backed cross-module resolution.

pub mod error;
pub mod eval;
pub mod lexer;
pub mod modules;
pub mod number;
pub mod parser;
pub mod scope;
pub mod syntax;
pub mod types;

pub use error::{EngineError, Result};
pub use eval::{Concrete, Domain, EvalReport, Evaluator, Value, evaluate_project};
pub use modules::{FsLoader, Language, MapLoader, ModuleLoader};
pub use syntax::Span;
pub use types::{Inference, Type};
