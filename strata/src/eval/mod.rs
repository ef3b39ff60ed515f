//! Evaluator core
//!
//! One rule per syntax constructor, open-recursively calling `eval` on
//! children; everything value-shaped is delegated to the `Domain` trait
//! so the same rules serve concrete execution and type inference. The
//! evaluation context (store, environment, scope graph, module table) is
//! threaded as explicit mutable state; failure short-circuits through
//! `Unwind::Fail` and captures the state live at failure time — nothing
//! is rolled back.

mod concrete;
mod control;
mod domain;
mod env;
mod store;

pub use concrete::{Concrete, Value};
pub use control::{Outcome, Signal, Unwind};
pub use domain::Domain;
pub use env::Environment;
pub use store::{Address, Store};

use std::mem;
use std::path::{Path, PathBuf};

use num_rational::Rational64;

use crate::error::EngineError;
use crate::modules::{Language, ModuleInfo, ModuleLoader, ModuleState, ModuleTable};
use crate::scope::{DeclId, DeclKind, Declaration, EdgeKind, FrameId, ScopeGraph, ScopeId};
use crate::syntax::{Node, Span, Term};

/// Stack growth parameters for deep tree-walking recursion
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// The evaluation context for one run, generic over the value domain
pub struct Evaluator<'l, D: Domain> {
    pub domain: D,
    pub store: Store<D::Value>,
    /// Current lexical environment
    pub env: Environment,
    pub scopes: ScopeGraph,
    pub table: ModuleTable<D::Value>,
    loader: &'l mut dyn ModuleLoader,
    /// Path of the module currently being evaluated
    pub module: PathBuf,
    pub module_scope: ScopeId,
    pub module_frame: FrameId,
    pub language: Language,
    /// Span of the node currently being evaluated, for diagnostics
    pub span: Span,
    /// Where fresh top-level declarations land; `None` inside function
    /// bodies, where bindings are locals only
    pub decl_target: Option<(ScopeId, FrameId)>,
}

impl<'l, D: Domain> Evaluator<'l, D> {
    pub fn new(domain: D, loader: &'l mut dyn ModuleLoader) -> Self {
        let mut scopes = ScopeGraph::new();
        let root_scope = scopes.new_scope();
        let root_frame = scopes.new_frame(root_scope);
        Evaluator {
            domain,
            store: Store::new(),
            env: Environment::new(),
            scopes,
            table: ModuleTable::new(),
            loader,
            module: PathBuf::from("<main>"),
            module_scope: root_scope,
            module_frame: root_frame,
            language: Language::Script,
            span: Span::default(),
            decl_target: Some((root_scope, root_frame)),
        }
    }

    /// Load and evaluate one module to completion, memoizing the outcome.
    /// Failure records a `Failed` entry but leaves already-evaluated
    /// sibling modules in the table.
    pub fn eval_module(&mut self, path: &Path) -> Result<D::Value, EngineError> {
        match self.table.state(path) {
            Some(ModuleState::Evaluated(info)) => return Ok(info.value.clone()),
            Some(ModuleState::Failed(err)) => return Err(err.clone()),
            // cycle: the module is already on the evaluation stack
            Some(ModuleState::Loading { .. }) => return Ok(D::unit(self)),
            None => {}
        }

        let term = self.loader.load(path)?;

        let scope = self.scopes.new_scope();
        let frame = self.scopes.new_frame(scope);
        self.table.begin(path, scope, frame);

        let saved_env = mem::replace(&mut self.env, Environment::new());
        let saved_module = mem::replace(&mut self.module, path.to_path_buf());
        let saved_scope = mem::replace(&mut self.module_scope, scope);
        let saved_frame = mem::replace(&mut self.module_frame, frame);
        let saved_target = mem::replace(&mut self.decl_target, Some((scope, frame)));

        let outcome = match self.eval(&term) {
            Ok(v) => Ok(v),
            Err(Unwind::Fail(err)) => Err(err),
            Err(Unwind::Signal(signal)) => Err(EngineError::type_error(
                format!("{} outside of a loop", signal.describe()),
                self.span,
            )),
        };
        let module_env = mem::replace(&mut self.env, saved_env);

        self.module = saved_module;
        self.module_scope = saved_scope;
        self.module_frame = saved_frame;
        self.decl_target = saved_target;

        match outcome {
            Ok(value) => {
                self.table.finish(
                    path,
                    ModuleInfo {
                        scope,
                        frame,
                        value: value.clone(),
                        env: module_env,
                    },
                );
                Ok(value)
            }
            Err(err) => {
                self.table.fail(path, err.clone());
                Err(err)
            }
        }
    }

    /// Evaluate one node, growing the stack when recursion runs deep
    pub fn eval(&mut self, node: &Node) -> Outcome<D::Value, D::Value> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_inner(node))
    }

    fn eval_inner(&mut self, node: &Node) -> Outcome<D::Value, D::Value> {
        self.span = node.span;
        match &node.node {
            Term::Integer(n) => Ok(D::integer(self, *n)),
            Term::Rational(n) => Ok(D::rational(self, Rational64::from_integer(*n))),
            Term::Float(f) => Ok(D::float(self, *f)),
            Term::Boolean(b) => Ok(D::boolean(self, *b)),
            Term::Text(s) => Ok(D::string(self, s)),
            Term::Unit => Ok(D::unit(self)),
            Term::Comment(_) => Ok(D::unit(self)),

            Term::Identifier(name) => self.resolve_name(name, node.span),

            Term::Statements(stmts) => {
                let mut result = D::unit(self);
                for stmt in stmts {
                    result = self.eval(stmt)?;
                }
                Ok(result)
            }

            Term::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(D::tuple(self, values))
            }

            Term::Arith { op, lhs, rhs } => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                self.span = node.span;
                Ok(D::lift_numeric2(self, *op, a, b)?)
            }

            Term::Unary { op, operand } => {
                let v = self.eval(operand)?;
                self.span = node.span;
                Ok(D::lift_numeric(self, *op, v)?)
            }

            Term::Compare { op, lhs, rhs } => {
                let a = self.eval(lhs)?;
                let b = self.eval(rhs)?;
                self.span = node.span;
                Ok(D::lift_comparison(self, *op, a, b)?)
            }

            Term::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let c = self.eval(cond)?;
                self.span = node.span;
                match D::condition(self, c)? {
                    Some(true) => self.eval(then_branch),
                    Some(false) => match else_branch {
                        Some(e) => self.eval(e),
                        None => Ok(D::unit(self)),
                    },
                    // both paths are live; bindings stay branch-local
                    None => {
                        let saved = self.env.clone();
                        let t = self.eval(then_branch)?;
                        self.env = saved.clone();
                        let e = match else_branch {
                            Some(e) => self.eval(e)?,
                            None => D::unit(self),
                        };
                        self.env = saved;
                        self.span = node.span;
                        Ok(D::merge(self, t, e)?)
                    }
                }
            }

            Term::While { cond, body } => self.while_loop(cond, body),

            Term::DoWhile { body, cond } => {
                match self.eval(body) {
                    Ok(_) => {}
                    Err(Unwind::Signal(Signal::Break(v))) => return Ok(v),
                    Err(Unwind::Signal(Signal::Next)) => {}
                    Err(other) => return Err(other),
                }
                self.while_loop(cond, body)
            }

            Term::For {
                init,
                cond,
                step,
                body,
            } => {
                let saved = self.env.clone();
                let saved_target = self.decl_target.take();
                let result = self.for_loop(init, cond, step, body);
                // loop-scoped bindings never leak, whichever way we left
                self.env = saved;
                self.decl_target = saved_target;
                result
            }

            Term::Break(expr) => {
                let v = match expr {
                    Some(e) => self.eval(e)?,
                    None => D::unit(self),
                };
                Err(Unwind::Signal(Signal::Break(v)))
            }

            Term::Next => Err(Unwind::Signal(Signal::Next)),

            Term::Return(expr) => {
                let v = match expr {
                    Some(e) => self.eval(e)?,
                    None => D::unit(self),
                };
                Err(Unwind::Signal(Signal::Return(v)))
            }

            Term::Function { name, params, body } => {
                let v = D::closure(self, params, body)?;
                if let Some(name) = name {
                    self.span = node.span;
                    self.define_name(name, DeclKind::Function, v.clone());
                }
                Ok(v)
            }

            Term::Call { callee, args } => {
                let f = self.eval(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.span = node.span;
                D::apply(self, f, values)
            }

            Term::Assignment { target, value } => {
                let v = self.eval(value)?;
                self.span = node.span;
                self.assign_name(target, v.clone());
                Ok(v)
            }

            Term::MemberAccess { object, member } => {
                let obj = self.eval(object)?;
                let member_env = D::environment(self, &obj);
                match member_env
                    .lookup(member)
                    .and_then(|addr| self.store.fetch(addr).cloned())
                {
                    Some(v) => Ok(v),
                    None => {
                        let err = EngineError::lookup_path(
                            member,
                            self.module.display().to_string(),
                            self.language,
                            node.span,
                        );
                        D::unresolved(self, member, err)
                    }
                }
            }

            Term::Class {
                name,
                superclass,
                members,
            } => self.eval_class(node.span, name, superclass.as_deref(), members),

            Term::Require { path } => self.eval_require(path),
            Term::Load { path } => self.eval_load(path),
        }
    }

    /// Name resolution: local environment first, then the scope graph
    /// from the current module's frame (which reaches imported modules).
    /// A miss is a resumable lookup error routed through the domain.
    fn resolve_name(&mut self, name: &str, span: Span) -> Outcome<D::Value, D::Value> {
        if let Some(addr) = self.env.lookup(name)
            && let Some(v) = self.store.fetch(addr)
        {
            return Ok(v.clone());
        }
        if let Some((_, addr)) = self.scopes.resolve(self.module_frame, name)
            && let Some(v) = self.store.fetch(addr)
        {
            return Ok(v.clone());
        }
        let err = EngineError::lookup_path(
            name,
            self.module.display().to_string(),
            self.language,
            span,
        );
        D::unresolved(self, name, err)
    }

    /// Assignment: overwrite the cell behind an existing binding, or
    /// introduce the name when it is new. Overwriting keeps the address
    /// stable, so updates made inside a loop survive the loop's
    /// environment restore.
    fn assign_name(&mut self, name: &str, value: D::Value) {
        if let Some(addr) = self.env.lookup(name) {
            self.store.assign(addr, value);
        } else {
            self.define_name(name, DeclKind::Variable, value);
        }
    }

    /// Definition (`def`, `class`, `load` rebinding): always a fresh cell
    /// and a shadowing binding, never an overwrite — a subclass override
    /// must not mutate the superclass's cell, and environments captured
    /// earlier keep observing the old one. At top level the name is also
    /// declared in the scope graph.
    fn define_name(
        &mut self,
        name: &str,
        kind: DeclKind,
        value: D::Value,
    ) -> (Address, Option<DeclId>) {
        let addr = self.store.alloc();
        self.store.assign(addr, value);
        self.env = self.env.insert(name, addr);
        let decl = self.decl_target.map(|(scope, frame)| {
            let decl = self.scopes.declare(
                scope,
                Declaration {
                    name: name.to_string(),
                    kind,
                    span: self.span,
                    module: self.module.display().to_string(),
                    associated_scope: None,
                    associated_frame: None,
                },
            );
            self.scopes.bind_slot(frame, decl, addr);
            decl
        });
        (addr, decl)
    }

    fn while_loop(&mut self, cond: &Node, body: &Node) -> Outcome<D::Value, D::Value> {
        loop {
            let c = self.eval(cond)?;
            match D::condition(self, c)? {
                Some(true) => match self.eval(body) {
                    Ok(_) => {}
                    Err(Unwind::Signal(Signal::Break(v))) => return Ok(v),
                    Err(Unwind::Signal(Signal::Next)) => {}
                    Err(other) => return Err(other),
                },
                Some(false) => return Ok(D::unit(self)),
                None => {
                    // statically unknown condition: the body is checked
                    // once, then the loop contributes unit
                    match self.eval(body) {
                        Ok(_)
                        | Err(Unwind::Signal(Signal::Break(_)))
                        | Err(Unwind::Signal(Signal::Next)) => {}
                        Err(other) => return Err(other),
                    }
                    return Ok(D::unit(self));
                }
            }
        }
    }

    fn for_loop(
        &mut self,
        init: &Node,
        cond: &Node,
        step: &Node,
        body: &Node,
    ) -> Outcome<D::Value, D::Value> {
        self.eval(init)?;
        loop {
            let c = self.eval(cond)?;
            match D::condition(self, c)? {
                Some(true) => {
                    match self.eval(body) {
                        Ok(_) => {}
                        Err(Unwind::Signal(Signal::Break(v))) => return Ok(v),
                        // next proceeds straight to the step expression
                        Err(Unwind::Signal(Signal::Next)) => {}
                        Err(other) => return Err(other),
                    }
                    self.eval(step)?;
                }
                Some(false) => return Ok(D::unit(self)),
                None => {
                    match self.eval(body) {
                        Ok(_)
                        | Err(Unwind::Signal(Signal::Break(_)))
                        | Err(Unwind::Signal(Signal::Next)) => {}
                        Err(other) => return Err(other),
                    }
                    self.eval(step)?;
                    return Ok(D::unit(self));
                }
            }
        }
    }

    fn eval_class(
        &mut self,
        span: Span,
        name: &str,
        superclass: Option<&str>,
        members: &[(String, Node)],
    ) -> Outcome<D::Value, D::Value> {
        // resolve the superclass before opening the subclass scope
        let mut super_graph = None;
        let super_env = match superclass {
            Some(super_name) => {
                let lookup_scope = self
                    .decl_target
                    .map(|(scope, _)| scope)
                    .unwrap_or(self.module_scope);
                if let Some(decl) = self.scopes.lookup(lookup_scope, super_name) {
                    let d = self.scopes.decl(decl);
                    super_graph = d.associated_scope.zip(d.associated_frame);
                }
                let value = self.resolve_name(super_name, span)?;
                D::environment(self, &value)
            }
            None => Environment::new(),
        };

        let class_scope = self.scopes.new_scope();
        let class_frame = self.scopes.new_frame(class_scope);
        let enclosing = self
            .decl_target
            .map(|(scope, _)| scope)
            .unwrap_or(self.module_scope);
        self.scopes.add_edge(class_scope, EdgeKind::Lexical, enclosing);
        if let Some((super_scope, super_frame)) = super_graph {
            self.scopes
                .add_edge(class_scope, EdgeKind::Superclass, super_scope);
            self.scopes
                .add_frame_link(class_frame, EdgeKind::Superclass, super_frame);
        }

        // member definitions shadow inherited ones, nearest wins
        let saved_env = self.env.clone();
        self.env = self.env.union(&super_env);
        let saved_target = mem::replace(&mut self.decl_target, Some((class_scope, class_frame)));
        for (_key, member) in members {
            self.eval(member)?;
        }
        self.decl_target = saved_target;

        let unit = D::unit(self);
        let class_value = D::interface(self, unit);
        self.env = saved_env;

        self.span = span;
        let (_, decl) = self.define_name(name, DeclKind::Class, class_value.clone());
        if let Some(decl) = decl {
            self.scopes.associate(decl, class_scope, class_frame);
        }
        Ok(class_value)
    }

    /// The path argument of `require_relative`/`load` must be a string
    /// literal so both domains agree on the target.
    fn import_target(&mut self, path: &Node) -> Result<PathBuf, EngineError> {
        match &path.node {
            Term::Text(s) => {
                let base = self.module.parent().unwrap_or_else(|| Path::new(""));
                Ok(base.join(s))
            }
            other => Err(EngineError::type_error(
                format!("import path must be a string literal, got {}", other.kind()),
                path.span,
            )),
        }
    }

    /// Merge the target module's exported scope and frame into the
    /// importer: one import edge each, everything stays in the arena.
    fn merge_import(&mut self, target: &Path) {
        let pair = match self.table.state(target) {
            Some(ModuleState::Evaluated(info)) => Some((info.scope, info.frame)),
            Some(ModuleState::Loading { scope, frame }) => Some((*scope, *frame)),
            _ => None,
        };
        if let Some((scope, frame)) = pair {
            self.scopes
                .add_edge(self.module_scope, EdgeKind::Import, scope);
            self.scopes
                .add_frame_link(self.module_frame, EdgeKind::Import, frame);
        }
    }

    /// A missing import target is reported like a missing declaration,
    /// which also makes it resumable for analysis domains.
    fn import_failure(&mut self, target: &Path, err: EngineError) -> Outcome<D::Value, D::Value> {
        match err {
            EngineError::Io { .. } | EngineError::LookupPath { .. } => {
                let name = target.display().to_string();
                let lookup = EngineError::lookup_path(
                    name.clone(),
                    self.module.display().to_string(),
                    self.language,
                    self.span,
                );
                D::unresolved(self, &name, lookup)
            }
            other => Err(other.into()),
        }
    }

    fn eval_require(&mut self, path: &Node) -> Outcome<D::Value, D::Value> {
        let target = self.import_target(path)?;
        self.span = path.span;
        match self.table.state(&target) {
            // memoized: thread the declarations, report a cache hit
            Some(ModuleState::Evaluated(_)) | Some(ModuleState::Loading { .. }) => {
                self.merge_import(&target);
                Ok(D::boolean(self, false))
            }
            Some(ModuleState::Failed(err)) => Err(err.clone().into()),
            None => match self.eval_module(&target) {
                Ok(_) => {
                    self.merge_import(&target);
                    Ok(D::boolean(self, true))
                }
                Err(err) => self.import_failure(&target, err),
            },
        }
    }

    fn eval_load(&mut self, path: &Node) -> Outcome<D::Value, D::Value> {
        let target = self.import_target(path)?;
        self.span = path.span;
        // load always re-evaluates the target
        self.table.evict(&target);
        match self.eval_module(&target) {
            Ok(value) => {
                self.merge_import(&target);
                // and rebinds the result at the current binding point
                let stem = target
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| target.display().to_string());
                self.define_name(&stem, DeclKind::Module, value.clone());
                Ok(value)
            }
            Err(err) => self.import_failure(&target, err),
        }
    }
}

/// Result surface of evaluating a set of root modules: the final scope
/// graph and store, the per-module table (failed entries keep their
/// error, siblings stay available), and the last root's outcome.
pub struct EvalReport<D: Domain> {
    /// The domain instance, with whatever state inference accumulated
    pub domain: D,
    pub scopes: ScopeGraph,
    pub store: Store<D::Value>,
    pub table: ModuleTable<D::Value>,
    pub result: Result<D::Value, EngineError>,
}

/// Public evaluation entry point: evaluate each root module in order
/// under the given domain. One root's failure does not stop the others.
pub fn evaluate_project<D: Domain>(
    domain: D,
    loader: &mut dyn ModuleLoader,
    roots: &[PathBuf],
) -> EvalReport<D> {
    let mut ev = Evaluator::new(domain, loader);
    let mut result = Err(EngineError::io_error("no root modules given"));
    for root in roots {
        result = ev.eval_module(root);
    }
    let Evaluator {
        domain,
        store,
        scopes,
        table,
        ..
    } = ev;
    EvalReport {
        domain,
        scopes,
        store,
        table,
        result,
    }
}
