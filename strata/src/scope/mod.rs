//! Scope graph
//!
//! A persistent arena of declarations, scopes, and frames. Scopes are
//! lexical regions wired together with edges (lexical parent, import,
//! superclass); frames are runtime instantiations of scopes mapping the
//! declarations reachable from them to store addresses. Cross-module
//! resolution works by adding an import edge from the importer's scope to
//! the imported module's scope and mirroring it on the frames — merging
//! is O(1) because everything lives in one arena.

use std::collections::HashSet;

use crate::eval::Address;
use crate::syntax::Span;

/// Arena index of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Arena index of a declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(usize);

/// Arena index of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

/// Edge categories between scopes (and between their frames)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Lexical,
    Import,
    Superclass,
}

/// What a declaration names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Variable,
    Function,
    Class,
    Module,
}

/// One declared name
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub span: Span,
    /// Path of the module that declared the name
    pub module: String,
    /// Class and module declarations own a scope of their members
    pub associated_scope: Option<ScopeId>,
    /// The runtime instantiation of `associated_scope`
    pub associated_frame: Option<FrameId>,
}

#[derive(Debug, Default)]
struct Scope {
    decls: Vec<DeclId>,
    edges: Vec<(EdgeKind, ScopeId)>,
}

#[derive(Debug)]
struct Frame {
    scope: ScopeId,
    slots: Vec<(DeclId, Address)>,
    links: Vec<(EdgeKind, FrameId)>,
}

/// The graph itself: one arena per node category
#[derive(Debug, Default)]
pub struct ScopeGraph {
    scopes: Vec<Scope>,
    decls: Vec<Declaration>,
    frames: Vec<Frame>,
}

impl ScopeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_scope(&mut self) -> ScopeId {
        self.scopes.push(Scope::default());
        ScopeId(self.scopes.len() - 1)
    }

    pub fn add_edge(&mut self, from: ScopeId, kind: EdgeKind, to: ScopeId) {
        let edges = &mut self.scopes[from.0].edges;
        if !edges.contains(&(kind, to)) {
            edges.push((kind, to));
        }
    }

    /// Declare `decl` in `scope`. Re-declaring a name already present in
    /// the same scope returns the existing declaration (nearest wins, and
    /// re-assignment must not duplicate slots).
    pub fn declare(&mut self, scope: ScopeId, decl: Declaration) -> DeclId {
        if let Some(existing) = self.scopes[scope.0]
            .decls
            .iter()
            .find(|id| self.decls[id.0].name == decl.name)
        {
            return *existing;
        }
        self.decls.push(decl);
        let id = DeclId(self.decls.len() - 1);
        self.scopes[scope.0].decls.push(id);
        id
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0]
    }

    pub fn associate(&mut self, id: DeclId, scope: ScopeId, frame: FrameId) {
        self.decls[id.0].associated_scope = Some(scope);
        self.decls[id.0].associated_frame = Some(frame);
    }

    pub fn new_frame(&mut self, scope: ScopeId) -> FrameId {
        self.frames.push(Frame {
            scope,
            slots: Vec::new(),
            links: Vec::new(),
        });
        FrameId(self.frames.len() - 1)
    }

    pub fn add_frame_link(&mut self, from: FrameId, kind: EdgeKind, to: FrameId) {
        let links = &mut self.frames[from.0].links;
        if !links.contains(&(kind, to)) {
            links.push((kind, to));
        }
    }

    /// Bind (or rebind) the address backing `decl` in `frame`. Every
    /// reachable declaration resolves to exactly one address.
    pub fn bind_slot(&mut self, frame: FrameId, decl: DeclId, addr: Address) {
        let slots = &mut self.frames[frame.0].slots;
        if let Some(slot) = slots.iter_mut().find(|(d, _)| *d == decl) {
            slot.1 = addr;
        } else {
            slots.push((decl, addr));
        }
    }

    pub fn frame_scope(&self, frame: FrameId) -> ScopeId {
        self.frames[frame.0].scope
    }

    fn decl_in_scope(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.scopes[scope.0]
            .decls
            .iter()
            .copied()
            .find(|id| self.decls[id.0].name == name)
    }

    /// Path-based declaration lookup: walk from `scope` along lexical and
    /// import edges, nearest scope first. Superclass edges are reserved
    /// for member lookup.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        let mut queue = vec![scope];
        let mut visited = HashSet::new();
        let mut at = 0;
        while at < queue.len() {
            let current = queue[at];
            at += 1;
            if !visited.insert(current) {
                continue;
            }
            if let Some(found) = self.decl_in_scope(current, name) {
                return Some(found);
            }
            for (kind, next) in &self.scopes[current.0].edges {
                if matches!(kind, EdgeKind::Lexical | EdgeKind::Import) {
                    queue.push(*next);
                }
            }
        }
        None
    }

    /// Resolve a name to its declaration and address, walking the frame
    /// graph in lockstep with the scopes it instantiates.
    pub fn resolve(&self, frame: FrameId, name: &str) -> Option<(DeclId, Address)> {
        let mut queue = vec![frame];
        let mut visited = HashSet::new();
        let mut at = 0;
        while at < queue.len() {
            let current = queue[at];
            at += 1;
            if !visited.insert(current) {
                continue;
            }
            let f = &self.frames[current.0];
            if let Some(decl) = self.decl_in_scope(f.scope, name)
                && let Some((_, addr)) = f.slots.iter().find(|(d, _)| *d == decl)
            {
                return Some((decl, *addr));
            }
            for (kind, next) in &f.links {
                if matches!(kind, EdgeKind::Lexical | EdgeKind::Import) {
                    queue.push(*next);
                }
            }
        }
        None
    }

    /// Member listing for a class/module scope: the scope's own
    /// declarations in declaration order, then inherited ones along
    /// superclass edges, de-duplicated with the nearest declaration
    /// winning.
    pub fn members(&self, scope: ScopeId) -> Vec<DeclId> {
        let mut out: Vec<DeclId> = Vec::new();
        let mut seen_names: Vec<&str> = Vec::new();
        let mut visited = HashSet::new();
        let mut queue = vec![scope];
        let mut at = 0;
        while at < queue.len() {
            let current = queue[at];
            at += 1;
            if !visited.insert(current) {
                continue;
            }
            for id in &self.scopes[current.0].decls {
                let name = self.decls[id.0].name.as_str();
                if !seen_names.contains(&name) {
                    seen_names.push(name);
                    out.push(*id);
                }
            }
            for (kind, next) in &self.scopes[current.0].edges {
                if *kind == EdgeKind::Superclass {
                    queue.push(*next);
                }
            }
        }
        out
    }

    /// Convenience for diagnostics and tests
    pub fn member_names(&self, scope: ScopeId) -> Vec<String> {
        self.members(scope)
            .into_iter()
            .map(|id| self.decl(id).name.clone())
            .collect()
    }

    /// First declaration with the given name anywhere in the graph
    pub fn find_declaration(&self, name: &str) -> Option<DeclId> {
        self.decls
            .iter()
            .position(|d| d.name == name)
            .map(DeclId)
    }

    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Store;

    fn decl(name: &str, kind: DeclKind) -> Declaration {
        Declaration {
            name: name.to_string(),
            kind,
            span: Span::default(),
            module: "test".to_string(),
            associated_scope: None,
            associated_frame: None,
        }
    }

    #[test]
    fn test_declare_and_lookup() {
        let mut graph = ScopeGraph::new();
        let scope = graph.new_scope();
        let id = graph.declare(scope, decl("x", DeclKind::Variable));
        assert_eq!(graph.lookup(scope, "x"), Some(id));
        assert_eq!(graph.lookup(scope, "y"), None);
    }

    #[test]
    fn test_redeclare_returns_existing() {
        let mut graph = ScopeGraph::new();
        let scope = graph.new_scope();
        let first = graph.declare(scope, decl("x", DeclKind::Variable));
        let second = graph.declare(scope, decl("x", DeclKind::Variable));
        assert_eq!(first, second);
        assert_eq!(graph.decl_count(), 1);
    }

    #[test]
    fn test_lookup_follows_lexical_and_import_edges() {
        let mut graph = ScopeGraph::new();
        let outer = graph.new_scope();
        let imported = graph.new_scope();
        let inner = graph.new_scope();
        graph.add_edge(inner, EdgeKind::Lexical, outer);
        graph.add_edge(inner, EdgeKind::Import, imported);

        let from_outer = graph.declare(outer, decl("a", DeclKind::Variable));
        let from_import = graph.declare(imported, decl("b", DeclKind::Function));

        assert_eq!(graph.lookup(inner, "a"), Some(from_outer));
        assert_eq!(graph.lookup(inner, "b"), Some(from_import));
    }

    #[test]
    fn test_lookup_does_not_follow_superclass_edges() {
        let mut graph = ScopeGraph::new();
        let parent = graph.new_scope();
        let child = graph.new_scope();
        graph.add_edge(child, EdgeKind::Superclass, parent);
        graph.declare(parent, decl("inherited", DeclKind::Function));

        assert_eq!(graph.lookup(child, "inherited"), None);
    }

    #[test]
    fn test_nearest_declaration_wins() {
        let mut graph = ScopeGraph::new();
        let outer = graph.new_scope();
        let inner = graph.new_scope();
        graph.add_edge(inner, EdgeKind::Lexical, outer);

        graph.declare(outer, decl("x", DeclKind::Variable));
        let near = graph.declare(inner, decl("x", DeclKind::Variable));

        assert_eq!(graph.lookup(inner, "x"), Some(near));
    }

    #[test]
    fn test_resolve_through_frames() {
        let mut graph = ScopeGraph::new();
        let mut store: Store<i64> = Store::new();

        let module_scope = graph.new_scope();
        let imported_scope = graph.new_scope();
        graph.add_edge(module_scope, EdgeKind::Import, imported_scope);

        let module_frame = graph.new_frame(module_scope);
        let imported_frame = graph.new_frame(imported_scope);
        graph.add_frame_link(module_frame, EdgeKind::Import, imported_frame);

        let d = graph.declare(imported_scope, decl("exported", DeclKind::Function));
        let addr = store.alloc();
        store.assign(addr, 7);
        graph.bind_slot(imported_frame, d, addr);

        let (found, found_addr) = graph.resolve(module_frame, "exported").unwrap();
        assert_eq!(found, d);
        assert_eq!(store.fetch(found_addr), Some(&7));
    }

    #[test]
    fn test_resolve_missing_is_none() {
        let mut graph = ScopeGraph::new();
        let scope = graph.new_scope();
        let frame = graph.new_frame(scope);
        assert_eq!(graph.resolve(frame, "ghost"), None);
    }

    #[test]
    fn test_members_own_before_inherited() {
        let mut graph = ScopeGraph::new();
        let parent = graph.new_scope();
        let child = graph.new_scope();
        graph.add_edge(child, EdgeKind::Superclass, parent);

        graph.declare(parent, decl("foo", DeclKind::Function));
        graph.declare(parent, decl("inspect", DeclKind::Function));
        graph.declare(child, decl("baz", DeclKind::Function));

        assert_eq!(graph.member_names(child), vec!["baz", "foo", "inspect"]);
    }

    #[test]
    fn test_members_dedup_nearest_wins() {
        let mut graph = ScopeGraph::new();
        let parent = graph.new_scope();
        let child = graph.new_scope();
        graph.add_edge(child, EdgeKind::Superclass, parent);

        graph.declare(parent, decl("shared", DeclKind::Function));
        graph.declare(parent, decl("base_only", DeclKind::Function));
        let own = graph.declare(child, decl("shared", DeclKind::Function));

        let members = graph.members(child);
        assert_eq!(graph.member_names(child), vec!["shared", "base_only"]);
        assert_eq!(members[0], own);
    }

    #[test]
    fn test_members_survive_superclass_cycles() {
        let mut graph = ScopeGraph::new();
        let a = graph.new_scope();
        let b = graph.new_scope();
        graph.add_edge(a, EdgeKind::Superclass, b);
        graph.add_edge(b, EdgeKind::Superclass, a);
        graph.declare(a, decl("m", DeclKind::Function));

        assert_eq!(graph.member_names(a), vec!["m"]);
    }
}
