//! Lexical scope graph.
//!
//! Scopes live in a flat arena and point at their parent by index. Each scope
//! maps `(name, kind)` to the declaration that introduced it; variables and
//! functions are separate namespaces, so `int f; int f() {..}` is legal.

use std::collections::HashMap;

use crate::lang::ast::{FunctionId, StmtId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

/// Namespace a declared name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Variable,
    Function,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementKind::Variable => write!(f, "variable"),
            ElementKind::Function => write!(f, "function"),
        }
    }
}

/// The declaration a name resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Parameter `index` of `function`.
    Param { function: FunctionId, index: usize },
    /// A `Var` or `Array` declaration statement.
    Local(StmtId),
    Function(FunctionId),
}

impl Binding {
    pub fn kind(&self) -> ElementKind {
        match self {
            Binding::Param { .. } | Binding::Local(_) => ElementKind::Variable,
            Binding::Function(_) => ElementKind::Function,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    symbols: HashMap<(String, ElementKind), Binding>,
}

impl Scope {
    pub fn get(&self, name: &str, kind: ElementKind) -> Option<Binding> {
        self.symbols.get(&(name.to_string(), kind)).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[derive(Debug)]
pub struct ScopeGraph {
    scopes: Vec<Scope>,
}

impl ScopeGraph {
    /// Creates a graph holding only the root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    /// Opens a new scope nested in `parent`.
    pub fn push(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            symbols: HashMap::new(),
        });
        id
    }

    /// Declares `name` in `scope`.
    ///
    /// Fails with the existing binding when the same `(name, kind)` pair is
    /// already declared in this exact scope; outer scopes do not conflict.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: &str,
        binding: Binding,
    ) -> Result<(), Binding> {
        let key = (name.to_string(), binding.kind());
        let symbols = &mut self.scopes[scope.0].symbols;
        if let Some(existing) = symbols.get(&key) {
            return Err(*existing);
        }
        symbols.insert(key, binding);
        Ok(())
    }

    /// Looks `name` up in `scope` and then each enclosing scope.
    pub fn resolve(&self, scope: ScopeId, name: &str, kind: ElementKind) -> Option<Binding> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(binding) = scope.get(name, kind) {
                return Some(binding);
            }
            current = scope.parent;
        }
        None
    }
}

impl Default for ScopeGraph {
    fn default() -> Self {
        Self::new()
    }
}
