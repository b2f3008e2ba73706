//! # Cinder syntax tree
//!
//! The tree is arena-allocated: a [`Program`] owns every function, statement
//! and expression, and nodes refer to one another through the typed indices
//! [`FunctionId`], [`StmtId`] and [`ExprId`].
//!
//! Besides the syntax itself each node carries slots that the analysis passes
//! fill in:
//!
//! - `scope`: the lexical scope active at the node (scope resolver)
//! - `binding`: the declaration a name use refers to (scope resolver)
//! - `slot` / `frame_slots`: frame-relative stack offsets (scope resolver)
//! - `ty`: the inferred type of an expression (type checker)
//! - `returns`, loop `target`: upward links found by the type checker
//!
//! Statements also keep a [`Parent`] handle so a pass can walk from a
//! `break` or `return` up to its loop or function without owning pointers.

use crate::frontend::token::Token;
use crate::lang::data_type::DataType;
use crate::lang::scope::{Binding, ScopeGraph, ScopeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(pub usize);

/// Syntactic parent of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Stmt(StmtId),
    Function(FunctionId),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: Token,
    pub ty: DataType,
    /// Frame offset, negative: parameters sit below the saved caller state.
    pub slot: i64,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub return_type: DataType,
    pub name: Token,
    pub params: Vec<Param>,
    /// Always a `StmtKind::Block`.
    pub body: StmtId,
    /// `Return` statements that belong to this function.
    pub returns: Vec<StmtId>,
    /// Number of local stack cells the frame needs.
    pub frame_slots: i64,
    pub scope: Option<ScopeId>,
}

impl Function {
    pub fn new(return_type: DataType, name: Token, params: Vec<Param>, body: StmtId) -> Self {
        Self {
            return_type,
            name,
            params,
            body,
            returns: Vec::new(),
            frame_slots: 0,
            scope: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name.lexeme
    }
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: Token,
    pub ty: DataType,
    pub initializer: Option<ExprId>,
    pub slot: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct ArrayDecl {
    pub name: Token,
    /// Element type.
    pub ty: DataType,
    pub len: usize,
    /// An `ArrayCreate` expression when well formed.
    pub initializer: Option<ExprId>,
    /// Slot of element 0; the elements occupy `len` consecutive slots.
    pub slot: Option<i64>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    Return {
        keyword: Token,
        value: Option<ExprId>,
    },
    Expression(ExprId),
    If {
        branches: Vec<(ExprId, StmtId)>,
        else_block: Option<StmtId>,
    },
    While {
        condition: ExprId,
        body: StmtId,
    },
    For {
        init: Option<StmtId>,
        condition: Option<ExprId>,
        update: Option<ExprId>,
        body: StmtId,
    },
    Output {
        keyword: Token,
        values: Vec<ExprId>,
    },
    Input {
        name: Token,
        binding: Option<Binding>,
    },
    Var(VarDecl),
    Array(ArrayDecl),
    Break {
        keyword: Token,
        target: Option<StmtId>,
    },
    Continue {
        keyword: Token,
        target: Option<StmtId>,
    },
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: usize,
    pub parent: Option<Parent>,
    pub scope: Option<ScopeId>,
}

impl Stmt {
    pub fn is_loop(&self) -> bool {
        matches!(self.kind, StmtKind::While { .. } | StmtKind::For { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
}

impl Literal {
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Int(_) => DataType::Int,
            Literal::Float(_) => DataType::Float,
            Literal::Bool(_) => DataType::Bool,
            Literal::Char(_) => DataType::Char,
            Literal::Str(_) => DataType::String,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Binary {
        left: ExprId,
        op: Token,
        right: ExprId,
    },
    Grouping(ExprId),
    Literal(Literal),
    /// `postfix` distinguishes `x++` from `++x`.
    Unary {
        op: Token,
        operand: ExprId,
        postfix: bool,
    },
    Variable {
        name: Token,
        binding: Option<Binding>,
    },
    /// `name = value` or, with an index, `name[index] = value`.
    Assign {
        name: Token,
        index: Option<ExprId>,
        value: ExprId,
        binding: Option<Binding>,
    },
    Call {
        callee: Token,
        args: Vec<ExprId>,
        binding: Option<Binding>,
    },
    ArrayAccess {
        name: Token,
        index: ExprId,
        binding: Option<Binding>,
    },
    /// `{ a, b, c }`, only meaningful as an array initializer.
    ArrayCreate {
        elements: Vec<ExprId>,
    },
    Random {
        keyword: Token,
        bound: ExprId,
    },
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: usize,
    pub scope: Option<ScopeId>,
    pub ty: Option<DataType>,
}

/// What the passes need to know about a variable binding.
#[derive(Debug, Clone, Copy)]
pub struct VarInfo<'a> {
    pub name: &'a Token,
    pub ty: DataType,
    pub array_len: Option<usize>,
    pub slot: Option<i64>,
}

/// A whole program: the node arenas plus the scope graph built over them.
#[derive(Debug)]
pub struct Program {
    functions: Vec<Function>,
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
    pub scopes: ScopeGraph,
}

impl Program {
    pub fn new() -> Self {
        Self {
            functions: Vec::new(),
            stmts: Vec::new(),
            exprs: Vec::new(),
            scopes: ScopeGraph::new(),
        }
    }

    /// Adds a function and links the parent handles of its whole body.
    pub fn add_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len());
        let body = function.body;
        self.functions.push(function);
        self.link(body, Parent::Function(id));
        id
    }

    pub fn add_stmt(&mut self, kind: StmtKind, line: usize) -> StmtId {
        let id = StmtId(self.stmts.len());
        self.stmts.push(Stmt {
            kind,
            line,
            parent: None,
            scope: None,
        });
        id
    }

    pub fn add_expr(&mut self, kind: ExprKind, line: usize) -> ExprId {
        let id = ExprId(self.exprs.len());
        self.exprs.push(Expr {
            kind,
            line,
            scope: None,
            ty: None,
        });
        id
    }

    /// Function ids in declaration order.
    pub fn function_ids(&self) -> impl Iterator<Item = FunctionId> + use<> {
        (0..self.functions.len()).map(FunctionId)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.0]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.0]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.0]
    }

    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.0]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.0]
    }

    /// Inferred type of an expression, once the type checker has run.
    pub fn type_of(&self, id: ExprId) -> Option<DataType> {
        self.exprs[id.0].ty
    }

    pub fn find_function(&self, name: &str) -> Option<FunctionId> {
        self.function_ids()
            .find(|id| self.function(*id).name() == name)
    }

    /// Statement children, in source order.
    pub fn child_stmts(&self, id: StmtId) -> Vec<StmtId> {
        match &self.stmt(id).kind {
            StmtKind::Block(stmts) => stmts.clone(),
            StmtKind::If {
                branches,
                else_block,
            } => branches
                .iter()
                .map(|(_, block)| *block)
                .chain(*else_block)
                .collect(),
            StmtKind::While { body, .. } => vec![*body],
            StmtKind::For { init, body, .. } => init.iter().copied().chain([*body]).collect(),
            StmtKind::Return { .. }
            | StmtKind::Expression(_)
            | StmtKind::Output { .. }
            | StmtKind::Input { .. }
            | StmtKind::Var(_)
            | StmtKind::Array(_)
            | StmtKind::Break { .. }
            | StmtKind::Continue { .. } => Vec::new(),
        }
    }

    fn link(&mut self, id: StmtId, parent: Parent) {
        self.stmts[id.0].parent = Some(parent);
        for child in self.child_stmts(id) {
            self.link(child, Parent::Stmt(id));
        }
    }

    /// Walks parent handles up to the function that owns `id`.
    pub fn enclosing_function(&self, id: StmtId) -> Option<FunctionId> {
        let mut current = self.stmt(id).parent;
        while let Some(parent) = current {
            match parent {
                Parent::Function(function) => return Some(function),
                Parent::Stmt(stmt) => current = self.stmt(stmt).parent,
            }
        }
        None
    }

    /// Walks parent handles up to the nearest `while`/`for`, stopping at the
    /// function boundary.
    pub fn enclosing_loop(&self, id: StmtId) -> Option<StmtId> {
        let mut current = self.stmt(id).parent;
        while let Some(Parent::Stmt(stmt)) = current {
            if self.stmt(stmt).is_loop() {
                return Some(stmt);
            }
            current = self.stmt(stmt).parent;
        }
        None
    }

    /// Declared type, array length and slot of a variable binding.
    pub fn variable(&self, binding: Binding) -> Option<VarInfo<'_>> {
        match binding {
            Binding::Param { function, index } => {
                let param = self.function(function).params.get(index)?;
                Some(VarInfo {
                    name: &param.name,
                    ty: param.ty,
                    array_len: None,
                    slot: Some(param.slot),
                })
            }
            Binding::Local(stmt) => match &self.stmt(stmt).kind {
                StmtKind::Var(decl) => Some(VarInfo {
                    name: &decl.name,
                    ty: decl.ty,
                    array_len: None,
                    slot: decl.slot,
                }),
                StmtKind::Array(decl) => Some(VarInfo {
                    name: &decl.name,
                    ty: decl.ty,
                    array_len: Some(decl.len),
                    slot: decl.slot,
                }),
                _ => None,
            },
            Binding::Function(_) => None,
        }
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::token::TokenKind;

    fn keyword(kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, 1, 1)
    }

    #[test]
    fn test_parent_links_reach_function_and_loop() {
        let mut program = Program::new();
        let brk = program.add_stmt(
            StmtKind::Break {
                keyword: keyword(TokenKind::Break, "break"),
                target: None,
            },
            3,
        );
        let loop_body = program.add_stmt(StmtKind::Block(vec![brk]), 2);
        let cond = program.add_expr(ExprKind::Literal(Literal::Bool(true)), 2);
        let while_stmt = program.add_stmt(
            StmtKind::While {
                condition: cond,
                body: loop_body,
            },
            2,
        );
        let body = program.add_stmt(StmtKind::Block(vec![while_stmt]), 1);
        let f = program.add_function(Function::new(
            DataType::Void,
            Token::ident("main", 1),
            Vec::new(),
            body,
        ));

        assert_eq!(program.stmt(brk).parent, Some(Parent::Stmt(loop_body)));
        assert_eq!(program.enclosing_loop(brk), Some(while_stmt));
        assert_eq!(program.enclosing_function(brk), Some(f));
        assert_eq!(program.stmt(body).parent, Some(Parent::Function(f)));
    }

    #[test]
    fn test_enclosing_loop_stops_at_function() {
        let mut program = Program::new();
        let brk = program.add_stmt(
            StmtKind::Break {
                keyword: keyword(TokenKind::Break, "break"),
                target: None,
            },
            1,
        );
        let body = program.add_stmt(StmtKind::Block(vec![brk]), 1);
        program.add_function(Function::new(
            DataType::Void,
            Token::ident("main", 1),
            Vec::new(),
            body,
        ));

        assert_eq!(program.enclosing_loop(brk), None);
    }

    #[test]
    fn test_variable_info_for_array() {
        let mut program = Program::new();
        let decl = program.add_stmt(
            StmtKind::Array(ArrayDecl {
                name: Token::ident("xs", 1),
                ty: DataType::Int,
                len: 4,
                initializer: None,
                slot: Some(2),
            }),
            1,
        );

        let info = program.variable(Binding::Local(decl)).unwrap();
        assert_eq!(info.ty, DataType::Int);
        assert_eq!(info.array_len, Some(4));
        assert_eq!(info.slot, Some(2));
        assert_eq!(info.name.lexeme, "xs");
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(Literal::Int(1).data_type(), DataType::Int);
        assert_eq!(Literal::Float(1.5).data_type(), DataType::Float);
        assert_eq!(Literal::Char('c').data_type(), DataType::Char);
        assert_eq!(Literal::Str("s".into()).data_type(), DataType::String);
    }
}
