//! Scope resolution.
//!
//! Builds the program's [`ScopeGraph`](crate::lang::scope::ScopeGraph),
//! stamps every statement and expression with the scope active at that
//! point, binds every name use to its declaration and assigns frame slots.
//!
//! Frame layout, relative to `bp`:
//!
//! ```text
//!   bp - 3 - n + i   parameter i of n
//!   bp - 3           saved ip
//!   bp - 2           saved bp
//!   bp - 1           saved sp
//!   bp + k           local slot k (arrays take `len` consecutive slots)
//! ```

use tracing::debug;

use crate::analysis::scope_error::ScopeError;
use crate::frontend::token::Token;
use crate::lang::ast::{ExprId, ExprKind, FunctionId, Program, StmtId, StmtKind};
use crate::lang::scope::{Binding, ElementKind, ScopeId};

/// Cells between the last parameter and `bp`: saved ip, bp and sp.
pub const FRAME_HEADER: i64 = 3;

/// Frame slot of parameter `index` out of `count`.
pub fn param_slot(index: usize, count: usize) -> i64 {
    index as i64 - count as i64 - FRAME_HEADER
}

pub struct Resolver<'p> {
    program: &'p mut Program,
    errors: Vec<ScopeError>,
    next_slot: i64,
}

impl<'p> Resolver<'p> {
    pub fn new(program: &'p mut Program) -> Self {
        Self {
            program,
            errors: Vec::new(),
            next_slot: 0,
        }
    }

    pub fn resolve(mut self) -> Vec<ScopeError> {
        let root = self.program.scopes.root();

        // Every function is visible everywhere, regardless of order.
        for id in self.program.function_ids() {
            let name = self.program.function(id).name.clone();
            self.declare(root, &name, Binding::Function(id));
        }

        for id in self.program.function_ids() {
            self.resolve_function(id, root);
        }

        debug!(
            functions = self.program.function_count(),
            scopes = self.program.scopes.len(),
            errors = self.errors.len(),
            "scope resolution finished"
        );
        self.errors
    }

    fn resolve_function(&mut self, id: FunctionId, root: ScopeId) {
        let scope = self.program.scopes.push(root);
        let params: Vec<Token> = self
            .program
            .function(id)
            .params
            .iter()
            .map(|p| p.name.clone())
            .collect();

        let count = params.len();
        for (index, name) in params.iter().enumerate() {
            self.declare(scope, name, Binding::Param { function: id, index });
            self.program.function_mut(id).params[index].slot = param_slot(index, count);
        }

        self.next_slot = 0;
        let body = self.program.function(id).body;
        self.resolve_block_in(body, scope);

        let function = self.program.function_mut(id);
        function.scope = Some(scope);
        function.frame_slots = self.next_slot;
    }

    fn declare(&mut self, scope: ScopeId, name: &Token, binding: Binding) {
        if self
            .program
            .scopes
            .declare(scope, &name.lexeme, binding)
            .is_err()
        {
            self.errors.push(ScopeError::Duplicate {
                kind: binding.kind(),
                name: name.lexeme.clone(),
                line: name.line,
            });
        }
    }

    fn lookup(&mut self, scope: ScopeId, name: &Token, kind: ElementKind) -> Option<Binding> {
        let found = self.program.scopes.resolve(scope, &name.lexeme, kind);
        if found.is_none() {
            self.errors.push(ScopeError::NotFound {
                kind,
                name: name.lexeme.clone(),
                line: name.line,
            });
        }
        found
    }

    fn alloc_slots(&mut self, count: i64) -> i64 {
        let slot = self.next_slot;
        self.next_slot += count;
        slot
    }

    /// Visits a block's statements directly in `scope` instead of opening a
    /// fresh one.
    fn resolve_block_in(&mut self, block: StmtId, scope: ScopeId) {
        self.program.stmt_mut(block).scope = Some(scope);
        match &self.program.stmt(block).kind {
            StmtKind::Block(stmts) => {
                for stmt in stmts.clone() {
                    self.resolve_stmt(stmt, scope);
                }
            }
            _ => self.resolve_stmt(block, scope),
        }
    }

    fn resolve_stmt(&mut self, id: StmtId, scope: ScopeId) {
        self.program.stmt_mut(id).scope = Some(scope);

        match self.program.stmt(id).kind.clone() {
            StmtKind::Block(stmts) => {
                let inner = self.program.scopes.push(scope);
                for stmt in stmts {
                    self.resolve_stmt(stmt, inner);
                }
            }
            StmtKind::Return { value, .. } => {
                if let Some(value) = value {
                    self.resolve_expr(value, scope);
                }
            }
            StmtKind::Expression(expr) => self.resolve_expr(expr, scope),
            StmtKind::If {
                branches,
                else_block,
            } => {
                for (condition, block) in branches {
                    self.resolve_expr(condition, scope);
                    let branch = self.program.scopes.push(scope);
                    self.resolve_block_in(block, branch);
                }
                if let Some(block) = else_block {
                    let branch = self.program.scopes.push(scope);
                    self.resolve_block_in(block, branch);
                }
            }
            StmtKind::While { condition, body } => {
                self.resolve_expr(condition, scope);
                let inner = self.program.scopes.push(scope);
                self.resolve_block_in(body, inner);
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                // The loop variable lives in its own scope around the body.
                let header = self.program.scopes.push(scope);
                if let Some(init) = init {
                    self.resolve_stmt(init, header);
                }
                if let Some(condition) = condition {
                    self.resolve_expr(condition, header);
                }
                if let Some(update) = update {
                    self.resolve_expr(update, header);
                }
                let inner = self.program.scopes.push(header);
                self.resolve_block_in(body, inner);
            }
            StmtKind::Output { values, .. } => {
                for value in values {
                    self.resolve_expr(value, scope);
                }
            }
            StmtKind::Input { name, .. } => {
                let found = self.lookup(scope, &name, ElementKind::Variable);
                if let StmtKind::Input { binding, .. } = &mut self.program.stmt_mut(id).kind {
                    *binding = found;
                }
            }
            StmtKind::Var(decl) => {
                if let Some(init) = decl.initializer {
                    self.resolve_expr(init, scope);
                }
                self.declare(scope, &decl.name, Binding::Local(id));
                let slot = self.alloc_slots(1);
                if let StmtKind::Var(decl) = &mut self.program.stmt_mut(id).kind {
                    decl.slot = Some(slot);
                }
            }
            StmtKind::Array(decl) => {
                if let Some(init) = decl.initializer {
                    self.resolve_expr(init, scope);
                }
                self.declare(scope, &decl.name, Binding::Local(id));
                let slot = self.alloc_slots(decl.len as i64);
                if let StmtKind::Array(decl) = &mut self.program.stmt_mut(id).kind {
                    decl.slot = Some(slot);
                }
            }
            // Loop targets are found by the type checker.
            StmtKind::Break { .. } | StmtKind::Continue { .. } => {}
        }
    }

    fn resolve_expr(&mut self, id: ExprId, scope: ScopeId) {
        self.program.expr_mut(id).scope = Some(scope);

        let found = match self.program.expr(id).kind.clone() {
            ExprKind::Binary { left, right, .. } => {
                self.resolve_expr(left, scope);
                self.resolve_expr(right, scope);
                None
            }
            ExprKind::Grouping(inner) => {
                self.resolve_expr(inner, scope);
                None
            }
            ExprKind::Literal(_) => None,
            ExprKind::Unary { operand, .. } => {
                self.resolve_expr(operand, scope);
                None
            }
            ExprKind::Variable { name, .. } => self.lookup(scope, &name, ElementKind::Variable),
            ExprKind::Assign {
                name, index, value, ..
            } => {
                self.resolve_expr(value, scope);
                if let Some(index) = index {
                    self.resolve_expr(index, scope);
                }
                self.lookup(scope, &name, ElementKind::Variable)
            }
            ExprKind::Call { callee, args, .. } => {
                for arg in args {
                    self.resolve_expr(arg, scope);
                }
                self.lookup(scope, &callee, ElementKind::Function)
            }
            ExprKind::ArrayAccess { name, index, .. } => {
                self.resolve_expr(index, scope);
                self.lookup(scope, &name, ElementKind::Variable)
            }
            ExprKind::ArrayCreate { elements } => {
                for element in elements {
                    self.resolve_expr(element, scope);
                }
                None
            }
            ExprKind::Random { bound, .. } => {
                self.resolve_expr(bound, scope);
                None
            }
        };

        if let Some(found) = found {
            match &mut self.program.expr_mut(id).kind {
                ExprKind::Variable { binding, .. }
                | ExprKind::Assign { binding, .. }
                | ExprKind::Call { binding, .. }
                | ExprKind::ArrayAccess { binding, .. } => *binding = Some(found),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;
    use crate::lang::ast::{ArrayDecl, VarDecl};

    fn resolved(source: &str) -> (Program, Vec<ScopeError>) {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut program = Parser::new(tokens).parse().unwrap();
        let errors = Resolver::new(&mut program).resolve();
        (program, errors)
    }

    fn body(program: &Program, name: &str) -> Vec<StmtId> {
        let f = program.find_function(name).unwrap();
        match &program.stmt(program.function(f).body).kind {
            StmtKind::Block(stmts) => stmts.clone(),
            _ => unreachable!(),
        }
    }

    fn returned_expr(program: &Program, stmt: StmtId) -> ExprId {
        match &program.stmt(stmt).kind {
            StmtKind::Return { value, .. } => value.unwrap(),
            other => panic!("expected return, got {:?}", other),
        }
    }

    #[test]
    fn test_clean_program_has_no_errors() {
        let (_, errors) =
            resolved("int add(int a, int b) { return a + b; } int main() { return add(2, 3); }");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_duplicate_variable_in_block() {
        let (_, errors) = resolved("void main() { int x; int x; }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ScopeError::Duplicate { kind: ElementKind::Variable, name, .. } if name == "x"
        ));
        assert!(errors[0]
            .to_string()
            .contains("duplicate variable name in scope"));
    }

    #[test]
    fn test_duplicate_function() {
        let (_, errors) = resolved("void f() { } void f() { } void main() { }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ScopeError::Duplicate { kind: ElementKind::Function, .. }
        ));
    }

    #[test]
    fn test_variable_and_function_share_a_name() {
        let (_, errors) = resolved("int f() { return 1; } int main() { int f = f(); return f; }");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_forward_and_mutual_calls() {
        let (program, errors) = resolved(
            "int main() { return even(4); } \
             int even(int n) { if (n == 0) { return 1; } return odd(n - 1); } \
             int odd(int n) { if (n == 0) { return 0; } return even(n - 1); }",
        );
        assert!(errors.is_empty(), "{:?}", errors);

        let call = returned_expr(&program, body(&program, "main")[0]);
        let even = program.find_function("even").unwrap();
        assert!(matches!(
            program.expr(call).kind,
            ExprKind::Call { binding: Some(Binding::Function(f)), .. } if f == even
        ));
    }

    #[test]
    fn test_unknown_names_accumulate() {
        let (_, errors) = resolved("void main() { x = y; g(); }");
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().all(|e| matches!(e, ScopeError::NotFound { .. })));
        assert!(errors[2]
            .to_string()
            .contains("function not found in current scope"));
    }

    #[test]
    fn test_initializer_cannot_see_its_own_name() {
        let (_, errors) = resolved("void main() { int x = x; }");
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ScopeError::NotFound { name, .. } if name == "x"));
    }

    #[test]
    fn test_shadowing_binds_to_inner_declaration() {
        let (program, errors) =
            resolved("int main() { int x = 1; { int x = 2; return x; } }");
        assert!(errors.is_empty(), "{:?}", errors);

        let stmts = body(&program, "main");
        let inner = match &program.stmt(stmts[1]).kind {
            StmtKind::Block(inner) => inner.clone(),
            _ => unreachable!(),
        };
        let use_site = returned_expr(&program, inner[1]);
        assert!(matches!(
            program.expr(use_site).kind,
            ExprKind::Variable { binding: Some(Binding::Local(decl)), .. } if decl == inner[0]
        ));
    }

    #[test]
    fn test_sibling_blocks_do_not_conflict() {
        let (_, errors) = resolved("void main() { { int x; } { int x; } }");
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[test]
    fn test_param_slots_are_negative() {
        let (program, _) = resolved("int f(int a, int b, int c) { return a; } void main() { }");
        let f = program.function(program.find_function("f").unwrap());
        let slots: Vec<i64> = f.params.iter().map(|p| p.slot).collect();
        assert_eq!(slots, vec![-6, -5, -4]);
    }

    #[test]
    fn test_locals_and_arrays_take_consecutive_slots() {
        let (program, errors) = resolved("void main() { int a; int xs[3]; float b; }");
        assert!(errors.is_empty());

        let stmts = body(&program, "main");
        assert!(matches!(
            &program.stmt(stmts[0]).kind,
            StmtKind::Var(VarDecl { slot: Some(0), .. })
        ));
        assert!(matches!(
            &program.stmt(stmts[1]).kind,
            StmtKind::Array(ArrayDecl { slot: Some(1), .. })
        ));
        assert!(matches!(
            &program.stmt(stmts[2]).kind,
            StmtKind::Var(VarDecl { slot: Some(4), .. })
        ));
        let main = program.function(program.find_function("main").unwrap());
        assert_eq!(main.frame_slots, 5);
    }

    #[test]
    fn test_param_conflicts_with_top_level_local() {
        let (_, errors) = resolved("void f(int a) { int a; } void main() { }");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_every_node_gets_a_scope() {
        let (program, _) = resolved("int main() { for (int i = 0; i < 3; i++) { print(i); } return 0; }");
        for f in program.function_ids() {
            assert!(program.function(f).scope.is_some());
        }
        let stmts = body(&program, "main");
        for stmt in stmts {
            assert!(program.stmt(stmt).scope.is_some());
        }
    }

    #[test]
    fn test_for_variable_is_scoped_to_loop() {
        let (_, errors) =
            resolved("void main() { for (int i = 0; i < 3; i++) { } for (int i = 0; i < 3; i++) { } }");
        assert!(errors.is_empty(), "{:?}", errors);

        let (_, errors) = resolved("void main() { for (int i = 0; i < 3; i++) { } i = 1; }");
        assert_eq!(errors.len(), 1);
    }
}
