//! Type checking.
//!
//! Runs after scope resolution. Every expression gets its inferred type
//! stored in `Expr::ty`; an expression whose type cannot be determined
//! (an unresolved name, an ill-typed operand) keeps `None` so one mistake
//! is reported once rather than at every enclosing node.

use tracing::debug;

use crate::analysis::type_error::TypeError;
use crate::frontend::token::TokenKind;
use crate::lang::ast::{ExprId, ExprKind, FunctionId, Program, StmtId, StmtKind};
use crate::lang::data_type::DataType;
use crate::lang::scope::Binding;

pub struct Checker<'p> {
    program: &'p mut Program,
    errors: Vec<TypeError>,
}

impl<'p> Checker<'p> {
    pub fn new(program: &'p mut Program) -> Self {
        Self {
            program,
            errors: Vec::new(),
        }
    }

    pub fn check(mut self) -> Vec<TypeError> {
        for id in self.program.function_ids() {
            self.check_function(id);
        }
        self.check_entry_point();

        debug!(
            functions = self.program.function_count(),
            errors = self.errors.len(),
            "type checking finished"
        );
        self.errors
    }

    fn error(&mut self, message: impl Into<String>, line: usize) {
        self.errors.push(TypeError::new(message, line));
    }

    fn check_function(&mut self, id: FunctionId) {
        self.program.function_mut(id).returns.clear();
        let body = self.program.function(id).body;
        self.check_stmt(body);

        let function = self.program.function(id);
        if function.return_type != DataType::Void && function.returns.is_empty() {
            let message = format!("function '{}' has no return statements", function.name());
            let line = function.name.line;
            self.error(message, line);
        }
    }

    /// A missing `main` is left to code generation; a malformed one is a
    /// type error.
    fn check_entry_point(&mut self) {
        let Some(id) = self.program.find_function("main") else {
            return;
        };
        let main = self.program.function(id);
        let (line, has_params, return_type) =
            (main.name.line, !main.params.is_empty(), main.return_type);
        if has_params {
            self.error("function 'main' must not take parameters", line);
        }
        if !matches!(return_type, DataType::Int | DataType::Void) {
            self.error(
                format!("function 'main' must return INT or VOID, found {}", return_type),
                line,
            );
        }
    }

    fn check_condition(&mut self, condition: ExprId) {
        let line = self.program.expr(condition).line;
        match self.check_expr(condition) {
            Some(DataType::Bool) | None => {}
            Some(found) => self.error(
                format!("condition should be boolean, found {}", found),
                line,
            ),
        }
    }

    fn check_stmt(&mut self, id: StmtId) {
        let line = self.program.stmt(id).line;

        match self.program.stmt(id).kind.clone() {
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.check_stmt(stmt);
                }
            }
            StmtKind::Return { value, .. } => self.check_return(id, value, line),
            StmtKind::Expression(expr) => {
                self.check_expr(expr);
            }
            StmtKind::If {
                branches,
                else_block,
            } => {
                for (condition, block) in branches {
                    self.check_condition(condition);
                    self.check_stmt(block);
                }
                if let Some(block) = else_block {
                    self.check_stmt(block);
                }
            }
            StmtKind::While { condition, body } => {
                self.check_condition(condition);
                self.check_stmt(body);
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(condition) = condition {
                    self.check_condition(condition);
                }
                if let Some(update) = update {
                    self.check_expr(update);
                }
                self.check_stmt(body);
            }
            StmtKind::Output { values, .. } => {
                for value in values {
                    if self.check_expr(value) == Some(DataType::Void) {
                        let line = self.program.expr(value).line;
                        self.error("cannot print a VOID value", line);
                    }
                }
            }
            StmtKind::Input { name, binding } => {
                let is_array = binding
                    .and_then(|b| self.program.variable(b))
                    .is_some_and(|info| info.array_len.is_some());
                if is_array {
                    self.error(
                        format!("cannot read input into array '{}'", name.lexeme),
                        line,
                    );
                }
            }
            StmtKind::Var(decl) => {
                let Some(init) = decl.initializer else {
                    return;
                };
                if let Some(source) = self.check_expr(init)
                    && decl.ty.assignment_result(source).is_none()
                {
                    self.error(
                        format!(
                            "cannot initialize variable '{}' of type {} with {}",
                            decl.name.lexeme, decl.ty, source
                        ),
                        line,
                    );
                }
            }
            StmtKind::Array(decl) => {
                let Some(init) = decl.initializer else {
                    return;
                };
                let elements = match &self.program.expr(init).kind {
                    ExprKind::ArrayCreate { elements } => elements.clone(),
                    _ => {
                        self.check_expr(init);
                        self.error(
                            format!(
                                "array '{}' must be initialized with a brace list",
                                decl.name.lexeme
                            ),
                            line,
                        );
                        return;
                    }
                };

                self.program.expr_mut(init).ty = Some(decl.ty);
                if elements.len() > decl.len {
                    self.error(
                        format!(
                            "too many initializer elements for array '{}' ({} > {})",
                            decl.name.lexeme,
                            elements.len(),
                            decl.len
                        ),
                        line,
                    );
                }
                for element in elements {
                    if let Some(source) = self.check_expr(element)
                        && decl.ty.assignment_result(source).is_none()
                    {
                        let line = self.program.expr(element).line;
                        self.error(
                            format!(
                                "cannot store {} in array '{}' of {}",
                                source, decl.name.lexeme, decl.ty
                            ),
                            line,
                        );
                    }
                }
            }
            StmtKind::Break { keyword, .. } | StmtKind::Continue { keyword, .. } => {
                match self.program.enclosing_loop(id) {
                    Some(found) => match &mut self.program.stmt_mut(id).kind {
                        StmtKind::Break { target, .. } | StmtKind::Continue { target, .. } => {
                            *target = Some(found)
                        }
                        _ => {}
                    },
                    None => self.error(
                        format!("'{}' must be inside of a loop", keyword.lexeme),
                        line,
                    ),
                }
            }
        }
    }

    fn check_return(&mut self, id: StmtId, value: Option<ExprId>, line: usize) {
        let found = value.and_then(|value| self.check_expr(value));

        let Some(function) = self.program.enclosing_function(id) else {
            self.error("return statement outside of a function", line);
            return;
        };
        self.program.function_mut(function).returns.push(id);

        let f = self.program.function(function);
        let name = f.name().to_string();
        let expected = f.return_type;

        match (expected, value) {
            (DataType::Void, Some(_)) => self.error(
                format!("void function '{}' cannot return a value", name),
                line,
            ),
            (DataType::Void, None) => {}
            (expected, None) => self.error(
                format!("function '{}' must return a value of type {}", name, expected),
                line,
            ),
            (expected, Some(_)) => {
                if let Some(found) = found
                    && expected.assignment_result(found).is_none()
                {
                    self.error(
                        format!(
                            "function '{}' returns {}, found {}",
                            name, expected, found
                        ),
                        line,
                    );
                }
            }
        }
    }

    fn check_expr(&mut self, id: ExprId) -> Option<DataType> {
        let ty = self.infer(id);
        self.program.expr_mut(id).ty = ty;
        ty
    }

    fn infer(&mut self, id: ExprId) -> Option<DataType> {
        let line = self.program.expr(id).line;

        match self.program.expr(id).kind.clone() {
            ExprKind::Binary { left, op, right } => {
                let left = self.check_expr(left);
                let right = self.check_expr(right);
                let (left, right) = (left?, right?);
                self.binary(&op.kind, &op.lexeme, left, right, line)
            }
            ExprKind::Grouping(inner) => self.check_expr(inner),
            ExprKind::Literal(literal) => Some(literal.data_type()),
            ExprKind::Unary { op, operand, .. } => {
                let ty = self.check_expr(operand)?;
                let valid = match op.kind {
                    TokenKind::Bang => ty == DataType::Bool,
                    TokenKind::PlusPlus | TokenKind::MinusMinus => ty == DataType::Int,
                    _ => ty.is_numeric(),
                };
                if !valid {
                    self.error(
                        format!("invalid operand {} for unary '{}'", ty, op.lexeme),
                        line,
                    );
                }
                Some(ty)
            }
            ExprKind::Variable { name, binding } => {
                let info = self.program.variable(binding?)?;
                let (ty, is_array) = (info.ty, info.array_len.is_some());
                if is_array {
                    self.error(format!("array '{}' used as a value", name.lexeme), line);
                }
                Some(ty)
            }
            ExprKind::Assign {
                name,
                index,
                value,
                binding,
            } => {
                let source = self.check_expr(value);
                let index_ty = index.and_then(|index| self.check_expr(index));

                let info = self.program.variable(binding?)?;
                let (target, is_array) = (info.ty, info.array_len.is_some());

                match (index, is_array) {
                    (Some(_), false) => {
                        self.error(format!("'{}' is not an array", name.lexeme), line)
                    }
                    (None, true) => self.error(
                        format!("cannot assign to array '{}' as a whole", name.lexeme),
                        line,
                    ),
                    _ => {}
                }
                if let Some(found) = index_ty
                    && found != DataType::Int
                {
                    self.error(format!("array index must be INT, found {}", found), line);
                }

                let source = source?;
                match target.assignment_result(source) {
                    Some(ty) => Some(ty),
                    None => {
                        self.error(
                            format!(
                                "cannot assign {} to '{}' of type {}",
                                source, name.lexeme, target
                            ),
                            line,
                        );
                        Some(target)
                    }
                }
            }
            ExprKind::Call {
                callee,
                args,
                binding,
            } => {
                let arg_types: Vec<Option<DataType>> =
                    args.iter().map(|arg| self.check_expr(*arg)).collect();

                let Binding::Function(function) = binding? else {
                    return None;
                };
                let f = self.program.function(function);
                let return_type = f.return_type;
                let params: Vec<DataType> = f.params.iter().map(|p| p.ty).collect();

                if params.len() != args.len() {
                    self.error(
                        format!(
                            "function '{}' expects {} arguments, found {}",
                            callee.lexeme,
                            params.len(),
                            args.len()
                        ),
                        line,
                    );
                } else {
                    for (position, (param, arg)) in params.iter().zip(arg_types).enumerate() {
                        if let Some(arg) = arg
                            && param.assignment_result(arg).is_none()
                        {
                            self.error(
                                format!(
                                    "argument {} of '{}' expects {}, found {}",
                                    position + 1,
                                    callee.lexeme,
                                    param,
                                    arg
                                ),
                                line,
                            );
                        }
                    }
                }
                Some(return_type)
            }
            ExprKind::ArrayAccess {
                name,
                index,
                binding,
            } => {
                let index_ty = self.check_expr(index);
                if let Some(found) = index_ty
                    && found != DataType::Int
                {
                    self.error(format!("array index must be INT, found {}", found), line);
                }

                let info = self.program.variable(binding?)?;
                let (ty, is_array) = (info.ty, info.array_len.is_some());
                if !is_array {
                    self.error(format!("'{}' is not an array", name.lexeme), line);
                }
                Some(ty)
            }
            ExprKind::ArrayCreate { elements } => {
                for element in elements {
                    self.check_expr(element);
                }
                self.error(
                    "array literal is only allowed as an array initializer",
                    line,
                );
                None
            }
            ExprKind::Random { bound, .. } => {
                if let Some(found) = self.check_expr(bound)
                    && found != DataType::Int
                {
                    self.error(format!("random bound must be INT, found {}", found), line);
                }
                Some(DataType::Int)
            }
        }
    }

    fn binary(
        &mut self,
        op: &TokenKind,
        lexeme: &str,
        left: DataType,
        right: DataType,
        line: usize,
    ) -> Option<DataType> {
        use DataType::*;

        let result = match op {
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash => {
                match (left, right) {
                    (Int, Int) => Some(Int),
                    (l, r) if l.is_numeric() && r.is_numeric() => Some(Float),
                    _ => None,
                }
            }
            TokenKind::Percent => match (left, right) {
                (Int, Int) => Some(Int),
                _ => None,
            },
            TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => {
                (left.is_numeric() && right.is_numeric()).then_some(Bool)
            }
            TokenKind::EqEq | TokenKind::NotEq => {
                (left != Void && right != Void).then_some(Bool)
            }
            // `and`/`or` accept any operands.
            TokenKind::And | TokenKind::Or => Some(Bool),
            _ => None,
        };

        if result.is_none() {
            self.error(
                format!(
                    "operator '{}' cannot be applied to {} and {}",
                    lexeme, left, right
                ),
                line,
            );
        }
        result
    }
}
