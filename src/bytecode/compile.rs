use std::collections::HashMap;

use tracing::debug;

use crate::{
    bytecode::{
        compile_error::CompileError,
        label::{LabelId, LabelTable},
        op::Op,
        strings::StringTable,
    },
    frontend::token::{Token, TokenKind},
    lang::{
        ast::{ExprId, ExprKind, FunctionId, Literal, Program, StmtId, StmtKind},
        data_type::DataType,
        scope::Binding,
    },
};

/// Output of code generation.
#[derive(Debug, Clone)]
pub struct Generated {
    pub code: Vec<i64>,
    pub labels: LabelTable,
    pub strings: StringTable,
    /// Entry address of every function, in declaration order.
    pub symbols: Vec<(String, usize)>,
}

/// Branch targets of the loop being generated.
#[derive(Debug, Clone, Copy)]
struct LoopLabels {
    continue_to: LabelId,
    break_to: LabelId,
}

/// Lowers a checked [`Program`] to the flat instruction stream.
///
/// Layout: an entry stub `PUSH main; CALL 0; EXIT`, then every function in
/// declaration order as `[ALLOC n] body RET`.
pub struct Compiler<'p> {
    program: &'p Program,
    code: Vec<i64>,
    labels: LabelTable,
    strings: StringTable,

    /// Entry label of each function, indexed by `FunctionId`.
    functions: Vec<LabelId>,

    /// Labels of every loop entered so far, keyed by the loop statement.
    loops: HashMap<StmtId, LoopLabels>,

    /// Function whose body is being generated.
    current: Option<FunctionId>,
}

impl<'p> Compiler<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            code: Vec::new(),
            labels: LabelTable::new(),
            strings: StringTable::new(),
            functions: Vec::new(),
            loops: HashMap::new(),
            current: None,
        }
    }

    pub fn compile_program(mut self) -> Result<Generated, CompileError> {
        let main = self
            .program
            .find_function("main")
            .ok_or(CompileError::MissingEntryPoint)?;

        self.functions = self
            .program
            .function_ids()
            .map(|_| self.labels.fresh())
            .collect();

        // Entry stub
        self.emit_label(Op::Push, self.functions[main.0])?;
        self.emit(Op::Call, &[0])?;
        self.emit(Op::Exit, &[])?;

        let mut symbols = Vec::new();
        for id in self.program.function_ids() {
            symbols.push((self.program.function(id).name().to_string(), self.code.len()));
            self.compile_function(id)?;
        }

        if let Some(label) = self.labels.unplaced().next() {
            return Err(CompileError::UnplacedLabel(label.0));
        }

        debug!(
            functions = symbols.len(),
            words = self.code.len(),
            labels = self.labels.len(),
            strings = self.strings.len(),
            "code generation finished"
        );

        Ok(Generated {
            code: self.code,
            labels: self.labels,
            strings: self.strings,
            symbols,
        })
    }

    // =========================================================================
    // Emission
    // =========================================================================

    fn emit(&mut self, op: Op, operands: &[i64]) -> Result<(), CompileError> {
        if operands.len() != op.arity() {
            return Err(CompileError::ArityMismatch {
                op,
                expected: op.arity(),
                found: operands.len(),
            });
        }
        self.code.push(op.word());
        self.code.extend_from_slice(operands);
        Ok(())
    }

    /// Emits a one-operand instruction whose operand is a label address.
    fn emit_label(&mut self, op: Op, label: LabelId) -> Result<(), CompileError> {
        self.emit(op, &[0])?;
        let site = self.code.len() - 1;
        self.labels.reference(label, &mut self.code, site);
        Ok(())
    }

    fn place(&mut self, label: LabelId) {
        self.labels.place(label, &mut self.code);
    }

    fn ty(&self, id: ExprId) -> Result<DataType, CompileError> {
        self.program.type_of(id).ok_or(CompileError::Untyped {
            line: self.program.expr(id).line,
        })
    }

    /// Emits `FTOI` when storing a `source` value into a `target` slot
    /// narrows.
    fn convert(&mut self, target: DataType, source: DataType) -> Result<(), CompileError> {
        if target.narrows_from(source) {
            self.emit(Op::Ftoi, &[])?;
        }
        Ok(())
    }

    /// Frame slot and type of a variable binding.
    fn variable(&self, binding: Option<Binding>, name: &Token) -> Result<(i64, DataType), CompileError> {
        binding
            .and_then(|b| self.program.variable(b))
            .and_then(|info| info.slot.map(|slot| (slot, info.ty)))
            .ok_or_else(|| unresolved(name))
    }

    // =========================================================================
    // Functions and statements
    // =========================================================================

    fn compile_function(&mut self, id: FunctionId) -> Result<(), CompileError> {
        let function = self.program.function(id);
        self.current = Some(id);

        self.place(self.functions[id.0]);
        if function.frame_slots > 0 {
            self.emit(Op::Alloc, &[function.frame_slots])?;
        }
        self.compile_stmt(function.body)?;

        // Falling off the end always returns.
        self.emit(Op::Ret, &[])?;
        self.current = None;
        Ok(())
    }

    fn compile_stmt(&mut self, id: StmtId) -> Result<(), CompileError> {
        let stmt = self.program.stmt(id);

        match &stmt.kind {
            StmtKind::Block(stmts) => {
                for stmt in stmts {
                    self.compile_stmt(*stmt)?;
                }
            }
            StmtKind::Return { value, .. } => match value {
                Some(value) => {
                    self.compile_expr(*value)?;
                    let expected = self
                        .current
                        .map(|f| self.program.function(f).return_type)
                        .unwrap_or(DataType::Void);
                    let found = self.ty(*value)?;
                    self.convert(expected, found)?;
                    self.emit(Op::RetV, &[])?;
                }
                None => self.emit(Op::Ret, &[])?,
            },
            StmtKind::Expression(expr) => {
                self.compile_expr(*expr)?;
                self.emit(Op::Pop, &[])?;
            }
            StmtKind::If {
                branches,
                else_block,
            } => {
                let end = self.labels.fresh();
                for (condition, block) in branches {
                    let next = self.labels.fresh();
                    self.compile_expr(*condition)?;
                    self.emit_label(Op::Jmpz, next)?;
                    self.compile_stmt(*block)?;
                    self.emit_label(Op::Jmp, end)?;
                    self.place(next);
                }
                if let Some(block) = else_block {
                    self.compile_stmt(*block)?;
                }
                self.place(end);
            }
            StmtKind::While { condition, body } => {
                let top = self.labels.fresh();
                let end = self.labels.fresh();
                self.loops.insert(
                    id,
                    LoopLabels {
                        continue_to: top,
                        break_to: end,
                    },
                );

                self.place(top);
                self.compile_expr(*condition)?;
                self.emit_label(Op::Jmpz, end)?;
                self.compile_stmt(*body)?;
                self.emit_label(Op::Jmp, top)?;
                self.place(end);
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                if let Some(init) = init {
                    self.compile_stmt(*init)?;
                }

                let top = self.labels.fresh();
                let step = self.labels.fresh();
                let end = self.labels.fresh();
                self.loops.insert(
                    id,
                    LoopLabels {
                        continue_to: step,
                        break_to: end,
                    },
                );

                self.place(top);
                if let Some(condition) = condition {
                    self.compile_expr(*condition)?;
                    self.emit_label(Op::Jmpz, end)?;
                }
                self.compile_stmt(*body)?;
                self.place(step);
                if let Some(update) = update {
                    self.compile_expr(*update)?;
                    self.emit(Op::Pop, &[])?;
                }
                self.emit_label(Op::Jmp, top)?;
                self.place(end);
            }
            StmtKind::Output { values, .. } => {
                for value in values {
                    self.compile_expr(*value)?;
                    let op = match self.ty(*value)? {
                        DataType::Int => Op::OutInt,
                        DataType::Float => Op::OutFloat,
                        DataType::String => Op::OutString,
                        DataType::Char => Op::OutChar,
                        DataType::Bool => Op::OutBool,
                        DataType::Void => {
                            return Err(CompileError::Untyped {
                                line: self.program.expr(*value).line,
                            });
                        }
                    };
                    self.emit(op, &[])?;
                }
            }
            StmtKind::Input { name, binding } => {
                let (slot, ty) = self.variable(*binding, name)?;
                let op = match ty {
                    DataType::Float => Op::InFloat,
                    DataType::Char => Op::InChar,
                    DataType::String => Op::InString,
                    // BOOL reads as an integer: zero is false
                    DataType::Int | DataType::Bool | DataType::Void => Op::InInt,
                };
                self.emit(op, &[])?;
                self.emit(Op::Poke, &[slot])?;
            }
            StmtKind::Var(decl) => {
                if let Some(init) = decl.initializer {
                    let slot = decl.slot.ok_or_else(|| unresolved(&decl.name))?;
                    self.compile_expr(init)?;
                    let found = self.ty(init)?;
                    self.convert(decl.ty, found)?;
                    self.emit(Op::Poke, &[slot])?;
                }
            }
            StmtKind::Array(decl) => {
                let Some(init) = decl.initializer else {
                    return Ok(());
                };
                let base = decl.slot.ok_or_else(|| unresolved(&decl.name))?;
                let ExprKind::ArrayCreate { elements } = &self.program.expr(init).kind else {
                    return Err(CompileError::Untyped {
                        line: self.program.expr(init).line,
                    });
                };
                for (offset, element) in elements.iter().enumerate() {
                    self.compile_expr(*element)?;
                    let found = self.ty(*element)?;
                    self.convert(decl.ty, found)?;
                    self.emit(Op::Poke, &[base + offset as i64])?;
                }
            }
            StmtKind::Break { target, .. } => {
                let labels = self.loop_labels(*target, "break", stmt.line)?;
                self.emit_label(Op::Jmp, labels.break_to)?;
            }
            StmtKind::Continue { target, .. } => {
                let labels = self.loop_labels(*target, "continue", stmt.line)?;
                self.emit_label(Op::Jmp, labels.continue_to)?;
            }
        }
        Ok(())
    }

    fn loop_labels(
        &self,
        target: Option<StmtId>,
        what: &'static str,
        line: usize,
    ) -> Result<LoopLabels, CompileError> {
        target
            .and_then(|t| self.loops.get(&t).copied())
            .ok_or(CompileError::NoEnclosingLoop { what, line })
    }

    // =========================================================================
    // Expressions: each leaves exactly one value on the stack
    // =========================================================================

    fn compile_expr(&mut self, id: ExprId) -> Result<(), CompileError> {
        let expr = self.program.expr(id);
        let line = expr.line;

        match &expr.kind {
            ExprKind::Literal(literal) => {
                let word = match literal {
                    Literal::Int(n) => *n,
                    Literal::Float(f) => f.to_bits() as i64,
                    Literal::Bool(b) => *b as i64,
                    Literal::Char(c) => *c as i64,
                    Literal::Str(s) => self.strings.intern(s),
                };
                self.emit(Op::Push, &[word])?;
            }
            ExprKind::Grouping(inner) => self.compile_expr(*inner)?,
            ExprKind::Binary { left, op, right } => self.compile_binary(*left, op, *right, line)?,
            ExprKind::Unary {
                op,
                operand,
                postfix,
            } => self.compile_unary(op, *operand, *postfix, line)?,
            ExprKind::Variable { name, binding } => {
                let (slot, _) = self.variable(*binding, name)?;
                self.emit(Op::Peek, &[slot])?;
            }
            ExprKind::Assign {
                name,
                index,
                value,
                binding,
            } => {
                let (slot, target) = self.variable(*binding, name)?;
                self.compile_expr(*value)?;
                let found = self.ty(*value)?;
                self.convert(target, found)?;
                self.emit(Op::Dup, &[])?;
                match index {
                    Some(index) => {
                        self.compile_expr(*index)?;
                        self.emit(Op::PokeI, &[slot])?;
                    }
                    None => self.emit(Op::Poke, &[slot])?,
                }
            }
            ExprKind::Call {
                callee,
                args,
                binding,
            } => {
                let Some(Binding::Function(function)) = binding else {
                    return Err(unresolved(callee));
                };
                let f = self.program.function(*function);

                self.emit_label(Op::Push, self.functions[function.0])?;
                for (arg, param) in args.iter().zip(&f.params) {
                    self.compile_expr(*arg)?;
                    let found = self.ty(*arg)?;
                    self.convert(param.ty, found)?;
                }
                self.emit(Op::Call, &[args.len() as i64])?;
                if f.return_type == DataType::Void {
                    // placeholder result
                    self.emit(Op::Push, &[0])?;
                }
            }
            ExprKind::ArrayAccess {
                name,
                index,
                binding,
            } => {
                let (slot, _) = self.variable(*binding, name)?;
                self.compile_expr(*index)?;
                self.emit(Op::PeekI, &[slot])?;
            }
            ExprKind::ArrayCreate { .. } => {
                return Err(CompileError::UnsupportedOperator {
                    op: "{...}".to_string(),
                    line,
                });
            }
            ExprKind::Random { bound, .. } => {
                self.compile_expr(*bound)?;
                self.emit(Op::Rand, &[])?;
            }
        }
        Ok(())
    }

    fn compile_binary(
        &mut self,
        left: ExprId,
        op: &Token,
        right: ExprId,
        line: usize,
    ) -> Result<(), CompileError> {
        let (lt, rt) = (self.ty(left)?, self.ty(right)?);
        let float = lt == DataType::Float || rt == DataType::Float;

        let opcode = match (&op.kind, float) {
            (TokenKind::And, _) => Op::And,
            (TokenKind::Or, _) => Op::Or,
            (TokenKind::Plus, false) => Op::Add,
            (TokenKind::Minus, false) => Op::Sub,
            (TokenKind::Star, false) => Op::Mul,
            (TokenKind::Slash, false) => Op::Div,
            (TokenKind::Percent, false) => Op::Mod,
            (TokenKind::Plus, true) => Op::AddF,
            (TokenKind::Minus, true) => Op::SubF,
            (TokenKind::Star, true) => Op::MulF,
            (TokenKind::Slash, true) => Op::DivF,
            (TokenKind::EqEq, false) => Op::Eq,
            (TokenKind::NotEq, false) => Op::Ne,
            (TokenKind::Lt, false) => Op::Lt,
            (TokenKind::LtEq, false) => Op::Le,
            (TokenKind::Gt, false) => Op::Gt,
            (TokenKind::GtEq, false) => Op::Ge,
            (TokenKind::EqEq, true) => Op::EqF,
            (TokenKind::NotEq, true) => Op::NeF,
            (TokenKind::Lt, true) => Op::LtF,
            (TokenKind::LtEq, true) => Op::LeF,
            (TokenKind::Gt, true) => Op::GtF,
            (TokenKind::GtEq, true) => Op::GeF,
            _ => {
                return Err(CompileError::UnsupportedOperator {
                    op: op.lexeme.clone(),
                    line,
                });
            }
        };
        // Logical operators take their operands as raw words.
        let widen = float && !matches!(opcode, Op::And | Op::Or);

        self.compile_expr(left)?;
        if widen && lt == DataType::Int {
            self.emit(Op::Itof, &[])?;
        }
        self.compile_expr(right)?;
        if widen && rt == DataType::Int {
            self.emit(Op::Itof, &[])?;
        }
        self.emit(opcode, &[])
    }

    fn compile_unary(
        &mut self,
        op: &Token,
        operand: ExprId,
        postfix: bool,
        line: usize,
    ) -> Result<(), CompileError> {
        match op.kind {
            TokenKind::Plus => self.compile_expr(operand),
            TokenKind::Minus => {
                if self.ty(operand)? == DataType::Float {
                    self.emit(Op::Push, &[0.0f64.to_bits() as i64])?;
                    self.compile_expr(operand)?;
                    self.emit(Op::SubF, &[])
                } else {
                    self.emit(Op::Push, &[0])?;
                    self.compile_expr(operand)?;
                    self.emit(Op::Sub, &[])
                }
            }
            TokenKind::Bang => {
                self.compile_expr(operand)?;
                self.emit(Op::Not, &[])
            }
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let ExprKind::Variable { name, binding } = &self.program.expr(operand).kind else {
                    return Err(CompileError::UnsupportedOperator {
                        op: op.lexeme.clone(),
                        line,
                    });
                };
                let (slot, _) = self.variable(*binding, name)?;
                let step = if op.kind == TokenKind::PlusPlus {
                    Op::Add
                } else {
                    Op::Sub
                };

                self.emit(Op::Peek, &[slot])?;
                if postfix {
                    // old value stays below the update
                    self.emit(Op::Dup, &[])?;
                    self.emit(Op::Push, &[1])?;
                    self.emit(step, &[])?;
                    self.emit(Op::Poke, &[slot])
                } else {
                    self.emit(Op::Push, &[1])?;
                    self.emit(step, &[])?;
                    self.emit(Op::Dup, &[])?;
                    self.emit(Op::Poke, &[slot])
                }
            }
            _ => Err(CompileError::UnsupportedOperator {
                op: op.lexeme.clone(),
                line,
            }),
        }
    }
}

fn unresolved(name: &Token) -> CompileError {
    CompileError::Unresolved {
        name: name.lexeme.clone(),
        line: name.line,
    }
}

/// Generates code for a program that passed scope and type checking.
pub fn generate(program: &Program) -> Result<Generated, CompileError> {
    Compiler::new(program).compile_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Checker, Resolver};
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;

    fn compile(source: &str) -> Result<Generated, CompileError> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let mut program = Parser::new(tokens).parse().unwrap();
        assert!(Resolver::new(&mut program).resolve().is_empty());
        let errors = Checker::new(&mut program).check();
        assert!(errors.is_empty(), "{:?}", errors);
        generate(&program)
    }

    fn words(ops: &[(Op, Option<i64>)]) -> Vec<i64> {
        let mut out = Vec::new();
        for (op, operand) in ops {
            out.push(op.word());
            out.extend(operand);
        }
        out
    }

    fn contains_sequence(code: &[i64], seq: &[i64]) -> bool {
        code.windows(seq.len()).any(|w| w == seq)
    }

    #[test]
    fn test_entry_stub_and_trailing_ret() {
        let generated = compile("int main() { return 1; }").unwrap();
        assert_eq!(
            generated.code,
            words(&[
                (Op::Push, Some(5)),
                (Op::Call, Some(0)),
                (Op::Exit, None),
                (Op::Push, Some(1)),
                (Op::RetV, None),
                (Op::Ret, None),
            ])
        );
        assert_eq!(generated.symbols, vec![("main".to_string(), 5)]);
    }

    #[test]
    fn test_main_label_is_forward_patched() {
        let generated = compile("int helper() { return 2; } int main() { return helper(); }").unwrap();
        let main_addr = generated.symbols[1].1;
        assert_eq!(generated.code[1], main_addr as i64);
        assert_eq!(generated.labels.unplaced().count(), 0);
    }

    #[test]
    fn test_missing_main() {
        let err = compile("int f() { return 1; }").unwrap_err();
        assert_eq!(err, CompileError::MissingEntryPoint);
    }

    #[test]
    fn test_frame_allocation() {
        let generated = compile("void main() { int a = 1; int xs[3]; }").unwrap();
        assert!(contains_sequence(
            &generated.code,
            &words(&[(Op::Alloc, Some(4)), (Op::Push, Some(1)), (Op::Poke, Some(0))])
        ));
    }

    #[test]
    fn test_call_pushes_target_then_args() {
        let generated =
            compile("int add(int a, int b) { return a + b; } int main() { return add(2, 3); }")
                .unwrap();
        let add = generated.symbols[0].1 as i64;
        assert!(contains_sequence(
            &generated.code,
            &words(&[
                (Op::Push, Some(add)),
                (Op::Push, Some(2)),
                (Op::Push, Some(3)),
                (Op::Call, Some(2)),
                (Op::RetV, None),
            ])
        ));
        // parameters live below the saved frame state
        assert!(contains_sequence(
            &generated.code,
            &words(&[(Op::Peek, Some(-5)), (Op::Peek, Some(-4)), (Op::Add, None)])
        ));
    }

    #[test]
    fn test_void_call_pushes_placeholder() {
        let generated = compile("void f() { } void main() { f(); }").unwrap();
        let f = generated.symbols[0].1 as i64;
        assert!(contains_sequence(
            &generated.code,
            &words(&[
                (Op::Push, Some(f)),
                (Op::Call, Some(0)),
                (Op::Push, Some(0)),
                (Op::Pop, None),
            ])
        ));
    }

    #[test]
    fn test_narrowing_and_widening() {
        let generated = compile("void main() { int x = 2.5; float y = 1 + 0.5; }").unwrap();
        let half = 0.5f64.to_bits() as i64;
        let two_and_half = 2.5f64.to_bits() as i64;
        assert!(contains_sequence(
            &generated.code,
            &words(&[(Op::Push, Some(two_and_half)), (Op::Ftoi, None), (Op::Poke, Some(0))])
        ));
        assert!(contains_sequence(
            &generated.code,
            &words(&[
                (Op::Push, Some(1)),
                (Op::Itof, None),
                (Op::Push, Some(half)),
                (Op::AddF, None),
            ])
        ));
    }

    #[test]
    fn test_strings_are_interned() {
        let generated = compile("void main() { print(\"hi\"); print(\"hi\", \"yo\"); }").unwrap();
        assert_eq!(generated.strings.len(), 2);
        assert!(contains_sequence(
            &generated.code,
            &words(&[(Op::Push, Some(0)), (Op::OutString, None)])
        ));
    }

    #[test]
    fn test_while_jumps_back_to_condition() {
        let generated = compile("void main() { while (false) { } }").unwrap();
        let main = generated.symbols[0].1 as i64;
        // main: PUSH 0; JMPZ end; JMP main; end: RET
        assert_eq!(
            &generated.code[main as usize..],
            &words(&[
                (Op::Push, Some(0)),
                (Op::Jmpz, Some(main + 6)),
                (Op::Jmp, Some(main)),
                (Op::Ret, None),
            ])[..]
        );
    }

    #[test]
    fn test_element_assignment() {
        let generated = compile("void main() { int xs[2]; xs[1] = 7; }").unwrap();
        assert!(contains_sequence(
            &generated.code,
            &words(&[
                (Op::Push, Some(7)),
                (Op::Dup, None),
                (Op::Push, Some(1)),
                (Op::PokeI, Some(0)),
                (Op::Pop, None),
            ])
        ));
    }

    #[test]
    fn test_arity_is_checked() {
        let program = Program::new();
        let mut compiler = Compiler::new(&program);
        assert_eq!(
            compiler.emit(Op::Push, &[]),
            Err(CompileError::ArityMismatch {
                op: Op::Push,
                expected: 1,
                found: 0
            })
        );
        assert!(compiler.emit(Op::Add, &[1]).is_err());
        assert!(compiler.code.is_empty());
    }
}
