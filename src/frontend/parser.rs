use crate::frontend::parser_error::ParserError;
use crate::frontend::token::{Token, TokenKind};
use crate::lang::ast::{
    ArrayDecl, ExprId, ExprKind, Function, Literal, Param, Program, StmtId, StmtKind, VarDecl,
};
use crate::lang::data_type::DataType;

/// Recursive-descent parser for Cinder.
///
/// The parser consumes the lexer's token list and builds the arena-allocated
/// [`Program`]. A program is a sequence of function definitions; statements
/// and expressions follow a small C-like grammar. Parsing stops at the first
/// error.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// The most recently consumed token.
    ///
    /// Used to provide stable source locations for errors that occur after
    /// advancing past the last token or at end-of-file.
    last: Option<Token>,
    program: Program,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            pos: 0,
            last: None,
            program: Program::new(),
        }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.current().map(|t| &t.kind)
    }

    fn peek_next(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    fn at_end(&self) -> bool {
        matches!(self.peek(), None | Some(TokenKind::Eof))
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.last = token.clone();
            self.pos += 1;
        }
        token
    }

    /// Consumes the current token when it has the given kind.
    fn matches(&mut self, kind: &TokenKind) -> Option<Token> {
        if self.check(kind) {
            self.advance()
        } else {
            None
        }
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> Result<Token, ParserError> {
        match self.matches(kind) {
            Some(token) => Ok(token),
            None => Err(self.error(&format!("expected {}", what))),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<Token, ParserError> {
        match self.peek() {
            Some(TokenKind::Ident(_)) => Ok(self.advance().ok_or_else(|| self.error(what))?),
            _ => Err(self.error(&format!("expected {}", what))),
        }
    }

    /// Constructs a `ParserError` at the most relevant location.
    ///
    /// Priority:
    /// 1. The current token, unless it is EOF and something was consumed.
    /// 2. The last consumed token.
    /// 3. (1,1) for truly empty input.
    fn error(&self, message: &str) -> ParserError {
        let at = match (self.current(), &self.last) {
            (Some(t), Some(last)) if t.kind == TokenKind::Eof => Some(last),
            (Some(t), _) => Some(t),
            (None, last) => last.as_ref(),
        };
        match at {
            Some(t) => ParserError {
                message: message.to_string(),
                line: t.line,
                col: t.col,
            },
            None => ParserError {
                message: message.to_string(),
                line: 1,
                col: 1,
            },
        }
    }

    fn line(&self) -> usize {
        self.current()
            .or(self.last.as_ref())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    /// Parses a complete program: a sequence of function definitions.
    pub fn parse(mut self) -> Result<Program, ParserError> {
        while !self.at_end() {
            self.parse_function()?;
        }
        Ok(self.program)
    }

    fn parse_type(&mut self, what: &str) -> Result<DataType, ParserError> {
        match self.peek().and_then(TokenKind::data_type) {
            Some(ty) => {
                self.advance();
                Ok(ty)
            }
            None => Err(self.error(&format!("expected {}", what))),
        }
    }

    /// ```text
    /// type name ( type name, ... ) { body }
    /// ```
    fn parse_function(&mut self) -> Result<(), ParserError> {
        let return_type = self.parse_type("return type of function")?;
        let name = self.expect_ident("function name")?;
        self.expect(&TokenKind::LParen, "'(' after function name")?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let ty = self.parse_type("parameter type")?;
                if ty == DataType::Void {
                    return Err(self.error("parameters cannot be void"));
                }
                let name = self.expect_ident("parameter name")?;
                params.push(Param { name, ty, slot: 0 });
                if self.matches(&TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' after parameters")?;

        let body = self.parse_block()?;
        self.program
            .add_function(Function::new(return_type, name, params, body));
        Ok(())
    }

    fn parse_block(&mut self) -> Result<StmtId, ParserError> {
        let open = self.expect(&TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.at_end() {
                return Err(self.error("unexpected EOF, expected '}'"));
            }
            stmts.push(self.parse_statement()?);
        }
        self.advance(); // consume '}'
        Ok(self.program.add_stmt(StmtKind::Block(stmts), open.line))
    }

    fn parse_statement(&mut self) -> Result<StmtId, ParserError> {
        let line = self.line();
        match self.peek() {
            Some(TokenKind::LBrace) => self.parse_block(),
            Some(TokenKind::If) => self.parse_if(),
            Some(TokenKind::While) => self.parse_while(),
            Some(TokenKind::For) => self.parse_for(),
            Some(TokenKind::Return) => {
                let keyword = self.advance().ok_or_else(|| self.error("expected return"))?;
                let value = if self.check(&TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(&TokenKind::Semicolon, "';' after return")?;
                Ok(self.program.add_stmt(StmtKind::Return { keyword, value }, line))
            }
            Some(TokenKind::Break) => {
                let keyword = self.advance().ok_or_else(|| self.error("expected break"))?;
                self.expect(&TokenKind::Semicolon, "';' after break")?;
                Ok(self.program.add_stmt(
                    StmtKind::Break {
                        keyword,
                        target: None,
                    },
                    line,
                ))
            }
            Some(TokenKind::Continue) => {
                let keyword = self
                    .advance()
                    .ok_or_else(|| self.error("expected continue"))?;
                self.expect(&TokenKind::Semicolon, "';' after continue")?;
                Ok(self.program.add_stmt(
                    StmtKind::Continue {
                        keyword,
                        target: None,
                    },
                    line,
                ))
            }
            Some(TokenKind::Print) => self.parse_print(),
            Some(TokenKind::Input) => {
                self.advance();
                self.expect(&TokenKind::LParen, "'(' after input")?;
                let name = self.expect_ident("variable name in input")?;
                self.expect(&TokenKind::RParen, "')' after input target")?;
                self.expect(&TokenKind::Semicolon, "';' after input")?;
                Ok(self.program.add_stmt(
                    StmtKind::Input {
                        name,
                        binding: None,
                    },
                    line,
                ))
            }
            _ if self.peek().and_then(TokenKind::data_type).is_some() => self.parse_declaration(),
            _ => {
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon, "';' after expression")?;
                Ok(self.program.add_stmt(StmtKind::Expression(expr), line))
            }
        }
    }

    /// ```text
    /// if (c) { .. } else if (c) { .. } else { .. }
    /// ```
    fn parse_if(&mut self) -> Result<StmtId, ParserError> {
        let line = self.line();
        self.advance(); // consume 'if'

        let mut branches = Vec::new();
        let mut else_block = None;
        loop {
            self.expect(&TokenKind::LParen, "'(' after if")?;
            let condition = self.parse_expression()?;
            self.expect(&TokenKind::RParen, "')' after condition")?;
            let block = self.parse_block()?;
            branches.push((condition, block));

            if self.matches(&TokenKind::Else).is_none() {
                break;
            }
            if self.matches(&TokenKind::If).is_none() {
                else_block = Some(self.parse_block()?);
                break;
            }
        }

        Ok(self.program.add_stmt(
            StmtKind::If {
                branches,
                else_block,
            },
            line,
        ))
    }

    fn parse_while(&mut self) -> Result<StmtId, ParserError> {
        let line = self.line();
        self.advance(); // consume 'while'
        self.expect(&TokenKind::LParen, "'(' after while")?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::RParen, "')' after condition")?;
        let body = self.parse_block()?;
        Ok(self
            .program
            .add_stmt(StmtKind::While { condition, body }, line))
    }

    /// ```text
    /// for (init; condition; update) { .. }
    /// ```
    /// Every clause is optional.
    fn parse_for(&mut self) -> Result<StmtId, ParserError> {
        let line = self.line();
        self.advance(); // consume 'for'
        self.expect(&TokenKind::LParen, "'(' after for")?;

        let init = if self.matches(&TokenKind::Semicolon).is_some() {
            None
        } else if self.peek().and_then(TokenKind::data_type).is_some() {
            Some(self.parse_declaration()?)
        } else {
            let init_line = self.line();
            let expr = self.parse_expression()?;
            self.expect(&TokenKind::Semicolon, "';' after for initializer")?;
            Some(self.program.add_stmt(StmtKind::Expression(expr), init_line))
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon, "';' after for condition")?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::RParen, "')' after for clauses")?;

        let body = self.parse_block()?;
        Ok(self.program.add_stmt(
            StmtKind::For {
                init,
                condition,
                update,
                body,
            },
            line,
        ))
    }

    fn parse_print(&mut self) -> Result<StmtId, ParserError> {
        let line = self.line();
        let keyword = self.advance().ok_or_else(|| self.error("expected print"))?;
        self.expect(&TokenKind::LParen, "'(' after print")?;
        let mut values = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                values.push(self.parse_expression()?);
                if self.matches(&TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' after print arguments")?;
        self.expect(&TokenKind::Semicolon, "';' after print")?;
        Ok(self
            .program
            .add_stmt(StmtKind::Output { keyword, values }, line))
    }

    /// ```text
    /// type name;
    /// type name = value;
    /// type name[N];
    /// type name[N?] = { a, b, ... };
    /// ```
    fn parse_declaration(&mut self) -> Result<StmtId, ParserError> {
        let line = self.line();
        let ty = self.parse_type("type")?;
        if ty == DataType::Void {
            return Err(self.error("variables cannot be void"));
        }
        let name = self.expect_ident("variable name")?;

        if self.matches(&TokenKind::LBracket).is_some() {
            let declared_len = match self.peek() {
                Some(TokenKind::Integer(n)) => {
                    let n = *n;
                    self.advance();
                    if n <= 0 {
                        return Err(self.error("array length must be positive"));
                    }
                    Some(n as usize)
                }
                _ => None,
            };
            self.expect(&TokenKind::RBracket, "']' after array length")?;

            let initializer = if self.matches(&TokenKind::Assign).is_some() {
                Some(self.parse_expression()?)
            } else {
                None
            };
            self.expect(&TokenKind::Semicolon, "';' after declaration")?;

            let len = match (declared_len, initializer) {
                (Some(len), _) => len,
                (None, Some(init)) => match &self.program.expr(init).kind {
                    ExprKind::ArrayCreate { elements } if !elements.is_empty() => elements.len(),
                    _ => return Err(self.error("array length required")),
                },
                (None, None) => return Err(self.error("array length required")),
            };

            return Ok(self.program.add_stmt(
                StmtKind::Array(ArrayDecl {
                    name,
                    ty,
                    len,
                    initializer,
                    slot: None,
                }),
                line,
            ));
        }

        let initializer = if self.matches(&TokenKind::Assign).is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.expect(&TokenKind::Semicolon, "';' after declaration")?;

        Ok(self.program.add_stmt(
            StmtKind::Var(VarDecl {
                name,
                ty,
                initializer,
                slot: None,
            }),
            line,
        ))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn parse_expression(&mut self) -> Result<ExprId, ParserError> {
        self.parse_assignment()
    }

    /// Right-associative; the target must be a name or an element access.
    fn parse_assignment(&mut self) -> Result<ExprId, ParserError> {
        let target = self.parse_binary_level(0)?;

        if !self.check(&TokenKind::Assign) {
            return Ok(target);
        }
        let assign = self.advance().ok_or_else(|| self.error("expected '='"))?;
        let value = self.parse_assignment()?;

        let (name, index) = match &self.program.expr(target).kind {
            ExprKind::Variable { name, .. } => (name.clone(), None),
            ExprKind::ArrayAccess { name, index, .. } => (name.clone(), Some(*index)),
            _ => {
                return Err(ParserError {
                    message: "invalid assignment target".to_string(),
                    line: assign.line,
                    col: assign.col,
                });
            }
        };

        Ok(self.program.add_expr(
            ExprKind::Assign {
                name,
                index,
                value,
                binding: None,
            },
            assign.line,
        ))
    }

    /// Binary operator precedence table, loosest first.
    const LEVELS: &'static [&'static [TokenKind]] = &[
        &[TokenKind::Or],
        &[TokenKind::And],
        &[TokenKind::EqEq, TokenKind::NotEq],
        &[TokenKind::Lt, TokenKind::LtEq, TokenKind::Gt, TokenKind::GtEq],
        &[TokenKind::Plus, TokenKind::Minus],
        &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent],
    ];

    fn parse_binary_level(&mut self, level: usize) -> Result<ExprId, ParserError> {
        if level == Self::LEVELS.len() {
            return self.parse_unary();
        }

        let mut left = self.parse_binary_level(level + 1)?;
        while let Some(kind) = self.peek() {
            if !Self::LEVELS[level].contains(kind) {
                break;
            }
            let op = self.advance().ok_or_else(|| self.error("expected operator"))?;
            let right = self.parse_binary_level(level + 1)?;
            let line = op.line;
            left = self
                .program
                .add_expr(ExprKind::Binary { left, op, right }, line);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParserError> {
        match self.peek() {
            Some(TokenKind::Bang | TokenKind::Minus | TokenKind::Plus) => {
                let op = self.advance().ok_or_else(|| self.error("expected operator"))?;
                let operand = self.parse_unary()?;
                let line = op.line;
                Ok(self.program.add_expr(
                    ExprKind::Unary {
                        op,
                        operand,
                        postfix: false,
                    },
                    line,
                ))
            }
            Some(TokenKind::PlusPlus | TokenKind::MinusMinus) => {
                let op = self.advance().ok_or_else(|| self.error("expected operator"))?;
                let operand = self.parse_unary()?;
                if !matches!(self.program.expr(operand).kind, ExprKind::Variable { .. }) {
                    return Err(ParserError {
                        message: format!("invalid operand for '{}'", op.lexeme),
                        line: op.line,
                        col: op.col,
                    });
                }
                let line = op.line;
                Ok(self.program.add_expr(
                    ExprKind::Unary {
                        op,
                        operand,
                        postfix: false,
                    },
                    line,
                ))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<ExprId, ParserError> {
        let expr = self.parse_primary()?;

        if matches!(self.program.expr(expr).kind, ExprKind::Variable { .. })
            && matches!(
                self.peek(),
                Some(TokenKind::PlusPlus | TokenKind::MinusMinus)
            )
        {
            let op = self.advance().ok_or_else(|| self.error("expected operator"))?;
            let line = op.line;
            return Ok(self.program.add_expr(
                ExprKind::Unary {
                    op,
                    operand: expr,
                    postfix: true,
                },
                line,
            ));
        }

        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParserError> {
        let token = match self.current() {
            Some(t) if t.kind != TokenKind::Eof => t.clone(),
            _ => return Err(self.error("unexpected EOF, expected expression")),
        };
        let line = token.line;

        let literal = match &token.kind {
            TokenKind::Integer(n) => Some(Literal::Int(*n)),
            TokenKind::Float(n) => Some(Literal::Float(*n)),
            TokenKind::Bool(b) => Some(Literal::Bool(*b)),
            TokenKind::Char(c) => Some(Literal::Char(*c)),
            TokenKind::Str(s) => Some(Literal::Str(s.clone())),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(self.program.add_expr(ExprKind::Literal(literal), line));
        }

        match &token.kind {
            TokenKind::Ident(_) => {
                self.advance();
                match self.peek() {
                    Some(TokenKind::LParen) => self.parse_call(token),
                    Some(TokenKind::LBracket) => {
                        self.advance();
                        let index = self.parse_expression()?;
                        self.expect(&TokenKind::RBracket, "']' after index")?;
                        Ok(self.program.add_expr(
                            ExprKind::ArrayAccess {
                                name: token,
                                index,
                                binding: None,
                            },
                            line,
                        ))
                    }
                    _ => Ok(self.program.add_expr(
                        ExprKind::Variable {
                            name: token,
                            binding: None,
                        },
                        line,
                    )),
                }
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "')' after expression")?;
                Ok(self.program.add_expr(ExprKind::Grouping(inner), line))
            }
            TokenKind::Random => {
                self.advance();
                self.expect(&TokenKind::LParen, "'(' after random")?;
                let bound = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "')' after random bound")?;
                Ok(self.program.add_expr(
                    ExprKind::Random {
                        keyword: token,
                        bound,
                    },
                    line,
                ))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&TokenKind::RBrace) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if self.matches(&TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                }
                self.expect(&TokenKind::RBrace, "'}' after array elements")?;
                Ok(self
                    .program
                    .add_expr(ExprKind::ArrayCreate { elements }, line))
            }
            _ => Err(self.error(&format!("unexpected token '{}'", token.lexeme))),
        }
    }

    fn parse_call(&mut self, callee: Token) -> Result<ExprId, ParserError> {
        let line = callee.line;
        self.advance(); // consume '('
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.matches(&TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen, "')' after arguments")?;
        Ok(self.program.add_expr(
            ExprKind::Call {
                callee,
                args,
                binding: None,
            },
            line,
        ))
    }
}
