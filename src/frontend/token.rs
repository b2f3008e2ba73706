use crate::lang::data_type::DataType;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Integer(i64),
    Float(f64),
    Str(String),
    Char(char),
    Bool(bool),

    // Names
    Ident(String),

    // Type keywords
    IntType,
    FloatType,
    BoolType,
    CharType,
    StringType,
    VoidType,

    // Keywords
    If,
    Else,
    While,
    For,
    Return,
    Break,
    Continue,
    Print,
    Input,
    Random,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,

    // Assignment / comparison
    Assign,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    // Logic
    Bang,
    And,
    Or,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,

    Eof,
}

impl TokenKind {
    /// The data type named by a type keyword, if this is one.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            TokenKind::IntType => Some(DataType::Int),
            TokenKind::FloatType => Some(DataType::Float),
            TokenKind::BoolType => Some(DataType::Bool),
            TokenKind::CharType => Some(DataType::Char),
            TokenKind::StringType => Some(DataType::String),
            TokenKind::VoidType => Some(DataType::Void),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Integer(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::Char(_)
                | TokenKind::Bool(_)
        )
    }
}

/// A lexed token: its kind (which carries any literal value), the source
/// text it was read from, and a 1-based position.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            line,
            col,
        }
    }

    /// Builds an identifier token. Mostly useful when assembling trees by hand.
    pub fn ident(name: &str, line: usize) -> Self {
        Self::new(TokenKind::Ident(name.to_string()), name, line, 1)
    }
}
