use thiserror::Error;

use crate::frontend::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{line}:{col}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
        ch
    }

    fn error(&self, message: impl Into<String>, line: usize, col: usize) -> LexerError {
        LexerError {
            message: message.into(),
            line,
            col,
        }
    }

    /// Skips whitespace, `// line` comments and `/* block */` comments.
    fn skip_trivia(&mut self) -> Result<(), LexerError> {
        loop {
            match (self.current(), self.peek()) {
                (Some(ch), _) if ch.is_whitespace() => {
                    self.advance();
                }
                (Some('/'), Some('/')) => {
                    while let Some(ch) = self.current() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                (Some('/'), Some('*')) => {
                    let (line, col) = (self.line, self.col);
                    self.advance();
                    self.advance();
                    loop {
                        match (self.current(), self.peek()) {
                            (Some('*'), Some('/')) => {
                                self.advance();
                                self.advance();
                                break;
                            }
                            (Some(_), _) => {
                                self.advance();
                            }
                            (None, _) => {
                                return Err(self.error("unterminated block comment", line, col));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_escape(&mut self) -> Result<char, LexerError> {
        // the backslash has already been consumed
        let escaped = match self.current() {
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('\\') => '\\',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('0') => '\0',
            Some(ch) => {
                return Err(self.error(
                    format!("unknown escape sequence: \\{}", ch),
                    self.line,
                    self.col,
                ));
            }
            None => {
                return Err(self.error(
                    "unexpected EOF in escape sequence",
                    self.line,
                    self.col,
                ));
            }
        };
        self.advance();
        Ok(escaped)
    }

    fn read_string(&mut self) -> Result<TokenKind, LexerError> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();

        let mut string = String::new();
        loop {
            match self.current() {
                Some('"') => {
                    self.advance();
                    return Ok(TokenKind::Str(string));
                }
                Some('\\') => {
                    self.advance();
                    string.push(self.read_escape()?);
                }
                Some('\n') => {
                    return Err(self.error(
                        "unterminated string (newline before closing quote)",
                        start_line,
                        start_col,
                    ));
                }
                Some(ch) => {
                    string.push(ch);
                    self.advance();
                }
                None => {
                    return Err(self.error("unterminated string literal", start_line, start_col));
                }
            }
        }
    }

    fn read_char(&mut self) -> Result<TokenKind, LexerError> {
        let start_line = self.line;
        let start_col = self.col;
        self.advance();

        let ch = match self.current() {
            Some('\\') => {
                self.advance();
                self.read_escape()?
            }
            Some('\'') | Some('\n') | None => {
                return Err(self.error("empty character literal", start_line, start_col));
            }
            Some(ch) => {
                self.advance();
                ch
            }
        };

        if self.current() != Some('\'') {
            return Err(self.error(
                "unterminated character literal",
                start_line,
                start_col,
            ));
        }
        self.advance();
        Ok(TokenKind::Char(ch))
    }

    fn read_number(&mut self) -> Result<TokenKind, LexerError> {
        let start_line = self.line;
        let start_col = self.col;

        let mut digits = String::new();
        while let Some(ch) = self.current() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // Float: digits '.' digits
        if self.current() == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            digits.push('.');
            self.advance();
            while let Some(ch) = self.current() {
                if ch.is_ascii_digit() {
                    digits.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
            return digits.parse::<f64>().map(TokenKind::Float).map_err(|_| {
                self.error(format!("invalid float: {}", digits), start_line, start_col)
            });
        }

        digits.parse::<i64>().map(TokenKind::Integer).map_err(|_| {
            self.error(
                format!("integer literal out of range: {}", digits),
                start_line,
                start_col,
            )
        })
    }

    fn read_identifier(&mut self) -> TokenKind {
        let mut ident = String::new();
        while let Some(ch) = self.current() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),

            "int" => TokenKind::IntType,
            "float" => TokenKind::FloatType,
            "bool" => TokenKind::BoolType,
            "char" => TokenKind::CharType,
            "string" => TokenKind::StringType,
            "void" => TokenKind::VoidType,

            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "print" => TokenKind::Print,
            "input" => TokenKind::Input,
            "random" => TokenKind::Random,

            "and" => TokenKind::And,
            "or" => TokenKind::Or,

            _ => TokenKind::Ident(ident),
        }
    }

    fn read_operator(&mut self) -> Option<TokenKind> {
        let ch = self.current()?;
        let next = self.peek();

        let (kind, width) = match (ch, next) {
            ('+', Some('+')) => (TokenKind::PlusPlus, 2),
            ('-', Some('-')) => (TokenKind::MinusMinus, 2),
            ('=', Some('=')) => (TokenKind::EqEq, 2),
            ('!', Some('=')) => (TokenKind::NotEq, 2),
            ('<', Some('=')) => (TokenKind::LtEq, 2),
            ('>', Some('=')) => (TokenKind::GtEq, 2),
            ('&', Some('&')) => (TokenKind::And, 2),
            ('|', Some('|')) => (TokenKind::Or, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('=', _) => (TokenKind::Assign, 1),
            ('<', _) => (TokenKind::Lt, 1),
            ('>', _) => (TokenKind::Gt, 1),
            ('!', _) => (TokenKind::Bang, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            ('{', _) => (TokenKind::LBrace, 1),
            ('}', _) => (TokenKind::RBrace, 1),
            ('[', _) => (TokenKind::LBracket, 1),
            (']', _) => (TokenKind::RBracket, 1),
            (',', _) => (TokenKind::Comma, 1),
            (';', _) => (TokenKind::Semicolon, 1),
            _ => return None,
        };

        for _ in 0..width {
            self.advance();
        }
        Some(kind)
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_trivia()?;
            let (line, col) = (self.line, self.col);
            let start = self.pos;

            let kind = match self.current() {
                None => {
                    tokens.push(Token::new(TokenKind::Eof, "", line, col));
                    break;
                }
                Some('"') => self.read_string()?,
                Some('\'') => self.read_char()?,
                Some(ch) if ch.is_ascii_digit() => self.read_number()?,
                Some(ch) if ch.is_alphabetic() || ch == '_' => self.read_identifier(),
                Some(ch) => match self.read_operator() {
                    Some(kind) => kind,
                    None => {
                        return Err(self.error(
                            format!("unexpected character: '{}'", ch),
                            line,
                            col,
                        ));
                    }
                },
            };

            let lexeme: String = self.source[start..self.pos].iter().collect();
            tokens.push(Token::new(kind, lexeme, line, col));
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_function_header() {
        assert_eq!(
            kinds("int add(int a, int b)"),
            vec![
                TokenKind::IntType,
                TokenKind::Ident("add".into()),
                TokenKind::LParen,
                TokenKind::IntType,
                TokenKind::Ident("a".into()),
                TokenKind::Comma,
                TokenKind::IntType,
                TokenKind::Ident("b".into()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 2.5 7"),
            vec![
                TokenKind::Integer(42),
                TokenKind::Float(2.5),
                TokenKind::Integer(7),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_trailing_dot_is_not_a_float() {
        let err = Lexer::new("7.").tokenize().unwrap_err();
        assert!(err.message.contains("'.'"));
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("++ -- == != <= >= && ||"),
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_logic_operators() {
        assert_eq!(
            kinds("a and b or c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::And,
                TokenKind::Ident("b".into()),
                TokenKind::Or,
                TokenKind::Ident("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_string_and_char_literals() {
        assert_eq!(
            kinds(r#""hi\n" 'x' '\t'"#),
            vec![
                TokenKind::Str("hi\n".into()),
                TokenKind::Char('x'),
                TokenKind::Char('\t'),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("1 // line\n/* block\n comment */ 2"),
            vec![TokenKind::Integer(1), TokenKind::Integer(2), TokenKind::Eof]
        );
    }

    #[test]
    fn test_lexeme_and_position() {
        let tokens = Lexer::new("int\n  count").tokenize().unwrap();
        assert_eq!(tokens[1].lexeme, "count");
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].col, 3);
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated"));
        assert_eq!((err.line, err.col), (1, 1));
    }

    #[test]
    fn test_unexpected_character() {
        let err = Lexer::new("int x = 1 @").tokenize().unwrap_err();
        assert!(err.message.contains("'@'"));
        assert_eq!(err.col, 11);
    }

    #[test]
    fn test_unterminated_block_comment() {
        assert!(Lexer::new("/* never closed").tokenize().is_err());
    }
}
