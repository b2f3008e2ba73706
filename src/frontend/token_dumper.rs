use std::io::{self, Write};

use crate::frontend::token::{Token, TokenKind};

/// Prints a token stream, one token per line, for `cinder tokens`.
pub struct TokenDumper {
    pub color: bool,
    pub show_debug_repr: bool, // if false, prints the source lexeme instead
}

impl Default for TokenDumper {
    fn default() -> Self {
        Self {
            color: true,
            show_debug_repr: true,
        }
    }
}

impl TokenDumper {
    // ANSI colors
    const RESET: &'static str = "\x1b[0m";
    const DIM: &'static str = "\x1b[2m";
    const GRN: &'static str = "\x1b[32m";
    const YEL: &'static str = "\x1b[33m";
    const CYN: &'static str = "\x1b[36m";
    const MAG: &'static str = "\x1b[35m";
    const BLU: &'static str = "\x1b[34m";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_color(mut self) -> Self {
        self.color = false;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.show_debug_repr = false;
        self
    }

    pub fn dump(&self, out: &mut impl Write, tokens: &[Token]) -> io::Result<()> {
        for token in tokens {
            self.write_one(out, token)?;
        }
        Ok(())
    }

    fn write_one(&self, out: &mut impl Write, token: &Token) -> io::Result<()> {
        let class = Self::class(&token.kind);
        let colr = if self.color {
            Self::color(&token.kind)
        } else {
            ""
        };
        let reset = if self.color { Self::RESET } else { "" };

        if self.show_debug_repr {
            writeln!(
                out,
                "[{:02}:{:02}] {}{:<8} {:?}{}",
                token.line, token.col, colr, class, token.kind, reset
            )
        } else if token.kind == TokenKind::Eof {
            writeln!(
                out,
                "[{:02}:{:02}] {}{:<8} <eof>{}",
                token.line, token.col, colr, class, reset
            )
        } else {
            writeln!(
                out,
                "[{:02}:{:02}] {}{:<8} {}{}",
                token.line, token.col, colr, class, token.lexeme, reset
            )
        }
    }

    fn class(kind: &TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Eof => "EOF",

            Integer(_) => "INT",
            Float(_) => "FLOAT",
            Str(_) => "STRING",
            Char(_) => "CHAR",
            Bool(_) => "BOOL",

            Ident(_) => "IDENT",

            IntType | FloatType | BoolType | CharType | StringType | VoidType => "TYPE",

            LParen | RParen | LBrace | RBrace | LBracket | RBracket | Comma | Semicolon => "PUNCT",

            Plus | Minus | Star | Slash | Percent | PlusPlus | MinusMinus | Assign | Bang | And
            | Or => "OP",
            EqEq | NotEq | Lt | LtEq | Gt | GtEq => "CMP",

            _ => "KEYWORD",
        }
    }

    fn color(kind: &TokenKind) -> &'static str {
        use TokenKind::*;
        match kind {
            Eof => Self::DIM,
            Str(_) | Char(_) => Self::GRN,
            Integer(_) | Float(_) | Bool(_) => Self::CYN,
            Ident(_) => Self::YEL,
            IntType | FloatType | BoolType | CharType | StringType | VoidType => Self::BLU,
            Plus | Minus | Star | Slash | Percent | PlusPlus | MinusMinus | Assign | Bang | And
            | Or => Self::MAG,
            EqEq | NotEq | Lt | LtEq | Gt | GtEq => Self::MAG,
            _ => Self::RESET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::lexer::Lexer;

    #[test]
    fn test_pretty_plain_output() {
        let tokens = Lexer::new("int x;").tokenize().unwrap();
        let mut out = Vec::new();
        TokenDumper::new()
            .no_color()
            .pretty()
            .dump(&mut out, &tokens)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "[01:01] TYPE     int");
        assert_eq!(lines[1], "[01:05] IDENT    x");
        assert!(lines[3].contains("<eof>"));
    }

    #[test]
    fn test_debug_repr_shows_value() {
        let tokens = Lexer::new("42").tokenize().unwrap();
        let mut out = Vec::new();
        TokenDumper::new()
            .no_color()
            .dump(&mut out, &tokens)
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("[01:01] INT      Integer(42)"));
    }
}
