//! Source text to syntax tree: [`lexer`] produces [`token::Token`]s and
//! [`parser`] assembles them into a [`crate::lang::ast::Program`].

pub mod lexer;
pub mod parser;
pub mod parser_error;
pub mod token;
pub mod token_dumper;
