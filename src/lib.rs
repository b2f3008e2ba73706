//! Cinder: a small statically typed procedural language.
//!
//! The pipeline runs source text through [`frontend`] (lexer and parser),
//! [`analysis`] (scope resolution, then type checking), [`bytecode`] (code
//! generation into a flat word stream) and finally the [`runtime`] stack
//! machine.

pub mod analysis;
pub mod bytecode;
pub mod frontend;
pub mod lang;
pub mod runtime;

use std::io::{BufRead, Write};

use thiserror::Error;
use tracing::debug;

use crate::analysis::{Checker, Resolver, ScopeError, TypeError};
use crate::bytecode::{CompileError, ImageError, StringTable};
use crate::frontend::lexer::{Lexer, LexerError};
use crate::frontend::parser::Parser;
use crate::frontend::parser_error::ParserError;
use crate::lang::ast::Program;
use crate::runtime::{Vm, VmConfig, VmError};

pub use crate::bytecode::{Generated, generate};

/// Any failure along the source-to-exit-status pipeline.
#[derive(Debug, Error)]
pub enum CinderError {
    #[error("lex error: {0}")]
    Lex(#[from] LexerError),

    #[error("parse error: {0}")]
    Parse(#[from] ParserError),

    /// Scope and type errors, collected over the whole program.
    #[error("{} scope error(s), {} type error(s)", scope.len(), types.len())]
    Diagnostics {
        scope: Vec<ScopeError>,
        types: Vec<TypeError>,
    },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Vm(#[from] VmError),
}

impl CinderError {
    /// Every diagnostic message, one per entry, scope errors first.
    pub fn messages(&self) -> Vec<String> {
        match self {
            CinderError::Diagnostics { scope, types } => scope
                .iter()
                .map(ToString::to_string)
                .chain(types.iter().map(ToString::to_string))
                .collect(),
            other => vec![other.to_string()],
        }
    }
}

/// Binds every name in `program` and lays out stack frames.
pub fn resolve_names(program: &mut Program) -> Vec<ScopeError> {
    Resolver::new(program).resolve()
}

/// Infers and checks types. Runs after [`resolve_names`]; uses whose name
/// did not resolve are skipped.
pub fn check_types(program: &mut Program) -> Vec<TypeError> {
    Checker::new(program).check()
}

/// Runs `code` on stdin/stdout with the default [`VmConfig`].
pub fn execute(code: &[i64], strings: StringTable) -> Result<i64, VmError> {
    runtime::vm::execute(code, strings)
}

/// Runs `code` against the given reader and writer.
pub fn execute_with<R: BufRead, W: Write>(
    code: &[i64],
    strings: StringTable,
    input: R,
    output: W,
    config: VmConfig,
) -> Result<i64, VmError> {
    Vm::new(code, strings, input, output, config).run()
}

pub fn parse_source(source: &str) -> Result<Program, CinderError> {
    let tokens = Lexer::new(source).tokenize()?;
    Ok(Parser::new(tokens).parse()?)
}

/// Parses and analyzes `source`, returning the annotated tree.
///
/// Both passes always run, so one call reports every scope and type error.
/// Names left unbound by the resolver are skipped by the checker.
pub fn analyze_source(source: &str) -> Result<Program, CinderError> {
    let mut program = parse_source(source)?;

    let scope = resolve_names(&mut program);
    let types = check_types(&mut program);
    debug!(
        functions = program.function_count(),
        scope_errors = scope.len(),
        type_errors = types.len(),
        "analysis finished"
    );

    if !scope.is_empty() || !types.is_empty() {
        return Err(CinderError::Diagnostics { scope, types });
    }
    Ok(program)
}

/// The whole front-to-back pipeline: source text to bytecode.
pub fn compile_source(source: &str) -> Result<Generated, CinderError> {
    let program = analyze_source(source)?;
    Ok(generate(&program)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_run() {
        let generated = compile_source("int main() { return 6 * 7; }").unwrap();
        let mut out = Vec::new();
        let status = execute_with(
            &generated.code,
            generated.strings,
            "".as_bytes(),
            &mut out,
            VmConfig::default(),
        )
        .unwrap();
        assert_eq!(status, 42);
        assert!(out.is_empty());
    }

    #[test]
    fn test_diagnostics_are_collected() {
        let err = compile_source("int main() { x = 1; y = 2; return 0; }").unwrap_err();
        let CinderError::Diagnostics { scope, types } = &err else {
            panic!("expected diagnostics, got {err}");
        };
        assert_eq!(scope.len(), 2);
        assert!(types.is_empty());
        assert_eq!(err.messages().len(), 2);
        assert_eq!(err.to_string(), "2 scope error(s), 0 type error(s)");
    }

    #[test]
    fn test_type_errors_stop_generation() {
        let err = compile_source("int main() { int x = true; return x; }").unwrap_err();
        assert!(matches!(
            err,
            CinderError::Diagnostics { ref types, .. } if types.len() == 1
        ));
    }

    #[test]
    fn test_frontend_errors() {
        assert!(matches!(compile_source("int main() { return 1 @ 2; }"), Err(CinderError::Lex(_))));
        assert!(matches!(compile_source("int main() { return 1 }"), Err(CinderError::Parse(_))));
    }

    #[test]
    fn test_missing_main() {
        assert!(matches!(
            compile_source("int f() { return 1; }"),
            Err(CinderError::Compile(CompileError::MissingEntryPoint))
        ));
    }
}
