use thiserror::Error;

use crate::bytecode::op::Op;

/// Code generation failure.
///
/// These only happen when an earlier pass let something through it should
/// have rejected; generation stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// An operator token with no lowering for the operand types at hand.
    #[error("compile error: [line {line}] no lowering for operator '{op}'")]
    UnsupportedOperator { op: String, line: usize },

    /// A name use without a binding, or a binding of the wrong kind.
    #[error("compile error: [line {line}] unresolved name '{name}'")]
    Unresolved { name: String, line: usize },

    /// An expression reached code generation without an inferred type.
    #[error("compile error: [line {line}] expression has no type")]
    Untyped { line: usize },

    #[error("compile error: program has no 'main' function")]
    MissingEntryPoint,

    #[error("compile error: {op} takes {expected} operand(s), got {found}")]
    ArityMismatch {
        op: Op,
        expected: usize,
        found: usize,
    },

    /// `break`/`continue` without a recorded loop, or a loop without labels.
    #[error("compile error: [line {line}] {what} outside of a loop")]
    NoEnclosingLoop { what: &'static str, line: usize },

    #[error("compile error: label {0} referenced but never placed")]
    UnplacedLabel(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CompileError::ArityMismatch {
            op: Op::Push,
            expected: 1,
            found: 0,
        };
        assert_eq!(
            err.to_string(),
            "compile error: PUSH takes 1 operand(s), got 0"
        );
        assert_eq!(
            CompileError::MissingEntryPoint.to_string(),
            "compile error: program has no 'main' function"
        );
    }
}
