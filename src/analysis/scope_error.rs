use thiserror::Error;

use crate::lang::scope::ElementKind;

/// A name-resolution problem found by the scope resolver.
///
/// Resolution does not stop at the first problem; every error in the
/// program is collected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("[line {line}] duplicate {kind} name in scope: '{name}'")]
    Duplicate {
        kind: ElementKind,
        name: String,
        line: usize,
    },

    #[error("[line {line}] {kind} not found in current scope: '{name}'")]
    NotFound {
        kind: ElementKind,
        name: String,
        line: usize,
    },
}

impl ScopeError {
    pub fn line(&self) -> usize {
        match self {
            ScopeError::Duplicate { line, .. } | ScopeError::NotFound { line, .. } => *line,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ScopeError::Duplicate { name, .. } | ScopeError::NotFound { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let dup = ScopeError::Duplicate {
            kind: ElementKind::Variable,
            name: "x".into(),
            line: 4,
        };
        assert_eq!(
            dup.to_string(),
            "[line 4] duplicate variable name in scope: 'x'"
        );

        let missing = ScopeError::NotFound {
            kind: ElementKind::Function,
            name: "f".into(),
            line: 9,
        };
        assert_eq!(
            missing.to_string(),
            "[line 9] function not found in current scope: 'f'"
        );
        assert_eq!(missing.line(), 9);
    }
}
