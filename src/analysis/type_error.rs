use thiserror::Error;

/// A typing problem found by the type checker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[line {line}] {message}")]
pub struct TypeError {
    pub message: String,
    pub line: usize,
}

impl TypeError {
    pub fn new(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}
