use thiserror::Error;

/// A fault that stops the VM.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("runtime error: unknown opcode {word} at {ip:04}")]
    UnknownOpcode { ip: usize, word: i64 },

    /// An access outside the stack region. Stack overflow and underflow,
    /// a bad frame offset and a jump out of the code all end up here.
    #[error("runtime error: memory fault at address {addr} (ip {ip:04})")]
    MemoryFault { ip: usize, addr: i64 },

    #[error("runtime error: division by zero at {ip:04}")]
    DivisionByZero { ip: usize },

    #[error("runtime error: step limit exceeded ({0})")]
    StepLimit(u64),

    #[error("runtime error: unknown string key {key} at {ip:04}")]
    UnknownString { ip: usize, key: i64 },

    #[error("runtime error: invalid input: {0}")]
    InvalidInput(String),

    #[error("runtime error: {0}")]
    Io(#[from] std::io::Error),
}
