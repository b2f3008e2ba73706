pub mod config;
pub mod runtime_error;
pub mod vm;

pub use config::VmConfig;
pub use runtime_error::VmError;
pub use vm::Vm;
