//! Flat bytecode: opcodes, labels, the string table, code generation and
//! the on-disk image format.

pub mod compile;
pub mod compile_error;
pub mod disasm;
pub mod image;
pub mod label;
pub mod op;
pub mod strings;
pub mod verify;

pub use compile::{Generated, generate};
pub use compile_error::CompileError;
pub use image::{Image, ImageError};
pub use label::{Label, LabelId, LabelTable};
pub use op::Op;
pub use strings::StringTable;
