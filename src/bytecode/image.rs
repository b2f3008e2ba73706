use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytecode::compile::Generated;
use crate::bytecode::op::Op;
use crate::bytecode::strings::StringTable;
use crate::bytecode::verify::verify;

/// "CNB1"
pub const IMAGE_MAGIC: u32 = 0x434E_4231;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("not a cinder image (bad magic {0:#010x})")]
    BadMagic(u32),

    #[error("image decode failed: {0}")]
    Decode(#[from] postcard::Error),

    #[error("image i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown opcode {word} at {addr:04}")]
    UnknownOpcode { addr: usize, word: i64 },

    #[error("{op} at {addr:04} is missing its operand")]
    TruncatedOperand { addr: usize, op: Op },

    #[error("jump at {addr:04} targets {target}, which is not an instruction")]
    JumpOutOfRange { addr: usize, target: i64 },

    #[error("code never reaches EXIT")]
    NoExit,
}

/// A compiled program as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    magic: u32,
    pub code: Vec<i64>,
    pub strings: StringTable,
    /// Function entry points, for listings.
    pub symbols: Vec<(String, usize)>,
}

impl Image {
    pub fn new(code: Vec<i64>, strings: StringTable, symbols: Vec<(String, usize)>) -> Self {
        Self {
            magic: IMAGE_MAGIC,
            code,
            strings,
            symbols,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ImageError> {
        Ok(postcard::to_allocvec(self)?)
    }

    /// Decodes and verifies an image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        let mut image: Image = postcard::from_bytes(bytes)?;
        if image.magic != IMAGE_MAGIC {
            return Err(ImageError::BadMagic(image.magic));
        }
        verify(&image.code)?;
        image.strings.reindex();
        Ok(image)
    }

    pub fn save(&self, path: &Path) -> Result<(), ImageError> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ImageError> {
        Self::from_bytes(&fs::read(path)?)
    }
}

impl From<Generated> for Image {
    fn from(generated: Generated) -> Self {
        Image::new(generated.code, generated.strings, generated.symbols)
    }
}
