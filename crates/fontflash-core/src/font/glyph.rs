//! Glyph record and converter errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FontError {
    #[error("Glyph '{glyph}' has {actual} bytes, expected {expected}")]
    GlyphSizeMismatch {
        glyph: char,
        actual: usize,
        expected: usize,
    },
    #[error("Glyph '{glyph}' has index {value}, which does not fit in 16 bits")]
    IndexOutOfRange { glyph: char, value: String },
    #[error("Glyph '{glyph}' (U+{code_point:04X}) does not fit the 16-bit index table")]
    CodePointOutOfRange { glyph: char, code_point: u32 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to format index header")]
    Format(#[from] std::fmt::Error),
}

/// One fixed-size bitmap, keyed by its character and sequential index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub ch: char,
    pub index: u16,
    pub data: Vec<u8>,
}

impl Glyph {
    pub fn code_point(&self) -> u32 {
        self.ch as u32
    }

    /// Code point as stored in the firmware's `uint16_t` index table.
    pub fn code_point_u16(&self) -> Result<u16, FontError> {
        u16::try_from(self.code_point()).map_err(|_| FontError::CodePointOutOfRange {
            glyph: self.ch,
            code_point: self.code_point(),
        })
    }
}
