//! Error types for MD3 parsing

use crate::cursor::OutOfBounds;
use thiserror::Error;

/// MD3 parse result type
pub type Md3Result<T> = Result<T, Md3Error>;

/// Structural errors raised while decoding an MD3 model
#[derive(Debug, Error)]
pub enum Md3Error {
    /// File does not start with the IDP3 tag
    #[error("invalid MD3 magic: {0:?}")]
    InvalidMagic([u8; 4]),

    /// Header carries an unsupported format version
    #[error("unsupported MD3 version: {0}")]
    UnsupportedVersion(u32),

    /// A surface record does not start with the IDP3 tag
    #[error("invalid MD3 surface magic at offset {0}")]
    InvalidSurfaceMagic(usize),

    /// Input ends before a declared header field
    #[error("truncated MD3: {0}")]
    Truncated(#[from] OutOfBounds),
}
