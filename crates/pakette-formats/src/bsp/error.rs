//! Error types for BSP parsing

use crate::cursor::OutOfBounds;
use thiserror::Error;

/// BSP parse result type
pub type BspResult<T> = Result<T, BspError>;

/// Structural errors raised while decoding a BSP file
#[derive(Debug, Error)]
pub enum BspError {
    /// File does not start with the IBSP tag
    #[error("invalid BSP magic: {0:?}")]
    InvalidMagic([u8; 4]),

    /// Header carries an unsupported format version
    #[error("unsupported BSP version: {0}")]
    UnsupportedVersion(u32),

    /// Input ends before a declared lump or header field
    #[error("truncated BSP: {0}")]
    Truncated(#[from] OutOfBounds),
}
