//! Error types for demo parsing

use thiserror::Error;

/// Demo parse result type
pub type DemoResult<T> = Result<T, DemoError>;

/// Errors raised while decoding a TVD demo file
#[derive(Debug, Error)]
pub enum DemoError {
    /// File does not start with the TVD1 tag or is shorter than the fixed
    /// header
    #[error("not a TVD demo file")]
    InvalidMagic,

    /// I/O error reading the demo file
    #[error("read demo: {0}")]
    Io(#[from] std::io::Error),
}
