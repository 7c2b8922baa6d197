use std::io;

/// Everything that can go wrong while working with TGX streams, GM1
/// archives or pixel buffers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying byte source failed.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A parser reached the end of its declared segment prematurely.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// A token with an invalid length or kind, or a payload exceeding the
    /// row width.
    #[error("malformed stream: {0}")]
    MalformedStream(&'static str),

    /// The data does not describe what the header promised.
    #[error("format mismatch: {0}")]
    FormatMismatch(String),

    /// Entry or palette index past the end of the archive.
    #[error("index out of range: {index} >= {count}")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Pixel memory could not be allocated.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn format_mismatch(msg: impl Into<String>) -> Self {
        Error::FormatMismatch(msg.into())
    }
}
