use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while reading or writing VDK archives and
/// CT tables.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid archive header: {0}")]
    InvalidHeader(String),

    #[error("unknown archive version {0:?}")]
    UnknownFormat(String),

    #[error("stream ended while reading {0}")]
    Truncated(&'static str),

    #[error("not a CT table: unrecognized magic")]
    InvalidMagic,

    #[error("row {row}, column {column}: {value:?} is not a valid {type_name}")]
    InvalidCellValue {
        row: usize,
        column: usize,
        value: String,
        type_name: String,
    },

    #[error("name {0:?} cannot be encoded in code page 51949")]
    UnencodableName(String),

    #[error("checksum mismatch: stored {stored:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { stored: u16, computed: u16 },
}

impl Error {
    /// Maps an unexpected end of stream to [`Error::Truncated`] naming the
    /// structure that was being read; any other failure stays [`Error::Io`].
    pub(crate) fn at(what: &'static str) -> impl FnOnce(io::Error) -> Error {
        move |err| {
            if err.kind() == io::ErrorKind::UnexpectedEof {
                Error::Truncated(what)
            } else {
                Error::Io(err)
            }
        }
    }
}
