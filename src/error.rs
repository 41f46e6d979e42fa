use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("read datagram: {0}")]
    Io(#[source] io::Error),
    #[error("bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("out-of-band message {got:02x?} (awaited {awaited:02x?})")]
    OutOfBand { got: [u8; 8], awaited: [u8; 8] },
    #[error("out-of-band message (not chunked)")]
    NotChunked,
    #[error("invalid chunk: {0}")]
    InvalidChunk(&'static str),
    #[error("incomplete message: received {received} of {total} chunks")]
    Incomplete { received: usize, total: usize },
    #[error("decompress: {0}")]
    Decompress(#[source] io::Error),
    #[error("decompressed message exceeds {limit} bytes")]
    MessageTooLarge { limit: usize },
    #[error("decode json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("field {field:?} must be a {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },
}

impl Error {
    /// Whether the error came from the underlying transport rather than
    /// from the content of a datagram.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Bind { .. })
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(err) => err,
            Error::Bind { source, .. } => source,
            err => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}
