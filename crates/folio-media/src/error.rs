use std::path::PathBuf;

use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("malformed data URI: {0}")]
    MalformedDataUri(String),

    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("invalid blob name {0:?}")]
    InvalidName(String),

    #[error("URL {0:?} is not served by this blob store")]
    ForeignUrl(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
