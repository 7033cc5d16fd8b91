use crate::storage::StorageError;

use std::string::FromUtf8Error;

use http::header::InvalidHeaderValue;

pub type Result<T = (), E = Error> = std::result::Result<T, E>;

/// Errors surfaced at the request boundary.
///
/// The [`Display`](std::fmt::Display) output is sent verbatim as the body of a `500` response.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A listing or presign call to the storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Presigning an object link failed while rendering a listing.
    #[error("error getting presigned link for {key}: {source}")]
    Link {
        key: String,
        #[source]
        source: StorageError,
    },

    /// A presigned URL cannot be used as a `Location` header.
    #[error("invalid redirect location: {0}")]
    Location(#[from] InvalidHeaderValue),

    /// An object's modification time cannot be formatted.
    #[error("invalid timestamp: {0}")]
    Timestamp(#[from] time::error::Format),

    /// The percent-decoded request path is not valid UTF-8.
    #[error("invalid request path: {0}")]
    InvalidPath(#[from] FromUtf8Error),
}
