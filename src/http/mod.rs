//! HTTP/1.1 chunked-transfer coding.
//!
//! Only the chunked-transfer decoding needed to read WARC record bodies
//! encoded as `application/http` is implemented here. Full HTTP/1.1 request
//! and response message semantics are out of scope.
pub mod chunked;
mod pc;

use thiserror::Error;

/// Errors while decoding chunked-transfer coded data.
#[derive(Error, Debug)]
pub enum HTTPError {
    /// Unexpected end of data.
    #[error("unexpected end of data")]
    UnexpectedEnd,

    /// Chunk size line or trailer could not be parsed.
    #[error("invalid chunked encoding")]
    InvalidEncoding {
        /// Source of the error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
