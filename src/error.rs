// Error taxonomy shared by every API component. Anything the client can
// fail with is one of these variants; transport errors never leak raw.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AurError {
    /// Connection, TLS or decompression failure. Never retried.
    #[error("network error: {0}")]
    Network(String),

    /// Login rejected, or a supplied session could not be used.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Malformed envelope, or an error envelope that is not "no results".
    #[error("bad response from AUR: {0}")]
    BadResponse(String),

    #[error("cannot read tarball {}: {source}", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("failed to unpack {name}: {source}")]
    Extract {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AurError>;

impl From<reqwest::Error> for AurError {
    fn from(err: reqwest::Error) -> Self {
        AurError::Network(err.to_string())
    }
}
