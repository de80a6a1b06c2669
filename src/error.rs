// Error types surfaced by the library. Network and service failures are
// not errors here: `api::bitlyfy` turns those into printable strings.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("could not determine the home directory")]
    HomeDirUnavailable,

    /// No explicit token and no usable netrc entry.
    #[error("Access token not found: {}", path.display())]
    AccessTokenNotFound { path: PathBuf },

    #[error("failed to parse {}: {source}", path.display())]
    Netrc {
        path: PathBuf,
        #[source]
        source: crate::netrc::ParseError,
    },

    #[error("Bitly request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected Bitly response: {0}")]
    MalformedResponse(String),
}

impl Error {
    /// Configuration problems are reported before any request is made.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::HomeDirUnavailable | Error::AccessTokenNotFound { .. } | Error::Netrc { .. }
        )
    }
}
