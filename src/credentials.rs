// Access token resolution: an explicit token wins, otherwise the password of
// the Bitly machine entry in `<home>/.netrc` is used.

use crate::error::{Error, Result};
use crate::netrc::{Netrc, ParseError};
use log::debug;
use std::path::{Path, PathBuf};

/// Name of the credential-store file inside the home directory.
pub const ACCESS_TOKEN_FILE: &str = ".netrc";

pub fn token_file(home_dir: &Path) -> PathBuf {
    home_dir.join(ACCESS_TOKEN_FILE)
}

/// Resolve the access token for `host`.
///
/// When `explicit_token` is given the credential store is never opened and
/// `home_dir` is not needed.
pub fn resolve(explicit_token: Option<&str>, home_dir: Option<&Path>, host: &str) -> Result<String> {
    if let Some(token) = explicit_token {
        debug!("using access token from the command line");
        return Ok(token.to_owned());
    }

    let home_dir = home_dir.ok_or(Error::HomeDirUnavailable)?;
    let path = token_file(home_dir);
    debug!("looking up machine {} in {}", host, path.display());

    let netrc = match Netrc::from_file(&path) {
        Ok(netrc) => netrc,
        Err(ParseError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::AccessTokenNotFound { path });
        }
        Err(source) => return Err(Error::Netrc { path, source }),
    };

    netrc
        .authenticators(host)
        .and_then(|entry| entry.password.clone())
        .ok_or(Error::AccessTokenNotFound { path })
}
