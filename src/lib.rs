// Library root
// -----------
// `bitlyfy` shortens or expands a URL with one request to the Bitly API.
//
// Module responsibilities:
// - `api`: request construction, the blocking HTTP call and response
//   unpacking for both modes.
// - `credentials` / `netrc`: access token lookup in `$HOME/.netrc`.
// - `cli`: argument parsing and logging for the binary.
// - `error`: the typed error returned across the library.
pub mod api;
pub mod cli;
pub mod credentials;
pub mod error;
pub mod netrc;

pub use api::{BitlyClient, Mode, Settings};
pub use error::{Error, Result};
