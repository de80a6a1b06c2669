// Bitly API client: a small blocking HTTP client that turns one URL into its
// shortened or expanded counterpart with a single GET request.

use crate::credentials;
use crate::error::{Error, Result};
use log::{debug, info};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::path::PathBuf;

pub const API: &str = "https://api-ssl.bitly.com";
pub const HOST: &str = "api-ssl.bitly.com";

/// Printed instead of failing when the service cannot be reached.
pub const NETWORK_FAILURE: &str = "Failed to establish network connection";

/// Bytes left as-is when encoding the target URL: the unreserved characters
/// plus `:` and `/`.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b':')
    .remove(b'/');

/// Endpoint and field names used by one mode of operation.
#[derive(Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub path: &'static str,
    /// Query parameter carrying the URL we send.
    pub request_field: &'static str,
    /// Field of the response record holding the URL we get back.
    pub response_field: &'static str,
}

const SHORTEN: Endpoint = Endpoint {
    path: "/v3/shorten",
    request_field: "longUrl",
    response_field: "url",
};

const EXPAND: Endpoint = Endpoint {
    path: "/v3/expand",
    request_field: "shortUrl",
    response_field: "long_url",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Shorten,
    Expand,
}

impl Mode {
    pub fn endpoint(self) -> &'static Endpoint {
        match self {
            Mode::Shorten => &SHORTEN,
            Mode::Expand => &EXPAND,
        }
    }
}

/// Everything needed to issue the GET: target and ordered query parameters.
#[derive(Debug, PartialEq, Eq)]
pub struct BitlyRequest {
    pub query: String,
    pub params: Vec<(&'static str, String)>,
}

/// Response envelope shared by every Bitly v3 endpoint. `data` is `null` or
/// `[]` on error responses, so it is only decoded once the status is known.
#[derive(Deserialize, Debug)]
struct Envelope {
    status_code: i64,
    #[serde(default)]
    status_txt: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize, Debug)]
struct ShortenData {
    url: String,
}

#[derive(Deserialize, Debug)]
struct ExpandData {
    expand: Vec<ExpandRecord>,
}

#[derive(Deserialize, Debug)]
struct ExpandRecord {
    long_url: String,
}

/// Percent-encode `url`, leaving `:` and `/` untouched.
pub fn percent_encode(url: &str) -> String {
    utf8_percent_encode(url, URL_SAFE).to_string()
}

/// Build the query and parameters for `url` in the given mode.
pub fn build_request(base_url: &str, url: &str, mode: Mode, access_token: &str) -> BitlyRequest {
    let endpoint = mode.endpoint();
    BitlyRequest {
        query: format!("{}{}", base_url, endpoint.path),
        params: vec![
            ("access_token", access_token.to_owned()),
            (endpoint.request_field, percent_encode(url)),
            // JSON is the default response format, but ask for it anyway
            ("format", "json".to_owned()),
        ],
    }
}

/// Extract the resulting URL from a response body.
///
/// A non-200 `status_code` is reported as a string, not an error. Bodies that
/// do not have the documented shape are errors.
pub fn unpack(body: &str, mode: Mode) -> Result<String> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|e| Error::MalformedResponse(format!("invalid envelope: {}", e)))?;

    if envelope.status_code != 200 {
        return Ok(format!("Bitly query error: {}", envelope.status_txt));
    }

    let malformed = |e: serde_json::Error| {
        Error::MalformedResponse(format!(
            "missing '{}' in data: {}",
            mode.endpoint().response_field,
            e
        ))
    };
    match mode {
        Mode::Shorten => {
            let data: ShortenData = serde_json::from_value(envelope.data).map_err(malformed)?;
            Ok(data.url)
        }
        Mode::Expand => {
            let data: ExpandData = serde_json::from_value(envelope.data).map_err(malformed)?;
            data.expand
                .into_iter()
                .next()
                .map(|record| record.long_url)
                .ok_or_else(|| Error::MalformedResponse("empty 'expand' list".into()))
        }
    }
}

/// Whether `e` happened on the wire: refused or reset connections, TLS
/// handshakes, timeouts and peers hanging up before the body is complete.
/// Request building, redirect, decode and status errors are not.
fn is_network_failure(e: &reqwest::Error) -> bool {
    if e.is_builder() || e.is_redirect() || e.is_status() {
        return false;
    }
    e.is_connect() || e.is_timeout() || e.is_request() || e.is_body()
}

/// Inputs of one invocation. `home_dir` is only read when no access token is
/// given.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub url: String,
    pub mode: Mode,
    pub access_token: Option<String>,
    pub home_dir: Option<PathBuf>,
}

/// Blocking client holding the reqwest client and the API origin.
#[derive(Clone)]
pub struct BitlyClient {
    client: Client,
    base_url: String,
}

impl BitlyClient {
    /// Client for the public Bitly API.
    pub fn new() -> Result<Self> {
        Self::with_base_url(API)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(BitlyClient {
            client,
            base_url: base_url.into(),
        })
    }

    /// Send the GET and return the raw body.
    pub fn execute(&self, request: &BitlyRequest) -> reqwest::Result<String> {
        debug!("GET {}", request.query);
        let res = self
            .client
            .get(&request.query)
            .query(&request.params)
            .send()?;
        debug!("response status {}", res.status());
        res.text()
    }

    /// Shorten or expand `settings.url`.
    ///
    /// Connection-level failures yield [`NETWORK_FAILURE`]; everything else
    /// that goes wrong is returned as an error.
    pub fn bitlyfy(&self, settings: &Settings) -> Result<String> {
        let token = credentials::resolve(
            settings.access_token.as_deref(),
            settings.home_dir.as_deref(),
            HOST,
        )?;

        let request = build_request(&self.base_url, &settings.url, settings.mode, &token);
        let body = match self.execute(&request) {
            Ok(body) => body,
            Err(e) if is_network_failure(&e) => {
                info!("network failure: {}", e);
                return Ok(NETWORK_FAILURE.to_owned());
            }
            Err(e) => return Err(e.into()),
        };
        unpack(&body, settings.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_keeps_colon_and_slash() {
        assert_eq!(
            percent_encode("http://example.com/a b?c=d#e"),
            "http://example.com/a%20b%3Fc%3Dd%23e"
        );
        assert_eq!(percent_encode("https://x.io/~me/a_b-c.d"), "https://x.io/~me/a_b-c.d");
        assert_eq!(percent_encode("http://例.jp/"), "http://%E4%BE%8B.jp/");
    }

    #[test]
    fn modes_use_matching_field_pairs() {
        assert_eq!(Mode::Shorten.endpoint().path, "/v3/shorten");
        assert_eq!(Mode::Shorten.endpoint().request_field, "longUrl");
        assert_eq!(Mode::Expand.endpoint().path, "/v3/expand");
        assert_eq!(Mode::Expand.endpoint().request_field, "shortUrl");
        assert_eq!(Mode::default(), Mode::Shorten);
    }

    #[test]
    fn shorten_request() {
        let req = build_request(API, "http://example.com/a b", Mode::Shorten, "tok");
        assert_eq!(req.query, "https://api-ssl.bitly.com/v3/shorten");
        assert_eq!(
            req.params,
            vec![
                ("access_token", "tok".to_owned()),
                ("longUrl", "http://example.com/a%20b".to_owned()),
                ("format", "json".to_owned()),
            ]
        );
    }

    #[test]
    fn expand_request() {
        let req = build_request(API, "http://bit.ly/xyz", Mode::Expand, "tok");
        assert_eq!(req.query, "https://api-ssl.bitly.com/v3/expand");
        assert_eq!(req.params[1], ("shortUrl", "http://bit.ly/xyz".to_owned()));
    }

    #[test]
    fn unpack_shorten() {
        let body = r#"{"status_code":200,"status_txt":"OK","data":{"url":"http://bit.ly/xyz"}}"#;
        assert_eq!(unpack(body, Mode::Shorten).unwrap(), "http://bit.ly/xyz");
    }

    #[test]
    fn unpack_expand() {
        let body = r#"{"status_code":200,"status_txt":"OK","data":{"expand":[{"long_url":"http://example.com/page"}]}}"#;
        assert_eq!(unpack(body, Mode::Expand).unwrap(), "http://example.com/page");
    }

    #[test]
    fn unpack_service_error() {
        let body = r#"{"status_code":500,"status_txt":"RATE_LIMITED","data":null}"#;
        for mode in [Mode::Shorten, Mode::Expand] {
            assert_eq!(unpack(body, mode).unwrap(), "Bitly query error: RATE_LIMITED");
        }
        let no_data = r#"{"status_code":500,"status_txt":"RATE_LIMITED"}"#;
        assert_eq!(
            unpack(no_data, Mode::Shorten).unwrap(),
            "Bitly query error: RATE_LIMITED"
        );
    }

    #[test]
    fn unpack_success_without_status_text() {
        let body = r#"{"status_code":200,"data":{"url":"http://bit.ly/x"}}"#;
        assert_eq!(unpack(body, Mode::Shorten).unwrap(), "http://bit.ly/x");
    }

    #[test]
    fn unpack_malformed() {
        let missing_url = r#"{"status_code":200,"status_txt":"OK","data":{}}"#;
        assert!(matches!(
            unpack(missing_url, Mode::Shorten),
            Err(Error::MalformedResponse(_))
        ));
        let empty_expand = r#"{"status_code":200,"status_txt":"OK","data":{"expand":[]}}"#;
        assert!(matches!(
            unpack(empty_expand, Mode::Expand),
            Err(Error::MalformedResponse(_))
        ));
        assert!(matches!(
            unpack("<html>", Mode::Shorten),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn explicit_token_needs_no_home_dir() {
        // nothing listens on port 1, so this never reaches unpack
        let client = BitlyClient::with_base_url("http://127.0.0.1:1").unwrap();
        let settings = Settings {
            url: "http://example.com".into(),
            mode: Mode::Shorten,
            access_token: Some("tok".into()),
            home_dir: None,
        };
        assert_eq!(client.bitlyfy(&settings).unwrap(), NETWORK_FAILURE);
    }

    #[test]
    fn missing_home_dir_is_a_configuration_error() {
        let client = BitlyClient::new().unwrap();
        let settings = Settings {
            url: "http://example.com".into(),
            ..Default::default()
        };
        let err = client.bitlyfy(&settings).unwrap_err();
        assert!(matches!(err, Error::HomeDirUnavailable));
    }
}
