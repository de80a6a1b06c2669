// Command-line surface: argument parsing, logging setup and the single line
// of output.

use crate::api::{BitlyClient, Mode, Settings, HOST};
use crate::credentials::ACCESS_TOKEN_FILE;
use clap::Parser;
use log::LevelFilter;

const ABOUT: &str = "Shorten or expand URL via the Bitly API";

/// Shorten or expand URL via the Bitly API (dev.bitly.com)
#[derive(Parser, Debug)]
#[clap(name = "bitlyfy")]
#[clap(version, about = ABOUT)]
pub struct Cli {
    /// URL to shorten or expand (with -e)
    #[clap(value_name = "URL")]
    pub url: String,

    /// Bitly access token; if this option is omitted, the access token will be
    /// read from the machine entry "api-ssl.bitly.com" in the netrc file
    /// $HOME/.netrc
    #[clap(short = 'a', long = "access_token", value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Expand (short) URL to long URL
    #[clap(short, long)]
    pub expand: bool,

    /// Turn debugging information on
    #[clap(short, long, parse(from_occurrences))]
    pub verbose: usize,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        if self.expand {
            Mode::Expand
        } else {
            Mode::Shorten
        }
    }

    pub fn settings(&self) -> Settings {
        Settings {
            url: self.url.clone(),
            mode: self.mode(),
            access_token: self.access_token.clone(),
            home_dir: dirs::home_dir(),
        }
    }

    pub fn init_logging(&self) {
        let mut builder = env_logger::builder();
        builder.parse_default_env();
        builder.filter_level(match self.verbose {
            0 => LevelFilter::Off,
            1 => LevelFilter::Error,
            2 => LevelFilter::Warn,
            3 => LevelFilter::Info,
            4 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        });
        builder.init();
    }

    /// Resolve, request and unpack; returns the line to print.
    pub fn execute(&self) -> crate::Result<String> {
        log::debug!(
            "{:?} {} (token from {})",
            self.mode(),
            self.url,
            if self.access_token.is_some() {
                "command line".to_owned()
            } else {
                format!("machine {} in $HOME/{}", HOST, ACCESS_TOKEN_FILE)
            }
        );
        let client = BitlyClient::new()?;
        client.bitlyfy(&self.settings())
    }
}
