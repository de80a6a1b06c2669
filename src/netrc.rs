// Reader for the netrc credential-store format.
//
// A netrc file is a whitespace separated stream of tokens:
//
//     machine api-ssl.bitly.com login me password s3cr3t
//     default login anonymous password guest
//
// Tokens may be double-quoted (with backslash escapes), `#` starts a comment
// that runs to the end of the line, and `macdef NAME` introduces a macro whose
// body runs until the next blank line.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// Credentials for one `machine` (or the `default`) entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    pub login: Option<String>,
    pub account: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default)]
pub struct Netrc {
    machines: HashMap<String, Entry>,
    default: Option<Entry>,
}

impl Netrc {
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        let content = fs::read_to_string(path)?;
        content.parse()
    }

    /// Entry for `host`, falling back to the `default` entry.
    pub fn authenticators(&self, host: &str) -> Option<&Entry> {
        self.machines.get(host).or(self.default.as_ref())
    }
}

impl std::str::FromStr for Netrc {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lexer = Lexer::new(s);
        let mut netrc = Netrc::default();

        while let Some(token) = lexer.next_token()? {
            match token.as_str() {
                "machine" => {
                    let name = lexer.expect_value("machine")?;
                    let entry = parse_entry(&mut lexer)?;
                    // later entries for the same machine win
                    netrc.machines.insert(name, entry);
                }
                "default" => {
                    let entry = parse_entry(&mut lexer)?;
                    netrc.default = Some(entry);
                }
                "macdef" => {
                    // macros are ftp client scripts, of no use for a token lookup
                    lexer.expect_value("macdef")?;
                    lexer.skip_macro_body();
                }
                other => {
                    return Err(lexer.error(format!("bad toplevel token '{}'", other)));
                }
            }
        }

        Ok(netrc)
    }
}

fn parse_entry(lexer: &mut Lexer<'_>) -> Result<Entry, ParseError> {
    let mut entry = Entry::default();
    loop {
        match lexer.peek_token()?.as_deref() {
            None | Some("machine") | Some("default") | Some("macdef") => return Ok(entry),
            Some(_) => {}
        }
        let Some(key) = lexer.next_token()? else {
            return Ok(entry);
        };
        match key.as_str() {
            "login" | "user" => entry.login = Some(lexer.expect_value(&key)?),
            "account" => entry.account = Some(lexer.expect_value(&key)?),
            "password" => entry.password = Some(lexer.expect_value(&key)?),
            other => return Err(lexer.error(format!("bad follower token '{}'", other))),
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer { input, pos: 0, line: 1 }
    }

    fn error(&self, message: String) -> ParseError {
        ParseError::Syntax {
            line: self.line,
            message,
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.rest().chars().next() {
            if c.is_whitespace() {
                self.bump();
            } else if c == '#' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<String>, ParseError> {
        self.skip_trivia();
        let Some(first) = self.rest().chars().next() else {
            return Ok(None);
        };

        let mut token = String::new();
        if first == '"' {
            self.bump();
            loop {
                match self.bump() {
                    Some('"') => break,
                    Some('\\') => match self.bump() {
                        Some(c) => token.push(c),
                        None => return Err(self.error("unterminated quoted token".into())),
                    },
                    Some(c) => token.push(c),
                    None => return Err(self.error("unterminated quoted token".into())),
                }
            }
        } else {
            while let Some(c) = self.rest().chars().next() {
                if c.is_whitespace() {
                    break;
                }
                self.bump();
                if c == '\\' {
                    if let Some(escaped) = self.bump() {
                        token.push(escaped);
                    }
                } else {
                    token.push(c);
                }
            }
        }
        Ok(Some(token))
    }

    fn peek_token(&mut self) -> Result<Option<String>, ParseError> {
        let (pos, line) = (self.pos, self.line);
        let token = self.next_token();
        self.pos = pos;
        self.line = line;
        token
    }

    fn expect_value(&mut self, keyword: &str) -> Result<String, ParseError> {
        self.next_token()?
            .ok_or_else(|| self.error(format!("missing value after '{}'", keyword)))
    }

    /// Consumes the rest of the `macdef` line, then every line up to a blank one.
    fn skip_macro_body(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
        while !self.rest().is_empty() {
            let end = self.rest().find('\n').map_or(self.rest().len(), |i| i + 1);
            let raw = &self.rest()[..end];
            self.pos += end;
            if raw.ends_with('\n') {
                self.line += 1;
            }
            if raw.trim().is_empty() {
                break;
            }
        }
    }
}
