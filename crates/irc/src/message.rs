//! IRC message grammar: `[@tags] [:prefix] COMMAND [params] [:trailing]`.

use std::{fmt, str::FromStr};

use fez_channels::{Error, Result};

/// Message source as sent by the server (`nick!user@host` or a server name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    raw: String,
}

impl Prefix {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The nickname part, or the whole prefix for server sources.
    #[must_use]
    pub fn nick(&self) -> &str {
        let end = self.raw.find(['!', '@']).unwrap_or(self.raw.len());
        &self.raw[..end]
    }

    /// The full `nick!user@host` mask.
    #[must_use]
    pub fn mask(&self) -> &str {
        &self.raw
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// IRCv3 message tags, values unescaped.
    pub tags: Vec<(String, Option<String>)>,
    pub prefix: Option<Prefix>,
    /// Command verb, upper-cased, or a three-digit numeric.
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    pub fn new<I, P>(command: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            tags: Vec::new(),
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    pub fn parse(line: &str) -> Result<Self> {
        line.parse()
    }

    #[must_use]
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Last parameter, usually the human-readable text.
    #[must_use]
    pub fn trailing(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }

    pub fn nick(nick: &str) -> Self {
        Self::new("NICK", [nick])
    }

    pub fn user(username: &str, realname: &str) -> Self {
        Self::new("USER", [username, "0", "*", realname])
    }

    pub fn pass(password: &str) -> Self {
        Self::new("PASS", [password])
    }

    pub fn join(channel: &str) -> Self {
        Self::new("JOIN", [channel])
    }

    pub fn privmsg(target: &str, text: &str) -> Self {
        Self::new("PRIVMSG", [target, text])
    }

    pub fn pong(token: &str) -> Self {
        Self::new("PONG", [token])
    }

    pub fn quit(reason: &str) -> Self {
        Self::new("QUIT", [reason])
    }
}

impl FromStr for Message {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let mut tags = Vec::new();
        if let Some(tagged) = rest.strip_prefix('@') {
            let (raw_tags, remainder) = tagged
                .split_once(' ')
                .ok_or_else(|| Error::protocol(format!("tags without command: {line}")))?;
            tags = raw_tags
                .split(';')
                .filter(|tag| !tag.is_empty())
                .map(|tag| match tag.split_once('=') {
                    Some((key, value)) => (key.to_string(), Some(unescape_tag(value))),
                    None => (tag.to_string(), None),
                })
                .collect();
            rest = remainder.trim_start_matches(' ');
        }

        let mut prefix = None;
        if let Some(sourced) = rest.strip_prefix(':') {
            let (raw_prefix, remainder) = sourced
                .split_once(' ')
                .ok_or_else(|| Error::protocol(format!("prefix without command: {line}")))?;
            prefix = Some(Prefix::new(raw_prefix));
            rest = remainder.trim_start_matches(' ');
        }

        let (command, mut rest) = match rest.split_once(' ') {
            Some((command, remainder)) => (command, remainder),
            None => (rest, ""),
        };
        if command.is_empty() {
            return Err(Error::protocol(format!("missing command: {line}")));
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, remainder)) => {
                    params.push(param.to_string());
                    rest = remainder;
                },
                None => {
                    params.push(rest.to_string());
                    break;
                },
            }
        }

        Ok(Self {
            tags,
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }
}

/// Wire form without tags; the client never sends any.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix.mask())?;
        }
        f.write_str(&self.command)?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            let needs_colon =
                i == last && (param.is_empty() || param.contains(' ') || param.starts_with(':'));
            if needs_colon {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}

fn unescape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {},
        }
    }
    out
}
