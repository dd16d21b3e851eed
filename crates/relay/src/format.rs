//! Rendering of events into single IRC lines.

use fez_feed::{Event, EventKind};

/// Formatted messages at or above this many UTF-8 bytes are dropped.
pub const MAX_MESSAGE_BYTES: usize = 512;

/// Zero-width non-joiner placed around the actor so the name can never be
/// read as part of the colour code before it.
pub const ZWNJ: char = '\u{200C}';

const COLOR: char = '\x03';

/// mIRC colours used by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    LightRed,
    Green,
    Orange,
    Cyan,
    Pink,
    Grey,
}

impl Color {
    fn code(self) -> &'static str {
        match self {
            Self::LightRed => "04",
            Self::Green => "03",
            Self::Orange => "07",
            Self::Cyan => "10",
            Self::Pink => "13",
            Self::Grey => "14",
        }
    }
}

/// Wrap `text` in a colour, with optional padding inside the colour span.
///
/// Text starting with a digit or a comma is padded with [`ZWNJ`] even when
/// no padding is asked for, so it cannot extend the colour code.
#[must_use]
pub fn colored(text: &str, color: Color, padding: Option<char>) -> String {
    let padding = padding.or_else(|| {
        text.starts_with(|c: char| c.is_ascii_digit() || c == ',')
            .then_some(ZWNJ)
    });
    let mut out = String::with_capacity(text.len() + 8);
    out.push(COLOR);
    out.push_str(color.code());
    out.extend(padding);
    out.push_str(text);
    out.extend(padding);
    out.push(COLOR);
    out
}

/// Replace CR, LF and NUL with spaces.
#[must_use]
pub fn single_line(text: &str) -> String {
    text.replace(['\r', '\n', '\0'], " ")
}

pub fn diff_link(server_name: &str, revision_new_id: u64) -> String {
    format!("https://{server_name}/w/index.php?diff={revision_new_id}")
}

pub fn log_link(server_name: &str, log_id: u64) -> String {
    format!("https://{server_name}/w/index.php?title=Special:Log&logid={log_id}")
}

/// Render `event` as one coloured line.
///
/// Edits: `<actor> edited [[<title>]]: <summary> <diff link>`.
/// Log actions: `<actor> <first word of summary> <log link>`.
#[must_use]
pub fn format_event(event: &Event) -> String {
    let actor = colored(&single_line(&event.actor), Color::Green, Some(ZWNJ));
    let summary = single_line(&event.summary_text);

    match event.kind {
        EventKind::LogAction { log_id } => {
            let link = log_link(&event.server_name, log_id);
            match summary.split_whitespace().next() {
                Some(verb) => format!("{actor} {verb} {link}"),
                None => format!("{actor} {link}"),
            }
        },
        EventKind::Edit { revision_new_id } => {
            let title = single_line(&event.title);
            let mut line = format!(
                "{actor} edited {}{}{} ",
                colored("[[", Color::Grey, None),
                colored(title.trim(), Color::Orange, None),
                colored("]]:", Color::Grey, None),
            );
            if !summary.is_empty() {
                line.push_str(&colored(&summary, Color::Cyan, None));
                line.push(' ');
            }
            line.push_str(&diff_link(&event.server_name, revision_new_id));
            line
        },
    }
}

/// Remove colour codes, other mIRC formatting bytes, and the padding
/// character, leaving the plain text.
#[must_use]
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            COLOR => {
                let mut digits = 0;
                while digits < 2 && chars.peek().is_some_and(char::is_ascii_digit) {
                    chars.next();
                    digits += 1;
                }
                if digits > 0 && chars.peek() == Some(&',') {
                    let mut lookahead = chars.clone();
                    lookahead.next();
                    if lookahead.peek().is_some_and(char::is_ascii_digit) {
                        chars.next();
                        let mut bg = 0;
                        while bg < 2 && chars.peek().is_some_and(char::is_ascii_digit) {
                            chars.next();
                            bg += 1;
                        }
                    }
                }
            },
            '\x02' | '\x0F' | '\x11' | '\x16' | '\x1D' | '\x1E' | '\x1F' | ZWNJ => {},
            other => out.push(other),
        }
    }
    out
}
