//! Registration and inbound translation, free of I/O.

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    fez_channels::{Signal, Source},
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, info, trace, warn},
};

use crate::{IrcConfig, Message};

/// AUTHENTICATE payloads are split into chunks of this many bytes.
const SASL_CHUNK: usize = 400;

const JOIN_FAILURES: &[&str] = &["471", "473", "474", "475", "477"];
const SASL_FAILURES: &[&str] = &["902", "904", "905", "906"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaslStep {
    Off,
    CapRequested,
    MechanismSent,
    PayloadSent,
    Done,
}

/// Outcome of one inbound message.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Inbound {
    pub signal: Option<Signal>,
    pub replies: Vec<Message>,
}

impl Inbound {
    fn signal(signal: Signal) -> Self {
        Self {
            signal: Some(signal),
            replies: Vec::new(),
        }
    }

    fn reply(msg: Message) -> Self {
        Self {
            signal: None,
            replies: vec![msg],
        }
    }
}

/// Connection-level protocol state: the SASL exchange and the mapping of
/// server lines to [`Signal`]s.
pub(crate) struct Protocol {
    username: String,
    realname: String,
    password: Secret<String>,
    sasl: SaslStep,
}

impl Protocol {
    pub fn new(config: &IrcConfig) -> Self {
        Self {
            username: config.username.clone(),
            realname: config.realname.clone(),
            password: config.password.clone(),
            sasl: if config.sasl {
                SaslStep::CapRequested
            } else {
                SaslStep::Off
            },
        }
    }

    /// Lines sent right after the socket opens.
    pub fn registration(&self) -> Vec<Message> {
        let mut lines = Vec::with_capacity(3);
        if self.sasl == SaslStep::Off {
            lines.push(Message::pass(self.password.expose_secret()));
        } else {
            lines.push(Message::new("CAP", ["REQ", "sasl"]));
        }
        lines.push(Message::nick(&self.username));
        lines.push(Message::user(&self.username, &self.realname));
        lines
    }

    pub fn on_message(&mut self, msg: &Message) -> Inbound {
        match msg.command.as_str() {
            "PING" => Inbound::signal(Signal::Ping {
                token: msg.trailing().unwrap_or_default().to_string(),
            }),
            "001" => Inbound::signal(Signal::Welcome {
                nick: msg.param(0).unwrap_or_default().to_string(),
            }),
            "433" => Inbound::signal(Signal::NicknameInUse {
                nick: msg.param(1).unwrap_or_default().to_string(),
            }),
            "JOIN" => match (&msg.prefix, msg.param(0)) {
                (Some(prefix), Some(channel)) => Inbound::signal(Signal::Join {
                    channel: channel.to_string(),
                    source: Source::new(prefix.nick(), prefix.mask()),
                }),
                _ => Inbound::default(),
            },
            "PRIVMSG" => match (&msg.prefix, msg.param(0), msg.param(1)) {
                (Some(prefix), Some(target), Some(text)) => Inbound::signal(Signal::Message {
                    target: target.to_string(),
                    source: Source::new(prefix.nick(), prefix.mask()),
                    text: text.to_string(),
                }),
                _ => Inbound::default(),
            },
            "ERROR" => Inbound::signal(Signal::Disconnect {
                reason: msg.trailing().unwrap_or("server closed the link").to_string(),
            }),
            "464" | "465" => Inbound::signal(Signal::AuthRejected {
                reason: describe(msg),
            }),
            "CAP" => self.on_cap(msg),
            "AUTHENTICATE" => self.on_authenticate(msg),
            "900" => {
                info!(account = msg.param(2).unwrap_or_default(), "logged in");
                Inbound::default()
            },
            "903" => {
                info!("SASL authentication succeeded");
                self.sasl = SaslStep::Done;
                Inbound::reply(Message::new("CAP", ["END"]))
            },
            code if SASL_FAILURES.contains(&code) => {
                self.sasl = SaslStep::Done;
                Inbound::signal(Signal::AuthRejected {
                    reason: describe(msg),
                })
            },
            code if JOIN_FAILURES.contains(&code) => Inbound::signal(Signal::JoinRejected {
                channel: msg.param(1).unwrap_or_default().to_string(),
                reason: describe(msg),
            }),
            _ if msg.is_numeric() => {
                debug!(numeric = %msg.command, text = msg.trailing().unwrap_or_default(), "server reply");
                Inbound::default()
            },
            _ => {
                trace!(command = %msg.command, "ignored");
                Inbound::default()
            },
        }
    }

    fn on_cap(&mut self, msg: &Message) -> Inbound {
        let sub = msg.param(1).unwrap_or_default();
        let caps = msg.trailing().unwrap_or_default();
        let mentions_sasl = caps.split_whitespace().any(|cap| cap == "sasl");
        match (sub, self.sasl) {
            ("ACK", SaslStep::CapRequested) if mentions_sasl => {
                debug!("sasl capability acknowledged");
                self.sasl = SaslStep::MechanismSent;
                Inbound::reply(Message::new("AUTHENTICATE", ["PLAIN"]))
            },
            ("NAK", SaslStep::CapRequested) if mentions_sasl => {
                warn!("server refused the sasl capability");
                self.sasl = SaslStep::Done;
                Inbound::signal(Signal::AuthRejected {
                    reason: "server does not support SASL".into(),
                })
            },
            _ => Inbound::default(),
        }
    }

    fn on_authenticate(&mut self, msg: &Message) -> Inbound {
        if self.sasl != SaslStep::MechanismSent || msg.param(0) != Some("+") {
            return Inbound::default();
        }
        self.sasl = SaslStep::PayloadSent;
        let payload = format!(
            "{user}\0{user}\0{pass}",
            user = self.username,
            pass = self.password.expose_secret()
        );
        Inbound {
            signal: None,
            replies: authenticate_chunks(&STANDARD.encode(payload)),
        }
    }
}

fn authenticate_chunks(encoded: &str) -> Vec<Message> {
    let mut replies: Vec<Message> = encoded
        .as_bytes()
        .chunks(SASL_CHUNK)
        .map(|chunk| Message::new("AUTHENTICATE", [String::from_utf8_lossy(chunk)]))
        .collect();
    if encoded.is_empty() || encoded.len() % SASL_CHUNK == 0 {
        replies.push(Message::new("AUTHENTICATE", ["+"]));
    }
    replies
}

fn describe(msg: &Message) -> String {
    format!("{} {}", msg.command, msg.trailing().unwrap_or_default())
}
