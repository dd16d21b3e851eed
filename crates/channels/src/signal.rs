/// Who sent an inbound message or joined a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub nick: String,
    /// Full mask as the server reports it (`nick!user@host` on IRC). Trust
    /// markers such as cloaks show up here.
    pub mask: String,
}

impl Source {
    pub fn new(nick: impl Into<String>, mask: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            mask: mask.into(),
        }
    }
}

/// Discriminant of [`Signal`], used as the handler table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Welcome,
    NicknameInUse,
    Join,
    Message,
    Ping,
    Disconnect,
    AuthRejected,
    JoinRejected,
}

/// An inbound protocol occurrence the relay reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Registration finished; the server greeted us under `nick`.
    Welcome { nick: String },
    /// The nickname we asked for is taken.
    NicknameInUse { nick: String },
    /// Someone (possibly us) joined `channel`.
    Join { channel: String, source: Source },
    /// A message to a channel or to us.
    Message {
        target: String,
        source: Source,
        text: String,
    },
    /// Liveness probe; must be answered with the same token.
    Ping { token: String },
    /// The connection is gone.
    Disconnect { reason: String },
    /// Credentials were refused.
    AuthRejected { reason: String },
    /// The server would not let us into `channel`.
    JoinRejected { channel: String, reason: String },
}

impl Signal {
    #[must_use]
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Welcome { .. } => SignalKind::Welcome,
            Self::NicknameInUse { .. } => SignalKind::NicknameInUse,
            Self::Join { .. } => SignalKind::Join,
            Self::Message { .. } => SignalKind::Message,
            Self::Ping { .. } => SignalKind::Ping,
            Self::Disconnect { .. } => SignalKind::Disconnect,
            Self::AuthRejected { .. } => SignalKind::AuthRejected,
            Self::JoinRejected { .. } => SignalKind::JoinRejected,
        }
    }
}

/// An outbound control operation requested by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Send { target: String, text: String },
    Join { channel: String },
    ChangeNick { nick: String },
    Pong { token: String },
    Disconnect { reason: String },
}

impl Action {
    pub fn send(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Send {
            target: target.into(),
            text: text.into(),
        }
    }

    pub fn disconnect(reason: impl Into<String>) -> Self {
        Self::Disconnect {
            reason: reason.into(),
        }
    }
}
