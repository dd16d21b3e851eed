use tracing::info;

/// Lifecycle of the outbound connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Joining,
    Joined,
    ShuttingDown,
}

/// Who we are on the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Account name; also the first nickname tried.
    pub username: String,
    /// Alternate nickname, tried once if the first one is taken.
    pub nickname: String,
    /// Trust marker that must appear in our mask once joined.
    pub cloak: String,
}

/// Why the session is ending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// An operator used the kill command.
    KillCommand,
    /// We joined without the expected cloak.
    IdentityUnverified { mask: String },
    /// The fallback nickname was refused too.
    NicknameUnavailable { nick: String },
    AuthRejected { reason: String },
    JoinRejected { channel: String, reason: String },
    /// The peer or the network closed the connection.
    Disconnected { reason: String },
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KillCommand => write!(f, "kill command received"),
            Self::IdentityUnverified { mask } => write!(f, "joined without cloak as {mask}"),
            Self::NicknameUnavailable { nick } => write!(f, "nickname {nick} unavailable"),
            Self::AuthRejected { reason } => write!(f, "authentication rejected: {reason}"),
            Self::JoinRejected { channel, reason } => {
                write!(f, "cannot join {channel}: {reason}")
            },
            Self::Disconnected { reason } => write!(f, "disconnected: {reason}"),
        }
    }
}

/// Mutable state of the single outbound session.
///
/// Owned by the relay loop and lent to handlers one signal at a time.
#[derive(Debug, Clone)]
pub struct Session {
    state: ConnectionState,
    target_channel: String,
    identity: Identity,
    current_nick: String,
    nick_fallback_used: bool,
    shutdown: Option<ShutdownReason>,
}

impl Session {
    #[must_use]
    pub fn new(target_channel: impl Into<String>, identity: Identity) -> Self {
        let current_nick = identity.username.clone();
        Self {
            state: ConnectionState::Disconnected,
            target_channel: target_channel.into(),
            identity,
            current_nick,
            nick_fallback_used: false,
            shutdown: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Move to `state`. Once shutting down, only `Disconnected` is accepted.
    pub fn set_state(&mut self, state: ConnectionState) {
        if self.state == ConnectionState::ShuttingDown && state != ConnectionState::Disconnected {
            return;
        }
        if self.state != state {
            info!(from = ?self.state, to = ?state, "session state");
            self.state = state;
        }
    }

    #[must_use]
    pub fn target_channel(&self) -> &str {
        &self.target_channel
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The nickname last requested or confirmed.
    #[must_use]
    pub fn current_nick(&self) -> &str {
        &self.current_nick
    }

    pub fn set_current_nick(&mut self, nick: impl Into<String>) {
        self.current_nick = nick.into();
    }

    /// The one fallback nickname, or `None` once it has been spent.
    ///
    /// Prefers the configured nickname when it differs from the refused one,
    /// otherwise appends `_` to the username.
    pub fn take_fallback_nick(&mut self, refused: &str) -> Option<String> {
        if self.nick_fallback_used {
            return None;
        }
        self.nick_fallback_used = true;
        let nick = if self.identity.nickname != refused && !self.identity.nickname.is_empty() {
            self.identity.nickname.clone()
        } else {
            format!("{}_", self.identity.username)
        };
        self.current_nick = nick.clone();
        Some(nick)
    }

    /// Record why the session ends. The first reason wins.
    pub fn request_shutdown(&mut self, reason: ShutdownReason) {
        if self.shutdown.is_none() {
            info!(%reason, "shutdown requested");
            self.shutdown = Some(reason);
        }
        if self.state != ConnectionState::Disconnected {
            self.state = ConnectionState::ShuttingDown;
        }
    }

    #[must_use]
    pub fn shutdown_reason(&self) -> Option<&ShutdownReason> {
        self.shutdown.as_ref()
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_some()
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.state == ConnectionState::Joined
    }
}
