//! Connection lifecycle handlers.

use {
    fez_channels::{
        Action, ConnectionState, HandlerTable, Session, ShutdownReason, Signal, SignalKind,
    },
    tracing::{error, info, warn},
};

use crate::commands::CommandConfig;

/// Sent as the QUIT reason when we join without our cloak.
pub const CLOAK_ERROR_MSG: &str =
    "Hmmm - I don't seem to have my cloak, something's gone wrong. Exiting!";

/// The handler table the relay runs with.
pub fn relay_handlers(commands: CommandConfig) -> HandlerTable {
    let mut table = HandlerTable::new();
    table.register(SignalKind::Welcome, on_welcome);
    table.register(SignalKind::NicknameInUse, on_nickname_in_use);
    table.register(SignalKind::Join, on_join);
    table.register(SignalKind::Message, move |session, signal| {
        commands.handle(session, signal)
    });
    table.register(SignalKind::Ping, on_ping);
    table.register(SignalKind::Disconnect, on_disconnect);
    table.register(SignalKind::AuthRejected, on_auth_rejected);
    table.register(SignalKind::JoinRejected, on_join_rejected);
    table
}

fn on_welcome(session: &mut Session, signal: &Signal) -> Vec<Action> {
    let Signal::Welcome { nick } = signal else {
        return Vec::new();
    };
    info!(%nick, "registered");
    session.set_current_nick(nick.clone());
    session.set_state(ConnectionState::Joining);
    vec![Action::Join {
        channel: session.target_channel().to_string(),
    }]
}

fn on_nickname_in_use(session: &mut Session, signal: &Signal) -> Vec<Action> {
    let Signal::NicknameInUse { nick } = signal else {
        return Vec::new();
    };
    match session.take_fallback_nick(nick) {
        Some(fallback) => {
            warn!(refused = %nick, %fallback, "nickname in use, changing");
            vec![Action::ChangeNick { nick: fallback }]
        },
        None => {
            error!(refused = %nick, "fallback nickname in use too");
            session.request_shutdown(ShutdownReason::NicknameUnavailable { nick: nick.clone() });
            vec![Action::disconnect("nickname unavailable")]
        },
    }
}

fn on_join(session: &mut Session, signal: &Signal) -> Vec<Action> {
    let Signal::Join { channel, source } = signal else {
        return Vec::new();
    };
    if !source.nick.eq_ignore_ascii_case(session.current_nick())
        || !channel.eq_ignore_ascii_case(session.target_channel())
    {
        return Vec::new();
    }
    if !source.mask.contains(session.identity().cloak.as_str()) {
        error!(mask = %source.mask, cloak = %session.identity().cloak, "{CLOAK_ERROR_MSG}");
        session.request_shutdown(ShutdownReason::IdentityUnverified {
            mask: source.mask.clone(),
        });
        return vec![Action::disconnect(CLOAK_ERROR_MSG)];
    }
    info!(%channel, "joined");
    session.set_state(ConnectionState::Joined);
    Vec::new()
}

fn on_ping(_session: &mut Session, signal: &Signal) -> Vec<Action> {
    match signal {
        Signal::Ping { token } => vec![Action::Pong {
            token: token.clone(),
        }],
        _ => Vec::new(),
    }
}

fn on_disconnect(session: &mut Session, signal: &Signal) -> Vec<Action> {
    if let Signal::Disconnect { reason } = signal {
        warn!(%reason, "connection lost");
        session.request_shutdown(ShutdownReason::Disconnected {
            reason: reason.clone(),
        });
        session.set_state(ConnectionState::Disconnected);
    }
    Vec::new()
}

fn on_auth_rejected(session: &mut Session, signal: &Signal) -> Vec<Action> {
    let Signal::AuthRejected { reason } = signal else {
        return Vec::new();
    };
    error!(%reason, "authentication rejected");
    session.request_shutdown(ShutdownReason::AuthRejected {
        reason: reason.clone(),
    });
    vec![Action::disconnect("authentication failed")]
}

fn on_join_rejected(session: &mut Session, signal: &Signal) -> Vec<Action> {
    let Signal::JoinRejected { channel, reason } = signal else {
        return Vec::new();
    };
    error!(%channel, %reason, "cannot join");
    session.request_shutdown(ShutdownReason::JoinRejected {
        channel: channel.clone(),
        reason: reason.clone(),
    });
    vec![Action::disconnect("cannot join channel")]
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        fez_channels::{Identity, Source},
    };

    const CHANNEL: &str = "#wikipedia-en-fez";

    fn session(username: &str, nickname: &str) -> Session {
        Session::new(CHANNEL, Identity {
            username: username.into(),
            nickname: nickname.into(),
            cloak: "user/fezbot".into(),
        })
    }

    fn dispatch(session: &mut Session, signal: Signal) -> Vec<Action> {
        relay_handlers(CommandConfig::default()).dispatch(session, &signal)
    }

    #[test]
    fn welcome_joins_the_target() {
        let mut s = session("FezBot", "FezBot");
        let actions = dispatch(&mut s, Signal::Welcome {
            nick: "FezBot".into(),
        });
        assert_eq!(actions, vec![Action::Join {
            channel: CHANNEL.into()
        }]);
        assert_eq!(s.state(), ConnectionState::Joining);
    }

    #[test]
    fn one_nickname_fallback_then_fatal() {
        let table = relay_handlers(CommandConfig::default());
        let mut s = session("FezBot", "FezBot");

        let first = table.dispatch(&mut s, &Signal::NicknameInUse {
            nick: "FezBot".into(),
        });
        assert_eq!(first, vec![Action::ChangeNick {
            nick: "FezBot_".into()
        }]);
        assert!(!s.is_shutting_down());

        let second = table.dispatch(&mut s, &Signal::NicknameInUse {
            nick: "FezBot_".into(),
        });
        assert!(matches!(second.as_slice(), [Action::Disconnect { .. }]));
        assert_eq!(
            s.shutdown_reason(),
            Some(&ShutdownReason::NicknameUnavailable {
                nick: "FezBot_".into()
            })
        );
    }

    #[test]
    fn fallback_uses_distinct_nickname() {
        let mut s = session("FezBot", "Fez");
        let actions = dispatch(&mut s, Signal::NicknameInUse {
            nick: "FezBot".into(),
        });
        assert_eq!(actions, vec![Action::ChangeNick { nick: "Fez".into() }]);
    }

    #[test]
    fn join_with_cloak_completes_connection() {
        let mut s = session("FezBot", "FezBot");
        let actions = dispatch(&mut s, Signal::Join {
            channel: CHANNEL.into(),
            source: Source::new("FezBot", "FezBot!~fez@user/fezbot"),
        });
        assert!(actions.is_empty());
        assert!(s.is_joined());
    }

    #[test]
    fn join_without_cloak_is_fatal() {
        let mut s = session("FezBot", "FezBot");
        let actions = dispatch(&mut s, Signal::Join {
            channel: CHANNEL.into(),
            source: Source::new("FezBot", "FezBot!~fez@203.0.113.9"),
        });
        assert_eq!(actions, vec![Action::disconnect(CLOAK_ERROR_MSG)]);
        assert_eq!(
            s.shutdown_reason(),
            Some(&ShutdownReason::IdentityUnverified {
                mask: "FezBot!~fez@203.0.113.9".into()
            })
        );
        assert!(!s.is_joined());
    }

    #[test]
    fn joins_by_others_are_ignored() {
        let mut s = session("FezBot", "FezBot");
        let actions = dispatch(&mut s, Signal::Join {
            channel: CHANNEL.into(),
            source: Source::new("someone", "someone!~s@203.0.113.9"),
        });
        assert!(actions.is_empty());
        assert!(!s.is_shutting_down());
        assert!(!s.is_joined());
    }

    #[test]
    fn ping_is_answered() {
        let mut s = session("FezBot", "FezBot");
        assert_eq!(
            dispatch(&mut s, Signal::Ping {
                token: "irc.libera.chat".into()
            }),
            vec![Action::Pong {
                token: "irc.libera.chat".into()
            }]
        );
    }

    #[test]
    fn disconnect_marks_session_gone() {
        let mut s = session("FezBot", "FezBot");
        s.set_state(ConnectionState::Joined);
        assert!(
            dispatch(&mut s, Signal::Disconnect {
                reason: "EOF".into()
            })
            .is_empty()
        );
        assert_eq!(s.state(), ConnectionState::Disconnected);
        assert!(matches!(
            s.shutdown_reason(),
            Some(ShutdownReason::Disconnected { .. })
        ));
    }

    #[test]
    fn rejections_are_fatal() {
        let mut s = session("FezBot", "FezBot");
        let actions = dispatch(&mut s, Signal::AuthRejected {
            reason: "904 SASL authentication failed".into(),
        });
        assert!(matches!(actions.as_slice(), [Action::Disconnect { .. }]));
        assert!(matches!(
            s.shutdown_reason(),
            Some(ShutdownReason::AuthRejected { .. })
        ));

        let mut s = session("FezBot", "FezBot");
        let actions = dispatch(&mut s, Signal::JoinRejected {
            channel: CHANNEL.into(),
            reason: "474 banned".into(),
        });
        assert!(matches!(actions.as_slice(), [Action::Disconnect { .. }]));
        assert!(matches!(
            s.shutdown_reason(),
            Some(ShutdownReason::JoinRejected { .. })
        ));
    }
}
