use std::collections::HashMap;

use tracing::trace;

use crate::{Action, Session, Signal, SignalKind};

/// A signal handler: inspects the session and the signal, may update the
/// session, and returns the actions to perform.
pub type Handler = Box<dyn Fn(&mut Session, &Signal) -> Vec<Action> + Send + Sync>;

/// Signal kind to ordered handler list.
pub struct HandlerTable {
    handlers: HashMap<SignalKind, Vec<Handler>>,
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerTable {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Append `handler` to the list for `kind`.
    pub fn register<F>(&mut self, kind: SignalKind, handler: F)
    where
        F: Fn(&mut Session, &Signal) -> Vec<Action> + Send + Sync + 'static,
    {
        self.handlers
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    /// Run every handler registered for the signal's kind, in registration
    /// order, and collect their actions. Signals without handlers are
    /// dropped.
    pub fn dispatch(&self, session: &mut Session, signal: &Signal) -> Vec<Action> {
        let Some(handlers) = self.handlers.get(&signal.kind()) else {
            trace!(kind = ?signal.kind(), "no handler registered");
            return Vec::new();
        };
        handlers
            .iter()
            .flat_map(|handler| handler(session, signal))
            .collect()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConnectionState, Identity};

    fn session() -> Session {
        Session::new("#c", Identity {
            username: "bot".into(),
            nickname: "bot".into(),
            cloak: "cloak".into(),
        })
    }

    #[test]
    fn dispatches_in_registration_order() {
        let mut table = HandlerTable::new();
        table.register(SignalKind::Ping, |_, signal| match signal {
            Signal::Ping { token } => vec![Action::Pong {
                token: token.clone(),
            }],
            _ => Vec::new(),
        });
        table.register(SignalKind::Ping, |_, _| vec![Action::send("#c", "second")]);

        let actions = table.dispatch(&mut session(), &Signal::Ping {
            token: "abc".into(),
        });
        assert_eq!(actions, vec![
            Action::Pong {
                token: "abc".into()
            },
            Action::send("#c", "second"),
        ]);
    }

    #[test]
    fn unregistered_kind_yields_nothing() {
        let table = HandlerTable::new();
        let actions = table.dispatch(&mut session(), &Signal::Welcome {
            nick: "bot".into(),
        });
        assert!(actions.is_empty());
    }

    #[test]
    fn handlers_see_session_updates_from_earlier_handlers() {
        let mut table = HandlerTable::new();
        table.register(SignalKind::Welcome, |session, _| {
            session.set_state(ConnectionState::Joining);
            Vec::new()
        });
        table.register(SignalKind::Welcome, |session, _| {
            if session.state() == ConnectionState::Joining {
                vec![Action::Join {
                    channel: session.target_channel().to_string(),
                }]
            } else {
                Vec::new()
            }
        });

        let mut s = session();
        let actions = table.dispatch(&mut s, &Signal::Welcome { nick: "bot".into() });
        assert_eq!(actions, vec![Action::Join {
            channel: "#c".into()
        }]);
    }
}
