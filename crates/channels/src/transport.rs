use async_trait::async_trait;

use crate::{Action, Result, Signal};

/// A bidirectional chat connection.
///
/// `recv` must be cancel-safe. Writes are never cancelled by the caller.
#[async_trait]
pub trait Transport: Send {
    /// Wait for the next signal. Returns `Signal::Disconnect` once the peer
    /// goes away; further calls keep returning it.
    async fn recv(&mut self) -> Result<Signal>;

    /// A signal that is already available, without waiting.
    fn try_recv(&mut self) -> Result<Option<Signal>>;

    /// Deliver `text` to a channel or user.
    async fn send(&mut self, target: &str, text: &str) -> Result<()>;

    async fn join(&mut self, channel: &str) -> Result<()>;

    async fn change_nick(&mut self, nick: &str) -> Result<()>;

    async fn pong(&mut self, token: &str) -> Result<()>;

    /// Close the connection, leaving `reason` if the protocol carries one.
    async fn disconnect(&mut self, reason: &str) -> Result<()>;

    /// Perform one handler action.
    async fn execute(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Send { target, text } => self.send(target, text).await,
            Action::Join { channel } => self.join(channel).await,
            Action::ChangeNick { nick } => self.change_nick(nick).await,
            Action::Pong { token } => self.pong(token).await,
            Action::Disconnect { reason } => self.disconnect(reason).await,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::Error};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
        closed: bool,
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn recv(&mut self) -> Result<Signal> {
            Ok(Signal::Disconnect {
                reason: "eof".into(),
            })
        }

        fn try_recv(&mut self) -> Result<Option<Signal>> {
            Ok(None)
        }

        async fn send(&mut self, target: &str, text: &str) -> Result<()> {
            if self.closed {
                return Err(Error::Closed);
            }
            self.calls.push(format!("send {target} {text}"));
            Ok(())
        }

        async fn join(&mut self, channel: &str) -> Result<()> {
            self.calls.push(format!("join {channel}"));
            Ok(())
        }

        async fn change_nick(&mut self, nick: &str) -> Result<()> {
            self.calls.push(format!("nick {nick}"));
            Ok(())
        }

        async fn pong(&mut self, token: &str) -> Result<()> {
            self.calls.push(format!("pong {token}"));
            Ok(())
        }

        async fn disconnect(&mut self, reason: &str) -> Result<()> {
            self.calls.push(format!("quit {reason}"));
            self.closed = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn execute_maps_each_action() {
        let mut t = Recorder::default();
        for action in [
            Action::ChangeNick { nick: "fez_".into() },
            Action::Join {
                channel: "#c".into(),
            },
            Action::Pong { token: "x".into() },
            Action::send("#c", "hello"),
            Action::disconnect("bye"),
        ] {
            t.execute(&action).await.unwrap();
        }
        assert_eq!(t.calls, vec![
            "nick fez_",
            "join #c",
            "pong x",
            "send #c hello",
            "quit bye",
        ]);
    }

    #[tokio::test]
    async fn execute_propagates_transport_errors() {
        let mut t = Recorder {
            closed: true,
            ..Recorder::default()
        };
        let err = t.execute(&Action::send("#c", "late")).await.unwrap_err();
        assert!(matches!(err, Error::Closed));
    }
}
