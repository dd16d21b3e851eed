//! Inbound chat commands: `!ping` and the kill switch.

use {
    fez_channels::{Action, Session, ShutdownReason, Signal},
    tracing::{info, warn},
};

use crate::format::{Color, colored};

pub const PING_COMMAND: &str = "!ping";
pub const DEFAULT_KILL_COMMAND: &str = "!fezquit";
pub const DEFAULT_FAREWELL: &str = "Failsafe command used, quitting - will be back shortly...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandConfig {
    /// Exact message text that shuts the relay down.
    pub kill_command: String,
    /// Notice posted to the channel before quitting.
    pub farewell: String,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            kill_command: DEFAULT_KILL_COMMAND.to_string(),
            farewell: DEFAULT_FAREWELL.to_string(),
        }
    }
}

impl CommandConfig {
    /// Handle one inbound message. Only messages to the target channel count.
    pub fn handle(&self, session: &mut Session, signal: &Signal) -> Vec<Action> {
        let Signal::Message {
            target,
            source,
            text,
        } = signal
        else {
            return Vec::new();
        };
        if !target.eq_ignore_ascii_case(session.target_channel()) {
            return Vec::new();
        }
        let channel = session.target_channel().to_string();

        if text == PING_COMMAND {
            info!(from = %source.nick, "ping");
            return vec![Action::send(channel, colored("pong", Color::Pink, None))];
        }
        if *text == self.kill_command {
            warn!(from = %source.mask, "kill command received");
            session.request_shutdown(ShutdownReason::KillCommand);
            return vec![
                Action::send(channel, colored(&self.farewell, Color::LightRed, None)),
                Action::disconnect(self.farewell.clone()),
            ];
        }
        Vec::new()
    }
}
