//! Config schema: `[irc]`, `[rules]`, `[feed]` and `[relay]` sections.

use {
    secrecy::Secret,
    serde::{Deserialize, Serialize},
};

pub const DEFAULT_IRC_HOST: &str = "irc.libera.chat";
pub const DEFAULT_IRC_PORT: u16 = 6697;
pub const DEFAULT_WIKI_HOST: &str = "en.wikipedia.org";
pub const DEFAULT_FEED_URL: &str = "https://stream.wikimedia.org/v2/stream";

/// Root configuration (`fez.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FezConfig {
    pub irc: IrcSection,
    pub rules: RulesSection,
    pub feed: FeedSection,
    pub relay: RelaySection,
}

/// Chat connection and identity.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct IrcSection {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    /// Channel the relay posts to and takes commands from.
    pub target: String,
    /// Account name; also the first nickname tried.
    pub username: String,
    /// Alternate nickname. Falls back to the username.
    pub nickname: Option<String>,
    pub password: Option<Secret<String>>,
    /// Substring that must appear in our host mask once joined.
    pub cloak: String,
    /// Authenticate with SASL PLAIN instead of `PASS`.
    pub sasl: bool,
    pub realname: Option<String>,
    pub connect_timeout_secs: u64,
}

impl Default for IrcSection {
    fn default() -> Self {
        Self {
            host: DEFAULT_IRC_HOST.into(),
            port: DEFAULT_IRC_PORT,
            tls: true,
            target: String::new(),
            username: String::new(),
            nickname: None,
            password: None,
            cloak: String::new(),
            sasl: false,
            realname: None,
            connect_timeout_secs: 30,
        }
    }
}

impl IrcSection {
    /// The configured nickname, or the username when none is set.
    #[must_use]
    pub fn effective_nickname(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|nick| !nick.trim().is_empty())
            .unwrap_or(&self.username)
    }
}

impl std::fmt::Debug for IrcSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcSection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("target", &self.target)
            .field("username", &self.username)
            .field("nickname", &self.nickname)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("cloak", &self.cloak)
            .field("sasl", &self.sasl)
            .field("realname", &self.realname)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Where the rules document lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesSection {
    /// URL, file path, or wiki page title.
    pub locator: String,
    /// Wiki that page-title locators are fetched from.
    pub wiki_host: String,
}

impl Default for RulesSection {
    fn default() -> Self {
        Self {
            locator: String::new(),
            wiki_host: DEFAULT_WIKI_HOST.into(),
        }
    }
}

/// EventStreams subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSection {
    pub url: String,
    pub streams: Vec<String>,
    /// Only relay changes from this wiki. `None` relays every wiki.
    pub server_name: Option<String>,
    pub max_reconnects: u32,
    pub reconnect_delay_secs: u64,
    pub user_agent: String,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.into(),
            streams: vec!["recentchange".into()],
            server_name: Some(DEFAULT_WIKI_HOST.into()),
            max_reconnects: 5,
            reconnect_delay_secs: 5,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!(
        "fez/{} (recent-changes IRC relay)",
        env!("CARGO_PKG_VERSION")
    )
}

/// Relay loop tuning and chat commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySection {
    /// Events older than this are dropped.
    pub stale_after_secs: i64,
    /// Overrides the relay's built-in kill command.
    pub kill_command: Option<String>,
    /// Overrides the relay's built-in farewell notice.
    pub farewell: Option<String>,
    /// Longest wait for a feed event before servicing the connection.
    pub idle_poll_ms: u64,
    /// Longest wait from connect to joining the target channel.
    pub registration_timeout_secs: u64,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            stale_after_secs: 2 * 60 * 60,
            kill_command: None,
            farewell: None,
            idle_poll_ms: 1_000,
            registration_timeout_secs: 120,
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::ExposeSecret};

    #[test]
    fn empty_document_uses_defaults() {
        let config: FezConfig = toml::from_str("").unwrap();
        assert_eq!(config.irc.host, "irc.libera.chat");
        assert_eq!(config.irc.port, 6697);
        assert!(config.irc.tls);
        assert_eq!(config.feed.streams, vec!["recentchange"]);
        assert_eq!(config.feed.server_name.as_deref(), Some("en.wikipedia.org"));
        assert_eq!(config.relay.stale_after_secs, 7200);
        assert_eq!(config.relay.kill_command, None);
        assert_eq!(config.rules.wiki_host, "en.wikipedia.org");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: FezConfig = toml::from_str(
            r##"
            [irc]
            target = "#wikipedia-en-fez"
            username = "FezBot"
            password = "pw"

            [relay]
            stale_after_secs = 60
            "##,
        )
        .unwrap();
        assert_eq!(config.irc.target, "#wikipedia-en-fez");
        assert_eq!(
            config.irc.password.as_ref().map(|p| p.expose_secret().as_str()),
            Some("pw")
        );
        assert_eq!(config.irc.port, 6697);
        assert_eq!(config.relay.stale_after_secs, 60);
        assert_eq!(config.relay.idle_poll_ms, 1_000);
    }

    #[test]
    fn nickname_falls_back_to_username() {
        let mut irc = IrcSection {
            username: "FezBot".into(),
            ..IrcSection::default()
        };
        assert_eq!(irc.effective_nickname(), "FezBot");
        irc.nickname = Some("Fez".into());
        assert_eq!(irc.effective_nickname(), "Fez");
        irc.nickname = Some(" ".into());
        assert_eq!(irc.effective_nickname(), "FezBot");
    }

    #[test]
    fn debug_hides_password() {
        let irc = IrcSection {
            password: Some(Secret::new("hunter2".into())),
            ..IrcSection::default()
        };
        let rendered = format!("{irc:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("hunter2"));
    }
}
