use std::time::Duration;

use secrecy::Secret;

pub const DEFAULT_HOST: &str = "irc.libera.chat";
pub const DEFAULT_PORT: u16 = 6697;

/// Connection parameters for [`crate::IrcTransport`].
#[derive(Clone)]
pub struct IrcConfig {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    /// Account name, first nickname, and SASL identity.
    pub username: String,
    pub realname: String,
    pub password: Secret<String>,
    /// Authenticate with SASL PLAIN instead of `PASS`.
    pub sasl: bool,
    pub connect_timeout: Duration,
}

impl IrcConfig {
    pub fn new(username: impl Into<String>, password: Secret<String>) -> Self {
        let username = username.into();
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            tls: true,
            realname: username.clone(),
            username,
            password,
            sasl: false,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for IrcConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("username", &self.username)
            .field("realname", &self.realname)
            .field("password", &"[REDACTED]")
            .field("sasl", &self.sasl)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_password() {
        let config = IrcConfig::new("FezBot", Secret::new("hunter2".into()));
        let rendered = format!("{config:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("hunter2"));
        assert_eq!(config.realname, "FezBot");
    }
}
