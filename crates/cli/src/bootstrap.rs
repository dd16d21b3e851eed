//! Builds the relay's parts from the loaded configuration and runs it.

use std::{path::Path, process::ExitCode, time::Duration};

use {
    anyhow::{Context, Result, bail},
    chrono::{DateTime, Utc},
    fez_channels::{Identity, Session},
    fez_config::{FezConfig, Severity},
    fez_feed::{EventStreamClient, FeedConfig},
    fez_irc::{IrcConfig, IrcTransport},
    fez_relay::{CommandConfig, Relay, RelaySettings, relay_handlers},
    fez_rules::{RuleSet, RulesSource},
    secrecy::Secret,
    tracing::{debug, error, info, warn},
};

/// The relay stopped, or could not reach the network.
pub const EXIT_RUNTIME: u8 = 1;
/// Bad configuration or rules, detected before connecting.
pub const EXIT_CONFIG: u8 = 2;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Load the configuration and reject it when required values are missing.
pub fn load_checked(path: Option<&Path>) -> Result<FezConfig> {
    let (config, source) = fez_config::load(path)?;
    match &source {
        Some(path) => info!(path = %path.display(), "config loaded"),
        None => info!("no config file found, using defaults and environment"),
    }

    let mut errors = 0;
    for diagnostic in fez_config::check_config(&config) {
        match diagnostic.severity {
            Severity::Error => {
                errors += 1;
                error!(path = %diagnostic.path, "{}", diagnostic.message);
            },
            Severity::Warning => warn!(path = %diagnostic.path, "{}", diagnostic.message),
            Severity::Info => debug!(path = %diagnostic.path, "{}", diagnostic.message),
        }
    }
    if errors > 0 {
        bail!("{errors} configuration error(s)");
    }
    Ok(config)
}

/// Shared HTTP client for the rules fetch and the feed.
///
/// No overall request timeout: the feed response is a stream that never ends.
pub fn http_client(config: &FezConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.feed.user_agent.clone())
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

pub async fn fetch_rules(client: &reqwest::Client, config: &FezConfig) -> Result<RuleSet> {
    let source = RulesSource::resolve(&config.rules.locator, &config.rules.wiki_host)?;
    fez_rules::load_rules(client, &source)
        .await
        .with_context(|| format!("failed to load rules from {source}"))
}

pub fn irc_config(config: &FezConfig) -> IrcConfig {
    let irc = &config.irc;
    IrcConfig {
        host: irc.host.clone(),
        port: irc.port,
        tls: irc.tls,
        username: irc.username.clone(),
        realname: irc
            .realname
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| irc.username.clone()),
        password: irc
            .password
            .clone()
            .unwrap_or_else(|| Secret::new(String::new())),
        sasl: irc.sasl,
        connect_timeout: Duration::from_secs(irc.connect_timeout_secs),
    }
}

pub fn feed_config(config: &FezConfig, since: DateTime<Utc>) -> FeedConfig {
    let feed = &config.feed;
    FeedConfig {
        base_url: feed.url.clone(),
        streams: feed.streams.clone(),
        server_name: feed
            .server_name
            .clone()
            .filter(|name| !name.trim().is_empty()),
        since,
        max_reconnects: feed.max_reconnects,
        reconnect_delay: Duration::from_secs(feed.reconnect_delay_secs),
    }
}

pub fn relay_settings(config: &FezConfig) -> RelaySettings {
    RelaySettings {
        stale_after_secs: config.relay.stale_after_secs,
        idle_poll: Duration::from_millis(config.relay.idle_poll_ms),
        registration_timeout: Duration::from_secs(config.relay.registration_timeout_secs),
    }
}

/// Built-in commands, with any configured overrides applied.
pub fn command_config(config: &FezConfig) -> CommandConfig {
    let mut commands = CommandConfig::default();
    if let Some(kill_command) = &config.relay.kill_command {
        commands.kill_command = kill_command.clone();
    }
    if let Some(farewell) = &config.relay.farewell {
        commands.farewell = farewell.clone();
    }
    commands
}

pub fn session(config: &FezConfig) -> Session {
    let irc = &config.irc;
    Session::new(irc.target.clone(), Identity {
        username: irc.username.clone(),
        nickname: irc.effective_nickname().to_string(),
        cloak: irc.cloak.clone(),
    })
}

/// Run the relay to completion. Every outcome is a non-zero exit code.
pub async fn run(config_path: Option<&Path>) -> ExitCode {
    let started = Utc::now();

    let config = match load_checked(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %format!("{e:#}"), "invalid configuration");
            return ExitCode::from(EXIT_CONFIG);
        },
    };
    let client = match http_client(&config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %format!("{e:#}"), "startup failed");
            return ExitCode::from(EXIT_RUNTIME);
        },
    };
    let rules = match fetch_rules(&client, &config).await {
        Ok(rules) => rules,
        Err(e) => {
            error!(error = %format!("{e:#}"), "invalid rules");
            return ExitCode::from(EXIT_CONFIG);
        },
    };

    let irc = irc_config(&config);
    let transport = match IrcTransport::connect(&irc).await {
        Ok(transport) => transport,
        Err(e) => {
            error!(host = %irc.host, error = %e, "connection failed");
            return ExitCode::from(EXIT_RUNTIME);
        },
    };

    let feed = EventStreamClient::new(client, feed_config(&config, started)).subscribe();
    let mut relay = Relay::new(
        transport,
        feed,
        rules,
        session(&config),
        relay_handlers(command_config(&config)),
        relay_settings(&config),
    );

    let reason = relay.run().await;
    let stats = relay.stats();
    warn!(
        %reason,
        received = stats.received,
        forwarded = stats.forwarded,
        "relay stopped"
    );
    ExitCode::from(reason.exit_code())
}
