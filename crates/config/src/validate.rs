//! Configuration diagnostics.
//!
//! Two passes: [`validate_toml_str`] checks a config file on its own (syntax,
//! unknown keys, types); [`check_config`] checks the effective configuration
//! after environment overrides, which is what decides whether the relay can
//! start.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use secrecy::ExposeSecret;

use crate::schema::FezConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// "syntax", "unknown-field", "type-error", "missing", "value", "effective"
    pub category: &'static str,
    /// Dotted path, e.g. "irc.target".
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn warning(category: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn info(category: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} [{}] {}", self.severity, self.category, self.message)
        } else {
            write!(
                f,
                "{} [{}] {}: {}",
                self.severity, self.category, self.path, self.message
            )
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }
}

/// Keys accepted in each section.
fn known_keys() -> HashMap<&'static str, &'static [&'static str]> {
    HashMap::from([
        ("irc", &[
            "host",
            "port",
            "tls",
            "target",
            "username",
            "nickname",
            "password",
            "cloak",
            "sasl",
            "realname",
            "connect_timeout_secs",
        ][..]),
        ("rules", &["locator", "wiki_host"][..]),
        ("feed", &[
            "url",
            "streams",
            "server_name",
            "max_reconnects",
            "reconnect_delay_secs",
            "user_agent",
        ][..]),
        ("relay", &[
            "stale_after_secs",
            "kill_command",
            "farewell",
            "idle_poll_ms",
            "registration_timeout_secs",
        ][..]),
    ])
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut curr = Vec::with_capacity(b.len() + 1);
        curr.push(i + 1);
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != *cb);
            curr.push(substitute.min(prev[j + 1] + 1).min(curr[j] + 1));
        }
        prev = curr;
    }
    prev[b.len()]
}

/// Closest candidate within three edits.
fn suggest<'a>(needle: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| (1..=3).contains(d))
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

fn unknown_field(path: String, candidates: &[&str], key: &str) -> Diagnostic {
    let message = match suggest(key, candidates) {
        Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
        None => "unknown field".to_string(),
    };
    Diagnostic::error("unknown-field", path, message)
}

/// Check a config file's text: syntax, unknown keys, value types.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut result = ValidationResult::default();

    let value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => {
            result.diagnostics.push(Diagnostic::error(
                "syntax",
                "",
                format!("TOML syntax error: {e}"),
            ));
            return result;
        },
    };

    let schema = known_keys();
    let sections: Vec<&str> = schema.keys().copied().collect();
    if let Some(root) = value.as_table() {
        for (section, body) in root {
            let Some(fields) = schema.get(section.as_str()) else {
                result
                    .diagnostics
                    .push(unknown_field(section.clone(), &sections, section));
                continue;
            };
            let Some(table) = body.as_table() else {
                continue;
            };
            for key in table.keys() {
                if !fields.contains(&key.as_str()) {
                    result.diagnostics.push(unknown_field(
                        format!("{section}.{key}"),
                        fields,
                        key,
                    ));
                }
            }
        }
    }

    if let Err(e) = toml::from_str::<FezConfig>(toml_str) {
        result.diagnostics.push(Diagnostic::error(
            "type-error",
            "",
            format!("type error: {e}"),
        ));
    }
    result
}

/// Check a config file on disk.
#[must_use]
pub fn validate_file(path: &Path) -> ValidationResult {
    let mut result = match std::fs::read_to_string(path) {
        Ok(content) => validate_toml_str(&content),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic::error(
                "syntax",
                "",
                format!("failed to read config file: {e}"),
            )],
            config_path: None,
        },
    };
    result.config_path = Some(path.to_path_buf());
    result
}

/// Check the effective configuration the relay would run with.
#[must_use]
pub fn check_config(config: &FezConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut require = |path: &str, value: &str, env: &str| {
        if value.trim().is_empty() {
            diagnostics.push(Diagnostic::error(
                "missing",
                path,
                format!("required; set it in the config file or via {env}"),
            ));
        }
    };

    let irc = &config.irc;
    require("irc.target", &irc.target, "FEZ_COLLECTOR_TARGET");
    require("irc.username", &irc.username, "FEZ_COLLECTOR_USERNAME");
    require(
        "irc.password",
        irc.password
            .as_ref()
            .map_or("", |p| p.expose_secret().as_str()),
        "FEZ_COLLECTOR_PASSWORD",
    );
    require("irc.cloak", &irc.cloak, "FEZ_COLLECTOR_CLOAK");
    require(
        "rules.locator",
        &config.rules.locator,
        "FEZ_COLLECTOR_CONFIG_PAGE",
    );

    if !irc.target.is_empty() && !irc.target.starts_with('#') {
        diagnostics.push(Diagnostic::warning(
            "value",
            "irc.target",
            format!("\"{}\" does not look like a channel", irc.target),
        ));
    }
    if irc.host.trim().is_empty() {
        diagnostics.push(Diagnostic::error("value", "irc.host", "must not be empty"));
    }
    if irc.port == 0 {
        diagnostics.push(Diagnostic::error("value", "irc.port", "must not be 0"));
    }
    if irc.username.contains(char::is_whitespace) {
        diagnostics.push(Diagnostic::error(
            "value",
            "irc.username",
            "must not contain whitespace",
        ));
    }

    let feed = &config.feed;
    if feed.streams.is_empty() {
        diagnostics.push(Diagnostic::error(
            "value",
            "feed.streams",
            "at least one stream is required",
        ));
    }
    if !(feed.url.starts_with("https://") || feed.url.starts_with("http://")) {
        diagnostics.push(Diagnostic::error(
            "value",
            "feed.url",
            "must be an http(s) URL",
        ));
    }

    let relay = &config.relay;
    if relay.stale_after_secs < 0 {
        diagnostics.push(Diagnostic::error(
            "value",
            "relay.stale_after_secs",
            "must not be negative",
        ));
    } else if relay.stale_after_secs == 0 {
        diagnostics.push(Diagnostic::warning(
            "value",
            "relay.stale_after_secs",
            "0 drops every event that is not from this very second",
        ));
    }
    if relay.idle_poll_ms == 0 {
        diagnostics.push(Diagnostic::error(
            "value",
            "relay.idle_poll_ms",
            "must be greater than 0",
        ));
    }
    if relay.kill_command.as_deref().is_some_and(|cmd| cmd.trim().is_empty()) {
        diagnostics.push(Diagnostic::error(
            "value",
            "relay.kill_command",
            "must not be empty",
        ));
    }

    if irc.nickname.as_deref().is_none_or(|nick| nick.trim().is_empty()) && !irc.username.is_empty() {
        diagnostics.push(Diagnostic::info(
            "effective",
            "irc.nickname",
            format!("not set, the username \"{}\" is used", irc.username),
        ));
    }
    if feed.server_name.as_deref().is_none_or(|name| name.trim().is_empty()) {
        diagnostics.push(Diagnostic::info(
            "effective",
            "feed.server_name",
            "not set, changes from every wiki are relayed",
        ));
    }

    diagnostics
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, secrecy::Secret};

    fn complete() -> FezConfig {
        let mut config = FezConfig::default();
        config.irc.target = "#wikipedia-en-fez".into();
        config.irc.username = "FezBot".into();
        config.irc.password = Some(Secret::new("pw".into()));
        config.irc.cloak = "user/fezbot".into();
        config.rules.locator = "User:FezBot/config.json".into();
        config
    }

    #[rstest]
    #[case("server", "sever", 1)]
    #[case("cat", "car", 1)]
    #[case("", "abc", 3)]
    #[case("target", "target", 0)]
    fn levenshtein_distances(#[case] a: &str, #[case] b: &str, #[case] d: usize) {
        assert_eq!(levenshtein(a, b), d);
    }

    fn problems(config: &FezConfig) -> Vec<Diagnostic> {
        check_config(config)
            .into_iter()
            .filter(|d| d.severity != Severity::Info)
            .collect()
    }

    #[test]
    fn complete_config_has_no_problems() {
        assert!(problems(&complete()).is_empty());
    }

    #[test]
    fn effective_defaults_are_reported_as_info() {
        let mut config = complete();
        config.feed.server_name = None;
        let infos: Vec<Diagnostic> = check_config(&config)
            .into_iter()
            .filter(|d| d.severity == Severity::Info)
            .collect();
        let paths: Vec<&str> = infos.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["irc.nickname", "feed.server_name"]);
        assert!(infos[0].message.contains("\"FezBot\""));

        config.irc.nickname = Some("Fez".into());
        config.feed.server_name = Some("de.wikipedia.org".into());
        assert!(check_config(&config).iter().all(|d| d.severity != Severity::Info));
    }

    #[test]
    fn missing_values_are_errors() {
        let diagnostics = check_config(&FezConfig::default());
        let paths: Vec<&str> = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| d.path.as_str())
            .collect();
        assert_eq!(paths, vec![
            "irc.target",
            "irc.username",
            "irc.password",
            "irc.cloak",
            "rules.locator",
        ]);
    }

    #[test]
    fn odd_values_are_warnings() {
        let mut config = complete();
        config.irc.target = "wikipedia-en-fez".into();
        config.relay.stale_after_secs = 0;
        let diagnostics = problems(&config);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.iter().all(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn invalid_values_are_errors() {
        let mut config = complete();
        config.irc.port = 0;
        config.feed.streams.clear();
        config.relay.idle_poll_ms = 0;
        config.relay.stale_after_secs = -1;
        let result = ValidationResult {
            diagnostics: check_config(&config),
            config_path: None,
        };
        assert!(result.has_errors());
        assert_eq!(result.count(Severity::Error), 4);
    }

    #[test]
    fn blank_kill_command_override_is_an_error() {
        let mut config = complete();
        config.relay.kill_command = Some("  ".into());
        let errors: Vec<Diagnostic> = problems(&config);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "relay.kill_command");
    }

    #[test]
    fn unknown_keys_get_suggestions() {
        let result = validate_toml_str("[irc]\ntraget = \"#x\"\n\n[relai]\n");
        let messages: Vec<String> = result.diagnostics.iter().map(ToString::to_string).collect();
        assert!(messages.contains(
            &"error [unknown-field] irc.traget: unknown field (did you mean \"target\"?)"
                .to_string()
        ));
        assert!(messages.contains(
            &"error [unknown-field] relai: unknown field (did you mean \"relay\"?)".to_string()
        ));
    }

    #[test]
    fn syntax_and_type_errors() {
        let syntax = validate_toml_str("[irc");
        assert_eq!(syntax.diagnostics[0].category, "syntax");

        let typed = validate_toml_str("[irc]\nport = \"six\"");
        assert!(typed.diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn valid_file_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fez.toml");
        std::fs::write(&path, "[irc]\ntarget = \"#fez\"\n[feed]\nstreams = [\"recentchange\"]\n")
            .unwrap();
        let result = validate_file(&path);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }
}
