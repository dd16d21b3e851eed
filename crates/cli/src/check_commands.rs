use std::{path::Path, process::ExitCode};

use fez_config::{Diagnostic, Severity, ValidationResult};

use crate::bootstrap::{EXIT_CONFIG, fetch_rules, http_client};

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Validate the config file, the effective configuration, and (unless
/// skipped) the rules document. Exits 0 when nothing is an error.
pub async fn check(config_path: Option<&Path>, verbose: bool, skip_rules: bool) -> ExitCode {
    let path = config_path
        .map(Path::to_path_buf)
        .or_else(fez_config::find_config_file);

    let mut result = match &path {
        Some(path) => fez_config::validate_file(path),
        None => ValidationResult::default(),
    };

    if let Some(ref path) = result.config_path {
        eprintln!("Checking {}\n", path.display());
    } else {
        eprintln!("No config file found; checking defaults and environment.\n");
    }

    let mut rules_summary = None;
    if !result.has_errors() {
        match fez_config::load(path.as_deref()) {
            Ok((config, _)) => {
                result.extend(fez_config::check_config(&config));
                if !skip_rules && !result.has_errors() {
                    let loaded = match http_client(&config) {
                        Ok(client) => fetch_rules(&client, &config).await,
                        Err(e) => Err(e),
                    };
                    match loaded {
                        Ok(rules) => rules_summary = Some(rules.summary()),
                        Err(e) => result.extend([Diagnostic::error(
                            "rules",
                            "rules.locator",
                            format!("{e:#}"),
                        )]),
                    }
                }
            },
            Err(e) => result.extend([Diagnostic::error("syntax", "", e.to_string())]),
        }
    }

    print_diagnostics(&result, verbose);
    if let Some(summary) = rules_summary {
        eprintln!("Rules: {summary}");
    }

    if result.has_errors() {
        ExitCode::from(EXIT_CONFIG)
    } else {
        ExitCode::SUCCESS
    }
}

fn paint(severity: Severity) -> String {
    let color = match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    };
    format!("{BOLD}{color}{severity}{RESET}")
}

/// Info diagnostics only show with `--verbose`.
fn visible(result: &ValidationResult, verbose: bool) -> Vec<&Diagnostic> {
    result
        .diagnostics
        .iter()
        .filter(|d| verbose || d.severity != Severity::Info)
        .collect()
}

fn print_diagnostics(result: &ValidationResult, verbose: bool) {
    let visible = visible(result, verbose);

    for d in &visible {
        let location = if d.path.is_empty() {
            String::new()
        } else {
            format!("{}: ", d.path)
        };
        eprintln!(
            "  {} [{}] {location}{}",
            paint(d.severity),
            d.category,
            d.message
        );
    }
    if !visible.is_empty() {
        eprintln!();
    }

    match (
        result.count(Severity::Error),
        result.count(Severity::Warning),
    ) {
        (0, 0) => eprintln!("No issues found."),
        (errors, warnings) => eprintln!("{errors} error(s), {warnings} warning(s)"),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, fez_config::FezConfig};

    #[test]
    fn verbose_reveals_effective_defaults() {
        let mut config = FezConfig::default();
        config.irc.target = "#fez".into();
        config.irc.username = "FezBot".into();
        let result = ValidationResult {
            diagnostics: fez_config::check_config(&config),
            config_path: None,
        };

        let quiet = visible(&result, false);
        let loud = visible(&result, true);
        assert!(quiet.iter().all(|d| d.severity != Severity::Info));
        assert!(
            loud.iter()
                .any(|d| d.severity == Severity::Info && d.path == "irc.nickname")
        );
        assert!(loud.len() > quiet.len());
    }
}
