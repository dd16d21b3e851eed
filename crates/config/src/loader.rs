use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::{
    Error, Result,
    env_subst::substitute_env,
    schema::FezConfig,
};

pub const CONFIG_FILENAME: &str = "fez.toml";

pub const ENV_TARGET: &str = "FEZ_COLLECTOR_TARGET";
pub const ENV_USERNAME: &str = "FEZ_COLLECTOR_USERNAME";
pub const ENV_NICKNAME: &str = "FEZ_COLLECTOR_NICKNAME";
pub const ENV_PASSWORD: &str = "FEZ_COLLECTOR_PASSWORD";
pub const ENV_CLOAK: &str = "FEZ_COLLECTOR_CLOAK";
pub const ENV_CONFIG_PAGE: &str = "FEZ_COLLECTOR_CONFIG_PAGE";
pub const ENV_SASL: &str = "FEZ_COLLECTOR_SASL";

/// Parse one config file, expanding `${ENV_VAR}` placeholders first.
pub fn load_config(path: &Path) -> Result<FezConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&substitute_env(&raw)).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `./fez.toml`, then `<user config dir>/fez/fez.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Some(local);
    }
    config_dir()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .filter(|path| path.exists())
}

/// The user-global config directory (`~/.config/fez/` on Linux).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "fez").map(|d| d.config_dir().to_path_buf())
}

/// Load the process configuration.
///
/// An explicit path must exist. Without one, the standard locations are
/// searched and defaults are used when nothing is found. Environment
/// overrides are applied last. Returns the config and the file it came from.
pub fn load(explicit: Option<&Path>) -> Result<(FezConfig, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };
    let mut config = match &path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(path)?
        },
        None => {
            debug!("no config file found, using defaults");
            FezConfig::default()
        },
    };
    apply_env_overrides(&mut config)?;
    Ok((config, path))
}

/// Apply `FEZ_COLLECTOR_*` variables from the process environment.
pub fn apply_env_overrides(config: &mut FezConfig) -> Result<()> {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

/// [`apply_env_overrides`] with an explicit lookup. Empty values are
/// treated as unset.
pub fn apply_env_overrides_with(
    config: &mut FezConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
    let mut applied = Vec::new();

    if let Some(target) = get(ENV_TARGET) {
        config.irc.target = target;
        applied.push(ENV_TARGET);
    }
    if let Some(username) = get(ENV_USERNAME) {
        config.irc.username = username;
        applied.push(ENV_USERNAME);
    }
    if let Some(nickname) = get(ENV_NICKNAME) {
        config.irc.nickname = Some(nickname);
        applied.push(ENV_NICKNAME);
    }
    if let Some(password) = get(ENV_PASSWORD) {
        config.irc.password = Some(Secret::new(password));
        applied.push(ENV_PASSWORD);
    }
    if let Some(cloak) = get(ENV_CLOAK) {
        config.irc.cloak = cloak;
        applied.push(ENV_CLOAK);
    }
    if let Some(page) = get(ENV_CONFIG_PAGE) {
        config.rules.locator = page;
        applied.push(ENV_CONFIG_PAGE);
    }
    if let Some(sasl) = get(ENV_SASL) {
        config.irc.sasl = parse_flag(ENV_SASL, &sasl)?;
        applied.push(ENV_SASL);
    }

    if !applied.is_empty() {
        info!(vars = ?applied, "applied environment overrides");
    }
    Ok(())
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidEnv {
            var,
            value: value.to_string(),
            expected: "one of 1/0, true/false, yes/no, on/off",
        }),
    }
}
