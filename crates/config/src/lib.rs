//! Process configuration for the relay.
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file
//! (`--config`, `./fez.toml`, or `~/.config/fez/fez.toml`) with `${ENV_VAR}`
//! substitution, then `FEZ_COLLECTOR_*` environment variables.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, find_config_file, load, load_config},
    schema::{FeedSection, FezConfig, IrcSection, RelaySection, RulesSection},
    validate::{Diagnostic, Severity, ValidationResult, check_config, validate_file},
};
