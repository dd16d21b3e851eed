mod bootstrap;
mod check_commands;

use std::{path::PathBuf, process::ExitCode};

use {
    clap::{Parser, Subcommand},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "fez", version, about = "fez: Wikimedia recent changes, relayed to IRC")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (defaults to ./fez.toml, then ~/.config/fez/fez.toml).
    #[arg(long, global = true, env = "FEZ_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect and relay until told to stop (the default).
    Run,
    /// Validate the configuration and the rules document, then exit.
    Check {
        /// Also show informational diagnostics.
        #[arg(short, long)]
        verbose: bool,
        /// Do not fetch the rules document.
        #[arg(long)]
        skip_rules: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    match cli.command {
        None | Some(Commands::Run) => {
            info!(version = env!("CARGO_PKG_VERSION"), "fez starting");
            bootstrap::run(cli.config.as_deref()).await
        },
        Some(Commands::Check {
            verbose,
            skip_rules,
        }) => check_commands::check(cli.config.as_deref(), verbose, skip_rules).await,
    }
}
