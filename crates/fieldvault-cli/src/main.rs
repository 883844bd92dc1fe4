//! `fieldvault`: operator CLI entry point.
//!
//! Startup sequence:
//! 1. Parse the command line.
//! 2. Load and validate [`Config`](config::Config) from environment variables.
//! 3. Initialise structured JSON logging on stderr.
//! 4. Run the command against `<SETTINGS_PREFIX>_*` environment settings.

mod commands;
mod config;
mod output;
mod telemetry;

use anyhow::Result;
use clap::Parser;
use fieldvault::EnvSettings;

#[derive(Parser)]
#[command(name = "fieldvault")]
#[command(about = "Encrypt, decrypt, rotate, and tokenise sensitive field values")]
#[command(version)]
#[command(
    after_help = "Keys are read from FIELDVAULT_KEYS / FIELDVAULT_KEY_V<n>, the default version from \
                  FIELDVAULT_CURRENT_KEY_ID, and the search salt from FIELDVAULT_SEARCH_SALT."
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Command line
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: fieldvault configuration invalid: {e}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;

    // -----------------------------------------------------------------------
    // 4. Command
    // -----------------------------------------------------------------------
    let settings = EnvSettings::with_prefix(cfg.settings_prefix.trim());
    let stdin = std::io::stdin().lock();
    let mut stdout = std::io::stdout().lock();
    commands::run(cli.command, settings, stdin, &mut stdout)
}
