// SPDX-FileCopyrightText: 2026 Tidedesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tidedesk - conversation state and caching core for a customer-support
//! chat backend.
//!
//! This is the binary entry point for the Tidedesk tooling.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod archive;
mod doctor;

use clap::{Parser, Subcommand};
use tidedesk_config::TidedeskConfig;
use tidedesk_core::TidedeskError;

/// Tidedesk - conversation state and caching core for a support backend.
#[derive(Parser, Debug)]
#[command(name = "tidedesk", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run diagnostic checks against config, database, and cache.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Archive resolved conversations older than the age threshold.
    Archive {
        /// Age threshold in days (defaults to `memory.archive_after_days`).
        #[arg(long)]
        days: Option<i64>,
    },
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match tidedesk_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            tidedesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.service.log_level);

    let result = match cli.command {
        Some(Commands::Doctor { plain }) => doctor::run_doctor(&config, plain).await,
        Some(Commands::Archive { days }) => archive::run_archive(&config, days)
            .await
            .map(|count| println!("archived {count} conversation(s)")),
        Some(Commands::Config) => print_config(&config),
        None => {
            println!("tidedesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("tidedesk: {e}");
        std::process::exit(1);
    }
}

/// Render the resolved configuration as TOML.
fn print_config(config: &TidedeskConfig) -> Result<(), TidedeskError> {
    let rendered = toml::to_string_pretty(config)
        .map_err(|e| TidedeskError::Internal(format!("config serialization failed: {e}")))?;
    print!("{rendered}");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tidedesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed).
        let config =
            tidedesk_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.service.name, "tidedesk");
    }

    #[test]
    fn resolved_config_renders_as_toml() {
        let config = TidedeskConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("[storage]"));
        assert!(rendered.contains("database_path"));
    }
}
