//! # Multi Search CLI (`msearch`)
//!
//! Runs the search-scheme plugin against a local console host.
//!
//! ## Usage
//!
//! ```bash
//! msearch --config ./config/msearch.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `msearch console` | Read command lines from stdin until `exit` |
//! | `msearch exec <line>` | Run one command line and wait for its output |
//!
//! ## Examples
//!
//! ```bash
//! # Create a scheme, then edit data/google/.ms_scheme.meta.toml
//! msearch exec '!!ms new google'
//!
//! # Search with it
//! msearch exec '!!g rust ownership'
//!
//! # Interactive session
//! msearch console
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;

use multi_search::config::load_config;
use multi_search::console::ConsoleHost;
use multi_search::logging::{init_logging, LogFormat};

/// Multi Search CLI — keyword search schemes for chat commands.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file with at least a `[plugin] data_dir` entry.
#[derive(Parser)]
#[command(
    name = "msearch",
    about = "Multi Search — map chat command prefixes to search URL templates",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/msearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive console.
    ///
    /// Each stdin line is dispatched as a command (e.g. `!!ms list`,
    /// `!!g keyword`). `exit` or `quit` ends the session.
    Console,

    /// Run a single command line.
    ///
    /// Waits for background searches to finish before exiting.
    Exec {
        /// The command line, e.g. `!!ms new google`.
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    init_logging(LogFormat::parse(&config.logging.format)?, &config.logging.level)?;

    let host = ConsoleHost::stdout(config);
    let mut registry = host.load_plugin()?;

    match cli.command {
        Commands::Console => {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = line?;
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed == "exit" || trimmed == "quit" {
                    break;
                }
                host.run_line(&mut registry, trimmed)?;
            }
        }
        Commands::Exec { line } => {
            host.run_line(&mut registry, &line.join(" "))?;
        }
    }

    host.wait_idle();
    Ok(())
}
