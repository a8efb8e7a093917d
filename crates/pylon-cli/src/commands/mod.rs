use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pylon_config::{ConfigLoader, PylonConfig};

mod plugins;
mod run;

/// Pylon: plugin discovery and signature trust for the host
#[derive(Parser)]
#[command(name = "pylon", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to pylon.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover plugins in every configured directory
    Scan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a registered plugin
    Info {
        /// Plugin id
        id: String,
    },
    /// List static asset routes served for external plugins
    Routes,
    /// List plugins rejected by signature checks and other load faults
    Errors,
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discover plugins, then check for updates until interrupted
    Run,
}

impl Cli {
    pub async fn run(self) -> pylon_core::Result<()> {
        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        // Resolve log level: --verbose > --quiet > --log-level > config
        let log_level = if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            self.log_level.as_deref().unwrap_or(&config.logging.level)
        };
        init_tracing(&config, log_level);

        match self.command {
            Commands::Scan { json } => plugins::cmd_scan(config, json),
            Commands::Info { id } => plugins::cmd_info(config, &id),
            Commands::Routes => plugins::cmd_routes(config),
            Commands::Errors => plugins::cmd_errors(config),
            Commands::Config { json } => Self::cmd_config(config, json),
            Commands::Run => run::cmd_run(config).await,
        }
    }

    fn cmd_config(config: PylonConfig, json: bool) -> pylon_core::Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config)
                    .map_err(|e| pylon_core::PylonError::Config(e.to_string()))?
            );
        }
        Ok(())
    }
}

fn init_tracing(config: &PylonConfig, log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pylon", "scan", "--json", "-v", "-c", "/tmp/pylon.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/pylon.toml")));
        assert!(matches!(cli.command, Commands::Scan { json: true }));
    }

    #[test]
    fn verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["pylon", "-v", "-q", "routes"]).is_err());
    }

    #[test]
    fn info_requires_id() {
        assert!(Cli::try_parse_from(["pylon", "info"]).is_err());
        let cli = Cli::try_parse_from(["pylon", "info", "acme-panel"]).unwrap();
        assert!(matches!(cli.command, Commands::Info { ref id } if id == "acme-panel"));
    }
}
