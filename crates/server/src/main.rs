//! Shelfview
//!
//! Web file browser for a single library directory.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use server::config::{default_config_path, Config};
use server::files::{DirectoryListing, LibraryRoot, ListingRequest, NameCollator};
use server::orchestrator::{wait_for_shutdown_signal, Server};
use server::protocol::listing::{SortBy, SortOrder};
use tracing_subscriber::EnvFilter;

/// Shelfview - browse and stream a directory over HTTP.
#[derive(Parser, Debug)]
#[command(name = "shelfview")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Address to listen on (overrides config)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Library root directory (overrides config)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Print one page of a directory listing as JSON
    List {
        /// Root-anchored directory path
        #[arg(default_value = "/")]
        path: String,

        /// Index of the first entry
        #[arg(long, default_value = "0")]
        offset: usize,

        /// Maximum number of entries (defaults to the configured page size)
        #[arg(long)]
        limit: Option<usize>,

        /// Sort key: name, type, date or modified
        #[arg(long, default_value = "name")]
        sort_by: SortBy,

        /// Sort direction: asc or desc
        #[arg(long, default_value = "asc")]
        sort_order: SortOrder,

        /// Library root directory (overrides config)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    let overrides = config.apply_env_overrides();

    init_tracing(cli.verbose, &config.server.log_level);
    tracing::debug!("Using config file: {:?}", config_path);
    for o in &overrides {
        tracing::info!("Overriding configuration from {}: {}", o.var, o.value);
    }

    match cli.command {
        Commands::Start { bind, root } => {
            if let Some(bind) = bind {
                config.server.bind_addr = bind;
            }
            if let Some(root) = root {
                config.library.root = root;
            }
            config.validate()?;

            tracing::info!("Shelfview starting...");
            let server = Server::new(config)?;
            let token = server.shutdown_token();

            tokio::spawn(async move {
                wait_for_shutdown_signal().await;
                tracing::info!("Received shutdown signal");
                token.cancel();
            });

            server.run().await?;
        }
        Commands::List {
            path,
            offset,
            limit,
            sort_by,
            sort_order,
            root,
        } => {
            if let Some(root) = root {
                config.library.root = root;
            }
            config.validate()?;

            let request = ListingRequest {
                path: Some(path),
                offset,
                limit: limit.unwrap_or(config.library.page_size),
                sort_by,
                sort_order,
            };

            let response = tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
                let root = LibraryRoot::new(&config.library.root)?;
                let collator = NameCollator::new(&config.library.locale)?;
                let page = DirectoryListing::new(&root, &collator).page(&request)?;
                Ok(serde_json::to_string_pretty(&page.to_protocol())?)
            })
            .await
            .context("Listing task failed")??;

            println!("{}", response);
        }
        Commands::Config(ConfigCommands::Show) => {
            print!("{}", config.to_toml()?);
        }
        Commands::Config(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {} (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default().save(&config_path)?;
            println!("Wrote default configuration to {}", config_path.display());
        }
    }

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over everything else,
/// then `--verbose`, then the configured level.
fn init_tracing(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list() {
        let cli = Cli::try_parse_from([
            "shelfview",
            "list",
            "/photos",
            "--limit",
            "10",
            "--sort-by",
            "modified",
            "--sort-order",
            "desc",
        ])
        .unwrap();

        match cli.command {
            Commands::List {
                path,
                limit,
                sort_by,
                sort_order,
                ..
            } => {
                assert_eq!(path, "/photos");
                assert_eq!(limit, Some(10));
                assert_eq!(sort_by, SortBy::Date);
                assert_eq!(sort_order, SortOrder::Desc);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_invalid_sort() {
        assert!(Cli::try_parse_from(["shelfview", "list", "--sort-by", "size"]).is_err());
    }

    #[test]
    fn test_parse_start_with_global_flags() {
        let cli = Cli::try_parse_from([
            "shelfview",
            "start",
            "--bind",
            "0.0.0.0:8080",
            "--verbose",
            "--config",
            "/tmp/x.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.toml")));
        assert!(matches!(cli.command, Commands::Start { bind: Some(_), .. }));
    }
}
