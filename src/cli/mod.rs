//! CLI routing and command dispatch.

use crate::core::ssm::SsmStore;
use crate::core::vault::Vault;
use crate::models::config::{self, Config};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

pub mod backup;
pub mod credential;
pub mod search;

/// Shared context passed to all command handlers.
pub struct CliContext {
    pub config: Config,
    pub vault: Vault,
}

#[derive(Parser, Debug)]
#[command(
    name = "credvault",
    version,
    about = "Personal credential manager backed by AWS SSM Parameter Store",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    /// Config file path (default: ~/.credvault/config.toml)
    #[arg(long, global = true, value_name = "PATH", env = "CREDVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Service name or prefix to search for when no command is given
    #[arg(value_name = "SERVICE")]
    pub service: Option<String>,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => config::default_path()?,
        };
        let config = Config::load(&config_path)?;

        let store = SsmStore::connect(config.aws.profile.as_deref())
            .context("connect to parameter store")?;
        let vault = Vault::discover(Arc::new(store), config.vault_settings())
            .context("load vault from backend")?;

        let ctx = CliContext { config, vault };

        match self.command {
            None => search::run(
                &ctx,
                search::SearchArgs {
                    service: self.service,
                    username: None,
                },
            ),
            Some(Commands::Search(args)) => search::run(&ctx, args),
            Some(Commands::Add(args)) => credential::run_add(&ctx, args),
            Some(Commands::Delete(args)) => credential::run_delete(&ctx, args),
            Some(Commands::Rotate(args)) => credential::run_rotate(&ctx, args),
            Some(Commands::Backup(args)) => backup::run(&ctx, args),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List services and users, or show a stored password
    #[command(alias = "s")]
    Search(search::SearchArgs),
    /// Add a credential for a service, or bulk-import from a file
    #[command(alias = "a")]
    Add(credential::AddArgs),
    /// Delete a credential for a service
    #[command(alias = "d")]
    Delete(credential::DeleteArgs),
    /// Replace a credential's password
    #[command(alias = "r")]
    Rotate(credential::RotateArgs),
    /// Export every credential to a JSON file
    #[command(alias = "b")]
    Backup(backup::BackupArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_service_is_search() {
        let cli = Cli::parse_from(["credvault", "gmail"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.service.as_deref(), Some("gmail"));
    }

    #[test]
    fn test_add_flags() {
        let cli = Cli::parse_from(["credvault", "add", "gmail", "-u", "alice", "-p", "pw"]);
        match cli.command {
            Some(Commands::Add(args)) => {
                assert_eq!(args.service.as_deref(), Some("gmail"));
                assert_eq!(args.username.as_deref(), Some("alice"));
                assert_eq!(args.password.as_deref(), Some("pw"));
                assert!(!args.generate);
            }
            other => panic!("expected add command, got {other:?}"),
        }
    }

    #[test]
    fn test_add_file_mode() {
        let cli = Cli::parse_from(["credvault", "a", "--file", "creds.json"]);
        match cli.command {
            Some(Commands::Add(args)) => {
                assert!(args.service.is_none());
                assert_eq!(args.file.as_deref(), Some(std::path::Path::new("creds.json")));
            }
            other => panic!("expected add command, got {other:?}"),
        }
    }

    #[test]
    fn test_add_requires_service_without_file() {
        assert!(Cli::try_parse_from(["credvault", "add", "-u", "alice"]).is_err());
    }

    #[test]
    fn test_password_conflicts_with_generate() {
        assert!(Cli::try_parse_from([
            "credvault", "add", "gmail", "-u", "alice", "-p", "pw", "-g"
        ])
        .is_err());
    }
}
