use crate::cli::CliContext;
use crate::models::creds_file::{self, FileCred};
use anyhow::{bail, Result};
use chrono::Local;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Output file (default: credvault-backup-<timestamp>.json)
    #[arg(long, short = 'f', value_name = "FILE")]
    pub file: Option<PathBuf>,
}

/// Export every credential to a creds file. Unreadable credentials are
/// reported individually and skipped; whatever could be read is written.
pub fn run(ctx: &CliContext, args: BackupArgs) -> Result<()> {
    let path = args.file.unwrap_or_else(|| {
        PathBuf::from(format!(
            "credvault-backup-{}.json",
            Local::now().format("%Y%m%d-%H%M%S")
        ))
    });

    let mut creds = Vec::new();
    let mut failures = 0;
    for service in ctx.vault.list_services("") {
        let users = match ctx.vault.get_users_for_service(&service) {
            Ok(users) => users,
            Err(err) => {
                failures += 1;
                eprintln!("failed to list users for {}: {}", service, err);
                continue;
            }
        };
        for username in users {
            match ctx.vault.get(&service, &username) {
                Ok(password) => creds.push(FileCred {
                    service: service.clone(),
                    username,
                    password,
                }),
                Err(err) => {
                    failures += 1;
                    eprintln!("failed to read {}/{}: {}", service, username, err);
                }
            }
        }
    }

    creds_file::write_creds_file(&path, &creds)?;
    println!("Wrote {} credentials to {}", creds.len(), path.display());
    if failures > 0 {
        bail!("{} credentials could not be read", failures);
    }
    Ok(())
}
