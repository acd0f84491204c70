use crate::cli::CliContext;
use crate::constants;
use crate::models::creds_file;
use crate::util::generate::generate_password;
use anyhow::{bail, Context, Result};
use clap::Args;
use dialoguer::Password;
use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

fn parse_service_name(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("service name cannot be empty".into());
    }
    if s.starts_with('/') || s.ends_with('/') {
        return Err("service name cannot start or end with '/'".into());
    }
    Ok(s.to_string())
}

fn parse_username(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        return Err("username cannot be empty".into());
    }
    if s.contains('/') {
        return Err("username cannot contain '/'".into());
    }
    Ok(s.to_string())
}

/// Tuning knobs for generated passwords, shared by `add` and `rotate`.
#[derive(Args, Debug)]
pub struct GeneratorArgs {
    /// Minimum digit substitutions in a generated password
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub min_digits: usize,

    /// Minimum special-character substitutions in a generated password
    #[arg(long, default_value_t = 1, value_name = "N")]
    pub min_specials: usize,

    /// Minimum generated password length
    #[arg(long, default_value_t = constants::DEFAULT_MIN_PASS_LEN, value_name = "LEN")]
    pub min_length: usize,

    /// Maximum generated password length
    #[arg(long, default_value_t = constants::DEFAULT_MAX_PASS_LEN, value_name = "LEN")]
    pub max_length: usize,
}

impl GeneratorArgs {
    fn generate(&self) -> Result<Zeroizing<String>> {
        if self.min_length > self.max_length {
            bail!("--min-length must not exceed --max-length");
        }
        Ok(Zeroizing::new(generate_password(
            self.min_digits,
            self.min_specials,
            self.min_length,
            self.max_length,
        )))
    }
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Service name
    #[arg(
        value_parser = parse_service_name,
        required_unless_present = "file",
        conflicts_with = "file"
    )]
    pub service: Option<String>,

    /// Username
    #[arg(
        long,
        short = 'u',
        value_parser = parse_username,
        required_unless_present = "file",
        conflicts_with = "file"
    )]
    pub username: Option<String>,

    /// Password (prompted for when neither --password nor --generate is given)
    #[arg(long, short = 'p', conflicts_with = "generate")]
    pub password: Option<String>,

    /// Generate a password
    #[arg(long, short = 'g')]
    pub generate: bool,

    /// Bulk-import credentials from a JSON file
    #[arg(long, short = 'f', value_name = "FILE")]
    pub file: Option<PathBuf>,

    #[command(flatten)]
    pub generator: GeneratorArgs,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Service name
    #[arg(value_parser = parse_service_name)]
    pub service: String,

    /// Username
    #[arg(long, short = 'u', value_parser = parse_username)]
    pub username: String,
}

#[derive(Args, Debug)]
pub struct RotateArgs {
    /// Service name
    #[arg(value_parser = parse_service_name)]
    pub service: String,

    /// Username
    #[arg(long, short = 'u', value_parser = parse_username)]
    pub username: String,

    /// New password (generated when omitted)
    #[arg(long, short = 'p')]
    pub password: Option<String>,

    #[command(flatten)]
    pub generator: GeneratorArgs,
}

pub fn run_add(ctx: &CliContext, args: AddArgs) -> Result<()> {
    if let Some(file) = &args.file {
        return run_add_file(ctx, file);
    }
    let service = args.service.as_deref().context("service name is required")?;
    let username = args.username.as_deref().context("--username is required")?;

    let (password, generated) = if let Some(password) = &args.password {
        (Zeroizing::new(password.clone()), false)
    } else if args.generate {
        (args.generator.generate()?, true)
    } else {
        let prompted = Password::new()
            .with_prompt(format!("Password for {}/{}", service, username))
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()
            .context("read password")?;
        (Zeroizing::new(prompted), false)
    };

    ctx.vault.add(service, username, &password)?;
    if generated {
        println!("Added {}/{} with generated password: {}", service, username, *password);
    } else {
        println!("Added {}/{}", service, username);
    }
    Ok(())
}

fn run_add_file(ctx: &CliContext, file: &Path) -> Result<()> {
    let creds = creds_file::read_creds_file(file)?;
    if creds.is_empty() {
        println!("No credentials in {}", file.display());
        return Ok(());
    }
    let total = creds.len();

    let results = ctx.vault.add_multi(creds);
    let mut failures = 0;
    for result in &results {
        match &result.error {
            None => println!("added {}/{}", result.service, result.username),
            Some(err) => {
                failures += 1;
                eprintln!("failed {}/{}: {}", result.service, result.username, err);
            }
        }
    }
    if failures > 0 {
        bail!("{} of {} credentials failed to import", failures, total);
    }
    println!("Imported {} credentials", total);
    Ok(())
}

pub fn run_delete(ctx: &CliContext, args: DeleteArgs) -> Result<()> {
    match ctx.vault.delete(&args.service, &args.username) {
        Ok(()) => {
            println!("Deleted {}/{}", args.service, args.username);
            Ok(())
        }
        Err(err) if err.is_not_found() => bail!("nothing to delete: {}", err),
        Err(err) => Err(err.into()),
    }
}

pub fn run_rotate(ctx: &CliContext, args: RotateArgs) -> Result<()> {
    if !ctx.vault.has_service(&args.service) {
        bail!("service {} does not exist", args.service);
    }
    let (password, generated) = match &args.password {
        Some(password) => (Zeroizing::new(password.clone()), false),
        None => (args.generator.generate()?, true),
    };
    ctx.vault.replace(&args.service, &args.username, &password)?;
    if generated {
        println!(
            "Rotated {}/{} to generated password: {}",
            args.service, args.username, *password
        );
    } else {
        println!("Rotated {}/{}", args.service, args.username);
    }
    Ok(())
}
