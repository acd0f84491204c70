use crate::cli::CliContext;
use anyhow::{bail, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Table};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Service name or prefix (omit to list everything)
    #[arg(value_name = "SERVICE")]
    pub service: Option<String>,

    /// Print the stored password for this username
    #[arg(long, short = 'u', value_name = "USER")]
    pub username: Option<String>,
}

pub fn run(ctx: &CliContext, args: SearchArgs) -> Result<()> {
    if let Some(username) = &args.username {
        let Some(service) = args.service.as_deref() else {
            bail!("--username requires a service name");
        };
        let value = ctx.vault.get(service, username)?;
        println!("{}", value);
        return Ok(());
    }

    let prefix = args.service.as_deref().unwrap_or("");
    let names = ctx.vault.list_services(prefix);
    if names.is_empty() {
        println!("No services found");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        Cell::new("Service").add_attribute(Attribute::Bold),
        Cell::new("Users").add_attribute(Attribute::Bold),
    ]);
    for name in names {
        let users = ctx.vault.get_users_for_service(&name)?;
        table.add_row(vec![name, users.join(", ")]);
    }
    println!("{}", table);
    Ok(())
}
