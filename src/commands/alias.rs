use anyhow::Result;
use clap::Subcommand;

use super::context::Context;
use crate::runtime::Runtime;

#[derive(Subcommand, Debug)]
pub enum AliasCommand {
    /// Map a friendly name to a base, table, view or column id
    Set { name: String, id: String },

    /// List aliases
    List,

    /// Remove an alias
    Remove { name: String },
}

#[tracing::instrument(skip(ctx))]
pub fn run<R: Runtime>(ctx: &mut Context<R>, command: AliasCommand) -> Result<()> {
    match command {
        AliasCommand::Set { name, id } => {
            ctx.settings.set_alias(&name, &id)?;
            ctx.save()?;
            ctx.output.status(&format!("{} -> {}", name, id));
        }
        AliasCommand::List => ctx.output.emit(&ctx.settings.aliases)?,
        AliasCommand::Remove { name } => {
            let id = ctx.settings.remove_alias(&name)?;
            ctx.save()?;
            ctx.output.status(&format!("Removed alias '{}' ({})", name, id));
        }
    }
    Ok(())
}
