use anyhow::Result;
use clap::Parser;
use tracing::debug;

use layerbox_cli::{
    cli::{Cli, Commands},
    commands::{self, resolve::ResolveArgs},
    logging,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = logging::init(cli.level_filter());
    debug!(data_file = %cli.data_file.display(), "starting lbx");

    match cli.command {
        Commands::Resolve {
            database,
            key,
            names,
            argument,
            precedence,
        } => commands::resolve::execute(
            &cli.data_file,
            ResolveArgs {
                database,
                key,
                names,
                argument,
                precedence: precedence.into(),
            },
            cli.format,
            &logging,
        )?,

        Commands::Get { name } => commands::store::get(&cli.data_file, &name, cli.format)?,

        Commands::Set { name, value } => commands::store::set(&cli.data_file, &name, &value)?,

        Commands::Remove { name } => commands::store::remove(&cli.data_file, &name)?,

        Commands::Clear => commands::store::clear(&cli.data_file)?,
    }

    Ok(())
}
