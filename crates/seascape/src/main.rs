mod cli;
mod paths;
mod run;

use anyhow::{Context, Result};
use cli::{Command, ConfigAction, RunArgs};
use paths::AppPaths;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Config(config_cmd)) => handle_config_command(config_cmd.action, &cli.run),
        None => run::run(cli.run),
    }
}

fn handle_config_command(action: ConfigAction, args: &RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    match action {
        ConfigAction::Show => {
            let (_, config) = run::effective_config(&paths, args)?;
            let rendered = config
                .to_toml_string()
                .context("failed to render configuration")?;
            print!("{rendered}");
            if config.assets.root.is_none() {
                println!("# assets.root defaults to \"{}\"", run::DEFAULT_ASSET_ROOT);
            }
        }
        ConfigAction::Where => {
            let path = paths.resolve_config_file(args.config.as_deref());
            println!("{}", path.display());
        }
    }
    Ok(())
}
