//! `convoy config` - where the configuration lives and what it resolves to

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;

use convoy_core::EngineConfig;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the config file path and the data locations it implies
    Path,

    /// Print the effective configuration as TOML
    Show,
}

pub fn run(action: ConfigAction, config: &EngineConfig, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Path => {
            let exists = if config_path.exists() { "" } else { " (not created)" };
            println!("config:      {}{}", config_path.display(), exists);
            println!("database:    {}", config.database_path().display());
            println!("credentials: {}", config.credentials_path().display());
            println!("logs:        {}", config.logs_dir().display());
        }
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
        }
    }
    Ok(())
}
