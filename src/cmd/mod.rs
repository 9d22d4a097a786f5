pub mod config;
pub mod diagnose;
pub mod login;
pub mod progress;
pub mod recipients;
pub mod render;
pub mod send;
pub mod sitemap;

use crate::config::{ConfigManager, Settings};
use crate::error::Result;
use crate::graph::GraphClient;
use clap::Args;
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Flags accepted by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Use this config.toml instead of the one in the user config directory
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Always request a fresh token and do not write the token cache
    #[arg(long, global = true)]
    pub no_cache: bool,
}

impl GlobalArgs {
    pub fn config_manager(&self) -> Result<ConfigManager> {
        ConfigManager::resolve(self.config.as_deref())
    }

    /// Config manager plus the effective settings (file, .env, environment)
    pub fn load(&self) -> Result<(ConfigManager, Settings)> {
        let manager = self.config_manager()?;
        let settings = manager.load_settings()?;
        Ok((manager, settings))
    }
}

/// Authenticated Graph client, with a spinner around token acquisition
pub async fn connect(
    settings: &Settings,
    manager: &ConfigManager,
    global: &GlobalArgs,
) -> Result<GraphClient> {
    progress::spin(
        "Acquiring access token...",
        "Access token acquired",
        "Could not acquire access token",
        GraphClient::from_settings(settings, manager, !global.no_cache),
    )
    .await
}

/// Yes/no prompt; answers `default` when stdin is not a terminal
pub fn confirm(message: &str, default: bool) -> Result<bool> {
    if !std::io::stdin().is_terminal() {
        return Ok(default);
    }

    let answer = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact()?;
    Ok(answer)
}
