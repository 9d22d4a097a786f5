use crate::cmd::{diagnose, GlobalArgs};
use crate::config::Settings;
use crate::error::{MailoutError, Result};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config.toml
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
pub struct SetSenderArgs {
    /// Mailbox that sends the newsletter
    address: String,
}

/// Keep enough of a secret to recognise it
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "********".to_string()
    } else {
        format!("{}********", visible)
    }
}

/// Copy of the settings safe to print
pub fn masked(settings: &Settings) -> Settings {
    let mut copy = settings.clone();
    for secret in [
        &mut copy.graph.client_secret,
        &mut copy.firestore.access_token,
        &mut copy.firestore.api_key,
    ] {
        if let Some(value) = secret.as_mut() {
            *value = mask_secret(value);
        }
    }
    copy
}

pub async fn show(global: &GlobalArgs) -> Result<()> {
    let (manager, settings) = global.load()?;

    let rendered = toml::to_string_pretty(&masked(&settings))
        .map_err(|e| MailoutError::ConfigError(format!("Failed to serialize config: {}", e)))?;

    println!(
        "{} Effective settings ({} + .env + environment)",
        "→".cyan(),
        manager.config_file().display()
    );
    println!("{}", "─".repeat(60).dimmed());
    println!("{}", rendered.trim_end());
    Ok(())
}

pub async fn init(args: InitArgs, global: &GlobalArgs) -> Result<()> {
    let manager = global.config_manager()?;
    manager.init_file(args.force)?;

    println!(
        "{} Wrote {}",
        "✓".green(),
        manager.config_file().display()
    );
    println!(
        "\n{} Put secrets in {} or the environment, then run {}",
        "→".cyan(),
        manager.env_file().display(),
        "mailout login".bold()
    );
    Ok(())
}

pub async fn set_sender(args: SetSenderArgs, global: &GlobalArgs) -> Result<()> {
    let address = args.address.trim();
    if !address.contains('@') {
        return Err(MailoutError::InvalidConfig(format!(
            "'{}' is not an email address",
            address
        )));
    }

    let manager = global.config_manager()?;
    diagnose::update_sender(&manager, address)?;

    if std::env::var("ONEDRIVE_EMAIL").is_ok_and(|v| !v.trim().is_empty()) {
        println!(
            "{} ONEDRIVE_EMAIL is set in the environment and still takes precedence",
            "!".yellow()
        );
    }
    Ok(())
}

pub async fn path(global: &GlobalArgs) -> Result<()> {
    let manager = global.config_manager()?;
    println!("Config file: {}", manager.config_file().display());
    println!("Env file:    {}", manager.env_file().display());
    println!("Config dir:  {}", manager.config_dir().display());
    Ok(())
}
