//! Checks for the usual reasons a newsletter run fails: bad app credentials,
//! missing Application permissions, a sender without an Exchange mailbox.

use crate::cmd::{confirm, connect, login::print_token, progress, GlobalArgs};
use crate::config::{ConfigManager, Settings};
use crate::error::{MailoutError, Result};
use crate::graph::auth::{self, Credentials, GraphAuth};
use crate::graph::directory::{self, LicenseSummary, User};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct UserArgs {
    /// Mailbox to look up (defaults to the configured sender)
    address: Option<String>,
}

#[derive(Args, Debug)]
pub struct UsersArgs {
    /// Offer to store the first candidate as the sender in config.toml
    #[arg(long)]
    set_sender: bool,

    /// Answer yes to the sender prompt
    #[arg(short, long)]
    yes: bool,
}

fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
    println!("{}", "─".repeat(60).dimmed());
}

fn print_hints(hints: &[&str]) {
    if hints.is_empty() {
        return;
    }
    println!("\n  {}", "Possible causes:".yellow());
    for hint in hints {
        println!("    • {}", hint);
    }
}

/// Request a fresh token and show what came back
pub async fn token(global: &GlobalArgs) -> Result<()> {
    let (manager, settings) = global.load()?;
    section("Access token");

    let credentials = Credentials::from_settings(&settings)?;
    let graph_auth =
        GraphAuth::new(manager).with_authority(settings.graph.authority.as_deref());

    let result = progress::spin(
        "Requesting a new token...",
        "Token acquired",
        "Token request failed",
        graph_auth.acquire_token(&credentials),
    )
    .await;

    match result {
        Ok(token) => {
            print_token(&token);
            Ok(())
        }
        Err(e) => {
            let message = e.to_string();
            println!("  {} {}", "✗".red(), message);
            print_hints(auth::token_error_hints(&message));
            Err(e)
        }
    }
}

fn print_user(user: &User) {
    let show = |v: Option<&str>| v.unwrap_or("(none)").to_string();
    println!("  Display name: {}", show(user.display_name.as_deref()));
    println!("  UPN:          {}", show(user.user_principal_name.as_deref()));
    println!("  Mail:         {}", show(user.mail.as_deref()));
    println!(
        "  Enabled:      {}",
        user.account_enabled
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown".into())
    );
    println!("  User type:    {}", show(user.user_type.as_deref()));
    if let Some(state) = &user.external_user_state {
        println!("  External:     {}", state);
    }
    println!("  Licences:     {}", user.assigned_licenses.len());
}

fn default_address(settings: &Settings, explicit: Option<String>) -> Result<String> {
    explicit
        .or_else(|| settings.graph.sender.clone())
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| {
            MailoutError::ConfigError(
                "No address given and ONEDRIVE_EMAIL is not set".into(),
            )
        })
}

/// Look up one mailbox and explain the result
pub async fn user(args: UserArgs, global: &GlobalArgs) -> Result<()> {
    let (manager, settings) = global.load()?;
    let address = default_address(&settings, args.address)?;
    let client = connect(&settings, &manager, global).await?;

    section(&format!("User {}", address));

    match directory::get_user(&client, &address).await {
        Ok(user) => {
            print_user(&user);

            if user.is_guest() {
                println!(
                    "\n  {} Guest accounts usually have no Exchange mailbox and cannot send",
                    "!".yellow()
                );
            }
            if !user.is_enabled() {
                println!("\n  {} The account is disabled", "!".yellow());
            }
            if user.assigned_licenses.is_empty() {
                println!(
                    "\n  {} No licences assigned: sendMail needs an Exchange Online mailbox",
                    "!".yellow()
                );
            }
            Ok(())
        }
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            match e.status() {
                Some(404) => print_hints(&[
                    "The user does not exist in this tenant",
                    "Check ONEDRIVE_EMAIL, or run 'mailout diagnose users'",
                ]),
                Some(403) => print_hints(&[
                    "User.Read.All (Application) is not granted",
                    "Admin consent has not been given for the app registration",
                ]),
                _ => {}
            }
            Err(e)
        }
    }
}

/// Enabled users with an address, in directory order
pub fn sender_candidates(users: &[User]) -> Vec<&User> {
    users
        .iter()
        .filter(|u| u.is_enabled() && u.address().is_some())
        .collect()
}

/// List tenant users and point out which can be senders
pub async fn users(args: UsersArgs, global: &GlobalArgs) -> Result<()> {
    let (manager, settings) = global.load()?;
    let client = connect(&settings, &manager, global).await?;

    let users = progress::spin(
        "Listing users...",
        "Users listed",
        "Could not list users",
        directory::list_users(&client),
    )
    .await?;

    section(&format!("Users ({})", users.len()));
    for user in &users {
        let marker = if !user.is_enabled() {
            "✗".red()
        } else if user.is_guest() {
            "!".yellow()
        } else {
            "✓".green()
        };
        println!(
            "  {} {:<40} {}",
            marker,
            user.address().unwrap_or("(no address)"),
            user.display_name.as_deref().unwrap_or("").dimmed()
        );
    }

    let candidates = sender_candidates(&users);
    if candidates.is_empty() {
        println!("\n{} No enabled users with an address found", "!".yellow());
        return Ok(());
    }

    println!(
        "\n{} {} candidate sender(s); guests ({}) usually cannot send",
        "→".cyan(),
        candidates.len(),
        "!".yellow()
    );

    if args.set_sender {
        if let Some(address) = candidates.iter().find(|u| !u.is_guest()).and_then(|u| u.address()) {
            let prompt = format!("Use {} as the sender in config.toml?", address);
            if args.yes || confirm(&prompt, false)? {
                update_sender(&manager, address)?;
            }
        }
    }

    Ok(())
}

pub fn update_sender(manager: &ConfigManager, address: &str) -> Result<()> {
    let old = manager.set_sender(address)?;
    println!(
        "{} Sender updated in {}: {} → {}",
        "✓".green(),
        manager.config_file().display(),
        old.as_deref().unwrap_or("(unset)"),
        address.bold()
    );
    Ok(())
}

/// Summarize subscribed SKUs and whether any include Exchange
pub async fn licenses(global: &GlobalArgs) -> Result<()> {
    let (manager, settings) = global.load()?;
    let client = connect(&settings, &manager, global).await?;

    section("Organization");
    match directory::get_organization(&client).await? {
        Some(org) => {
            println!(
                "  Name:   {}",
                org.display_name.as_deref().unwrap_or("(unknown)")
            );
            if let Some(domain) = org.verified_domains.first().and_then(|d| d.name.as_deref()) {
                println!("  Domain: {}", domain);
            }
        }
        None => println!("  {} Organization details not returned", "!".yellow()),
    }

    let skus = directory::list_subscribed_skus(&client).await?;
    let summaries: Vec<LicenseSummary> = skus.iter().map(LicenseSummary::from).collect();

    section(&format!("Subscribed SKUs ({})", summaries.len()));
    for sku in &summaries {
        let kind = if sku.is_free { "free".dimmed() } else { "paid".green() };
        let exchange = if sku.has_exchange {
            "Exchange".green()
        } else {
            "no Exchange".dimmed()
        };
        println!(
            "  {:<36} {:>5} available ({} used)  {}  {}",
            sku.name, sku.available, sku.consumed, kind, exchange
        );
    }

    let paid = summaries.iter().filter(|s| !s.is_free).count();
    println!();
    if paid > 0 {
        println!("{} {} paid licence SKU(s) found", "✓".green(), paid);
    } else {
        println!(
            "{} Only free licences found: the sender will not have an Exchange mailbox",
            "!".yellow()
        );
    }
    if !summaries.iter().any(|s| s.has_exchange && !s.is_free) {
        println!(
            "{} No paid SKU includes Exchange Online; sendMail will fail with MailboxNotEnabledForRESTAPI",
            "!".yellow()
        );
    }

    Ok(())
}

pub fn guide() {
    section("Troubleshooting checklist");

    println!("  1. App registration (Azure portal → App registrations)");
    println!("     API permissions → Microsoft Graph → {}:", "Application permissions".bold());
    for (permission, purpose) in auth::REQUIRED_PERMISSIONS {
        println!("       • {:<15} {}", permission, purpose.dimmed());
    }
    println!("     Then click 'Grant admin consent'.");
    println!();
    println!("  2. Credentials");
    println!("     TENANT_ID, CLIENT_ID and CLIENT_SECRET must belong to that registration.");
    println!("     Client secrets expire; create a new one if login fails with invalid_client.");
    println!();
    println!("  3. Sender mailbox (ONEDRIVE_EMAIL)");
    println!("     Must be a member user with an Exchange Online licence.");
    println!("     Guest and unlicensed users cannot send through Graph.");
    println!();
    println!("  4. Recipient file");
    println!("     RECIPIENT_FILE_PATH is relative to the sender's OneDrive root.");
    println!();
    println!(
        "{} Run {} to check each step",
        "→".cyan(),
        "mailout diagnose all".bold()
    );
}

/// token → user → guide, stopping at the first failure
pub async fn all(global: &GlobalArgs) -> Result<()> {
    token(global).await?;
    user(UserArgs { address: None }, global).await?;
    guide();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sender_candidates() {
        let users: Vec<User> = serde_json::from_value(json!([
            {"mail": "news@contoso.com", "accountEnabled": true, "userType": "Member"},
            {"mail": "old@contoso.com", "accountEnabled": false},
            {"mail": null, "userPrincipalName": null, "accountEnabled": true},
            {"userPrincipalName": "guest_x.com#EXT#@contoso.onmicrosoft.com", "accountEnabled": true, "userType": "Guest"}
        ]))
        .unwrap();

        let candidates = sender_candidates(&users);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].address(), Some("news@contoso.com"));
        assert!(candidates[1].is_guest());
    }

    #[test]
    fn test_default_address() {
        let mut settings = Settings::default();
        assert!(default_address(&settings, None).is_err());
        settings.graph.sender = Some("news@contoso.com".into());
        assert_eq!(default_address(&settings, None).unwrap(), "news@contoso.com");
        assert_eq!(
            default_address(&settings, Some("other@contoso.com".into())).unwrap(),
            "other@contoso.com"
        );
    }
}
