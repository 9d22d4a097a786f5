use crate::cmd::{progress, GlobalArgs};
use crate::config::TokenCache;
use crate::error::Result;
use crate::graph::auth::{Credentials, GraphAuth};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Request a new token even if the cached one is still valid
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {}

/// Safely truncate a string to n characters (not bytes)
fn truncate_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

pub fn print_token(token: &TokenCache) {
    println!(
        "  Token type: {}",
        token.token_type.as_deref().unwrap_or("Bearer")
    );
    println!(
        "  Expires:    {}",
        token.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Scope:      {}",
        token.scope.as_deref().unwrap_or("(not reported)")
    );
    println!("  Tenant ID:  {}...", truncate_chars(&token.tenant_id, 8));
    println!("  Client ID:  {}...", truncate_chars(&token.client_id, 8));
}

pub async fn login(args: LoginArgs, global: &GlobalArgs) -> Result<()> {
    let (manager, settings) = global.load()?;
    let credentials = Credentials::from_settings(&settings)?;
    let auth = GraphAuth::new(manager).with_authority(settings.graph.authority.as_deref());

    let use_cache = !global.no_cache && !args.force;
    let token = progress::spin(
        "Requesting access token...",
        "Authenticated with client credentials",
        "Authentication failed",
        auth.access_token(&credentials, use_cache),
    )
    .await?;

    if args.force && !global.no_cache {
        auth.store(&token)?;
    }

    print_token(&token);
    if global.no_cache {
        println!("\n{} Token not cached (--no-cache)", "!".yellow());
    }

    Ok(())
}

pub async fn logout(_args: LogoutArgs, global: &GlobalArgs) -> Result<()> {
    let (manager, settings) = global.load()?;
    let credentials = Credentials::from_settings(&settings)?;
    let auth = GraphAuth::new(manager);

    if auth.logout(&credentials)? {
        println!("{} Cached token removed", "✓".green());
    } else {
        println!("{} No cached token for this app registration", "!".yellow());
    }

    Ok(())
}
