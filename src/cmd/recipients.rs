use crate::cmd::{connect, progress, GlobalArgs};
use crate::config::SourceKind;
use crate::error::Result;
use crate::recipients::RecipientSource;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct RecipientsArgs {
    /// Where to fetch the mailing list from
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// File path (local, or relative to the OneDrive root)
    #[arg(long)]
    path: Option<String>,

    /// Only print the number of recipients
    #[arg(long)]
    count: bool,
}

pub async fn list(args: RecipientsArgs, global: &GlobalArgs) -> Result<()> {
    let (manager, mut settings) = global.load()?;
    if let Some(source) = args.source {
        settings.recipients.source = source;
    }
    if let Some(path) = args.path {
        settings.recipients.path = path;
    }

    let source = RecipientSource::from_settings(&settings)?;
    let client = if source.needs_graph() {
        Some(connect(&settings, &manager, global).await?)
    } else {
        None
    };

    let recipients = progress::spin(
        &format!("Fetching recipients from {}...", source),
        &format!("Fetched from {}", settings.recipients.source.display_name()),
        "Could not fetch recipients",
        source.fetch(client.as_ref()),
    )
    .await?;

    if recipients.is_empty() {
        println!("{} No valid email addresses found", "!".yellow());
        return Ok(());
    }

    if !args.count {
        println!("\n{}", "Recipients:".bold());
        println!("{}", "─".repeat(60));
        for (i, address) in recipients.iter().enumerate() {
            println!("{:>4}. {}", i + 1, address);
        }
        println!("{}", "─".repeat(60));
    }

    println!("{} {} recipient(s)", "✓".green(), recipients.len());
    Ok(())
}
