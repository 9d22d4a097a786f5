use crate::cmd::GlobalArgs;
use crate::error::{MailoutError, Result};
use crate::sitemap::{self, ChangeFreq};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SitemapArgs {
    /// Site root to scan (defaults to [sitemap].root)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Public URL of the site root, e.g. https://user.github.io/site
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Output file (defaults to <root>/sitemap.xml)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Additional directory names to skip
    #[arg(long, value_name = "NAME")]
    exclude: Vec<String>,

    #[arg(long, value_enum)]
    changefreq: Option<ChangeFreq>,

    /// Between 0.0 and 1.0
    #[arg(long)]
    priority: Option<f64>,
}

pub async fn generate(args: SitemapArgs, global: &GlobalArgs) -> Result<()> {
    let (_, settings) = global.load()?;
    let config = settings.sitemap;

    let base_url = args
        .base_url
        .or(config.base_url)
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| {
            MailoutError::ConfigError(
                "Site base URL is not configured (--base-url or SITEMAP_BASE_URL)".into(),
            )
        })?;

    let priority = args.priority.unwrap_or(config.priority);
    if !(0.0..=1.0).contains(&priority) {
        return Err(MailoutError::InvalidConfig(format!(
            "Priority must be between 0.0 and 1.0, got {}",
            priority
        )));
    }

    let root = args.root.unwrap_or(config.root);
    if !root.is_dir() {
        return Err(MailoutError::ConfigError(format!(
            "Site root {} is not a directory",
            root.display()
        )));
    }

    let mut exclude = config.exclude;
    exclude.extend(args.exclude);

    let entries = sitemap::collect_entries(&root, &base_url, &exclude)?;
    let xml = sitemap::generate(
        &entries,
        args.changefreq.unwrap_or(config.changefreq),
        priority,
    );

    let output = args
        .output
        .or(config.output)
        .unwrap_or_else(|| sitemap::default_output(&root));
    sitemap::write_sitemap(&output, &xml)?;

    println!(
        "{} Sitemap generated at {} with {} URLs",
        "✓".green(),
        output.display(),
        entries.len()
    );
    Ok(())
}
