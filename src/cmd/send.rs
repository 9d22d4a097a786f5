use crate::cmd::{connect, progress, GlobalArgs};
use crate::config::{ConfigManager, Settings, SourceKind};
use crate::error::Result;
use crate::graph::mail::{self, Newsletter, SendOutcome};
use crate::graph::{ApiVersion, GraphClient};
use crate::recipients::RecipientSource;
use crate::templates;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Send to these addresses instead of the configured list
    #[arg(long = "to", value_name = "ADDRESS")]
    to: Vec<String>,

    /// Where to fetch the mailing list from
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// Sender mailbox (defaults to ONEDRIVE_EMAIL)
    #[arg(long, value_name = "ADDRESS")]
    from: Option<String>,

    /// Subject line (defaults to "<subject_prefix> - <date>")
    #[arg(long)]
    subject: Option<String>,

    /// HTML template; created with the built-in content if missing
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Extra template values, e.g. --var custom_message="Spring edition"
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,

    /// Use the Graph beta endpoint
    #[arg(long)]
    beta: bool,

    /// Print the sendMail payload instead of sending it
    #[arg(long)]
    dry_run: bool,
}

pub async fn send(args: SendArgs, global: &GlobalArgs) -> Result<()> {
    let (manager, mut settings) = global.load()?;
    if let Some(source) = args.source {
        settings.recipients.source = source;
    }

    let now = chrono::Utc::now();
    let template_path = args
        .template
        .clone()
        .unwrap_or_else(|| settings.newsletter.template.clone());

    if templates::ensure_template(&template_path)? {
        println!(
            "{} Created default template at {}",
            "→".cyan(),
            template_path.display()
        );
    }

    let mut context = templates::default_context(now, &settings.newsletter);
    for raw in &args.vars {
        let (key, value) = templates::parse_var(raw)?;
        context.insert(key, value);
    }
    let content_html = templates::render_file(&template_path, &context)?;

    let mut newsletter = Newsletter {
        subject: args
            .subject
            .clone()
            .unwrap_or_else(|| templates::default_subject(now, &settings.newsletter)),
        content_html,
        recipients: (!args.to.is_empty()).then(|| args.to.clone()),
        from_address: args.from.clone(),
        version: if args.beta {
            ApiVersion::Beta
        } else {
            ApiVersion::V1
        },
    };

    if args.dry_run {
        return dry_run(newsletter, &settings, &manager, global).await;
    }

    let client = connect(&settings, &manager, global).await?;

    let recipients =
        resolve_recipients(newsletter.recipients.take(), &settings, Some(&client)).await?;
    if recipients.is_empty() {
        print_no_recipients();
        return Ok(());
    }
    newsletter.recipients = Some(recipients);

    let outcome = progress::spin(
        "Sending newsletter...",
        "Newsletter handed to Microsoft Graph",
        "Send failed",
        mail::send_newsletter(&client, &settings, newsletter),
    )
    .await?;

    match outcome {
        SendOutcome::Sent { recipients, status } => {
            println!(
                "{} Email sent successfully to {} recipient(s) (HTTP {})",
                "✓".green(),
                recipients,
                status
            );
        }
        SendOutcome::NoRecipients => print_no_recipients(),
    }

    Ok(())
}

fn print_no_recipients() {
    println!(
        "{} No recipients specified. Email will not be sent.",
        "!".yellow()
    );
}

/// The `--to` list when given, otherwise the configured source
async fn resolve_recipients(
    explicit: Option<Vec<String>>,
    settings: &Settings,
    client: Option<&GraphClient>,
) -> Result<Vec<String>> {
    if let Some(list) = explicit {
        return Ok(list);
    }

    let source = RecipientSource::from_settings(settings)?;
    progress::spin(
        "Fetching recipients...",
        &format!("Recipients read from {}", source),
        "Could not fetch recipients",
        source.fetch(client),
    )
    .await
}

async fn dry_run(
    newsletter: Newsletter,
    settings: &Settings,
    manager: &ConfigManager,
    global: &GlobalArgs,
) -> Result<()> {
    let sender = mail::resolve_sender(&newsletter, settings)?;

    let needs_graph = newsletter.recipients.is_none()
        && RecipientSource::from_settings(settings)?.needs_graph();
    let client = if needs_graph {
        Some(connect(settings, manager, global).await?)
    } else {
        None
    };

    let recipients =
        resolve_recipients(newsletter.recipients.clone(), settings, client.as_ref()).await?;
    if recipients.is_empty() {
        print_no_recipients();
        return Ok(());
    }

    let request = mail::build_send_mail_request(
        &sender,
        &newsletter.subject,
        &newsletter.content_html,
        &recipients,
    );

    println!(
        "{} Dry run: POST /{}/users/{}/sendMail",
        "→".cyan(),
        newsletter.version.as_str(),
        sender
    );
    println!("{}", serde_json::to_string_pretty(&request)?);
    println!(
        "\n{} {} recipient(s), nothing sent",
        "✓".green(),
        recipients.len()
    );

    Ok(())
}
