//! Newsletter delivery through `POST /users/{sender}/sendMail`
//!
//! One request carries the whole list in `toRecipients`. Graph answers
//! 202 Accepted with an empty body; anything else is surfaced as an error.

use crate::config::Settings;
use crate::error::{MailoutError, Result};
use crate::graph::{encode_path, ApiVersion, GraphClient};
use crate::recipients::RecipientSource;
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    pub message: GraphMessage,
    pub save_to_sent_items: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMessage {
    pub subject: String,
    pub body: GraphBody,
    pub to_recipients: Vec<GraphRecipient>,
    pub from: GraphRecipient,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphBody {
    pub content_type: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRecipient {
    pub email_address: GraphEmailAddress,
}

#[derive(Debug, Serialize)]
pub struct GraphEmailAddress {
    pub address: String,
}

impl GraphRecipient {
    pub fn new(address: &str) -> Self {
        Self {
            email_address: GraphEmailAddress {
                address: address.to_string(),
            },
        }
    }
}

/// Build the sendMail body: HTML content, explicit From, saved to Sent Items
pub fn build_send_mail_request(
    sender: &str,
    subject: &str,
    content_html: &str,
    recipients: &[String],
) -> SendMailRequest {
    SendMailRequest {
        message: GraphMessage {
            subject: subject.to_string(),
            body: GraphBody {
                content_type: "HTML".to_string(),
                content: content_html.to_string(),
            },
            to_recipients: recipients.iter().map(|r| GraphRecipient::new(r)).collect(),
            from: GraphRecipient::new(sender),
        },
        save_to_sent_items: true,
    }
}

/// POST the payload as `sender`. Returns the HTTP status Graph answered with.
pub async fn send_mail(
    client: &GraphClient,
    version: ApiVersion,
    sender: &str,
    request: &SendMailRequest,
) -> Result<u16> {
    let endpoint = format!("users/{}/sendMail", encode_path(sender));

    client
        .post_no_content(version, &endpoint, request)
        .await
        .map_err(|e| match e {
            MailoutError::GraphApiError { status, message } => {
                MailoutError::SendFailed { status, message }
            }
            other => other,
        })
}

/// What one newsletter run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { recipients: usize, status: u16 },
    NoRecipients,
}

/// Everything a single send needs besides the client and settings
#[derive(Debug, Clone, Default)]
pub struct Newsletter {
    pub subject: String,
    pub content_html: String,
    /// Explicit list; `None` fetches from the configured source
    pub recipients: Option<Vec<String>>,
    /// Overrides the configured sender
    pub from_address: Option<String>,
    pub version: ApiVersion,
}

/// Sender from the request, else the configured mailbox
pub fn resolve_sender(newsletter: &Newsletter, settings: &Settings) -> Result<String> {
    newsletter
        .from_address
        .as_deref()
        .or(settings.graph.sender.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            MailoutError::ConfigError(
                "From address for sending email is not configured (ONEDRIVE_EMAIL in environment or --from)."
                    .into(),
            )
        })
}

/// Resolve sender and recipients, then send. An empty list sends nothing.
pub async fn send_newsletter(
    client: &GraphClient,
    settings: &Settings,
    newsletter: Newsletter,
) -> Result<SendOutcome> {
    let sender = resolve_sender(&newsletter, settings)?;

    let recipients = match newsletter.recipients {
        Some(list) => list,
        None => {
            info!("Recipients list not provided directly, fetching from configured source");
            let source = RecipientSource::from_settings(settings)?;
            source.fetch(Some(client)).await?
        }
    };

    if recipients.is_empty() {
        info!("No recipients specified. Email will not be sent.");
        return Ok(SendOutcome::NoRecipients);
    }

    let request = build_send_mail_request(
        &sender,
        &newsletter.subject,
        &newsletter.content_html,
        &recipients,
    );

    info!(
        "Sending '{}' to {} recipient(s) from {}",
        newsletter.subject,
        recipients.len(),
        sender
    );
    debug!("sendMail endpoint version: {}", newsletter.version.as_str());

    let status = send_mail(client, newsletter.version, &sender, &request).await?;

    Ok(SendOutcome::Sent {
        recipients: recipients.len(),
        status,
    })
}
