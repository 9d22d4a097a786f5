//! Mailing list retrieval
//!
//! The list comes from exactly one source per run: a local text file, a text
//! file in the sender's OneDrive, or a field of a Firestore document. Text
//! sources hold one address per line; lines without `@` are skipped.

pub mod firestore;

use crate::config::{Settings, SourceKind};
use crate::error::{MailoutError, Result};
use crate::graph::{drive, GraphClient};
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

pub use firestore::FirestoreDocument;

/// One of the three interchangeable mailing list origins
#[derive(Debug, Clone, PartialEq)]
pub enum RecipientSource {
    LocalFile { path: PathBuf },
    OneDrive { user: String, path: String },
    Firestore(FirestoreDocument),
}

impl RecipientSource {
    /// Build the configured source, checking it has what it needs
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::for_kind(settings.recipients.source, settings)
    }

    pub fn for_kind(kind: SourceKind, settings: &Settings) -> Result<Self> {
        let path = settings.recipients.path.trim();

        match kind {
            SourceKind::File => {
                if path.is_empty() {
                    return Err(MailoutError::ConfigError(
                        "RECIPIENT_FILE_PATH must be set to read recipients from a local file.".into(),
                    ));
                }
                Ok(RecipientSource::LocalFile {
                    path: PathBuf::from(path),
                })
            }
            SourceKind::OneDrive => match settings.drive_user() {
                Some(user) if !user.trim().is_empty() && !path.is_empty() => {
                    Ok(RecipientSource::OneDrive {
                        user: user.trim().to_string(),
                        path: path.to_string(),
                    })
                }
                _ => Err(MailoutError::ConfigError(
                    "ONEDRIVE_EMAIL and RECIPIENT_FILE_PATH must be set in environment to fetch recipients from OneDrive."
                        .into(),
                )),
            },
            SourceKind::Firestore => Ok(RecipientSource::Firestore(
                FirestoreDocument::from_settings(&settings.firestore)?,
            )),
        }
    }

    /// Only the OneDrive source talks to Graph
    pub fn needs_graph(&self) -> bool {
        matches!(self, RecipientSource::OneDrive { .. })
    }

    /// Fetch and filter the list. An empty list is returned, not treated as an error.
    pub async fn fetch(&self, graph: Option<&GraphClient>) -> Result<Vec<String>> {
        let recipients = match self {
            RecipientSource::LocalFile { path } => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    MailoutError::IoError(std::io::Error::new(
                        e.kind(),
                        format!("Recipient file {}: {}", path.display(), e),
                    ))
                })?;
                parse_recipient_lines(&contents)
            }
            RecipientSource::OneDrive { user, path } => {
                let graph = graph.ok_or_else(|| {
                    MailoutError::AuthError("OneDrive recipients need a Graph access token".into())
                })?;
                let contents = drive::download_text(graph, user, path).await?;
                parse_recipient_lines(&contents)
            }
            RecipientSource::Firestore(document) => document.fetch_recipients().await?,
        };

        if recipients.is_empty() {
            warn!("No valid email addresses found in {}", self);
        } else {
            info!("Fetched {} recipients from {}", recipients.len(), self);
        }

        Ok(recipients)
    }
}

impl fmt::Display for RecipientSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipientSource::LocalFile { path } => write!(f, "local file {}", path.display()),
            RecipientSource::OneDrive { user, path } => {
                write!(f, "OneDrive file {} of {}", path, user)
            }
            RecipientSource::Firestore(doc) => write!(
                f,
                "Firestore {}/{} field '{}' (project {})",
                doc.collection, doc.document, doc.field, doc.project_id
            ),
        }
    }
}

/// Trim each line; keep non-empty lines that contain `@`, in file order
pub fn parse_recipient_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.contains('@'))
        .map(str::to_string)
        .collect()
}

/// Same filter for the entries of a list that arrived as separate values
pub fn filter_addresses<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| v.as_ref().trim().to_string())
        .filter(|v| !v.is_empty() && v.contains('@'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recipient_lines() {
        let content = "alice@example.com\n\n  bob@example.com  \r\nnot-an-address\n# comment\ncarol@example.org\n";
        assert_eq!(
            parse_recipient_lines(content),
            vec!["alice@example.com", "bob@example.com", "carol@example.org"]
        );
    }

    #[test]
    fn test_parse_recipient_lines_empty() {
        assert!(parse_recipient_lines("").is_empty());
        assert!(parse_recipient_lines("\n  \nnobody\n").is_empty());
    }

    #[test]
    fn test_onedrive_source_requires_user() {
        let settings = Settings::default();
        let err = RecipientSource::from_settings(&settings).unwrap_err();
        assert!(err
            .to_string()
            .contains("ONEDRIVE_EMAIL and RECIPIENT_FILE_PATH must be set"));
    }

    #[test]
    fn test_onedrive_source_uses_sender() {
        let mut settings = Settings::default();
        settings.graph.sender = Some("news@contoso.com".into());
        assert_eq!(
            RecipientSource::from_settings(&settings).unwrap(),
            RecipientSource::OneDrive {
                user: "news@contoso.com".into(),
                path: "email_recipients.txt".into()
            }
        );
    }

    #[tokio::test]
    async fn test_local_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.txt");
        std::fs::write(&path, "a@example.com\njunk\nb@example.com\n").unwrap();

        let mut settings = Settings::default();
        settings.recipients.source = SourceKind::File;
        settings.recipients.path = path.to_string_lossy().into_owned();

        let source = RecipientSource::from_settings(&settings).unwrap();
        assert!(!source.needs_graph());
        let recipients = source.fetch(None).await.unwrap();
        assert_eq!(recipients, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    async fn test_local_file_missing() {
        let source = RecipientSource::LocalFile {
            path: PathBuf::from("/definitely/not/here.txt"),
        };
        let err = source.fetch(None).await.unwrap_err();
        assert!(matches!(err, MailoutError::IoError(_)));
    }

    #[tokio::test]
    async fn test_onedrive_without_client() {
        let source = RecipientSource::OneDrive {
            user: "news@contoso.com".into(),
            path: "email_recipients.txt".into(),
        };
        assert!(source.needs_graph());
        let err = source.fetch(None).await.unwrap_err();
        assert!(matches!(err, MailoutError::AuthError(_)));
    }
}
