//! OneDrive file content

use crate::error::{MailoutError, Result};
use crate::graph::{encode_path, GraphClient};
use tracing::debug;

/// Endpoint for the raw content of a file addressed by path in a user's drive
pub fn content_endpoint(user: &str, path: &str) -> String {
    format!(
        "users/{}/drive/root:/{}:/content",
        encode_path(user),
        encode_path(path)
    )
}

/// Download a text file from `user`'s OneDrive
pub async fn download_text(client: &GraphClient, user: &str, path: &str) -> Result<String> {
    let endpoint = content_endpoint(user, path);
    debug!("Fetching OneDrive file {}", endpoint);

    client.get_text(&endpoint).await.map_err(|e| match e {
        MailoutError::GraphApiError { status, message } => {
            MailoutError::OneDriveError { status, message }
        }
        other => other,
    })
}
