use thiserror::Error;

#[derive(Error, Debug)]
pub enum MailoutError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Graph API error (HTTP {status}): {message}")]
    GraphApiError { status: u16, message: String },

    #[error("Failed to send email: {status}. {message}")]
    SendFailed { status: u16, message: String },

    #[error("Failed to fetch recipient file from OneDrive: {status} {message}")]
    OneDriveError { status: u16, message: String },

    #[error("Firestore error: {0}")]
    FirestoreError(String),

    #[error("Template error: {0}")]
    TemplateError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Directory walk error: {0}")]
    WalkDirError(#[from] walkdir::Error),

    #[error("Interactive prompt error: {0}")]
    DialoguerError(#[from] dialoguer::Error),

    #[error("No cached token. Run 'mailout login' first")]
    TokenNotFound,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, MailoutError>;

pub use MailoutError as Error;

impl MailoutError {
    /// HTTP status carried by API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            MailoutError::GraphApiError { status, .. }
            | MailoutError::SendFailed { status, .. }
            | MailoutError::OneDriveError { status, .. } => Some(*status),
            MailoutError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Parse a Graph API (or Azure AD token endpoint) error body and add a hint
/// for the failures that come up when setting up an app registration.
pub fn enhance_graph_error(error_response: &str) -> String {
    let Ok(error_json) = serde_json::from_str::<serde_json::Value>(error_response) else {
        return error_response.to_string();
    };

    // Graph shape: {"error": {"code": "...", "message": "..."}}
    if let Some(error_obj) = error_json.get("error").filter(|e| e.is_object()) {
        let code = error_obj
            .get("code")
            .and_then(|c| c.as_str())
            .unwrap_or("Unknown");
        let message = error_obj
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("No message");

        return format!("{}: {}{}", code, message, hint_for(code, message));
    }

    // OAuth shape: {"error": "invalid_client", "error_description": "..."}
    if let Some(code) = error_json.get("error").and_then(|e| e.as_str()) {
        let description = error_json
            .get("error_description")
            .and_then(|d| d.as_str())
            .unwrap_or("No description");
        return format!("{}: {}{}", code, description, hint_for(code, description));
    }

    error_response.to_string()
}

fn hint_for(code: &str, message: &str) -> &'static str {
    match code {
        "Unauthorized" | "InvalidAuthenticationToken" => {
            "\nHint: the access token was rejected. Run 'mailout login' to fetch a fresh one."
        }
        "ErrorAccessDenied" | "Forbidden" | "Authorization_RequestDenied" => {
            "\nHint: the app registration needs Application permissions (Mail.Send, Files.Read.All, User.Read.All) with admin consent granted."
        }
        "MailboxNotEnabledForRESTAPI" => {
            "\nHint: the sender has no Exchange Online mailbox. Assign a licence with Exchange, or pick another sender ('mailout diagnose licenses')."
        }
        "ResourceNotFound" | "Request_ResourceNotFound" | "itemNotFound" => {
            if message.contains("User") || message.contains("user") {
                "\nHint: the user does not exist in this tenant. Run 'mailout diagnose users' to list valid senders."
            } else {
                "\nHint: the requested resource doesn't exist. Check the user and file path."
            }
        }
        "invalid_client" => {
            "\nHint: the client ID or client secret is wrong, or the app registration is disabled."
        }
        "unauthorized_client" => {
            "\nHint: the app is not allowed to use the client credentials flow. Grant Application (not Delegated) permissions."
        }
        "invalid_request" if message.contains("tenant") => {
            "\nHint: check TENANT_ID. It must be the directory (tenant) ID of the app registration."
        }
        _ => "",
    }
}
