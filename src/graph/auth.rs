use crate::config::{ConfigManager, Settings, TokenCache};
use crate::error::{MailoutError, Result};
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthType, AuthUrl, ClientId, ClientSecret, RequestTokenError, Scope, TokenResponse, TokenUrl,
};
use std::time::Duration;
use tracing::{debug, warn};

pub const MICROSOFT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Cached tokens are reused only while they have this much life left
const CACHE_MARGIN_SECS: i64 = 60;

/// Application permissions the newsletter flow needs
pub const REQUIRED_PERMISSIONS: &[(&str, &str)] = &[
    ("Mail.Send", "send as the sender mailbox"),
    ("Files.Read.All", "read the recipient file from OneDrive"),
    ("User.Read.All", "look up the sender for diagnostics"),
];

/// App registration secrets for the client-credentials flow
#[derive(Debug, Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let graph = &settings.graph;
        fn present(v: &Option<String>) -> Option<&str> {
            v.as_deref().map(str::trim).filter(|s| !s.is_empty())
        }

        let mut missing = Vec::new();
        if present(&graph.tenant_id).is_none() {
            missing.push("TENANT_ID");
        }
        if present(&graph.client_id).is_none() {
            missing.push("CLIENT_ID");
        }
        if present(&graph.client_secret).is_none() {
            missing.push("CLIENT_SECRET");
        }

        match (
            present(&graph.tenant_id),
            present(&graph.client_id),
            present(&graph.client_secret),
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => Ok(Self {
                tenant_id: tenant_id.to_string(),
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            }),
            _ => Err(MailoutError::ConfigError(format!(
                "Missing critical environment variables for authentication: {}",
                missing.join(", ")
            ))),
        }
    }
}

pub struct GraphAuth {
    config_manager: ConfigManager,
    authority: String,
}

impl GraphAuth {
    pub fn new(config_manager: ConfigManager) -> Self {
        Self {
            config_manager,
            authority: MICROSOFT_AUTHORITY.to_string(),
        }
    }

    /// Override the login authority; `None` keeps the public cloud default
    pub fn with_authority(mut self, authority: Option<&str>) -> Self {
        if let Some(authority) = authority {
            self.authority = authority.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn token_url(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, tenant_id)
    }

    /// Request a new token with the client credentials flow
    pub async fn acquire_token(&self, credentials: &Credentials) -> Result<TokenCache> {
        let tenant_id = &credentials.tenant_id;

        // Only the token endpoint is used; the authorize URL satisfies the client type.
        let auth_url = AuthUrl::new(format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.authority, tenant_id
        ))
        .map_err(|e| MailoutError::AuthError(format!("Invalid auth URL: {}", e)))?;

        let token_url = TokenUrl::new(self.token_url(tenant_id))
            .map_err(|e| MailoutError::AuthError(format!("Invalid token URL: {}", e)))?;

        let client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            auth_url,
            Some(token_url),
        )
        .set_auth_type(AuthType::RequestBody);

        debug!("Requesting token from {}", self.token_url(tenant_id));

        let token = client
            .exchange_client_credentials()
            .add_scope(Scope::new(GRAPH_SCOPE.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                MailoutError::AuthError(format!(
                    "Failed to get access token: {}",
                    describe_token_error(&e)
                ))
            })?;

        let lifetime = token.expires_in().unwrap_or(Duration::from_secs(3600));
        let expires_at =
            chrono::Utc::now() + chrono::Duration::seconds(lifetime.as_secs() as i64);

        let scope = token.scopes().map(|scopes| {
            scopes
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        });

        Ok(TokenCache {
            access_token: token.access_token().secret().clone(),
            token_type: Some(format!("{:?}", token.token_type())),
            scope,
            expires_at,
            tenant_id: tenant_id.clone(),
            client_id: credentials.client_id.clone(),
        })
    }

    /// Valid access token: cached when still fresh, otherwise newly acquired and cached
    pub async fn access_token(
        &self,
        credentials: &Credentials,
        use_cache: bool,
    ) -> Result<TokenCache> {
        if use_cache {
            match self
                .config_manager
                .load_token(&credentials.tenant_id, &credentials.client_id)
            {
                Ok(token) if token.is_fresh(CACHE_MARGIN_SECS) => {
                    debug!("Using cached token (expires {})", token.expires_at);
                    return Ok(token);
                }
                Ok(_) => debug!("Cached token about to expire, requesting a new one"),
                Err(MailoutError::TokenNotFound) | Err(MailoutError::AuthError(_)) => {}
                Err(e) => warn!("Ignoring unreadable token cache: {}", e),
            }
        }

        let token = self.acquire_token(credentials).await?;

        if use_cache {
            if let Err(e) = self.config_manager.save_token(&token) {
                warn!("Could not write token cache: {}", e);
            }
        }

        Ok(token)
    }

    pub fn store(&self, token: &TokenCache) -> Result<()> {
        self.config_manager.save_token(token)
    }

    /// Delete the cached token for this app registration
    pub fn logout(&self, credentials: &Credentials) -> Result<bool> {
        self.config_manager
            .delete_token(&credentials.tenant_id, &credentials.client_id)
    }
}

fn describe_token_error<RE: std::error::Error + 'static>(
    error: &RequestTokenError<RE, BasicErrorResponse>,
) -> String {
    match error {
        RequestTokenError::ServerResponse(response) => {
            let code: &str = response.error().as_ref();
            let description = response
                .error_description()
                .map(String::as_str)
                .unwrap_or("No description");
            format!("{}: {}", code, description)
        }
        RequestTokenError::Request(e) => format!("request failed: {}", e),
        RequestTokenError::Parse(e, body) => format!(
            "Access token not found in response ({}): {}",
            e,
            String::from_utf8_lossy(body)
        ),
        RequestTokenError::Other(message) => message.clone(),
    }
}

/// Plain-language reading of a token endpoint failure
pub fn token_error_hints(message: &str) -> &'static [&'static str] {
    if message.contains("invalid_client") {
        &[
            "Client ID or Client Secret is incorrect",
            "App registration doesn't exist or is disabled",
        ]
    } else if message.contains("unauthorized_client") {
        &[
            "App doesn't have permission for client_credentials flow",
            "App registration needs 'Application permissions' not 'Delegated permissions'",
        ]
    } else if message.contains("AADSTS90002") || message.contains("invalid_request") {
        &["Tenant ID is wrong or the tenant no longer exists"]
    } else {
        &[]
    }
}
