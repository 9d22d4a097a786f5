pub mod auth;
pub mod directory;
pub mod drive;
pub mod mail;

use crate::config::{ConfigManager, Settings};
use crate::error::{MailoutError, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

pub const GRAPH_ROOT: &str = "https://graph.microsoft.com";

/// Graph API version segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    #[default]
    V1,
    Beta,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1.0",
            ApiVersion::Beta => "beta",
        }
    }
}

/// Graph API client. One request per call; failures are returned, not retried.
pub struct GraphClient {
    client: Client,
    access_token: String,
    root: String,
}

impl GraphClient {
    pub fn new(access_token: String) -> Self {
        Self::with_root(access_token, GRAPH_ROOT)
    }

    /// Point the client at another Graph root (sovereign clouds, mock servers)
    pub fn with_root(access_token: String, root: &str) -> Self {
        Self {
            client: Client::new(),
            access_token,
            root: root.trim_end_matches('/').to_string(),
        }
    }

    /// Acquire (or reuse a cached) token from the configured app registration
    pub async fn from_settings(
        settings: &Settings,
        config_manager: &ConfigManager,
        use_cache: bool,
    ) -> Result<Self> {
        let credentials = auth::Credentials::from_settings(settings)?;
        let graph_auth = auth::GraphAuth::new(config_manager.clone())
            .with_authority(settings.graph.authority.as_deref());
        let token = graph_auth.access_token(&credentials, use_cache).await?;

        let root = settings.graph.base_url.as_deref().unwrap_or(GRAPH_ROOT);
        Ok(Self::with_root(token.access_token, root))
    }

    pub fn url(&self, version: ApiVersion, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            self.root,
            version.as_str(),
            endpoint.trim_start_matches('/')
        )
    }

    /// Send and turn non-success statuses into `GraphApiError`
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        let status = response.status();
        debug!("Graph response: {} {}", status, response.url());

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MailoutError::GraphApiError {
                status: status.as_u16(),
                message: crate::error::enhance_graph_error(&error_text),
            });
        }

        Ok(response)
    }

    /// GET a JSON resource from v1.0
    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.get_versioned(ApiVersion::V1, endpoint).await
    }

    pub async fn get_versioned<T: DeserializeOwned>(
        &self,
        version: ApiVersion,
        endpoint: &str,
    ) -> Result<T> {
        let url = self.url(version, endpoint);
        debug!("GET {}", url);
        let response = self.execute(self.client.get(&url)).await?;
        Ok(response.json::<T>().await?)
    }

    /// GET an absolute URL, e.g. an `@odata.nextLink`
    pub async fn get_url<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self.execute(self.client.get(url)).await?;
        Ok(response.json::<T>().await?)
    }

    /// GET every page of a collection by following `@odata.nextLink`
    pub async fn get_all_pages<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page: CollectionResponse<T> = self.get(endpoint).await?;

        loop {
            items.extend(page.value);
            match page.next_link {
                Some(next) => page = self.get_url(&next).await?,
                None => break,
            }
        }

        Ok(items)
    }

    /// GET a raw text body (drive item content)
    pub async fn get_text(&self, endpoint: &str) -> Result<String> {
        let url = self.url(ApiVersion::V1, endpoint);
        debug!("GET {}", url);
        let response = self.execute(self.client.get(&url)).await?;
        Ok(response.text().await?)
    }

    /// POST a JSON body where the response carries no content (e.g. 202 Accepted)
    pub async fn post_no_content<T: Serialize>(
        &self,
        version: ApiVersion,
        endpoint: &str,
        body: &T,
    ) -> Result<u16> {
        let url = self.url(version, endpoint);
        debug!("POST {}", url);
        let response = self.execute(self.client.post(&url).json(body)).await?;
        Ok(response.status().as_u16())
    }
}

/// Percent-encode a user id or drive path for use in a Graph URL.
/// Each `/`-separated segment is encoded on its own so drive paths stay hierarchical.
pub fn encode_path(value: &str) -> String {
    value
        .trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Generic collection response from Graph API
#[derive(Debug, serde::Deserialize)]
pub struct CollectionResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}
