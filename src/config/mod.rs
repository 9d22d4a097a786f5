use crate::error::{MailoutError, Result};
use crate::sitemap::ChangeFreq;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_RECIPIENT_FILE: &str = "email_recipients.txt";
pub const DEFAULT_TEMPLATE_PATH: &str = "templates/newsletter_template.html";

/// Effective settings: config.toml, then .env, then process environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub graph: GraphSettings,

    #[serde(default)]
    pub recipients: RecipientSettings,

    #[serde(default)]
    pub firestore: FirestoreSettings,

    #[serde(default)]
    pub newsletter: NewsletterSettings,

    #[serde(default)]
    pub sitemap: SitemapSettings,
}

/// App registration and sender mailbox
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GraphSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Mailbox that sends the newsletter; its OneDrive holds the recipient file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    /// Token authority, defaults to https://login.microsoftonline.com
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,

    /// Graph root, defaults to https://graph.microsoft.com
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Where the mailing list lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    #[value(name = "onedrive")]
    OneDrive,
    File,
    Firestore,
}

impl SourceKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "onedrive" => Some(SourceKind::OneDrive),
            "file" | "local" => Some(SourceKind::File),
            "firestore" => Some(SourceKind::Firestore),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::OneDrive => "OneDrive file",
            SourceKind::File => "local file",
            SourceKind::Firestore => "Firestore document",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientSettings {
    #[serde(default)]
    pub source: SourceKind,

    /// Local path, or path relative to the OneDrive root
    #[serde(default = "default_recipient_path")]
    pub path: String,

    /// OneDrive owner when it differs from the sender
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_user: Option<String>,
}

impl Default for RecipientSettings {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            path: default_recipient_path(),
            drive_user: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,

    #[serde(default = "default_firestore_database")]
    pub database: String,

    #[serde(default = "default_firestore_collection")]
    pub collection: String,

    #[serde(default = "default_firestore_document")]
    pub document: String,

    #[serde(default = "default_firestore_field")]
    pub field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl Default for FirestoreSettings {
    fn default() -> Self {
        Self {
            project_id: None,
            database: default_firestore_database(),
            collection: default_firestore_collection(),
            document: default_firestore_document(),
            field: default_firestore_field(),
            access_token: None,
            api_key: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterSettings {
    #[serde(default = "default_template_path")]
    pub template: PathBuf,

    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default = "default_custom_message")]
    pub custom_message: String,
}

impl Default for NewsletterSettings {
    fn default() -> Self {
        Self {
            template: default_template_path(),
            subject_prefix: default_subject_prefix(),
            username: default_username(),
            custom_message: default_custom_message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapSettings {
    #[serde(default = "default_sitemap_root")]
    pub root: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Defaults to <root>/sitemap.xml
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    #[serde(default = "default_sitemap_exclude")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub changefreq: ChangeFreq,

    #[serde(default = "default_sitemap_priority")]
    pub priority: f64,
}

impl Default for SitemapSettings {
    fn default() -> Self {
        Self {
            root: default_sitemap_root(),
            base_url: None,
            output: None,
            exclude: default_sitemap_exclude(),
            changefreq: ChangeFreq::default(),
            priority: default_sitemap_priority(),
        }
    }
}

fn default_recipient_path() -> String {
    DEFAULT_RECIPIENT_FILE.to_string()
}
fn default_firestore_database() -> String {
    "(default)".to_string()
}
fn default_firestore_collection() -> String {
    "config".to_string()
}
fn default_firestore_document() -> String {
    "email_recipients".to_string()
}
fn default_firestore_field() -> String {
    "emails".to_string()
}
fn default_template_path() -> PathBuf {
    PathBuf::from(DEFAULT_TEMPLATE_PATH)
}
fn default_subject_prefix() -> String {
    "Weekly Newsletter".to_string()
}
fn default_username() -> String {
    "Valued Subscriber".to_string()
}
fn default_custom_message() -> String {
    "Thanks for reading. Here is what's new this week.".to_string()
}
fn default_sitemap_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_sitemap_exclude() -> Vec<String> {
    vec!["tests".to_string(), "test".to_string()]
}
fn default_sitemap_priority() -> f64 {
    0.8
}

impl Settings {
    /// Overlay variables from the environment or a .env file. Empty values are ignored.
    pub fn apply_env(&mut self, vars: &HashMap<String, String>) {
        let get = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .filter_map(|k| vars.get(*k))
                .map(|v| v.trim())
                .find(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let Some(v) = get(&["TENANT_ID", "ONEDRIVE_TENANT_ID"]) {
            self.graph.tenant_id = Some(v);
        }
        if let Some(v) = get(&["CLIENT_ID", "ONEDRIVE_CLIENT_ID"]) {
            self.graph.client_id = Some(v);
        }
        if let Some(v) = get(&["CLIENT_SECRET", "ONEDRIVE_CLIENT_SECRET"]) {
            self.graph.client_secret = Some(v);
        }
        if let Some(v) = get(&["ONEDRIVE_EMAIL"]) {
            self.graph.sender = Some(v);
        }
        if let Some(v) = get(&["RECIPIENT_FILE_PATH"]) {
            self.recipients.path = v;
        }
        if let Some(kind) = get(&["RECIPIENT_SOURCE"]).and_then(|v| SourceKind::parse(&v)) {
            self.recipients.source = kind;
        }
        if let Some(v) = get(&["FIREBASE_PROJECT_ID"]) {
            self.firestore.project_id = Some(v);
        }
        if let Some(v) = get(&["FIRESTORE_ACCESS_TOKEN"]) {
            self.firestore.access_token = Some(v);
        }
        if let Some(v) = get(&["FIRESTORE_API_KEY"]) {
            self.firestore.api_key = Some(v);
        }
        if let Some(v) = get(&["SITEMAP_BASE_URL"]) {
            self.sitemap.base_url = Some(v);
        }
    }

    /// OneDrive owner: explicit drive user, else the sender
    pub fn drive_user(&self) -> Option<&str> {
        self.recipients
            .drive_user
            .as_deref()
            .or(self.graph.sender.as_deref())
    }
}

/// Token cache structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCache {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub tenant_id: String,
    pub client_id: String,
}

impl TokenCache {
    /// True while the token stays valid for at least `margin_secs` more seconds
    pub fn is_fresh(&self, margin_secs: i64) -> bool {
        self.expires_at > chrono::Utc::now() + chrono::Duration::seconds(margin_secs)
    }
}

/// Configuration manager
#[derive(Clone, Debug)]
pub struct ConfigManager {
    config_dir: PathBuf,
    config_file: PathBuf,
    explicit_file: bool,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("com", "mailout", "mailout").ok_or_else(|| {
            MailoutError::ConfigError("Failed to determine config directory".into())
        })?;

        let config_dir = project_dirs.config_dir().to_path_buf();
        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        Ok(Self {
            config_file: config_dir.join("config.toml"),
            config_dir,
            explicit_file: false,
        })
    }

    /// Use an explicit config file (from --config); cache and .env live beside it
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        let config_file = path.into();
        let config_dir = config_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            config_dir,
            config_file,
            explicit_file: true,
        }
    }

    /// Resolve from an optional --config flag
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Ok(Self::with_file(p)),
            None => Self::new(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn env_file(&self) -> PathBuf {
        self.config_dir.join(".env")
    }

    pub fn token_cache_file(&self, tenant_id: &str, client_id: &str) -> PathBuf {
        let key: String = format!("{}-{}", tenant_id, client_id)
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.config_dir.join("cache").join(format!("{}.token", key))
    }

    /// Load config.toml only (defaults when absent)
    pub fn load_file(&self) -> Result<Settings> {
        if !self.config_file.exists() {
            if self.explicit_file {
                return Err(MailoutError::ConfigError(format!(
                    "Config file not found: {}",
                    self.config_file.display()
                )));
            }
            return Ok(Settings::default());
        }

        let contents = fs::read_to_string(&self.config_file)?;
        let settings: Settings = toml::from_str(&contents)?;
        Ok(settings)
    }

    /// Load config.toml, then overlay .env and the process environment
    pub fn load_settings(&self) -> Result<Settings> {
        let mut settings = self.load_file()?;

        let env_path = self.env_file();
        if env_path.exists() {
            let contents = fs::read_to_string(&env_path)?;
            settings.apply_env(&Self::parse_env_file(&contents));
            tracing::debug!("Applied variables from {}", env_path.display());
        }

        let process_env: HashMap<String, String> = std::env::vars().collect();
        settings.apply_env(&process_env);

        Ok(settings)
    }

    /// Save config.toml
    pub fn save_file(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.config_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = toml::to_string_pretty(settings)
            .map_err(|e| MailoutError::ConfigError(format!("Failed to serialize config: {}", e)))?;
        fs::write(&self.config_file, contents)?;
        Ok(())
    }

    /// Replace the sender in config.toml, returning the previous value
    pub fn set_sender(&self, sender: &str) -> Result<Option<String>> {
        let mut settings = self.load_file()?;
        let old = settings.graph.sender.replace(sender.to_string());
        self.save_file(&settings)?;
        Ok(old)
    }

    /// Write a starter config.toml. Refuses to overwrite unless `force`.
    pub fn init_file(&self, force: bool) -> Result<()> {
        if self.config_file.exists() && !force {
            return Err(MailoutError::ConfigError(format!(
                "{} already exists (use --force to overwrite)",
                self.config_file.display()
            )));
        }

        if let Some(parent) = self.config_file.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(&self.config_file, CONFIG_TEMPLATE)?;
        Ok(())
    }

    /// Save token cache
    pub fn save_token(&self, token: &TokenCache) -> Result<()> {
        let cache_dir = self.config_dir.join("cache");
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }

        let token_path = self.token_cache_file(&token.tenant_id, &token.client_id);
        let contents = serde_json::to_string_pretty(token)?;
        fs::write(token_path, contents)?;
        Ok(())
    }

    /// Load token cache
    pub fn load_token(&self, tenant_id: &str, client_id: &str) -> Result<TokenCache> {
        let token_path = self.token_cache_file(tenant_id, client_id);

        if !token_path.exists() {
            return Err(MailoutError::TokenNotFound);
        }

        let contents = fs::read_to_string(token_path)?;
        let token: TokenCache = serde_json::from_str(&contents)?;

        if token.expires_at < chrono::Utc::now() {
            return Err(MailoutError::AuthError("Token expired".into()));
        }

        Ok(token)
    }

    /// Delete token cache; returns whether a file was removed
    pub fn delete_token(&self, tenant_id: &str, client_id: &str) -> Result<bool> {
        let token_path = self.token_cache_file(tenant_id, client_id);

        if token_path.exists() {
            fs::remove_file(token_path)?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Parse simple .env file format
    pub fn parse_env_file(contents: &str) -> HashMap<String, String> {
        let mut vars = HashMap::new();

        for line in contents.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);

            if let Some(pos) = line.find('=') {
                let key = line[..pos].trim().to_string();
                let value = line[pos + 1..].trim();

                let value = if value.len() >= 2
                    && ((value.starts_with('"') && value.ends_with('"'))
                        || (value.starts_with('\'') && value.ends_with('\'')))
                {
                    value[1..value.len() - 1].to_string()
                } else {
                    value.to_string()
                };

                vars.insert(key, value);
            }
        }

        vars
    }
}

const CONFIG_TEMPLATE: &str = r#"# mailout configuration
# Environment variables (TENANT_ID, CLIENT_ID, CLIENT_SECRET, ONEDRIVE_EMAIL,
# RECIPIENT_FILE_PATH, ...) override anything set here.

[graph]
# tenant_id = "00000000-0000-0000-0000-000000000000"
# client_id = "00000000-0000-0000-0000-000000000000"
# client_secret = "..."
# sender = "newsletter@contoso.onmicrosoft.com"

[recipients]
# onedrive | file | firestore
source = "onedrive"
path = "email_recipients.txt"

[firestore]
# project_id = "my-project"
collection = "config"
document = "email_recipients"
field = "emails"

[newsletter]
template = "templates/newsletter_template.html"
subject_prefix = "Weekly Newsletter"
username = "Valued Subscriber"

[sitemap]
# base_url = "https://example.github.io/site"
root = "."
exclude = ["tests", "test"]
changefreq = "monthly"
priority = 0.8
"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_env_file() {
        let contents = r#"
# newsletter app
TENANT_ID=abc
export CLIENT_ID = "def"
CLIENT_SECRET='s3cr=t'

EMPTY=
"#;
        let parsed = ConfigManager::parse_env_file(contents);
        assert_eq!(parsed.get("TENANT_ID").map(String::as_str), Some("abc"));
        assert_eq!(parsed.get("CLIENT_ID").map(String::as_str), Some("def"));
        assert_eq!(parsed.get("CLIENT_SECRET").map(String::as_str), Some("s3cr=t"));
        assert_eq!(parsed.get("EMPTY").map(String::as_str), Some(""));
        assert_eq!(parsed.len(), 4);
    }

    #[test]
    fn test_apply_env_overrides_and_prefixed_names() {
        let mut settings = Settings::default();
        settings.graph.tenant_id = Some("from-file".into());

        settings.apply_env(&vars(&[
            ("ONEDRIVE_TENANT_ID", "tenant"),
            ("ONEDRIVE_CLIENT_ID", "client"),
            ("CLIENT_SECRET", "secret"),
            ("ONEDRIVE_EMAIL", "news@contoso.com"),
            ("RECIPIENT_FILE_PATH", "lists/subscribers.txt"),
            ("RECIPIENT_SOURCE", "Firestore"),
        ]));

        assert_eq!(settings.graph.tenant_id.as_deref(), Some("tenant"));
        assert_eq!(settings.graph.client_id.as_deref(), Some("client"));
        assert_eq!(settings.graph.client_secret.as_deref(), Some("secret"));
        assert_eq!(settings.graph.sender.as_deref(), Some("news@contoso.com"));
        assert_eq!(settings.recipients.path, "lists/subscribers.txt");
        assert_eq!(settings.recipients.source, SourceKind::Firestore);
    }

    #[test]
    fn test_apply_env_ignores_empty_values() {
        let mut settings = Settings::default();
        settings.graph.client_id = Some("keep".into());
        settings.apply_env(&vars(&[("CLIENT_ID", "  "), ("RECIPIENT_SOURCE", "carrier-pigeon")]));
        assert_eq!(settings.graph.client_id.as_deref(), Some("keep"));
        assert_eq!(settings.recipients.source, SourceKind::OneDrive);
    }

    #[test]
    fn test_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.recipients.path, DEFAULT_RECIPIENT_FILE);
        assert_eq!(settings.recipients.source, SourceKind::OneDrive);
        assert_eq!(settings.firestore.collection, "config");
        assert_eq!(settings.firestore.document, "email_recipients");
        assert_eq!(settings.newsletter.username, "Valued Subscriber");
        assert_eq!(settings.sitemap.exclude, vec!["tests", "test"]);
    }

    #[test]
    fn test_config_template_parses() {
        let settings: Settings = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(settings.recipients.source, SourceKind::OneDrive);
        assert_eq!(settings.sitemap.changefreq, ChangeFreq::Monthly);
    }

    #[test]
    fn test_drive_user_falls_back_to_sender() {
        let mut settings = Settings::default();
        assert_eq!(settings.drive_user(), None);
        settings.graph.sender = Some("news@contoso.com".into());
        assert_eq!(settings.drive_user(), Some("news@contoso.com"));
        settings.recipients.drive_user = Some("owner@contoso.com".into());
        assert_eq!(settings.drive_user(), Some("owner@contoso.com"));
    }

    #[test]
    fn test_set_sender_and_token_cache_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_file(dir.path().join("config.toml"));

        manager.init_file(false).unwrap();
        assert!(manager.init_file(false).is_err());

        let old = manager.set_sender("first@contoso.com").unwrap();
        assert_eq!(old, None);
        let old = manager.set_sender("second@contoso.com").unwrap();
        assert_eq!(old.as_deref(), Some("first@contoso.com"));
        assert_eq!(
            manager.load_file().unwrap().graph.sender.as_deref(),
            Some("second@contoso.com")
        );

        let token = TokenCache {
            access_token: "tok".into(),
            token_type: Some("Bearer".into()),
            scope: None,
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            tenant_id: "t".into(),
            client_id: "c".into(),
        };
        manager.save_token(&token).unwrap();
        assert_eq!(manager.load_token("t", "c").unwrap().access_token, "tok");
        assert!(manager.delete_token("t", "c").unwrap());
        assert!(matches!(
            manager.load_token("t", "c"),
            Err(MailoutError::TokenNotFound)
        ));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::with_file(dir.path().join("missing.toml"));
        assert!(matches!(
            manager.load_file(),
            Err(MailoutError::ConfigError(_))
        ));
    }
}
