//! Newsletter HTML templates
//!
//! Plain placeholder substitution of `{{key}}` and `{key}` in a single pass.
//! There are no loops, conditionals or escaping.

use crate::config::NewsletterSettings;
use crate::error::{MailoutError, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

pub type Context = BTreeMap<String, String>;

pub const DEFAULT_TEMPLATE: &str =
    "<h1>Hello {{username}}!</h1><p>Today's date is {{date}}.</p><p>{{custom_message}}</p>";

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Substitute every context value into the template
pub fn render(template: &str, context: &Context) -> String {
    let (rendered, unresolved) = substitute(template, context);
    if !unresolved.is_empty() {
        warn!("Template placeholders without a value: {}", unresolved.join(", "));
    }

    rendered
}

/// Names of `{{name}}` and `{name}` placeholders in `text`.
/// Braces around anything but a plain name, such as CSS rules, are not placeholders.
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    substitute(text, &Context::new()).1
}

/// Single left-to-right pass; inserted values are copied verbatim and never rescanned
fn substitute(template: &str, context: &Context) -> (String, Vec<String>) {
    let mut out = String::with_capacity(template.len());
    let mut unresolved: Vec<String> = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let Some((name, len)) = placeholder_at(tail) else {
            out.push('{');
            rest = &tail[1..];
            continue;
        };

        if let Some(value) = context.get(name) {
            out.push_str(value);
            rest = &tail[len..];
        } else if is_placeholder_name(name.trim()) {
            let name = name.trim();
            if !unresolved.iter().any(|n| n == name) {
                unresolved.push(name.to_string());
            }
            out.push_str(&tail[..len]);
            rest = &tail[len..];
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    (out, unresolved)
}

/// `{{name}}` or `{name}` at the start of `text`, with its length in bytes
fn placeholder_at(text: &str) -> Option<(&str, usize)> {
    if let Some(inner) = text.strip_prefix("{{") {
        if let Some(end) = inner.find("}}") {
            return Some((&inner[..end], end + 4));
        }
    }

    let inner = text.strip_prefix('{')?;
    let end = inner.find('}')?;
    Some((&inner[..end], end + 2))
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}

/// Read a template file and render it
pub fn render_file(path: &Path, context: &Context) -> Result<String> {
    if !path.exists() {
        return Err(MailoutError::TemplateError(format!(
            "Template file not found at {}",
            path.display()
        )));
    }

    let template = fs::read_to_string(path)?;
    Ok(render(&template, context))
}

/// Write the built-in template when `path` does not exist yet.
/// Returns true when a file was created.
pub fn ensure_template(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(path, DEFAULT_TEMPLATE)?;
    info!("Created default template at {}", path.display());
    Ok(true)
}

pub fn default_context(now: DateTime<Utc>, settings: &NewsletterSettings) -> Context {
    let mut context = Context::new();
    context.insert("date".into(), now.format(DATE_FORMAT).to_string());
    context.insert(
        "timestamp".into(),
        now.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    );
    context.insert("username".into(), settings.username.clone());
    context.insert("recipient_name".into(), settings.username.clone());
    context.insert("custom_message".into(), settings.custom_message.clone());
    context
}

/// `<prefix> - <date>`
pub fn default_subject(now: DateTime<Utc>, settings: &NewsletterSettings) -> String {
    format!("{} - {}", settings.subject_prefix, now.format(DATE_FORMAT))
}

/// Parse a `key=value` override from the command line
pub fn parse_var(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        MailoutError::InvalidConfig(format!("Expected key=value, got '{}'", raw))
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(MailoutError::InvalidConfig(format!(
            "Empty variable name in '{}'",
            raw
        )));
    }

    Ok((key.to_string(), value.to_string()))
}
