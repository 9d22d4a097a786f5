//! sitemap.xml generation for a static site checked out on disk
//!
//! Every `*.html` below the site root becomes one `<url>`; the root
//! `index.html` maps to the base URL itself.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
pub const SITEMAP_FILE: &str = "sitemap.xml";

/// `<changefreq>` values accepted by the sitemaps.org protocol
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    #[default]
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFreq::Always => "always",
            ChangeFreq::Hourly => "hourly",
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
            ChangeFreq::Never => "never",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    pub loc: String,
    pub lastmod: Option<String>,
}

fn is_skipped_dir(entry: &DirEntry, exclude: &[String]) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || exclude.iter().any(|e| e == name.as_ref())
}

/// Relative `/`-separated paths of all HTML files under `root`, sorted
pub fn find_html_files(root: &Path, exclude: &[String]) -> Result<Vec<String>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e, exclude));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let is_html = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
        if !is_html {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path);
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        files.push(parts.join("/"));
    }

    files.sort();
    debug!("Found {} HTML files under {}", files.len(), root.display());
    Ok(files)
}

/// Modification date as `YYYY-MM-DD` in UTC
pub fn lastmod(path: &Path) -> Option<String> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let modified: DateTime<Utc> = modified.into();
    Some(modified.format("%Y-%m-%d").to_string())
}

pub fn url_for_file(base_url: &str, relative: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');

    if relative == "index.html" {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, relative)
    }
}

/// Walk the site and build one entry per page
pub fn collect_entries(root: &Path, base_url: &str, exclude: &[String]) -> Result<Vec<SitemapEntry>> {
    let files = find_html_files(root, exclude)?;

    Ok(files
        .iter()
        .map(|relative| SitemapEntry {
            loc: url_for_file(base_url, relative),
            lastmod: lastmod(&root.join(relative)),
        })
        .collect())
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// `0.85` stays `0.85`, `1` becomes `1.0`
fn format_priority(priority: f64) -> String {
    let fixed = format!("{:.2}", priority);
    let trimmed = fixed.trim_end_matches('0');
    if trimmed.ends_with('.') {
        format!("{}0", trimmed)
    } else {
        trimmed.to_string()
    }
}

pub fn generate(entries: &[SitemapEntry], changefreq: ChangeFreq, priority: f64) -> String {
    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(&format!("<urlset xmlns=\"{}\">\n", SITEMAP_NAMESPACE));

    for entry in entries {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.loc)));
        if let Some(date) = &entry.lastmod {
            xml.push_str(&format!("    <lastmod>{}</lastmod>\n", escape_xml(date)));
        }
        xml.push_str(&format!("    <changefreq>{}</changefreq>\n", changefreq.as_str()));
        xml.push_str(&format!("    <priority>{}</priority>\n", format_priority(priority)));
        xml.push_str("  </url>\n");
    }

    xml.push_str("</urlset>\n");
    xml
}

/// Default output location for a site root
pub fn default_output(root: &Path) -> PathBuf {
    root.join(SITEMAP_FILE)
}

pub fn write_sitemap(path: &Path, xml: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, xml)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exclude() -> Vec<String> {
        vec!["tests".to_string(), "test".to_string()]
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<html></html>").unwrap();
    }

    #[test]
    fn test_find_html_files_skips_excluded_and_hidden() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "index.html");
        touch(root, "about.html");
        touch(root, "blog/post-1.html");
        touch(root, "blog/notes.txt");
        touch(root, "tests/fixture.html");
        touch(root, "test/other.html");
        touch(root, ".git/hooks/readme.html");
        touch(root, "assets/.cache/page.html");

        let files = find_html_files(root, &exclude()).unwrap();
        assert_eq!(files, vec!["about.html", "blog/post-1.html", "index.html"]);
    }

    #[test]
    fn test_url_for_file() {
        assert_eq!(
            url_for_file("https://example.github.io/site/", "index.html"),
            "https://example.github.io/site/"
        );
        assert_eq!(
            url_for_file("https://example.github.io/site", "/blog/post-1.html"),
            "https://example.github.io/site/blog/post-1.html"
        );
        assert_eq!(
            url_for_file("https://example.com", "blog/index.html"),
            "https://example.com/blog/index.html"
        );
    }

    #[test]
    fn test_lastmod_format() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.html");

        let date = lastmod(&dir.path().join("index.html")).unwrap();
        assert_eq!(date.len(), 10);
        assert!(chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok());
        assert!(lastmod(&dir.path().join("missing.html")).is_none());
    }

    #[test]
    fn test_generate_xml() {
        let entries = vec![
            SitemapEntry {
                loc: "https://example.com/".to_string(),
                lastmod: Some("2025-06-01".to_string()),
            },
            SitemapEntry {
                loc: "https://example.com/a&b.html".to_string(),
                lastmod: None,
            },
        ];

        let xml = generate(&entries, ChangeFreq::Weekly, 0.8);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">"));
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<lastmod>2025-06-01</lastmod>"));
        assert!(xml.contains("<loc>https://example.com/a&amp;b.html</loc>"));
        assert_eq!(xml.matches("<changefreq>weekly</changefreq>").count(), 2);
        assert_eq!(xml.matches("<priority>0.8</priority>").count(), 2);
        assert_eq!(xml.matches("<lastmod>").count(), 1);
        assert!(xml.ends_with("</urlset>\n"));
    }

    #[test]
    fn test_generate_keeps_two_decimal_priority() {
        let entries = vec![SitemapEntry {
            loc: "https://example.com/".to_string(),
            lastmod: None,
        }];

        let xml = generate(&entries, ChangeFreq::Monthly, 0.85);
        assert!(xml.contains("<priority>0.85</priority>"));

        assert_eq!(format_priority(0.25), "0.25");
        assert_eq!(format_priority(0.05), "0.05");
        assert_eq!(format_priority(0.5), "0.5");
        assert_eq!(format_priority(1.0), "1.0");
        assert_eq!(format_priority(0.0), "0.0");
    }

    #[test]
    fn test_generate_empty() {
        let xml = generate(&[], ChangeFreq::default(), 0.5);
        assert!(xml.contains("<urlset"));
        assert!(!xml.contains("<url>"));
    }

    #[test]
    fn test_collect_entries_and_write() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "index.html");
        touch(dir.path(), "contact.html");

        let entries = collect_entries(dir.path(), "https://example.com/", &exclude()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].loc, "https://example.com/contact.html");
        assert_eq!(entries[1].loc, "https://example.com/");
        assert!(entries.iter().all(|e| e.lastmod.is_some()));

        let output = default_output(dir.path());
        write_sitemap(&output, &generate(&entries, ChangeFreq::Monthly, 0.8)).unwrap();
        let written = fs::read_to_string(output).unwrap();
        assert!(written.contains("<changefreq>monthly</changefreq>"));
    }
}
