//! Newsletter sender for Microsoft 365 mailboxes, plus a sitemap generator
//! for the static site the newsletter points to.

pub mod cmd;
pub mod config;
pub mod error;
pub mod graph;
pub mod recipients;
pub mod sitemap;
pub mod templates;

pub use error::{Error, MailoutError, Result};
