use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::extract;

pub const DEFAULT_SMTP_SERVER: &str = "smtp.strato.de";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const ENV_FILE: &str = "config/.env";

#[derive(Debug, Clone)]
pub struct MailSettings {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender: String,
    pub recipients: Vec<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub enabled: bool,
    pub archive_empty: bool,
    /// Overrides `<data-dir>/email_archive` when set.
    pub dir: Option<PathBuf>,
}

impl ArchiveSettings {
    pub fn dir_or_default(&self, data_dir: &Path) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| data_dir.join("email_archive"))
    }
}

/// Environment-driven settings shared by both stages.
#[derive(Debug, Clone)]
pub struct Settings {
    pub search_terms: Vec<String>,
    pub mail: MailSettings,
    pub archive: ArchiveSettings,
}

impl Settings {
    /// Loads `config/.env` when present, then reads the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        match dotenvy::from_path(ENV_FILE) {
            Ok(()) => tracing::debug!(path = ENV_FILE, "loaded env file"),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(err).with_context(|| format!("load env file: {ENV_FILE}")),
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let smtp_port = match lookup("SMTP_PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .with_context(|| format!("parse SMTP_PORT: {raw:?}"))?,
            None => DEFAULT_SMTP_PORT,
        };

        let recipients = lookup("RECIPIENT_EMAIL")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(str::to_owned)
            .collect();

        Ok(Self {
            search_terms: extract::parse_search_terms(lookup("SEARCH_TEXT").as_deref()),
            mail: MailSettings {
                smtp_server: lookup("SMTP_SERVER")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_owned()),
                smtp_port,
                sender: lookup("SENDER_EMAIL").unwrap_or_default(),
                recipients,
                smtp_username: lookup("SMTP_USERNAME").filter(|v| !v.is_empty()),
                smtp_password: lookup("SMTP_PASSWORD").filter(|v| !v.is_empty()),
            },
            archive: ArchiveSettings {
                enabled: parse_flag(lookup("SAVE_EMAILS").as_deref()),
                archive_empty: parse_flag(lookup("SAVE_EMPTY_EMAILS").as_deref()),
                dir: lookup("EMAIL_ARCHIVE_DIR")
                    .filter(|v| !v.trim().is_empty())
                    .map(PathBuf::from),
            },
        })
    }
}

/// Unset means `true`; any value other than `true` (case-insensitive) is
/// `false`.
fn parse_flag(raw: Option<&str>) -> bool {
    raw.is_none_or(|v| v.trim().eq_ignore_ascii_case("true"))
}
