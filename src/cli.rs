use std::fmt;

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_URL: &str = "https://www.kfv-esnt.de/index.asp?ID=1894&CAT=Ausbildung&SUBCAT=Termine%20Kreisausbildung&SPRACHE=1";

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Also append log output to this file.
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the course page and store new records.
    Scrape(ScrapeArgs),
    /// Mail a digest of records not yet notified.
    Notify(NotifyArgs),
    /// Run `scrape` and then `notify`, stopping on the first failure.
    Run(RunArgs),
    Credentials {
        #[command(subcommand)]
        command: CredentialsCommand,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ScrapeArgs {
    /// Course page URL (must be http/https).
    #[arg(long, default_value = DEFAULT_URL)]
    pub url: String,

    /// Directory holding `termine.json` and `last_sent.json`.
    #[arg(long, default_value = "data")]
    pub data_dir: String,
}

#[derive(Debug, Clone, Args)]
pub struct NotifyArgs {
    /// Directory holding `termine.json` and `last_sent.json`.
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Encrypted SMTP credentials (used when SMTP_USERNAME/SMTP_PASSWORD are unset).
    #[arg(long, default_value = "config/smtp_credentials.enc")]
    pub credentials_file: String,

    /// Key file for the encrypted credentials.
    #[arg(long, default_value = "secret.key")]
    pub key_file: String,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Course page URL (must be http/https).
    #[arg(long, default_value = DEFAULT_URL)]
    pub url: String,

    /// Directory holding `termine.json` and `last_sent.json`.
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Encrypted SMTP credentials (used when SMTP_USERNAME/SMTP_PASSWORD are unset).
    #[arg(long, default_value = "config/smtp_credentials.enc")]
    pub credentials_file: String,

    /// Key file for the encrypted credentials.
    #[arg(long, default_value = "secret.key")]
    pub key_file: String,
}

#[derive(Debug, Subcommand)]
pub enum CredentialsCommand {
    /// Encrypt SMTP credentials into the credentials file.
    Init(CredentialsInitArgs),
}

#[derive(Args)]
pub struct CredentialsInitArgs {
    /// Output path for the encrypted credentials.
    #[arg(long, default_value = "config/smtp_credentials.enc")]
    pub credentials_file: String,

    /// Key file (generated when missing).
    #[arg(long, default_value = "secret.key")]
    pub key_file: String,

    /// SMTP username (prompted on stdin when omitted).
    #[arg(long)]
    pub username: Option<String>,

    /// SMTP password (prompted on stdin when omitted).
    #[arg(long)]
    pub password: Option<String>,
}

impl fmt::Debug for CredentialsInitArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsInitArgs")
            .field("credentials_file", &self.credentials_file)
            .field("key_file", &self.key_file)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
