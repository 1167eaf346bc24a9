use std::path::PathBuf;

use anyhow::Context as _;
use chrono::NaiveDateTime;

use crate::archive::ArchiveSink;
use crate::cli::NotifyArgs;
use crate::config::{MailSettings, Settings};
use crate::credentials::{
    ChainedCredentials, CredentialSource, EncryptedFileCredentials, EnvCredentials,
};
use crate::dedup;
use crate::digest::{self, Digest};
use crate::mail::{MailTransport, OutgoingMail, SmtpMailer};
use crate::record_store::{self, StorePaths};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub new_records: usize,
    pub archived: Option<PathBuf>,
    pub sent: bool,
}

/// The notify stage with its collaborators wired in.
pub struct Notifier<'a> {
    pub stores: StorePaths,
    pub archive: ArchiveSink,
    pub mail: &'a MailSettings,
    pub credentials: &'a dyn CredentialSource,
    pub transport: &'a dyn MailTransport,
}

impl Notifier<'_> {
    /// Diffs the record store against the last notification, archives the
    /// digest, sends it when there is something new, and then marks the
    /// current store as notified.
    ///
    /// The last-sent store advances even when sending fails, so a record is
    /// announced at most once.
    pub fn run(&self, now: NaiveDateTime) -> anyhow::Result<NotifyOutcome> {
        let current = record_store::load(&self.stores.records)?;
        tracing::info!(
            count = current.len(),
            path = %self.stores.records.display(),
            "records loaded"
        );
        let last_sent = record_store::load(&self.stores.last_sent)?;
        tracing::info!(
            count = last_sent.len(),
            path = %self.stores.last_sent.display(),
            "last sent records loaded"
        );

        let fresh = dedup::diff_for_notification(&current, &last_sent);
        tracing::info!(count = fresh.len(), "new records since last notification");

        let digest = digest::build_digest(&fresh, now);
        let archived = self.archive.store(&digest, now);

        if digest.is_empty() {
            tracing::info!("no new records; no mail sent");
            return Ok(NotifyOutcome {
                new_records: 0,
                archived,
                sent: false,
            });
        }

        let sent = send_digest(&digest, self.mail, self.credentials, self.transport);

        record_store::save(&self.stores.last_sent, &current).with_context(|| {
            format!("save last sent records: {}", self.stores.last_sent.display())
        })?;
        tracing::info!(path = %self.stores.last_sent.display(), "last sent records updated");

        Ok(NotifyOutcome {
            new_records: digest.entry_count,
            archived,
            sent,
        })
    }
}

/// Sends `digest` to the configured recipients. Every failure is logged and
/// reported as `false`.
pub fn send_digest(
    digest: &Digest,
    mail: &MailSettings,
    credentials: &dyn CredentialSource,
    transport: &dyn MailTransport,
) -> bool {
    if mail.recipients.is_empty() {
        tracing::error!("no recipient addresses configured (RECIPIENT_EMAIL)");
        return false;
    }

    let credentials = match credentials.load() {
        Ok(Some(credentials)) => credentials,
        Ok(None) => {
            tracing::error!("no smtp credentials found");
            return false;
        }
        Err(err) => {
            tracing::error!("failed to load smtp credentials: {err:#}");
            return false;
        }
    };

    let outgoing = OutgoingMail {
        sender: &mail.sender,
        recipients: &mail.recipients,
        subject: &digest.subject,
        text_body: &digest.text_body,
        html_body: &digest.html_body,
    };
    match transport.send(&outgoing, &credentials) {
        Ok(()) => {
            tracing::info!(
                entries = digest.entry_count,
                recipients = %mail.recipients.join(", "),
                "notification sent"
            );
            true
        }
        Err(err) => {
            tracing::error!("failed to send notification: {err:#}");
            false
        }
    }
}

pub fn run(args: &NotifyArgs, settings: &Settings) -> anyhow::Result<NotifyOutcome> {
    let data_dir = PathBuf::from(&args.data_dir);
    let credentials = ChainedCredentials::new(vec![
        Box::new(EnvCredentials::new(
            settings.mail.smtp_username.clone(),
            settings.mail.smtp_password.clone(),
        )),
        Box::new(EncryptedFileCredentials::new(
            &args.credentials_file,
            &args.key_file,
        )),
    ]);
    let transport = SmtpMailer::from_settings(&settings.mail);

    let notifier = Notifier {
        stores: StorePaths::in_data_dir(&data_dir),
        archive: ArchiveSink::new(
            settings.archive.dir_or_default(&data_dir),
            settings.archive.enabled,
            settings.archive.archive_empty,
        ),
        mail: &settings.mail,
        credentials: &credentials,
        transport: &transport,
    };

    notifier.run(chrono::Local::now().naive_local())
}
