use anyhow::Context as _;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport as _};

use crate::config::MailSettings;
use crate::credentials::SmtpCredentials;

#[derive(Debug, Clone, Copy)]
pub struct OutgoingMail<'a> {
    pub sender: &'a str,
    pub recipients: &'a [String],
    pub subject: &'a str,
    pub text_body: &'a str,
    pub html_body: &'a str,
}

pub trait MailTransport {
    fn send(&self, mail: &OutgoingMail<'_>, credentials: &SmtpCredentials) -> anyhow::Result<()>;
}

/// Sends multipart (plain + HTML) mail over an SMTP relay using STARTTLS.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    server: String,
    port: u16,
}

impl SmtpMailer {
    pub fn new(server: impl Into<String>, port: u16) -> Self {
        Self {
            server: server.into(),
            port,
        }
    }

    pub fn from_settings(settings: &MailSettings) -> Self {
        Self::new(settings.smtp_server.clone(), settings.smtp_port)
    }
}

impl MailTransport for SmtpMailer {
    fn send(&self, mail: &OutgoingMail<'_>, credentials: &SmtpCredentials) -> anyhow::Result<()> {
        let message = build_message(mail)?;

        let transport = SmtpTransport::starttls_relay(&self.server)
            .with_context(|| format!("configure smtp relay: {}", self.server))?
            .port(self.port)
            .credentials(Credentials::new(
                credentials.username.clone(),
                credentials.password.clone(),
            ))
            .build();

        tracing::debug!(server = %self.server, port = self.port, "smtp send");
        transport
            .send(&message)
            .with_context(|| format!("smtp send via {}:{}", self.server, self.port))?;
        Ok(())
    }
}

fn build_message(mail: &OutgoingMail<'_>) -> anyhow::Result<Message> {
    let from: Mailbox = mail
        .sender
        .parse()
        .with_context(|| format!("parse sender address: {:?}", mail.sender))?;

    let mut builder = Message::builder().from(from).subject(mail.subject);
    for recipient in mail.recipients {
        let to: Mailbox = recipient
            .parse()
            .with_context(|| format!("parse recipient address: {recipient:?}"))?;
        builder = builder.to(to);
    }

    builder
        .multipart(MultiPart::alternative_plain_html(
            mail.text_body.to_owned(),
            mail.html_body.to_owned(),
        ))
        .context("build mail message")
}
