//! SMTP mailer via lettre.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use super::{Mailer, OutgoingMail};
use crate::error::MailError;

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SmtpSecurity {
    /// Implicit TLS (usually port 465).
    Tls,
    /// Plain connection upgraded with STARTTLS (usually port 587).
    #[default]
    StartTls,
    /// No encryption. Local relays and test catchers only.
    None,
}

impl std::str::FromStr for SmtpSecurity {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tls" | "ssl" => Ok(Self::Tls),
            "starttls" => Ok(Self::StartTls),
            "none" | "plain" => Ok(Self::None),
            _ => Err(format!("Unknown SMTP security mode: {}", s)),
        }
    }
}

/// Connection settings for the relay.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub security: SmtpSecurity,
    pub username: String,
    pub password: SecretString,
    pub timeout: Duration,
}

/// Sends notifications through an SMTP relay.
pub struct SmtpMailer {
    settings: SmtpSettings,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let message = build_message(&mail)?;
        let settings = self.settings.clone();

        // lettre's blocking transport; keep it off the async workers.
        tokio::task::spawn_blocking(move || deliver(&settings, &message))
            .await
            .map_err(|e| MailError::Transport(format!("SMTP task panicked: {e}")))??;

        tracing::info!(to = %mail.to, subject = %mail.subject, "Notification email sent");
        Ok(())
    }
}

fn parse_address(value: &str, field: &'static str) -> Result<Address, MailError> {
    value.parse().map_err(|e: lettre::address::AddressError| MailError::InvalidAddress {
        field,
        reason: e.to_string(),
    })
}

/// Build the RFC 5322 message: text-only, or mixed with one attachment.
pub fn build_message(mail: &OutgoingMail) -> Result<Message, MailError> {
    let from = Mailbox::new(
        Some(mail.from_name.clone()).filter(|n| !n.is_empty()),
        parse_address(&mail.from_address, "from")?,
    );
    let to = Mailbox::new(None, parse_address(&mail.to, "to")?);
    let reply_to = Mailbox::new(
        Some(mail.reply_to_name.clone()).filter(|n| !n.trim().is_empty()),
        parse_address(&mail.reply_to_address, "reply-to")?,
    );

    let builder = Message::builder()
        .from(from)
        .to(to)
        .reply_to(reply_to)
        .subject(mail.subject.clone());

    let message = match &mail.attachment {
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(mail.text_body.clone()),
        Some(file) => {
            let content_type =
                ContentType::parse(file.content_type.as_deref().unwrap_or("application/octet-stream"))
                    .map_err(|e| MailError::Build(format!("Invalid attachment content type: {e}")))?;
            let part = Attachment::new(file.filename.clone()).body(file.data.to_vec(), content_type);
            builder.multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(mail.text_body.clone()))
                    .singlepart(part),
            )
        }
    };

    message.map_err(|e| MailError::Build(e.to_string()))
}

/// Blocking send: run in `spawn_blocking`.
fn deliver(settings: &SmtpSettings, message: &Message) -> Result<(), MailError> {
    let builder = match settings.security {
        SmtpSecurity::Tls => SmtpTransport::relay(&settings.host)
            .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?,
        SmtpSecurity::StartTls => SmtpTransport::starttls_relay(&settings.host)
            .map_err(|e| MailError::Transport(format!("SMTP relay error: {e}")))?,
        SmtpSecurity::None => SmtpTransport::builder_dangerous(&settings.host),
    };

    let mut builder = builder.port(settings.port).timeout(Some(settings.timeout));
    if !settings.username.is_empty() {
        builder = builder.credentials(Credentials::new(
            settings.username.clone(),
            settings.password.expose_secret().to_string(),
        ));
    }

    let response = builder
        .build()
        .send(message)
        .map_err(|e| MailError::Transport(format!("SMTP send failed: {e}")))?;

    if response.is_positive() {
        Ok(())
    } else {
        Err(MailError::NotAccepted)
    }
}
