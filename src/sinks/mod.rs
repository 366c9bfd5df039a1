//! Submission sinks: where an accepted submission goes.
//!
//! Both are narrow traits so the pipeline can run against stubs:
//! - `Mailer`: notification email (SMTP via lettre in production)
//! - `EntryStore`: optional content-entry record (libSQL in production)

pub mod entry;
pub mod smtp;

use async_trait::async_trait;
use axum::body::Bytes;

pub use entry::{EntryStore, EntryTarget, NewEntry, contact_entry, slugify};
pub use smtp::{SmtpMailer, SmtpSecurity, SmtpSettings};

use crate::error::MailError;

/// File attached to the notification.
#[derive(Debug, Clone)]
pub struct MailAttachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A fully addressed plain-text notification.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub to: String,
    pub from_name: String,
    pub from_address: String,
    pub reply_to_name: String,
    pub reply_to_address: String,
    pub subject: String,
    pub text_body: String,
    pub attachment: Option<MailAttachment>,
}

/// Mail dispatch.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Transport name for logs.
    fn name(&self) -> &str;

    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}
