//! Submission pipeline: runs one posted form from guard to sinks.
//!
//! Flow:
//! 1. Spam guard (honeypot, CAPTCHA) → may short-circuit
//! 2. Field + attachment rules → composed body
//! 3. Content entry, when enabled
//! 4. Notification email
//!
//! Nothing is persisted or sent unless every earlier step passed.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::SubmissionError;
use crate::form::{self, FormConfig, SubmissionInput, display_name};
use crate::guard::{GuardResult, SpamGuard};
use crate::sinks::{EntryStore, EntryTarget, MailAttachment, Mailer, OutgoingMail, contact_entry};

/// Subject used when the sender left `subject` empty.
pub const DEFAULT_SUBJECT: &str = "New Contact Form Message";

/// Who the notification goes to and comes from.
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub to_address: String,
    pub from_address: String,
    pub from_name: String,
}

/// What happened to an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Mail sent; `entry_id` is set when an entry was saved.
    Delivered { entry_id: Option<String> },
    /// Honeypot hit. Reported as success, nothing delivered.
    Dropped,
}

/// Runs one submission end to end.
pub struct SubmissionPipeline {
    guard: SpamGuard,
    form: FormConfig,
    notification: NotificationSettings,
    mailer: Arc<dyn Mailer>,
    entries: Option<(Arc<dyn EntryStore>, EntryTarget)>,
}

impl SubmissionPipeline {
    pub fn new(
        guard: SpamGuard,
        form: FormConfig,
        notification: NotificationSettings,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            guard,
            form,
            notification,
            mailer,
            entries: None,
        }
    }

    /// Also save each accepted submission as a content entry.
    pub fn with_entries(mut self, store: Arc<dyn EntryStore>, target: EntryTarget) -> Self {
        self.entries = Some((store, target));
        self
    }

    pub async fn submit(&self, input: &SubmissionInput) -> Result<SubmissionOutcome, SubmissionError> {
        match self.guard.check(input).await {
            GuardResult::Pass => {}
            GuardResult::SilentDrop => return Ok(SubmissionOutcome::Dropped),
            GuardResult::Reject(rejection) => return Err(rejection.into()),
        }

        let body = form::evaluate(input, &self.form)?;
        debug!(profile = %self.form.profile, "Submission passed validation");

        let entry_id = match &self.entries {
            Some((store, target)) => {
                let entry = contact_entry(input, self.form.profile, target);
                let id = store.create_entry(&entry).await?;
                info!(id = %id, section = %target.section, "Contact entry saved");
                Some(id)
            }
            None => None,
        };

        let mail = self.notification_for(input, body);
        info!(
            mailer = self.mailer.name(),
            to = %mail.to,
            has_attachment = mail.attachment.is_some(),
            "Sending contact notification"
        );
        self.mailer.send(mail).await?;

        Ok(SubmissionOutcome::Delivered { entry_id })
    }

    fn notification_for(&self, input: &SubmissionInput, text_body: String) -> OutgoingMail {
        let subject = match input.subject.trim() {
            "" => DEFAULT_SUBJECT.to_string(),
            subject => subject.to_string(),
        };

        OutgoingMail {
            to: self.notification.to_address.clone(),
            from_name: self.notification.from_name.clone(),
            from_address: self.notification.from_address.clone(),
            reply_to_name: display_name(input, self.form.profile),
            reply_to_address: input.email.clone(),
            subject,
            text_body,
            attachment: input.attachment.as_ref().map(|file| MailAttachment {
                filename: file.filename.clone(),
                content_type: Some(file.declared_mime_type.clone()).filter(|t| !t.is_empty()),
                data: file.data.clone(),
            }),
        }
    }
}
