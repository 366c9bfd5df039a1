//! Error types for the contact relay.

use std::fmt;

/// Top-level error type for service startup and wiring.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("CAPTCHA client error: {0}")]
    Captcha(#[from] CaptchaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Content-entry persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("Section with handle '{section}' not found")]
    SectionNotFound { section: String },

    #[error("Entry type with handle '{entry_type}' not found for section '{section}'")]
    EntryTypeNotFound { section: String, entry_type: String },

    #[error("Could not save entry: {0}")]
    Rejected(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Mail dispatch errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid {field} address: {reason}")]
    InvalidAddress { field: &'static str, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),

    #[error("Mail server did not accept the message")]
    NotAccepted,
}

/// CAPTCHA verification transport errors.
#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("Verification request failed: {0}")]
    Request(String),

    #[error("Verification service returned HTTP {0}")]
    Status(u16),

    #[error("Invalid verification response: {0}")]
    InvalidResponse(String),
}

/// Failures while reading a posted body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    /// An upload (or the body carrying it) is over its size cap.
    #[error("upload exceeds the size limit")]
    TooLarge,

    #[error("malformed request body: {0}")]
    Malformed(String),
}

/// A user-correctable rejection from the field or attachment rules.
///
/// The `Display` text is exactly what the sender sees in the error flash.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("First name and last name must be text.")]
    NamesNotText,

    #[error("First name and last name must be between 2 and 20 characters.")]
    NameLength,

    #[error("Names can only contain letters, spaces, hyphens, and apostrophes.")]
    NameCharacters,

    #[error("Name is required.")]
    NameRequired,

    #[error("Email is required.")]
    EmailRequired,

    #[error("Please enter a valid email address.")]
    EmailInvalid,

    #[error("Phone number must be exactly 10 digits.")]
    PhoneLength,

    #[error("Message is required.")]
    MessageRequired,

    #[error("Invalid file type. Allowed: JPEG, JPG, PNG, WEBP, MP4.")]
    FileType,

    #[error("Invalid file MIME type.")]
    FileMimeType,

    #[error("File is too large. Max 20 MB.")]
    FileTooLarge,
}

/// External collaborator a submission depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Captcha,
    Mail,
    Entries,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Captcha => "captcha verification",
            Service::Mail => "mail dispatch",
            Service::Entries => "entry persistence",
        };
        f.write_str(name)
    }
}

/// Why a single submission did not go through.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Server-side misconfiguration; not correctable by the sender.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Spam detected: {0}")]
    SpamDetected(String),

    #[error("{service} failed: {reason}")]
    ExternalService { service: Service, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Flash text for failures the sender cannot act on.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

impl SubmissionError {
    /// The message shown to the sender in the error flash.
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Configuration(reason) => reason.clone(),
            SubmissionError::Validation(e) => e.to_string(),
            SubmissionError::SpamDetected(reason) => reason.clone(),
            SubmissionError::ExternalService { service, .. } => match service {
                Service::Captcha => "captcha verification failed".to_string(),
                Service::Mail => "Failed to send your message.".to_string(),
                Service::Entries => "Unable to save your submission.".to_string(),
            },
            SubmissionError::Internal(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Short machine-friendly tag used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            SubmissionError::Configuration(_) => "configuration",
            SubmissionError::Validation(_) => "validation",
            SubmissionError::SpamDetected(_) => "spam",
            SubmissionError::ExternalService { .. } => "external_service",
            SubmissionError::Internal(_) => "internal",
        }
    }
}

impl From<BodyError> for SubmissionError {
    fn from(e: BodyError) -> Self {
        match e {
            BodyError::TooLarge => SubmissionError::Validation(ValidationError::FileTooLarge),
            BodyError::Malformed(reason) => SubmissionError::Internal(reason),
        }
    }
}

impl From<MailError> for SubmissionError {
    fn from(e: MailError) -> Self {
        SubmissionError::ExternalService {
            service: Service::Mail,
            reason: e.to_string(),
        }
    }
}

impl From<EntryError> for SubmissionError {
    fn from(e: EntryError) -> Self {
        SubmissionError::ExternalService {
            service: Service::Entries,
            reason: e.to_string(),
        }
    }
}

/// Result type alias for service wiring.
pub type Result<T> = std::result::Result<T, Error>;
