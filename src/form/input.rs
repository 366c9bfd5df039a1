//! Input extraction: posted fields into an immutable `SubmissionInput`.

use std::collections::HashMap;
use std::net::IpAddr;

use axum::body::Bytes;
use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;

use super::attachment::MAX_ATTACHMENT_BYTES;
use crate::error::BodyError;

// ── Field keys ──────────────────────────────────────────────────────

pub const FIELD_FIRST_NAME: &str = "fname";
pub const FIELD_LAST_NAME: &str = "lname";
pub const FIELD_NAME: &str = "name";
pub const FIELD_EMAIL: &str = "email";
pub const FIELD_MESSAGE: &str = "message";
pub const FIELD_COUNTRY_CODE: &str = "countryCode";
pub const FIELD_PHONE: &str = "phone";
pub const FIELD_COMPANY: &str = "company";
pub const FIELD_SUBJECT: &str = "subject";
pub const FIELD_ADDRESS: &str = "address";
pub const FIELD_TERMS: &str = "terms";
pub const FIELD_PRIVACY_POLICY: &str = "privacyPolicy";
/// Honeypot. Rendered hidden, so humans leave it empty.
pub const FIELD_HONEYPOT: &str = "website";
pub const FIELD_CAPTCHA_TOKEN: &str = "g-recaptcha-response";
pub const FIELD_REDIRECT: &str = "redirect";
pub const FIELD_FILE: &str = "file";

// ── Raw fields ──────────────────────────────────────────────────────

/// An uploaded file held in memory for the duration of one request.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Client-supplied file name.
    pub filename: String,
    /// Content type declared by the client (not sniffed).
    pub declared_mime_type: String,
    pub size_bytes: u64,
    pub data: Bytes,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, declared_mime_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            declared_mime_type: declared_mime_type.into(),
            size_bytes: data.len() as u64,
            data,
        }
    }
}

/// A single posted value.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Text(String),
    File(Attachment),
}

/// Key/value view of a request body. Later values for a repeated key win.
#[derive(Debug, Clone, Default)]
pub struct FormFields {
    values: HashMap<String, FieldValue>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from urlencoded `(key, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields = Self::new();
        for (key, value) in pairs {
            fields.insert_text(key, value);
        }
        fields
    }

    /// Drain a multipart body. A file part with no name and no bytes is the
    /// browser's "no file chosen" and is skipped. A file over
    /// `MAX_ATTACHMENT_BYTES` is read through without being kept.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, BodyError> {
        let mut fields = Self::new();

        while let Some(mut field) = multipart.next_field().await.map_err(body_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let declared = field.content_type().unwrap_or_default().to_string();
                    let mut data = Vec::new();
                    let mut too_large = false;
                    while let Some(chunk) = field.chunk().await.map_err(body_error)? {
                        too_large |= (data.len() + chunk.len()) as u64 > MAX_ATTACHMENT_BYTES;
                        if !too_large {
                            data.extend_from_slice(&chunk);
                        }
                    }
                    if too_large {
                        return Err(BodyError::TooLarge);
                    }
                    if filename.is_empty() && data.is_empty() {
                        continue;
                    }
                    fields.insert_file(name, Attachment::new(filename, declared, Bytes::from(data)));
                }
                None => {
                    let text = field.text().await.map_err(body_error)?;
                    fields.insert_text(name, text);
                }
            }
        }

        Ok(fields)
    }

    pub fn insert_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), FieldValue::Text(value.into()));
    }

    pub fn insert_file(&mut self, key: impl Into<String>, attachment: Attachment) {
        self.values.insert(key.into(), FieldValue::File(attachment));
    }

    /// Text value of `key`, or `None` when absent or not text.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(FieldValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Text value of `key`; absent or non-text values read as empty.
    pub fn text_or_empty(&self, key: &str) -> String {
        self.text(key).unwrap_or_default().to_string()
    }

    /// Trimmed text; `None` only when the key holds a non-text value.
    fn trimmed_text(&self, key: &str) -> Option<String> {
        match self.values.get(key) {
            Some(FieldValue::Text(value)) => Some(value.trim().to_string()),
            Some(FieldValue::File(_)) => None,
            None => Some(String::new()),
        }
    }

    pub fn attachment(&self, key: &str) -> Option<&Attachment> {
        match self.values.get(key) {
            Some(FieldValue::File(attachment)) => Some(attachment),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Checkbox-style truthiness: empty, "0", "false", "off", and "no" are false.
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty()
        || value == "0"
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("off")
        || value.eq_ignore_ascii_case("no"))
}

fn body_error(e: MultipartError) -> BodyError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        BodyError::TooLarge
    } else {
        BodyError::Malformed(e.body_text())
    }
}

// ── Submission ──────────────────────────────────────────────────────

/// Everything one submission carries, extracted once and then read-only.
#[derive(Debug, Clone, Default)]
pub struct SubmissionInput {
    /// `None` when the posted value was not text.
    pub first_name: Option<String>,
    /// `None` when the posted value was not text.
    pub last_name: Option<String>,
    /// Single name field used by the minimal form.
    pub name: String,
    pub email: String,
    pub message: String,
    pub country_code: String,
    pub phone: String,
    pub company: String,
    pub address: String,
    pub subject: String,
    pub terms_accepted: bool,
    pub privacy_accepted: bool,
    pub honeypot: String,
    pub captcha_token: String,
    pub remote_ip: Option<IpAddr>,
    pub attachment: Option<Attachment>,
}

impl SubmissionInput {
    /// Pull the contact fields out of a posted body.
    pub fn extract(fields: &FormFields, remote_ip: Option<IpAddr>) -> Self {
        Self {
            first_name: fields.trimmed_text(FIELD_FIRST_NAME),
            last_name: fields.trimmed_text(FIELD_LAST_NAME),
            name: fields.text_or_empty(FIELD_NAME).trim().to_string(),
            email: fields.text_or_empty(FIELD_EMAIL).trim().to_string(),
            message: fields.text_or_empty(FIELD_MESSAGE),
            country_code: fields.text_or_empty(FIELD_COUNTRY_CODE),
            phone: fields.text_or_empty(FIELD_PHONE),
            company: fields.text_or_empty(FIELD_COMPANY),
            address: fields.text_or_empty(FIELD_ADDRESS),
            subject: fields.text_or_empty(FIELD_SUBJECT),
            terms_accepted: fields.text(FIELD_TERMS).is_some_and(is_truthy),
            privacy_accepted: fields.text(FIELD_PRIVACY_POLICY).is_some_and(is_truthy),
            honeypot: fields.text_or_empty(FIELD_HONEYPOT).trim().to_string(),
            captcha_token: fields.text_or_empty(FIELD_CAPTCHA_TOKEN),
            remote_ip,
            attachment: fields.attachment(FIELD_FILE).cloned(),
        }
    }

    /// "First Last", trimmed. Empty when either half is not text.
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}").trim().to_string(),
            _ => String::new(),
        }
    }
}
