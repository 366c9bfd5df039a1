//! Content entries: a typed record of each submission.

use async_trait::async_trait;

use crate::error::EntryError;
use crate::form::{SubmissionInput, ValidationProfile, display_name};

pub const DEFAULT_SECTION: &str = "contactSubmissions";
pub const DEFAULT_ENTRY_TYPE: &str = "contactFormSubmissions";
/// Title used when the sender gave no name.
pub const FALLBACK_TITLE: &str = "Contact Submission";

/// Section / entry-type handle pair an entry is filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTarget {
    pub section: String,
    pub entry_type: String,
}

impl Default for EntryTarget {
    fn default() -> Self {
        Self {
            section: DEFAULT_SECTION.to_string(),
            entry_type: DEFAULT_ENTRY_TYPE.to_string(),
        }
    }
}

/// An entry ready to be saved.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub target: EntryTarget,
    pub title: String,
    pub slug: String,
    pub enabled: bool,
    /// Field handle → value, in insertion order.
    pub fields: Vec<(String, String)>,
}

impl NewEntry {
    pub fn field(&self, handle: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| h == handle)
            .map(|(_, v)| v.as_str())
    }
}

/// Content-entry persistence.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Save an entry; returns its id.
    async fn create_entry(&self, entry: &NewEntry) -> Result<String, EntryError>;
}

/// URL-safe slug: ASCII-transliterated, lower-case, hyphen separated.
pub fn slugify(value: &str) -> String {
    let transliterated = deunicode::deunicode(value);
    let mut out = String::with_capacity(transliterated.len());

    for ch in transliterated.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }

    while out.ends_with('-') {
        out.pop();
    }

    if out.is_empty() {
        "entry".to_string()
    } else {
        out
    }
}

/// Map a submission onto the contact-submission field handles.
pub fn contact_entry(input: &SubmissionInput, profile: ValidationProfile, target: &EntryTarget) -> NewEntry {
    let name = display_name(input, profile).trim().to_string();
    let title = if name.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        name.clone()
    };
    let phone = if input.country_code.is_empty() {
        input.phone.clone()
    } else {
        format!("{}-{}", input.country_code, input.phone)
    };

    NewEntry {
        target: target.clone(),
        slug: slugify(&title),
        title,
        enabled: true,
        fields: vec![
            ("formSubmissionName".into(), name),
            ("formSubmissionCompany".into(), input.company.clone()),
            ("formSubmissionAddress".into(), input.address.clone()),
            ("formSubmissionEmail".into(), input.email.clone()),
            ("formSubmissionMessage".into(), input.message.clone()),
            ("formSubmissionPhoneNumber".into(), phone.trim().to_string()),
            ("formSubmissionSubject".into(), input.subject.clone()),
        ],
    }
}
