//! Field rules: ordered checks, first failure wins.
//!
//! Each rule is a predicate paired with the error it produces. Rules never
//! accumulate: the sender sees the reason of the first rule that fails.

use std::sync::LazyLock;

use email_address::{EmailAddress, Options};
use regex::Regex;

use super::input::SubmissionInput;
use crate::error::ValidationError;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 20;
pub const PHONE_DIGITS: usize = 10;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s'-]+$").expect("name pattern compiles"));

/// Which set of field rules applies to a form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationProfile {
    /// First/last name, email, and phone checks.
    #[default]
    Strict,
    /// Only `name`, `email`, and `message` must be non-empty.
    Minimal,
}

impl std::fmt::Display for ValidationProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Minimal => write!(f, "minimal"),
        }
    }
}

impl std::str::FromStr for ValidationProfile {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "minimal" => Ok(Self::Minimal),
            _ => Err(format!("Unknown validation profile: {}", s)),
        }
    }
}

type Rule = (fn(&SubmissionInput) -> bool, ValidationError);

static STRICT_RULES: &[Rule] = &[
    (names_are_text, ValidationError::NamesNotText),
    (names_have_valid_length, ValidationError::NameLength),
    (names_have_valid_characters, ValidationError::NameCharacters),
    (email_present, ValidationError::EmailRequired),
    (email_well_formed, ValidationError::EmailInvalid),
    (phone_has_ten_digits, ValidationError::PhoneLength),
];

static MINIMAL_RULES: &[Rule] = &[
    (name_present, ValidationError::NameRequired),
    (email_present, ValidationError::EmailRequired),
    (message_present, ValidationError::MessageRequired),
];

/// Apply the profile's rules in order.
pub fn validate(input: &SubmissionInput, profile: ValidationProfile) -> Result<(), ValidationError> {
    let rules = match profile {
        ValidationProfile::Strict => STRICT_RULES,
        ValidationProfile::Minimal => MINIMAL_RULES,
    };

    match rules.iter().find(|(passes, _)| !passes(input)) {
        Some((_, error)) => Err(error.clone()),
        None => Ok(()),
    }
}

/// Syntax check for a sender address. Display names and bare hosts are refused.
pub fn is_valid_email(value: &str) -> bool {
    let options = Options::default()
        .with_required_tld()
        .without_display_text();
    EmailAddress::parse_with_options(value, options).is_ok()
}

fn names(input: &SubmissionInput) -> [&str; 2] {
    [
        input.first_name.as_deref().unwrap_or_default(),
        input.last_name.as_deref().unwrap_or_default(),
    ]
}

fn names_are_text(input: &SubmissionInput) -> bool {
    input.first_name.is_some() && input.last_name.is_some()
}

fn names_have_valid_length(input: &SubmissionInput) -> bool {
    names(input).iter().all(|name| {
        let len = name.chars().count();
        (NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len)
    })
}

fn names_have_valid_characters(input: &SubmissionInput) -> bool {
    names(input).iter().all(|name| NAME_PATTERN.is_match(name))
}

fn name_present(input: &SubmissionInput) -> bool {
    !input.name.is_empty()
}

fn email_present(input: &SubmissionInput) -> bool {
    !input.email.is_empty()
}

fn email_well_formed(input: &SubmissionInput) -> bool {
    is_valid_email(&input.email)
}

fn phone_has_ten_digits(input: &SubmissionInput) -> bool {
    input.phone.len() == PHONE_DIGITS && input.phone.bytes().all(|b| b.is_ascii_digit())
}

fn message_present(input: &SubmissionInput) -> bool {
    !input.message.trim().is_empty()
}
