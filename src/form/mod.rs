//! Contact form handling.
//!
//! A posted body flows through:
//! 1. `input`: raw fields into a read-only `SubmissionInput`
//! 2. `rules`: ordered field checks (first failure wins)
//! 3. `attachment`: file type and size checks
//! 4. `compose`: the plain-text notification body
//!
//! Nothing here touches the network; spam checks and delivery live in
//! `guard` and `sinks`.

pub mod attachment;
pub mod compose;
pub mod input;
pub mod rules;

pub use compose::{compose_body, display_name};
pub use input::{Attachment, FieldValue, FormFields, SubmissionInput};
pub use rules::{ValidationProfile, validate};

use crate::error::ValidationError;

/// How a form is validated and rendered.
#[derive(Debug, Clone, Copy)]
pub struct FormConfig {
    pub profile: ValidationProfile,
    /// Append "Terms Accepted" / "Privacy Policy Accepted" lines.
    pub consent_lines: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            profile: ValidationProfile::Strict,
            consent_lines: true,
        }
    }
}

/// Field rules, then attachment rules, then the composed body.
pub fn evaluate(input: &SubmissionInput, config: &FormConfig) -> Result<String, ValidationError> {
    validate(input, config.profile)?;
    if let Some(file) = &input.attachment {
        attachment::check(file)?;
    }
    Ok(compose_body(input, config.profile, config.consent_lines))
}

#[cfg(test)]
mod tests {
    use axum::body::Bytes;

    use super::*;

    fn jane() -> SubmissionInput {
        SubmissionInput {
            first_name: Some("Jane".into()),
            last_name: Some("Doe".into()),
            email: "jane@example.com".into(),
            phone: "5551234567".into(),
            message: "Hello".into(),
            ..Default::default()
        }
    }

    #[test]
    fn accepted_input_yields_body() {
        let config = FormConfig {
            consent_lines: false,
            ..Default::default()
        };
        let body = evaluate(&jane(), &config).unwrap();
        assert!(body.starts_with("Name: Jane Doe\n"));
    }

    #[test]
    fn field_rules_run_before_attachment_rules() {
        let input = SubmissionInput {
            phone: "123".into(),
            attachment: Some(Attachment::new("x.exe", "application/x-msdownload", Bytes::new())),
            ..jane()
        };
        assert_eq!(
            evaluate(&input, &FormConfig::default()),
            Err(ValidationError::PhoneLength)
        );
    }

    #[test]
    fn bad_attachment_rejects_whole_submission() {
        let input = SubmissionInput {
            attachment: Some(Attachment::new("x.gif", "image/gif", Bytes::from_static(b"GIF89a"))),
            ..jane()
        };
        assert_eq!(
            evaluate(&input, &FormConfig::default()),
            Err(ValidationError::FileType)
        );
    }
}
