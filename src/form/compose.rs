//! Plain-text notification body.

use super::input::SubmissionInput;
use super::rules::ValidationProfile;

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Name as it appears in the body and the Reply-To header.
pub fn display_name(input: &SubmissionInput, profile: ValidationProfile) -> String {
    match profile {
        ValidationProfile::Strict => input.full_name(),
        ValidationProfile::Minimal => input.name.clone(),
    }
}

/// Build the line-oriented body. Optional lines are dropped when their
/// field is empty; consent lines appear only when `consent_lines` is set.
pub fn compose_body(input: &SubmissionInput, profile: ValidationProfile, consent_lines: bool) -> String {
    let phone = if input.country_code.is_empty() {
        format!("Phone: {}", input.phone)
    } else {
        format!("Phone: {} {}", input.country_code, input.phone)
    };

    let mut lines: Vec<(bool, String)> = vec![
        (true, format!("Name: {}", display_name(input, profile))),
        (true, format!("Email: {}", input.email)),
        (!input.phone.is_empty(), phone),
        (!input.company.is_empty(), format!("Company: {}", input.company)),
        (!input.address.is_empty(), format!("Address: {}", input.address)),
        (true, String::new()),
        (true, "Message:".to_string()),
        (true, input.message.clone()),
    ];

    if consent_lines {
        lines.push((true, format!("Terms Accepted: {}", yes_no(input.terms_accepted))));
        lines.push((
            true,
            format!("Privacy Policy Accepted: {}", yes_no(input.privacy_accepted)),
        ));
    }

    lines
        .into_iter()
        .filter_map(|(include, line)| include.then_some(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
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
    fn body_without_optional_lines() {
        assert_eq!(
            compose_body(&jane(), ValidationProfile::Strict, false),
            "Name: Jane Doe\nEmail: jane@example.com\nPhone: 5551234567\n\nMessage:\nHello"
        );
    }

    #[test]
    fn company_and_address_sit_before_separator() {
        let input = SubmissionInput {
            company: "Acme".into(),
            address: "1 Main St".into(),
            ..jane()
        };
        assert_eq!(
            compose_body(&input, ValidationProfile::Strict, false),
            "Name: Jane Doe\nEmail: jane@example.com\nPhone: 5551234567\nCompany: Acme\nAddress: 1 Main St\n\nMessage:\nHello"
        );
    }

    #[test]
    fn country_code_prefixes_phone() {
        let input = SubmissionInput {
            country_code: "+1".into(),
            ..jane()
        };
        let body = compose_body(&input, ValidationProfile::Strict, false);
        assert!(body.contains("\nPhone: +1 5551234567\n"));
    }

    #[test]
    fn consent_lines_follow_message() {
        let input = SubmissionInput {
            terms_accepted: true,
            ..jane()
        };
        let body = compose_body(&input, ValidationProfile::Strict, true);
        assert!(body.ends_with("Message:\nHello\nTerms Accepted: Yes\nPrivacy Policy Accepted: No"));
    }

    #[test]
    fn strict_display_name_joins_both_halves() {
        assert_eq!(display_name(&jane(), ValidationProfile::Strict), "Jane Doe");
        let input = SubmissionInput {
            last_name: None,
            ..jane()
        };
        assert_eq!(display_name(&input, ValidationProfile::Strict), "");
    }

    #[test]
    fn minimal_profile_uses_single_name_and_drops_empty_phone() {
        let input = SubmissionInput {
            name: "Jane D".into(),
            email: "jane@example.com".into(),
            message: "<b>hi</b>".into(),
            ..Default::default()
        };
        assert_eq!(
            compose_body(&input, ValidationProfile::Minimal, false),
            "Name: Jane D\nEmail: jane@example.com\n\nMessage:\n<b>hi</b>"
        );
    }
}
