//! Spam guard: honeypot and CAPTCHA checks run before any validation.
//!
//! A filled honeypot is dropped silently: the sender gets the normal
//! success notice and nothing is delivered.

pub mod recaptcha;

use std::sync::Arc;

pub use recaptcha::{CaptchaVerifier, DEFAULT_VERIFY_URL, RecaptchaVerifier, SiteVerifyResponse};

use crate::config::CaptchaConfig;
use crate::error::{Service, SubmissionError};
use crate::form::SubmissionInput;

/// Verdict for one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardResult {
    Pass,
    /// Report success, deliver nothing.
    SilentDrop,
    Reject(GuardRejection),
}

/// Why the guard refused a submission.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GuardRejection {
    #[error("captcha not configured")]
    NotConfigured,

    #[error("captcha verification failed")]
    VerificationFailed,

    /// The verification call itself failed (transport, status, decoding).
    #[error("captcha verification failed: {0}")]
    Unavailable(String),

    #[error("suspicious activity")]
    SuspiciousActivity,
}

impl From<GuardRejection> for SubmissionError {
    fn from(rejection: GuardRejection) -> Self {
        match rejection {
            GuardRejection::NotConfigured => {
                SubmissionError::Configuration(GuardRejection::NotConfigured.to_string())
            }
            GuardRejection::Unavailable(reason) => SubmissionError::ExternalService {
                service: Service::Captcha,
                reason,
            },
            other => SubmissionError::SpamDetected(other.to_string()),
        }
    }
}

/// Honeypot + CAPTCHA gate.
pub struct SpamGuard {
    config: CaptchaConfig,
    verifier: Arc<dyn CaptchaVerifier>,
}

impl SpamGuard {
    pub fn new(config: CaptchaConfig, verifier: Arc<dyn CaptchaVerifier>) -> Self {
        Self { config, verifier }
    }

    /// Judge a submission. The honeypot is checked first so obvious bots
    /// never cost a verification round-trip.
    pub async fn check(&self, input: &SubmissionInput) -> GuardResult {
        if !input.honeypot.is_empty() {
            tracing::warn!(remote_ip = ?input.remote_ip, "Honeypot triggered; dropping submission");
            return GuardResult::SilentDrop;
        }

        if !self.config.enabled {
            return GuardResult::Pass;
        }

        let Some(secret) = &self.config.secret else {
            tracing::error!("reCAPTCHA is enabled but RECAPTCHA_SECRET_KEY is not set");
            return GuardResult::Reject(GuardRejection::NotConfigured);
        };

        if input.captcha_token.is_empty() {
            return GuardResult::Reject(GuardRejection::VerificationFailed);
        }

        let response = match self
            .verifier
            .verify(secret, &input.captcha_token, input.remote_ip)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "reCAPTCHA verification call failed");
                return GuardResult::Reject(GuardRejection::Unavailable(e.to_string()));
            }
        };

        if self.is_trusted(&response) {
            GuardResult::Pass
        } else {
            tracing::info!(
                success = response.success,
                score = ?response.score,
                action = ?response.action,
                "reCAPTCHA rejected submission"
            );
            GuardResult::Reject(GuardRejection::SuspiciousActivity)
        }
    }

    /// `success` must be true; score and action are only checked when sent.
    pub fn is_trusted(&self, response: &SiteVerifyResponse) -> bool {
        if !response.success {
            return false;
        }
        if response.score.is_some_and(|score| score < self.config.min_score) {
            return false;
        }
        match response.action.as_deref() {
            Some(action) if !action.is_empty() => action == self.config.expected_action,
            _ => true,
        }
    }
}
