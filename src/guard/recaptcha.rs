//! reCAPTCHA v3 site verification over HTTP.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::CaptchaError;

/// Google's verification endpoint.
pub const DEFAULT_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// Decoded siteverify payload. Only `success` is always sent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteVerifyResponse {
    #[serde(default)]
    pub success: bool,
    /// v3 only; 1.0 is very likely a human.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub challenge_ts: Option<String>,
    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// Something that can check a CAPTCHA token.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(
        &self,
        secret: &SecretString,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<SiteVerifyResponse, CaptchaError>;
}

/// reqwest-backed verifier with a hard request timeout.
pub struct RecaptchaVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl RecaptchaVerifier {
    pub fn new(verify_url: impl Into<String>, timeout: Duration) -> Result<Self, CaptchaError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CaptchaError::Request(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            verify_url: verify_url.into(),
        })
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(
        &self,
        secret: &SecretString,
        token: &str,
        remote_ip: Option<IpAddr>,
    ) -> Result<SiteVerifyResponse, CaptchaError> {
        let mut params = vec![
            ("secret", secret.expose_secret().to_string()),
            ("response", token.to_string()),
        ];
        if let Some(ip) = remote_ip {
            params.push(("remoteip", ip.to_string()));
        }

        let resp = self
            .client
            .post(&self.verify_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| CaptchaError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CaptchaError::Status(resp.status().as_u16()));
        }

        let payload: SiteVerifyResponse = resp
            .json()
            .await
            .map_err(|e| CaptchaError::InvalidResponse(e.to_string()))?;

        tracing::debug!(
            success = payload.success,
            score = ?payload.score,
            action = ?payload.action,
            hostname = ?payload.hostname,
            errors = ?payload.error_codes,
            "reCAPTCHA verification response"
        );

        Ok(payload)
    }
}
