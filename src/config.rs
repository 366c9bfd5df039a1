//! Configuration types.
//!
//! Everything is read from the environment once at startup. Empty values
//! count as unset.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::form::{FormConfig, ValidationProfile};
use crate::guard::DEFAULT_VERIFY_URL;
use crate::sinks::{EntryTarget, SmtpSecurity, SmtpSettings};

/// Default request body cap; leaves headroom over the 20 MB attachment limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct ContactConfig {
    pub server: ServerConfig,
    pub captcha: CaptchaConfig,
    pub mail: MailConfig,
    pub form: FormConfig,
    pub entries: EntryConfig,
    /// How long an unread flash message survives.
    pub flash_ttl: Duration,
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Take the client IP from `X-Forwarded-For` (behind a reverse proxy).
    pub trust_forwarded_for: bool,
    pub max_body_bytes: usize,
}

/// reCAPTCHA v3 settings.
#[derive(Debug, Clone)]
pub struct CaptchaConfig {
    pub enabled: bool,
    pub secret: Option<SecretString>,
    pub verify_url: String,
    pub timeout: Duration,
    pub min_score: f64,
    pub expected_action: String,
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            secret: None,
            verify_url: DEFAULT_VERIFY_URL.to_string(),
            timeout: Duration::from_secs(5),
            min_score: 0.5,
            expected_action: "submit".to_string(),
        }
    }
}

/// Notification mail settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp: SmtpSettings,
    pub from_address: String,
    pub from_name: String,
    pub to_address: String,
}

/// Optional content-entry persistence.
#[derive(Debug, Clone)]
pub struct EntryConfig {
    pub enabled: bool,
    pub db_path: PathBuf,
    pub target: EntryTarget,
}

impl ContactConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let server = ServerConfig {
            bind_addr: env.parse_or("CONTACT_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            trust_forwarded_for: env.flag_or("CONTACT_TRUST_FORWARDED_FOR", false)?,
            max_body_bytes: env.parse_or("CONTACT_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
        };

        let defaults = CaptchaConfig::default();
        let captcha = CaptchaConfig {
            enabled: env.flag_or("RECAPTCHA_ENABLED", defaults.enabled)?,
            secret: env.get("RECAPTCHA_SECRET_KEY").map(SecretString::from),
            verify_url: env.get("RECAPTCHA_VERIFY_URL").unwrap_or(defaults.verify_url),
            timeout: Duration::from_secs(env.parse_or("RECAPTCHA_TIMEOUT_SECS", 5)?),
            min_score: env.parse_or("RECAPTCHA_MIN_SCORE", defaults.min_score)?,
            expected_action: env.get("RECAPTCHA_ACTION").unwrap_or(defaults.expected_action),
        };
        if !(0.0..=1.0).contains(&captcha.min_score) {
            return Err(ConfigError::InvalidValue {
                key: "RECAPTCHA_MIN_SCORE".into(),
                message: "must be between 0.0 and 1.0".into(),
            });
        }

        let from_address = env.require("CONTACT_FROM_EMAIL")?;
        let mail = MailConfig {
            smtp: SmtpSettings {
                host: env.require("SMTP_HOST")?,
                port: env.parse_or("SMTP_PORT", 587)?,
                security: env.parse_or("SMTP_SECURITY", SmtpSecurity::default())?,
                username: env.get("SMTP_USERNAME").unwrap_or_default(),
                password: SecretString::from(env.get("SMTP_PASSWORD").unwrap_or_default()),
                timeout: Duration::from_secs(env.parse_or("SMTP_TIMEOUT_SECS", 30)?),
            },
            to_address: env
                .get("CONTACT_TO_EMAIL")
                .unwrap_or_else(|| from_address.clone()),
            from_name: env.get("CONTACT_FROM_NAME").unwrap_or_default(),
            from_address,
        };

        let form = FormConfig {
            profile: env.parse_or("CONTACT_FORM_PROFILE", ValidationProfile::default())?,
            consent_lines: env.flag_or("CONTACT_CONSENT_LINES", true)?,
        };

        let target_defaults = EntryTarget::default();
        let entries = EntryConfig {
            enabled: env.flag_or("CONTACT_ENTRIES_ENABLED", false)?,
            db_path: env
                .get("CONTACT_DB_PATH")
                .unwrap_or_else(|| "./data/contact-relay.db".to_string())
                .into(),
            target: EntryTarget {
                section: env.get("CONTACT_ENTRY_SECTION").unwrap_or(target_defaults.section),
                entry_type: env
                    .get("CONTACT_ENTRY_TYPE")
                    .unwrap_or(target_defaults.entry_type),
            },
        };

        Ok(Self {
            server,
            captcha,
            mail,
            form,
            entries,
            flash_ttl: Duration::from_secs(env.parse_or("CONTACT_FLASH_TTL_SECS", 600)?),
        })
    }
}

// ── Lookup helpers ──────────────────────────────────────────────────

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
            None => Ok(default),
        }
    }

    fn flag_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected a boolean, got '{raw}'"),
                }),
            },
            None => Ok(default),
        }
    }
}
