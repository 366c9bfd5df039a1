use std::net::SocketAddr;
use std::sync::Arc;

use contact_relay::config::ContactConfig;
use contact_relay::flash::{self, FlashStore};
use contact_relay::guard::{RecaptchaVerifier, SpamGuard};
use contact_relay::pipeline::{NotificationSettings, SubmissionPipeline};
use contact_relay::routes::{AppState, contact_routes};
use contact_relay::sinks::SmtpMailer;
use contact_relay::store::LibSqlEntryStore;

#[tokio::main]
async fn main() -> contact_relay::error::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ContactConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export SMTP_HOST=smtp.example.com");
        eprintln!("  export CONTACT_FROM_EMAIL=noreply@example.com");
        std::process::exit(1);
    });

    eprintln!("📨 Contact Relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Listening: http://{}", config.server.bind_addr);
    eprintln!("   Form profile: {}", config.form.profile);
    eprintln!(
        "   reCAPTCHA: {}",
        if config.captcha.enabled { "enabled" } else { "disabled" }
    );
    eprintln!("   Notify: {}", config.mail.to_address);

    if config.captcha.enabled && config.captcha.secret.is_none() {
        tracing::warn!("RECAPTCHA_SECRET_KEY is not set; every submission will be refused");
    }

    // ── Spam guard ──────────────────────────────────────────────────────
    let verifier = RecaptchaVerifier::new(config.captcha.verify_url.clone(), config.captcha.timeout)?;
    let guard = SpamGuard::new(config.captcha.clone(), Arc::new(verifier));

    // ── Sinks ───────────────────────────────────────────────────────────
    let mailer = Arc::new(SmtpMailer::new(config.mail.smtp.clone()));
    let notification = NotificationSettings {
        to_address: config.mail.to_address.clone(),
        from_address: config.mail.from_address.clone(),
        from_name: config.mail.from_name.clone(),
    };

    let mut pipeline = SubmissionPipeline::new(guard, config.form, notification, mailer);

    if config.entries.enabled {
        let store = LibSqlEntryStore::new_local(&config.entries.db_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: Failed to open database at {}: {}",
                    config.entries.db_path.display(),
                    e
                );
                std::process::exit(1);
            });
        let target = config.entries.target.clone();
        store
            .ensure_entry_type(&target.section, &target.entry_type)
            .await?;
        eprintln!("   Entries: {} ({})", config.entries.db_path.display(), target.section);
        pipeline = pipeline.with_entries(Arc::new(store), target);
    }

    // ── Flash + HTTP ────────────────────────────────────────────────────
    let flash_store = FlashStore::new(config.flash_ttl);
    let _expiry_handle = flash::spawn_expiry_task(Arc::clone(&flash_store));

    let state = AppState {
        pipeline: Arc::new(pipeline),
        flash: flash_store,
        trust_forwarded_for: config.server.trust_forwarded_for,
    };
    let app = contact_routes(state, config.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr).await?;
    tracing::info!(addr = %config.server.bind_addr, "Contact relay started");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
