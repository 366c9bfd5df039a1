//! HTTP routes for the contact endpoint and its flash readout.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{ConnectInfo, DefaultBodyLimit, FromRequest, Multipart, Request, State},
    http::{HeaderMap, HeaderValue, header},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::SubmissionError;
use crate::flash::{FlashBag, FlashStore};
use crate::form::input::FIELD_REDIRECT;
use crate::form::{FormFields, SubmissionInput};
use crate::pipeline::{SubmissionOutcome, SubmissionPipeline};

/// Cookie carrying the flash session id.
pub const SESSION_COOKIE: &str = "contact_session";

/// Flash text for every accepted submission, dropped ones included.
pub const SUCCESS_MESSAGE: &str = "Message sent successfully!";

/// Shared state for route handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SubmissionPipeline>,
    pub flash: Arc<FlashStore>,
    /// Take the client IP from `X-Forwarded-For`.
    pub trust_forwarded_for: bool,
}

/// Build the Axum router with the contact and flash routes.
pub fn contact_routes(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/contact/send", post(send_contact))
        .route("/api/flash", get(take_flash))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "contact-relay"
    }))
}

// ── Flash ───────────────────────────────────────────────────────────

async fn take_flash(State(state): State<AppState>, headers: HeaderMap) -> Json<FlashBag> {
    match session_from_cookies(&headers) {
        Some(session) => Json(state.flash.take(session).await),
        None => Json(FlashBag::default()),
    }
}

fn session_from_cookies(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

fn session_cookie(session: Uuid) -> String {
    format!("{SESSION_COOKIE}={session}; HttpOnly; SameSite=Lax; Path=/")
}

// ── Contact ─────────────────────────────────────────────────────────

async fn send_contact(State(state): State<AppState>, request: Request) -> Response {
    let headers = request.headers().clone();
    let remote_ip = client_ip(&request, &headers, state.trust_forwarded_for);

    let existing_session = session_from_cookies(&headers);
    let session = existing_session.unwrap_or_else(Uuid::new_v4);

    let (target, result) = match read_fields(request, &state).await {
        Ok(fields) => {
            let target = redirect_target(fields.text(FIELD_REDIRECT), &headers);
            let input = SubmissionInput::extract(&fields, remote_ip);
            let result = state.pipeline.submit(&input).await;
            (target, result)
        }
        Err(e) => (redirect_target(None, &headers), Err(e)),
    };

    match result {
        Ok(outcome) => {
            if let SubmissionOutcome::Delivered { entry_id } = &outcome {
                info!(remote_ip = ?remote_ip, entry_id = ?entry_id, "Contact submission delivered");
            }
            state.flash.notice(session, SUCCESS_MESSAGE).await;
        }
        Err(e) => {
            error!(
                kind = e.kind(),
                error = %e,
                remote_ip = ?remote_ip,
                "Contact submission failed"
            );
            state.flash.error(session, e.user_message()).await;
        }
    }

    let redirect = Redirect::to(&target);
    if existing_session.is_some() {
        return redirect.into_response();
    }
    match HeaderValue::from_str(&session_cookie(session)) {
        Ok(cookie) => (AppendHeaders([(header::SET_COOKIE, cookie)]), redirect).into_response(),
        Err(_) => redirect.into_response(),
    }
}

/// Multipart when the client says so, urlencoded otherwise.
async fn read_fields(request: Request, state: &AppState) -> Result<FormFields, SubmissionError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| SubmissionError::Internal(format!("multipart rejected: {e}")))?;
        Ok(FormFields::from_multipart(multipart).await?)
    } else {
        let axum::Form(pairs) = axum::Form::<Vec<(String, String)>>::from_request(request, state)
            .await
            .map_err(|e| SubmissionError::Internal(format!("form body rejected: {e}")))?;
        Ok(FormFields::from_pairs(pairs))
    }
}

fn client_ip(request: &Request, headers: &HeaderMap, trust_forwarded_for: bool) -> Option<IpAddr> {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Posted local path, else the referring page, else the site root.
fn redirect_target(posted: Option<&str>, headers: &HeaderMap) -> String {
    if let Some(path) = posted.map(str::trim).filter(|p| is_local_path(p)) {
        return path.to_string();
    }
    headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "/".to_string())
}

/// Same-site path that is also a valid `Location` header value.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/')
        && !path.starts_with("//")
        && !path.contains('\\')
        && !path.chars().any(char::is_control)
        && HeaderValue::from_str(path).is_ok()
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::StatusCode;
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::config::CaptchaConfig;
    use crate::error::{CaptchaError, MailError};
    use crate::form::FormConfig;
    use crate::guard::{CaptchaVerifier, SiteVerifyResponse, SpamGuard};
    use crate::pipeline::NotificationSettings;
    use crate::sinks::{Mailer, OutgoingMail};

    struct FixedVerifier(f64);

    #[async_trait]
    impl CaptchaVerifier for FixedVerifier {
        async fn verify(
            &self,
            _secret: &SecretString,
            _token: &str,
            _remote_ip: Option<IpAddr>,
        ) -> Result<SiteVerifyResponse, CaptchaError> {
            Ok(SiteVerifyResponse {
                success: true,
                score: Some(self.0),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(mail);
            Ok(())
        }
    }

    fn app(score: f64, mailer: Arc<RecordingMailer>) -> Router {
        app_with_limit(score, mailer, 1024 * 1024)
    }

    fn app_with_limit(score: f64, mailer: Arc<RecordingMailer>, max_body_bytes: usize) -> Router {
        let captcha = CaptchaConfig {
            secret: Some(SecretString::from("secret")),
            timeout: Duration::from_secs(1),
            ..Default::default()
        };
        let pipeline = SubmissionPipeline::new(
            SpamGuard::new(captcha, Arc::new(FixedVerifier(score))),
            FormConfig::default(),
            NotificationSettings {
                to_address: "inbox@example.com".into(),
                from_address: "noreply@example.com".into(),
                from_name: "Example Site".into(),
            },
            mailer,
        );
        let state = AppState {
            pipeline: Arc::new(pipeline),
            flash: FlashStore::new(Duration::from_secs(600)),
            trust_forwarded_for: false,
        };
        contact_routes(state, max_body_bytes)
    }

    const VALID: &str = "fname=Jane&lname=Doe&email=jane%40example.com&phone=5551234567\
                         &message=Hello&g-recaptcha-response=token";

    fn post_form(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/contact/send")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::REFERER, "http://site.example/contact")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn flashes(app: Router, cookie: &str) -> serde_json::Value {
        let request = Request::builder()
            .uri("/api/flash")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn cookie_of(response: &Response) -> String {
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let app = app(0.9, Arc::default());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn success_redirects_to_referer_with_notice() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(0.9, mailer.clone());

        let response = app.clone().oneshot(post_form(VALID)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://site.example/contact"
        );
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);

        let cookie = cookie_of(&response);
        let bag = flashes(app.clone(), &cookie).await;
        assert_eq!(bag["notice"][0], SUCCESS_MESSAGE);
        assert_eq!(bag["error"].as_array().unwrap().len(), 0);

        // Consumed on first read.
        let bag = flashes(app, &cookie).await;
        assert_eq!(bag["notice"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn validation_error_is_flashed() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(0.9, mailer.clone());

        let body = VALID.replace("phone=5551234567", "phone=123");
        let response = app.clone().oneshot(post_form(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(mailer.sent.lock().unwrap().is_empty());

        let bag = flashes(app, &cookie_of(&response)).await;
        assert_eq!(bag["error"][0], "Phone number must be exactly 10 digits.");
    }

    #[tokio::test]
    async fn low_score_is_suspicious() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(0.3, mailer.clone());

        let response = app.clone().oneshot(post_form(VALID)).await.unwrap();
        let bag = flashes(app, &cookie_of(&response)).await;
        assert_eq!(bag["error"][0], "suspicious activity");
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn honeypot_looks_like_success() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(0.9, mailer.clone());

        let body = format!("{VALID}&website=http%3A%2F%2Fspam.example");
        let response = app.clone().oneshot(post_form(&body)).await.unwrap();
        let bag = flashes(app, &cookie_of(&response)).await;
        assert_eq!(bag["notice"][0], SUCCESS_MESSAGE);
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn posted_local_redirect_wins() {
        let app = app(0.9, Arc::default());
        let body = format!("{VALID}&redirect=%2Fthanks");
        let response = app.oneshot(post_form(&body)).await.unwrap();
        assert_eq!(response.headers()[header::LOCATION], "/thanks");
    }

    #[tokio::test]
    async fn redirect_with_control_character_falls_back_to_referer() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(0.9, mailer.clone());

        let body = format!("{VALID}&redirect=%2Fa%0Ab");
        let response = app.clone().oneshot(post_form(&body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "http://site.example/contact"
        );
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);

        let bag = flashes(app, &cookie_of(&response)).await;
        assert_eq!(bag["notice"][0], SUCCESS_MESSAGE);
    }

    #[tokio::test]
    async fn existing_session_is_reused() {
        let app = app(0.9, Arc::default());
        let session = Uuid::new_v4();
        let mut request = post_form(VALID);
        request.headers_mut().insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={session}")).unwrap(),
        );

        let response = app.clone().oneshot(request).await.unwrap();
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let bag = flashes(app, &format!("{SESSION_COOKIE}={session}")).await;
        assert_eq!(bag["notice"][0], SUCCESS_MESSAGE);
    }

    fn post_multipart(filename: &str, content_type: &str, data: &[u8]) -> Request {
        let boundary = "XBOUNDARY";
        let mut body = Vec::new();
        for (name, value) in [
            ("fname", "Jane"),
            ("lname", "Doe"),
            ("email", "jane@example.com"),
            ("phone", "5551234567"),
            ("message", "Hello"),
            ("g-recaptcha-response", "token"),
        ] {
            body.extend_from_slice(
                format!(
                    "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/contact/send")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn multipart_with_bad_attachment_is_rejected() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app(0.9, mailer.clone());

        let request = post_multipart("anim.gif", "image/gif", b"GIF89a");
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.headers()[header::LOCATION], "/");
        let bag = flashes(app, &cookie_of(&response)).await;
        assert_eq!(
            bag["error"][0],
            "Invalid file type. Allowed: JPEG, JPG, PNG, WEBP, MP4."
        );
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn upload_over_body_cap_reports_file_size() {
        let mailer = Arc::new(RecordingMailer::default());
        let app = app_with_limit(0.9, mailer.clone(), 16 * 1024);

        let request = post_multipart("clip.mp4", "video/mp4", &[0u8; 64 * 1024]);
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let bag = flashes(app, &cookie_of(&response)).await;
        assert_eq!(bag["error"][0], "File is too large. Max 20 MB.");
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn local_path_check() {
        assert!(is_local_path("/thanks"));
        assert!(!is_local_path("//evil.example"));
        assert!(!is_local_path("https://evil.example"));
        assert!(!is_local_path("/\\evil.example"));
        assert!(!is_local_path("/a\nb"));
        assert!(!is_local_path("/a\tb"));
        assert!(!is_local_path("/a\u{7f}b"));
        assert!(is_local_path("/caf\u{e9}?q=1"));
    }

    #[test]
    fn forwarded_for_is_honoured_only_when_trusted() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request
            .headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 1], 5000))));
        let headers = request.headers().clone();

        assert_eq!(
            client_ip(&request, &headers, true),
            Some("203.0.113.7".parse().unwrap())
        );
        assert_eq!(
            client_ip(&request, &headers, false),
            Some("10.0.0.1".parse().unwrap())
        );
    }
}
