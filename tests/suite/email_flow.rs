//! Email confirmation-link flow against an HTTP backend

use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use shopfront_config::VerificationSettings;
use shopfront_engine::{ChannelKind, ChannelState, EmailVerifyState, Route};

use crate::common::{accepted, mount_envelope, rejected, start_backend, storefront, tick_until};

const LINK: &str = "https://shop.example.com/verify-email?code=tok%2Fen";

#[tokio::test]
async fn confirmed_link_redirects_to_login_after_delay() {
    let server = start_backend().await;
    Mock::given(method("POST"))
        .and(path("/api/user/verify-email"))
        .and(body_json(json!({"code": "tok/en"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(accepted("", None)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = storefront(
        &server,
        &dir.path().join("session.json"),
        VerificationSettings::default(),
    );
    app.register_channel(ChannelKind::Email, "a@example.com")
        .unwrap();

    app.open_email_link(LINK);
    tick_until(&mut app, |app| {
        app.email().is_some_and(|v| v.state().is_terminal())
    })
    .await;
    let settled = Instant::now();

    assert_eq!(
        app.email().unwrap().state(),
        &EmailVerifyState::Success {
            message: "Email verified successfully".to_string()
        }
    );
    assert_eq!(app.status().state(ChannelKind::Email), ChannelState::Verified);

    // Re-rendering with the same link does not verify again
    app.open_email_link(LINK);
    app.tick(settled + Duration::from_secs(2));
    assert_eq!(app.route(), Route::VerifyEmail);

    app.tick(settled + Duration::from_secs(3));
    assert_eq!(app.route(), Route::Login);
}

#[tokio::test]
async fn link_without_code_never_calls_backend() {
    let server = start_backend().await;
    mount_envelope(&server, "/api/user/verify-email", 200, accepted("ok", None), 0).await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = storefront(
        &server,
        &dir.path().join("session.json"),
        VerificationSettings::default(),
    );
    app.open_email_link("https://shop.example.com/verify-email?token=abc");

    assert_eq!(
        app.email().unwrap().state(),
        &EmailVerifyState::Error {
            message: "Invalid verification link".to_string()
        }
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    app.tick(Instant::now() + Duration::from_secs(5));
    assert_eq!(app.route(), Route::VerifyEmail);
}

#[tokio::test]
async fn expired_link_shows_server_message() {
    let server = start_backend().await;
    mount_envelope(
        &server,
        "/api/user/verify-email",
        410,
        rejected("Verification link has expired"),
        1,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = storefront(
        &server,
        &dir.path().join("session.json"),
        VerificationSettings::default(),
    );
    app.open_email_link(LINK);
    tick_until(&mut app, |app| {
        app.email().is_some_and(|v| v.state().is_terminal())
    })
    .await;

    assert_eq!(
        app.email().unwrap().state(),
        &EmailVerifyState::Error {
            message: "Verification link has expired".to_string()
        }
    );
    app.tick(Instant::now() + Duration::from_secs(10));
    assert_eq!(app.route(), Route::VerifyEmail);
}

#[tokio::test]
async fn leaving_before_redirect_cancels_it() {
    let server = start_backend().await;
    mount_envelope(&server, "/api/user/verify-email", 200, accepted("Verified", None), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = storefront(
        &server,
        &dir.path().join("session.json"),
        VerificationSettings::default(),
    );
    app.open_email_link(LINK);
    tick_until(&mut app, |app| {
        app.email().is_some_and(|v| v.state().is_terminal())
    })
    .await;

    app.navigate(Route::Home);
    app.tick(Instant::now() + Duration::from_secs(5));
    assert_eq!(app.route(), Route::Home);
}
