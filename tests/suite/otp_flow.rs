//! Mobile OTP flow against an HTTP backend

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use shopfront_config::VerificationSettings;
use shopfront_engine::{
    AuthTokens, ChannelKind, ChannelState, FileSessionStore, OtpContext, OtpPurpose, ResendStart,
    Route, SessionStore,
};

use crate::common::{
    accepted, messages, mount_envelope, rejected, start_backend, storefront, tick_until,
};

fn quick_cooldown() -> VerificationSettings {
    VerificationSettings {
        resend_cooldown_secs: 1,
        ..VerificationSettings::default()
    }
}

#[tokio::test]
async fn login_code_persists_tokens_and_lands_home() {
    let server = start_backend().await;
    Mock::given(method("POST"))
        .and(path("/api/user/verify-mobile-login-otp"))
        .and(body_json(json!({"mobile": "9876543210", "otp": "000000"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(accepted(
            "Login successful",
            Some(json!({"accesstoken": "A", "refreshToken": "B"})),
        )))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    let mut app = storefront(&server, &session_path, VerificationSettings::default());

    app.open_otp(
        OtpContext::new("9876543210", OtpPurpose::Login),
        std::time::Instant::now(),
    )
    .unwrap();
    app.input_otp("000000");
    app.submit_otp().unwrap().unwrap();
    tick_until(&mut app, |app| app.route() == Route::Home).await;

    let stored = FileSessionStore::new(&session_path).get().unwrap();
    assert_eq!(stored, Some(AuthTokens::new("A", "B")));
    assert_eq!(app.status().state(ChannelKind::Mobile), ChannelState::Verified);
    assert_eq!(messages(&app.take_toasts()), vec!["Login successful"]);
}

#[tokio::test]
async fn rejected_code_keeps_screen_and_input() {
    let server = start_backend().await;
    mount_envelope(
        &server,
        "/api/user/verify-mobile-otp",
        400,
        rejected("Invalid OTP"),
        1,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = storefront(
        &server,
        &dir.path().join("session.json"),
        VerificationSettings::default(),
    );
    app.open_otp(
        OtpContext::new("9876543210", OtpPurpose::Registration),
        std::time::Instant::now(),
    )
    .unwrap();
    app.input_otp("111111");
    app.submit_otp().unwrap().unwrap();
    tick_until(&mut app, |app| {
        app.otp().is_some_and(|otp| !otp.is_verify_in_flight())
    })
    .await;

    assert_eq!(app.route(), Route::VerifyOtp);
    let otp = app.otp().unwrap();
    assert_eq!(otp.code(), "111111");
    assert!(otp.is_code_rejected());
    assert_eq!(messages(&app.take_toasts()), vec!["Invalid OTP"]);
}

#[tokio::test]
async fn unparseable_server_error_is_generic_failure() {
    let server = start_backend().await;
    Mock::given(method("POST"))
        .and(path("/api/user/verify-mobile-otp"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = storefront(
        &server,
        &dir.path().join("session.json"),
        VerificationSettings::default(),
    );
    app.open_otp(
        OtpContext::new("9876543210", OtpPurpose::Registration),
        std::time::Instant::now(),
    )
    .unwrap();
    app.input_otp("123456");
    app.submit_otp().unwrap().unwrap();
    tick_until(&mut app, |app| {
        app.otp().is_some_and(|otp| !otp.is_verify_in_flight())
    })
    .await;

    assert_eq!(
        messages(&app.take_toasts()),
        vec!["Something went wrong. Please try again."]
    );
    assert!(!app.otp().unwrap().is_code_rejected());
}

#[tokio::test]
async fn short_code_never_reaches_backend() {
    let server = start_backend().await;
    mount_envelope(
        &server,
        "/api/user/verify-mobile-otp",
        200,
        accepted("ok", None),
        0,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = storefront(
        &server,
        &dir.path().join("session.json"),
        VerificationSettings::default(),
    );
    app.open_otp(
        OtpContext::new("9876543210", OtpPurpose::Registration),
        std::time::Instant::now(),
    )
    .unwrap();
    app.input_otp("12a3");
    assert!(app.submit_otp().unwrap().is_err());
    tokio::time::sleep(Duration::from_millis(50)).await;
    app.tick(std::time::Instant::now());

    assert_eq!(
        messages(&app.take_toasts()),
        vec!["Please enter the 6-digit code"]
    );
}

#[tokio::test]
async fn resend_waits_for_cooldown_then_uses_purpose_endpoint() {
    let server = start_backend().await;
    mount_envelope(
        &server,
        "/api/user/mobile-otp-login",
        200,
        accepted("OTP sent", None),
        1,
    )
    .await;
    mount_envelope(
        &server,
        "/api/user/resend-mobile-otp",
        200,
        accepted("unused", None),
        0,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = storefront(&server, &dir.path().join("session.json"), quick_cooldown());
    app.open_otp(
        OtpContext::new("9876543210", OtpPurpose::Login),
        std::time::Instant::now(),
    )
    .unwrap();

    assert_eq!(
        app.resend_otp(),
        Some(ResendStart::CoolingDown { remaining: 1 })
    );
    tick_until(&mut app, |app| {
        app.otp().is_some_and(|otp| otp.cooldown_remaining() == 0)
    })
    .await;

    assert_eq!(app.resend_otp(), Some(ResendStart::Started));
    tick_until(&mut app, |app| {
        app.otp().is_some_and(|otp| !otp.is_resend_in_flight())
    })
    .await;

    assert_eq!(messages(&app.take_toasts()), vec!["OTP sent"]);
    assert_eq!(app.otp().unwrap().cooldown_remaining(), 1);
}
