//! Verification gate in front of checkout, and logout

use std::time::Instant;

use shopfront_config::VerificationSettings;
use shopfront_engine::{
    AuthTokens, ChannelKind, FileSessionStore, OtpContext, OtpPurpose, Route, SessionStore,
};

use crate::common::{accepted, messages, mount_envelope, start_backend, storefront, tick_until};

#[tokio::test]
async fn checkout_unblocks_after_mobile_verification() {
    let server = start_backend().await;
    mount_envelope(
        &server,
        "/api/user/verify-mobile-otp",
        200,
        accepted("Mobile number verified", None),
        1,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let mut app = storefront(
        &server,
        &dir.path().join("session.json"),
        VerificationSettings::default(),
    );
    app.register_channel(ChannelKind::Mobile, "9876543210")
        .unwrap();
    app.navigate(Route::Checkout);

    let mut orders = 0;
    assert!(app.checkout(|| orders += 1).is_none());
    assert!(app.checkout(|| orders += 1).is_none());
    assert_eq!(orders, 0);
    let lines = app.gate_prompt().unwrap().describe();
    assert_eq!(
        lines,
        vec![
            "Mobile number: not verified".to_string(),
            "Email address: not added".to_string(),
        ]
    );

    assert!(app.confirm_gate());
    assert_eq!(app.route(), Route::Profile);

    app.open_otp(
        OtpContext::new("9876543210", OtpPurpose::Registration),
        Instant::now(),
    )
    .unwrap();
    app.input_otp("123456");
    app.submit_otp().unwrap().unwrap();
    tick_until(&mut app, |app| app.route() == Route::Login).await;

    assert!(app.checkout(|| orders += 1).is_some());
    assert_eq!(orders, 1);
    assert!(app.gate_prompt().is_none());
}

#[tokio::test]
async fn logout_removes_persisted_session() {
    let server = start_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    FileSessionStore::new(&session_path)
        .set(&AuthTokens::new("A", "B"))
        .unwrap();

    let mut app = storefront(&server, &session_path, VerificationSettings::default());
    app.logout().unwrap();

    assert!(!session_path.exists());
    assert_eq!(app.route(), Route::Login);
    assert_eq!(messages(&app.take_toasts()), vec!["Logged out successfully"]);
}
