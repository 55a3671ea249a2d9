//! Login and access token checks through the backend facade

mod common;

use common::{registration, TestApp, TEST_PASSWORD};

// AUTH-I01: Registered user logs in and the token verifies
#[tokio::test]
async fn test_login_and_verify() {
    let app = TestApp::new().unwrap();
    let registered = app
        .backend
        .register_user(registration("a@b.com", vec![]))
        .await
        .unwrap();

    let token = app
        .backend
        .authenticate_user(" A@b.com ", TEST_PASSWORD)
        .await
        .unwrap();
    assert_eq!(token.token_type, "Bearer");

    let header = format!("Bearer {}", token.access_token);
    let claims = app.backend.verify_access_token(Some(&header)).unwrap();
    assert_eq!(claims.sub, registered.id.to_string());
    assert_eq!(claims.email, "a@b.com");
    assert_eq!(claims.iss.as_deref(), Some("crmsync-test"));
}

// AUTH-I02: Wrong password and unknown user give the same message
#[tokio::test]
async fn test_invalid_credentials() {
    let app = TestApp::new().unwrap();
    app.backend
        .register_user(registration("a@b.com", vec![]))
        .await
        .unwrap();

    let wrong_password = app
        .backend
        .authenticate_user("a@b.com", "nope")
        .await
        .unwrap_err();
    let unknown_user = app
        .backend
        .authenticate_user("who@b.com", TEST_PASSWORD)
        .await
        .unwrap_err();

    assert_eq!(wrong_password.error, "Invalid credentials");
    assert_eq!(wrong_password, unknown_user);
}

// AUTH-I03: Rolled-back registrations cannot log in
#[tokio::test]
async fn test_compensated_user_cannot_login() {
    let app = TestApp::new().unwrap();
    app.crm
        .fail(crmsync_hubspot::MockFailure::Create(crmsync_hubspot::ObjectKind::Contacts));
    let _ = app
        .backend
        .register_user(registration("a@b.com", vec![]))
        .await;

    let body = app
        .backend
        .authenticate_user("a@b.com", TEST_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(body.error, "Invalid credentials");
}

// AUTH-I04: Malformed and forged headers are rejected
#[tokio::test]
async fn test_bad_authorization_headers() {
    let app = TestApp::new().unwrap();

    let missing = app.backend.verify_access_token(None).unwrap_err();
    assert_eq!(missing.error, "Authorization header required");

    let basic = app
        .backend
        .verify_access_token(Some("Basic dXNlcjpwYXNz"))
        .unwrap_err();
    assert_eq!(basic.error, "Invalid authorization header format");

    let forged = app
        .backend
        .verify_access_token(Some("Bearer eyJhbGciOiJIUzI1NiJ9.e30.c2lnbmF0dXJl"))
        .unwrap_err();
    assert_eq!(forged.error, "Invalid or expired token");
}
