mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{MockBackend, Reply};
use chrono::NaiveDate;
use npi_outreach::{
    auth::{
        BusinessDetails, BusinessSignUpRequest, SignInRequest, SignUpRequest, forgot_password,
        register, register_business, send_forgot_password_link, send_signup_otp, sign_in,
    },
    error::{ApiError, ValidationError},
    google_users::{approve_user, list_google_users, mark_approved},
    reset::{self, NewPassword, Otp, ResetOutcome, ResetProgress, ResetStep},
    session::{SessionContext, SessionStore},
};

#[tokio::test]
async fn sign_in_stores_token_and_profile() {
    let mock = MockBackend::default();
    mock.json(
        "/auth/login",
        json!({"user": {"id": 4, "name": "Admin", "email": "admin@clinic.org",
                        "role": "admin", "photoURL": "https://img/a.png", "token": "jwt-1"}}),
    );
    let mut client = mock.client(None).await;
    let mut session = SessionContext::default();

    let request = SignInRequest::new("admin@clinic.org", "secret1").unwrap();
    let user = sign_in(&mut client, &mut session, &request).await.unwrap();

    assert_eq!(user.avatar.as_deref(), Some("https://img/a.png"));
    assert_eq!(client.token(), Some("jwt-1"));
    assert!(session.is_signed_in());
    assert_eq!(
        mock.requests_to("/auth/login")[0].body,
        json!({"email": "admin@clinic.org", "password": "secret1"})
    );

    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path());
    store.save(&session).unwrap();
    assert_eq!(store.load().unwrap(), session);
}

#[tokio::test]
async fn failed_sign_in_leaves_session_untouched() {
    let mock = MockBackend::default();
    mock.reply(
        "/auth/login",
        Reply::Json(StatusCode::UNAUTHORIZED, json!({"msg": "Invalid credentials"})),
    );
    let mut client = mock.client(None).await;
    let mut session = SessionContext::default();

    let request = SignInRequest::new("admin@clinic.org", "wrong1").unwrap();
    let err = sign_in(&mut client, &mut session, &request).await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid credentials");
    assert!(!session.is_signed_in());
    assert_eq!(client.token(), None);
}

#[tokio::test]
async fn sign_up_sends_otp_then_registers_and_signs_in() {
    let mock = MockBackend::default();
    mock.json("/auth/users/send-otp", json!({"message": "OTP sent"}))
        .json(
            "/auth/users/admin-register",
            json!({"token": "jwt-new", "user": {"id": 9, "name": "Ada", "email": "ada@clinic.org"}}),
        );
    let mut client = mock.client(None).await;
    let mut session = SessionContext::default();

    let request =
        SignUpRequest::new("ada", "ada@clinic.org", "secret1", "+1 337 427 8230", true).unwrap();
    send_signup_otp(&client, &request).await.unwrap();
    assert_eq!(
        mock.requests_to("/auth/users/send-otp")[0].body,
        json!({"username": "ada", "email": "ada@clinic.org", "password": "secret1",
               "phone": 13374278230u64, "terms": "true"})
    );

    let otp = Otp::for_signup("482193").unwrap();
    let user = register(&mut client, &mut session, "ada@clinic.org", &otp)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.name.as_deref(), Some("Ada"));
    assert_eq!(client.token(), Some("jwt-new"));
    assert!(session.is_signed_in());
    assert_eq!(
        mock.requests_to("/auth/users/admin-register")[0].body,
        json!({"email": "ada@clinic.org", "otp": "482193"})
    );
}

#[tokio::test]
async fn registration_without_token_is_refused() {
    let mock = MockBackend::default();
    mock.json("/auth/users/admin-register", json!({"message": "ok"}));
    let mut client = mock.client(None).await;
    let mut session = SessionContext::default();

    let otp = Otp::for_signup("482193").unwrap();
    let err = register(&mut client, &mut session, "ada@clinic.org", &otp)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Sign up failed");
    assert!(!session.is_signed_in());
}

#[tokio::test]
async fn business_sign_up_posts_vendor_profile_and_signs_in() {
    let mock = MockBackend::default();
    mock.json(
        "/auth/users/vendor-register",
        json!({"token": "jwt-biz", "user": {"id": 12, "email": "ops@bayou.org", "role": "vendor"}}),
    );
    let mut client = mock.client(None).await;
    let mut session = SessionContext::default();

    let details = BusinessDetails {
        business_name: "Bayou Clinic".into(),
        category_name: "Healthcare".into(),
        start_date: NaiveDate::from_ymd_opt(2025, 8, 1),
        currency: "USD".into(),
        phone_number: "3374278230".into(),
        country: "US".into(),
        state: "LA".into(),
        city: "Lafayette".into(),
        postal_code: "70501".into(),
        username: "bayou".into(),
        email: "ops@bayou.org".into(),
        linkedin_link: Some("https://linkedin.com/company/bayou".into()),
        ..Default::default()
    };
    let request = BusinessSignUpRequest::new(details, "secret1", "secret1", true).unwrap();
    let user = register_business(&mut client, &mut session, &request)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(user.role.as_deref(), Some("vendor"));
    assert_eq!(client.token(), Some("jwt-biz"));
    assert!(session.is_signed_in());
    let body = &mock.requests_to("/auth/users/vendor-register")[0].body;
    assert_eq!(body["businessName"], "Bayou Clinic");
    assert_eq!(body["categoryName"], "Healthcare");
    assert_eq!(body["startDate"], "2025-08-01");
    assert_eq!(body["phoneNumber"], "3374278230");
    assert_eq!(body["linkedinLink"], "https://linkedin.com/company/bayou");
    assert_eq!(body["confirmPassword"], "secret1");
    assert_eq!(body["acceptTerms"], true);
    assert!(body.get("twitterLink").is_none());
}

#[tokio::test]
async fn business_sign_up_failure_keeps_session_signed_out() {
    let mock = MockBackend::default();
    mock.reply(
        "/auth/users/vendor-register",
        Reply::Json(StatusCode::CONFLICT, json!({"error": "Email already registered"})),
    );
    let mut client = mock.client(None).await;
    let mut session = SessionContext::default();

    let details = BusinessDetails {
        business_name: "Bayou Clinic".into(),
        category_name: "Healthcare".into(),
        start_date: NaiveDate::from_ymd_opt(2025, 8, 1),
        currency: "USD".into(),
        phone_number: "3374278230".into(),
        country: "US".into(),
        state: "LA".into(),
        city: "Lafayette".into(),
        postal_code: "70501".into(),
        username: "bayou".into(),
        email: "ops@bayou.org".into(),
        ..Default::default()
    };
    let request = BusinessSignUpRequest::new(details, "secret1", "secret1", true).unwrap();
    let err = register_business(&mut client, &mut session, &request)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Email already registered");
    assert!(!session.is_signed_in());
    assert_eq!(client.token(), None);
}

#[tokio::test]
async fn forgot_password_link_then_reset_with_token() {
    let mock = MockBackend::default();
    mock.json("/auth/users/send-forgot-password-link", json!({"message": "sent"}))
        .json("/auth/users/forgot-password", json!({"message": "updated"}));
    let client = mock.client(None).await;

    send_forgot_password_link(&client, " ada@clinic.org ").await.unwrap();
    assert_eq!(
        mock.requests_to("/auth/users/send-forgot-password-link")[0].body,
        json!({"email": "ada@clinic.org"})
    );

    let password = NewPassword::parse("newpass1", "newpass1").unwrap();
    let err = forgot_password(&client, &password, "  ").await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Validation(ValidationError::Required("Reset token"))
    ));
    assert!(mock.requests_to("/auth/users/forgot-password").is_empty());

    forgot_password(&client, &password, "rt-42").await.unwrap();
    assert_eq!(
        mock.requests_to("/auth/users/forgot-password")[0].body,
        json!({"password": "newpass1", "resetToken": "rt-42"})
    );
}

#[tokio::test]
async fn password_reset_runs_three_steps_then_signs_out() {
    let mock = MockBackend::default();
    mock.json("/auth/users/send-password-otp", json!({"message": "OTP sent"}))
        .json("/auth/users/verify-password-otp", json!({"resetToken": "rt-9"}))
        .json("/auth/users/reset-password", json!({"message": "updated"}))
        .json(
            "/auth/login",
            json!({"user": {"email": "admin@clinic.org", "token": "jwt-1"}}),
        );
    let mut client = mock.client(None).await;
    let mut session = SessionContext::default();
    sign_in(
        &mut client,
        &mut session,
        &SignInRequest::new("admin@clinic.org", "secret1").unwrap(),
    )
    .await
    .unwrap();

    let step = ResetStep::send_otp(&session).unwrap();
    assert_eq!(
        reset::submit(&mut client, &mut session, step).await.unwrap(),
        ResetOutcome::OtpSent
    );

    let step = ResetStep::verify_otp(&session, "4821").unwrap();
    assert_eq!(
        reset::submit(&mut client, &mut session, step).await.unwrap(),
        ResetOutcome::OtpVerified
    );
    assert_eq!(
        session.reset_progress(),
        Some(&ResetProgress::AwaitingPassword {
            email: "admin@clinic.org".into(),
            reset_token: "rt-9".into()
        })
    );

    let step = ResetStep::set_password(&session, "newpass1", "newpass1").unwrap();
    assert_eq!(
        reset::submit(&mut client, &mut session, step).await.unwrap(),
        ResetOutcome::PasswordUpdated
    );
    assert!(!session.is_signed_in());
    assert_eq!(client.token(), None);

    assert_eq!(
        mock.requests_to("/auth/users/verify-password-otp")[0].body,
        json!({"email": "admin@clinic.org", "otp": "4821"})
    );
    let reset_request = &mock.requests_to("/auth/users/reset-password")[0];
    assert_eq!(
        reset_request.body,
        json!({"email": "admin@clinic.org", "password": "newpass1", "resetToken": "rt-9"})
    );
    assert_eq!(reset_request.bearer.as_deref(), Some("jwt-1"));
}

#[tokio::test]
async fn google_user_approval_patches_by_id() {
    let mock = MockBackend::default();
    mock.json(
        "/super-admin/get-google-users",
        json!([
            {"id": 3, "name": "Dr. Lee", "role": "admin", "email": "lee@gmail.com", "approved": false},
            {"id": 5, "name": "Dr. Roy", "role": "admin", "email": "roy@gmail.com", "approved": true}
        ]),
    )
    .json("/super-admin/approve", json!({"message": "approved"}));
    let client = mock.client(Some("jwt-1")).await;

    let mut users = list_google_users(&client).await.unwrap();
    assert_eq!(users[0].status_label(), "Pending");

    approve_user(&client, 3).await.unwrap();
    assert!(mark_approved(&mut users, 3));
    assert_eq!(users[0].status_label(), "Approved");

    let request = &mock.requests_to("/super-admin/approve")[0];
    assert_eq!(request.method, Method::PATCH);
    assert_eq!(request.query["id"], "3");
}
