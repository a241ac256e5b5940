use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::{
    constants::{
        ADMIN_REGISTER_PATH, FORGOT_PASSWORD_PATH, LOGIN_PATH, SEND_FORGOT_PASSWORD_LINK_PATH,
        SEND_SIGNUP_OTP_PATH, VENDOR_REGISTER_PATH,
    },
    error::{ApiError, ValidationError},
    http::ApiClient,
    phone::format_number,
    reset::{NewPassword, Otp},
    session::{RawUser, SessionContext, UserProfile},
};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));
static ALLOWED_SIGNUP_EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w\-.]+@([\w-]+\.)?(gmail\.com|edu|org|com)$").expect("valid regex")
});

const MIN_SIGNUP_PASSWORD: usize = 6;
const MIN_SIGNUP_PHONE: usize = 11;

pub fn validate_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required("Email"));
    }
    if !EMAIL.is_match(email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email.to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    email: String,
    password: String,
}

impl SignInRequest {
    pub fn new(email: &str, password: &str) -> Result<Self, ValidationError> {
        let email = validate_email(email)?;
        if password.is_empty() {
            return Err(ValidationError::Required("Password"));
        }
        Ok(Self {
            email,
            password: password.to_string(),
        })
    }
}

/// First sign-up step: account details that trigger an emailed OTP.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpRequest {
    username: String,
    email: String,
    password: String,
    phone: u64,
    terms: &'static str,
}

impl SignUpRequest {
    pub fn new(
        username: &str,
        email: &str,
        password: &str,
        phone: &str,
        terms: bool,
    ) -> Result<Self, ValidationError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ValidationError::Required("Username"));
        }
        let email = validate_email(email)?;
        if !ALLOWED_SIGNUP_EMAIL.is_match(&email) {
            return Err(ValidationError::DisallowedEmailDomain);
        }
        if password.chars().count() < MIN_SIGNUP_PASSWORD {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_SIGNUP_PASSWORD,
            });
        }
        let digits = format_number(phone);
        if phone.trim().chars().count() < MIN_SIGNUP_PHONE || digits.is_empty() {
            return Err(ValidationError::InvalidPhone);
        }
        let phone = digits.parse().map_err(|_| ValidationError::InvalidPhone)?;
        if !terms {
            return Err(ValidationError::TermsNotAccepted);
        }
        Ok(Self {
            username: username.to_string(),
            email,
            password: password.to_string(),
            phone,
            terms: "true",
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

/// Company profile for a business (vendor) account.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDetails {
    pub business_name: String,
    pub category_name: String,
    pub start_date: Option<NaiveDate>,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    pub phone_number: String,
    pub country: String,
    pub state: String,
    pub city: String,
    pub postal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_details: Option<String>,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_link: Option<String>,
}

/// Business sign-up, checked and ready to send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSignUpRequest {
    #[serde(flatten)]
    details: BusinessDetails,
    password: String,
    confirm_password: String,
    accept_terms: bool,
}

impl BusinessSignUpRequest {
    pub fn new(
        mut details: BusinessDetails,
        password: &str,
        confirm: &str,
        accept_terms: bool,
    ) -> Result<Self, ValidationError> {
        let required = [
            (&mut details.business_name, "Business name"),
            (&mut details.category_name, "Category"),
            (&mut details.currency, "Currency"),
            (&mut details.country, "Country"),
            (&mut details.state, "State"),
            (&mut details.city, "City"),
            (&mut details.postal_code, "Postal code"),
            (&mut details.username, "Username"),
        ];
        for (value, field) in required {
            *value = value.trim().to_string();
            if value.is_empty() {
                return Err(ValidationError::Required(field));
            }
        }
        if details.start_date.is_none() {
            return Err(ValidationError::Required("Start date"));
        }
        details.email = validate_email(&details.email)?;
        if format_number(&details.phone_number).is_empty() {
            return Err(ValidationError::InvalidPhone);
        }
        let password = NewPassword::parse(password, confirm)?;
        if !accept_terms {
            return Err(ValidationError::TermsNotAccepted);
        }
        Ok(Self {
            details,
            password: password.as_str().to_string(),
            confirm_password: password.as_str().to_string(),
            accept_terms,
        })
    }

    pub fn email(&self) -> &str {
        &self.details.email
    }
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: Option<RawUser>,
}

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    token: Option<String>,
    user: Option<RawUser>,
}

/// Signs in with email and password and stores the token and profile in
/// `session`.
pub async fn sign_in(
    client: &mut ApiClient,
    session: &mut SessionContext,
    request: &SignInRequest,
) -> Result<UserProfile, ApiError> {
    let response: LoginResponse = client.post_json(LOGIN_PATH, request, "Login failed").await?;
    let mut raw = response
        .user
        .ok_or_else(|| ApiError::Unexpected("No user returned from auth server".to_string()))?;
    let token = raw
        .token
        .take()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unexpected("No token returned from auth server".to_string()))?;

    let user = UserProfile::from(raw);
    session.sign_in(token.clone(), Some(user.clone()));
    client.set_token(Some(token));
    tracing::info!("Signed in as {}", user.email.as_deref().unwrap_or("unknown"));
    Ok(user)
}

pub async fn send_signup_otp(client: &ApiClient, request: &SignUpRequest) -> Result<(), ApiError> {
    let _: serde_json::Value = client
        .post_lenient(SEND_SIGNUP_OTP_PATH, request, "Sign up failed")
        .await?;
    tracing::info!("Sign-up OTP sent to {}", request.email);
    Ok(())
}

#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    email: &'a str,
    otp: &'a str,
}

/// Completes sign-up with the emailed OTP.
pub async fn register(
    client: &mut ApiClient,
    session: &mut SessionContext,
    email: &str,
    otp: &Otp,
) -> Result<Option<UserProfile>, ApiError> {
    let email = validate_email(email)?;
    let body = RegisterBody {
        email: &email,
        otp: otp.as_str(),
    };
    let response: RegisterResponse = client
        .post_json(ADMIN_REGISTER_PATH, &body, "Sign up failed")
        .await?;
    adopt_registration(client, session, response, "Sign up failed")
}

/// Creates a business account and signs it in.
pub async fn register_business(
    client: &mut ApiClient,
    session: &mut SessionContext,
    request: &BusinessSignUpRequest,
) -> Result<Option<UserProfile>, ApiError> {
    let response: RegisterResponse = client
        .post_json(VENDOR_REGISTER_PATH, request, "Sign up business failed")
        .await?;
    let user = adopt_registration(client, session, response, "Sign up business failed")?;
    tracing::info!("Business account created for {}", request.email());
    Ok(user)
}

fn adopt_registration(
    client: &mut ApiClient,
    session: &mut SessionContext,
    response: RegisterResponse,
    failure: &str,
) -> Result<Option<UserProfile>, ApiError> {
    let token = response
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Unexpected(failure.to_string()))?;
    let user = response.user.map(UserProfile::from);
    session.sign_in(token.clone(), user.clone());
    client.set_token(Some(token));
    Ok(user)
}

#[derive(Debug, Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

pub async fn send_forgot_password_link(client: &ApiClient, email: &str) -> Result<(), ApiError> {
    let email = validate_email(email)?;
    let _: serde_json::Value = client
        .post_lenient(
            SEND_FORGOT_PASSWORD_LINK_PATH,
            &EmailBody { email: &email },
            "Failed to send OTP",
        )
        .await?;
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ForgotPasswordBody<'a> {
    password: &'a str,
    reset_token: &'a str,
}

/// Sets a new password using the token from an emailed reset link.
pub async fn forgot_password(
    client: &ApiClient,
    password: &NewPassword,
    reset_token: &str,
) -> Result<(), ApiError> {
    let reset_token = reset_token.trim();
    if reset_token.is_empty() {
        return Err(ValidationError::Required("Reset token").into());
    }
    let body = ForgotPasswordBody {
        password: password.as_str(),
        reset_token,
    };
    let _: serde_json::Value = client
        .post_lenient(FORGOT_PASSWORD_PATH, &body, "Failed to forgot password")
        .await?;
    Ok(())
}

pub fn sign_out(client: &mut ApiClient, session: &mut SessionContext) {
    session.sign_out();
    client.set_token(None);
}
