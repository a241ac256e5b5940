//! Password reset for a signed-in user.
//!
//! Each step is its own type carrying only the input that step needs, already
//! validated. Which step may run next is tracked in the session context.

use serde::{Deserialize, Serialize};

use crate::{
    constants::{RESET_PASSWORD_PATH, SEND_PASSWORD_OTP_PATH, VERIFY_PASSWORD_OTP_PATH},
    error::{ApiError, ValidationError},
    http::ApiClient,
    session::SessionContext,
};

const MIN_RESET_OTP: usize = 4;
const MIN_SIGNUP_OTP: usize = 6;
const MIN_PASSWORD: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Otp(String);

impl Otp {
    fn parse(raw: &str, min: usize) -> Result<Self, ValidationError> {
        let otp = raw.trim();
        if otp.chars().count() < min {
            return Err(ValidationError::OtpTooShort { min });
        }
        Ok(Self(otp.to_string()))
    }

    pub fn for_reset(raw: &str) -> Result<Self, ValidationError> {
        Self::parse(raw, MIN_RESET_OTP)
    }

    pub fn for_signup(raw: &str) -> Result<Self, ValidationError> {
        Self::parse(raw, MIN_SIGNUP_OTP)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A password that met the length rule and matched its confirmation.
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(String);

impl NewPassword {
    pub fn parse(password: &str, confirm: &str) -> Result<Self, ValidationError> {
        if password.is_empty() || confirm.is_empty() {
            return Err(ValidationError::Required("Password and Confirm Password"));
        }
        if password.chars().count() < MIN_PASSWORD {
            return Err(ValidationError::PasswordTooShort { min: MIN_PASSWORD });
        }
        if password != confirm {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(Self(password.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NewPassword(***)")
    }
}

/// Where an unfinished reset stands between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ResetProgress {
    AwaitingOtp { email: String },
    AwaitingPassword { email: String, reset_token: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOtpStep {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOtpStep {
    pub email: String,
    pub otp: Otp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetPasswordStep {
    pub email: String,
    pub reset_token: String,
    pub password: NewPassword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetStep {
    SendOtp(SendOtpStep),
    VerifyOtp(VerifyOtpStep),
    SetPassword(SetPasswordStep),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    OtpSent,
    OtpVerified,
    PasswordUpdated,
}

impl ResetStep {
    /// Starts (or restarts) a reset for the signed-in user's email.
    pub fn send_otp(session: &SessionContext) -> Result<Self, ValidationError> {
        let email = session
            .user()
            .and_then(|u| u.email.clone())
            .filter(|e| !e.trim().is_empty())
            .ok_or(ValidationError::OutOfOrder("Sign in before resetting the password"))?;
        Ok(ResetStep::SendOtp(SendOtpStep { email }))
    }

    pub fn verify_otp(session: &SessionContext, otp: &str) -> Result<Self, ValidationError> {
        match session.reset_progress() {
            Some(ResetProgress::AwaitingOtp { email }) => Ok(ResetStep::VerifyOtp(VerifyOtpStep {
                email: email.clone(),
                otp: Otp::for_reset(otp)?,
            })),
            _ => Err(ValidationError::OutOfOrder("Send an OTP first")),
        }
    }

    pub fn set_password(
        session: &SessionContext,
        password: &str,
        confirm: &str,
    ) -> Result<Self, ValidationError> {
        match session.reset_progress() {
            Some(ResetProgress::AwaitingPassword { email, reset_token }) => {
                Ok(ResetStep::SetPassword(SetPasswordStep {
                    email: email.clone(),
                    reset_token: reset_token.clone(),
                    password: NewPassword::parse(password, confirm)?,
                }))
            }
            _ => Err(ValidationError::OutOfOrder("Verify the OTP first")),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendOtpBody<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyOtpBody<'a> {
    email: &'a str,
    otp: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyOtpResponse {
    #[serde(default)]
    reset_token: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordBody<'a> {
    email: &'a str,
    password: &'a str,
    reset_token: &'a str,
}

/// Runs one step and records what comes next in `session`. The final step
/// signs the user out.
pub async fn submit(
    client: &mut ApiClient,
    session: &mut SessionContext,
    step: ResetStep,
) -> Result<ResetOutcome, ApiError> {
    match step {
        ResetStep::SendOtp(SendOtpStep { email }) => {
            let _: serde_json::Value = client
                .post_lenient(
                    SEND_PASSWORD_OTP_PATH,
                    &SendOtpBody { email: &email },
                    "Failed to send OTP",
                )
                .await?;
            session.set_reset_progress(Some(ResetProgress::AwaitingOtp { email }));
            Ok(ResetOutcome::OtpSent)
        }
        ResetStep::VerifyOtp(VerifyOtpStep { email, otp }) => {
            let body = VerifyOtpBody {
                email: &email,
                otp: otp.as_str(),
            };
            let response: VerifyOtpResponse = client
                .post_lenient(VERIFY_PASSWORD_OTP_PATH, &body, "Invalid OTP")
                .await?;
            let reset_token = response
                .reset_token
                .filter(|t| !t.is_empty())
                .ok_or_else(|| ApiError::Unexpected("No reset token returned".to_string()))?;
            session.set_reset_progress(Some(ResetProgress::AwaitingPassword { email, reset_token }));
            Ok(ResetOutcome::OtpVerified)
        }
        ResetStep::SetPassword(SetPasswordStep {
            email,
            reset_token,
            password,
        }) => {
            let body = ResetPasswordBody {
                email: &email,
                password: password.as_str(),
                reset_token: &reset_token,
            };
            let _: serde_json::Value = client
                .post_lenient(RESET_PASSWORD_PATH, &body, "Failed to update password")
                .await?;
            crate::auth::sign_out(client, session);
            tracing::info!("Password updated for {email}; signed out");
            Ok(ResetOutcome::PasswordUpdated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserProfile;

    fn signed_in() -> SessionContext {
        SessionContext::signed_in(
            "tok",
            Some(UserProfile {
                id: None,
                name: None,
                email: Some("admin@clinic.org".into()),
                role: None,
                avatar: None,
            }),
        )
    }

    #[test]
    fn steps_must_come_in_order() {
        let mut session = signed_in();
        assert_eq!(
            ResetStep::send_otp(&session).unwrap(),
            ResetStep::SendOtp(SendOtpStep {
                email: "admin@clinic.org".into()
            })
        );
        assert!(matches!(
            ResetStep::verify_otp(&session, "1234"),
            Err(ValidationError::OutOfOrder(_))
        ));

        session.set_reset_progress(Some(ResetProgress::AwaitingOtp {
            email: "admin@clinic.org".into(),
        }));
        assert!(ResetStep::verify_otp(&session, "1234").is_ok());
        assert!(matches!(
            ResetStep::set_password(&session, "secret1", "secret1"),
            Err(ValidationError::OutOfOrder(_))
        ));
    }

    #[test]
    fn signed_out_user_cannot_start() {
        assert!(matches!(
            ResetStep::send_otp(&SessionContext::default()),
            Err(ValidationError::OutOfOrder(_))
        ));
    }

    #[test]
    fn otp_and_password_rules() {
        assert_eq!(Otp::for_reset("123"), Err(ValidationError::OtpTooShort { min: 4 }));
        assert_eq!(Otp::for_reset(" 1234 ").unwrap().as_str(), "1234");
        assert_eq!(Otp::for_signup("12345"), Err(ValidationError::OtpTooShort { min: 6 }));

        assert_eq!(
            NewPassword::parse("short", "short"),
            Err(ValidationError::PasswordTooShort { min: 6 })
        );
        assert_eq!(
            NewPassword::parse("secret1", "secret2"),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(NewPassword::parse("secret1", "secret1").unwrap().as_str(), "secret1");
        assert_eq!(format!("{:?}", NewPassword::parse("secret1", "secret1").unwrap()), "NewPassword(***)");
    }

    #[test]
    fn progress_is_tagged_in_json() {
        let json = serde_json::to_string(&ResetProgress::AwaitingOtp {
            email: "a@b.co".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"stage":"awaiting_otp","email":"a@b.co"}"#);
    }
}
