use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the backend. Nothing here is retried.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    Unexpected(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ApiError {
    /// Message suitable for a one-line notice.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            ApiError::Unexpected(message) => message.clone(),
            ApiError::Validation(err) => err.to_string(),
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Input rejected before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Please add at least one number and write a message.")]
    EmptyRecipients,

    #[error("Please add at least one number and write a message.")]
    EmptyMessage,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Only .edu, .org, .com or gmail.com emails are allowed")]
    DisallowedEmailDomain,

    #[error("Password should be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Passwords don't match")]
    PasswordMismatch,

    #[error("OTP must be at least {min} digits")]
    OtpTooShort { min: usize },

    #[error("Please Enter a valid phone number")]
    InvalidPhone,

    #[error("You must accept the terms and conditions")]
    TermsNotAccepted,

    #[error("Please enter start date and end date")]
    MissingDateRange,

    #[error("End date {end} is before start date {start}")]
    InvertedDateRange { start: String, end: String },

    #[error("Unsupported page size {0}")]
    PageSize(usize),

    #[error("{0}")]
    OutOfOrder(&'static str),
}
