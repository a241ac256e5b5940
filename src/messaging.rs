use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{fmt, time::Duration};
use thiserror::Error;

use crate::{
    constants::{FAILED_SAMPLE_LIMIT, PACED_SEND_DELAY_SECS, SEND_SMS_PATH},
    error::{ApiError, ValidationError},
    http::ApiClient,
    phone::format_number,
    recipients::RecipientSet,
};

const SEND_FALLBACK: &str = "Failed to send messages!";

/// A message and its recipients, checked before anything goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundBatch {
    numbers: Vec<String>,
    message: String,
}

impl OutboundBatch {
    pub fn compose(recipients: &RecipientSet, message: &str) -> Result<Self, ValidationError> {
        Self::from_numbers(&recipients.phones(), message)
    }

    pub fn from_numbers(numbers: &[String], message: &str) -> Result<Self, ValidationError> {
        let numbers: Vec<String> = numbers
            .iter()
            .map(|n| format_number(n))
            .filter(|n| !n.is_empty())
            .collect();
        if numbers.is_empty() {
            return Err(ValidationError::EmptyRecipients);
        }
        if message.trim().is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        Ok(Self {
            numbers,
            message: message.to_string(),
        })
    }

    pub fn numbers(&self) -> &[String] {
        &self.numbers
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Serialize)]
struct SendSmsBody<'a, T: Serialize> {
    to: T,
    message: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct SendSmsResponse {
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: Option<Vec<DeliveryResult>>,
}

impl SendSmsResponse {
    fn accepted(&self) -> bool {
        match &self.status {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "true",
            _ => false,
        }
    }

    /// Accepted through `status`, or the legacy `success` flag.
    fn went_through(&self) -> bool {
        self.accepted() || self.success == Some(true)
    }

    fn rejection_reason(self) -> String {
        self.message
            .or(self.error)
            .unwrap_or_else(|| "Unexpected response from SMS API".to_string())
    }
}

/// Per-number outcome, when the backend reports one.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeliveryResult {
    #[serde(default, alias = "phone")]
    pub number: Option<String>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub sent: Vec<String>,
    pub failed: Vec<(String, Option<String>)>,
}

impl DeliverySummary {
    pub fn from_results(results: &[DeliveryResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            let number = result.number.clone().unwrap_or_else(|| "unknown".to_string());
            if result.success {
                summary.sent.push(number);
            } else {
                summary.failed.push((number, result.error.clone()));
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.sent.len() + self.failed.len()
    }

    pub fn failed_sample(&self) -> Vec<&str> {
        self.failed
            .iter()
            .take(FAILED_SAMPLE_LIMIT)
            .map(|(number, _)| number.as_str())
            .collect()
    }
}

impl fmt::Display for DeliverySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.failed.is_empty() {
            return write!(f, "Message(s) sent successfully to {} number(s)", self.sent.len());
        }
        write!(
            f,
            "Sent {} of {}. Failed to send to {}",
            self.sent.len(),
            self.total(),
            self.failed_sample().join(", ")
        )?;
        let hidden = self.failed.len().saturating_sub(FAILED_SAMPLE_LIMIT);
        if hidden > 0 {
            write!(f, " (+{hidden} more)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The backend took the batch and will work through it on its own.
    /// Nothing has necessarily been delivered yet.
    Accepted { message: String },
    /// Every number reported success.
    Delivered(DeliverySummary),
}

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    PartialFailure(DeliverySummary),
}

impl MessagingError {
    pub fn user_message(&self) -> String {
        match self {
            MessagingError::Api(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// One request carrying every number.
    Batch,
    /// One request per number with a fixed pause in between.
    Paced { delay: Duration },
}

impl DispatchMode {
    pub fn paced_default() -> Self {
        DispatchMode::Paced {
            delay: Duration::from_secs(PACED_SEND_DELAY_SECS),
        }
    }
}

pub async fn dispatch(
    client: &ApiClient,
    batch: &OutboundBatch,
    mode: DispatchMode,
) -> Result<SendOutcome, MessagingError> {
    match mode {
        DispatchMode::Batch => send_batch(client, batch).await,
        DispatchMode::Paced { delay } => send_paced(client, batch, delay).await,
    }
}

pub async fn send_batch(client: &ApiClient, batch: &OutboundBatch) -> Result<SendOutcome, MessagingError> {
    tracing::info!("Submitting {} number(s) to the SMS gateway", batch.numbers.len());
    let body = SendSmsBody {
        to: &batch.numbers,
        message: &batch.message,
    };
    let response: SendSmsResponse = client.post_lenient(SEND_SMS_PATH, &body, SEND_FALLBACK).await?;
    interpret_response(response)
}

fn interpret_response(response: SendSmsResponse) -> Result<SendOutcome, MessagingError> {
    if response.accepted() {
        return Ok(SendOutcome::Accepted {
            message: response
                .message
                .unwrap_or_else(|| "SMS sending started".to_string()),
        });
    }

    if let Some(results) = &response.results {
        let summary = DeliverySummary::from_results(results);
        if summary.failed.is_empty() {
            return Ok(SendOutcome::Delivered(summary));
        }
        return Err(MessagingError::PartialFailure(summary));
    }

    if response.success == Some(true) {
        return Ok(SendOutcome::Accepted {
            message: response
                .message
                .unwrap_or_else(|| "Message(s) sending started".to_string()),
        });
    }

    Err(MessagingError::Rejected(response.rejection_reason()))
}

/// Sends one number at a time, sleeping `delay` between requests (not after
/// the last). There is no way to cancel once started.
pub async fn send_paced(
    client: &ApiClient,
    batch: &OutboundBatch,
    delay: Duration,
) -> Result<SendOutcome, MessagingError> {
    let total = batch.numbers.len();
    let progress = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} [SMS {elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    ) {
        progress.set_style(style.progress_chars("=> "));
    }

    let mut results = Vec::with_capacity(total);
    for (i, number) in batch.numbers.iter().enumerate() {
        let body = SendSmsBody {
            to: number.as_str(),
            message: &batch.message,
        };
        let outcome: Result<SendSmsResponse, ApiError> =
            client.post_lenient(SEND_SMS_PATH, &body, "Request failed").await;
        let error = match outcome {
            Ok(response) if response.went_through() => None,
            Ok(response) => Some(response.rejection_reason()),
            Err(err) => Some(err.user_message()),
        };
        if let Some(reason) = &error {
            tracing::warn!("SMS to {number} failed: {reason}");
        }
        results.push(DeliveryResult {
            number: Some(number.clone()),
            success: error.is_none(),
            error,
        });
        progress.inc(1);

        if i + 1 < total && !delay.is_zero() {
            progress.set_message(format!("waiting {}s", delay.as_secs()));
            tokio::time::sleep(delay).await;
        }
    }

    let summary = DeliverySummary::from_results(&results);
    progress.finish_with_message(format!(
        "done: sent={} failed={}",
        summary.sent.len(),
        summary.failed.len()
    ));

    if summary.failed.is_empty() {
        Ok(SendOutcome::Delivered(summary))
    } else {
        Err(MessagingError::PartialFailure(summary))
    }
}
