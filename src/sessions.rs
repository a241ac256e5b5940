use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    constants::{LIST_SESSIONS_PATH, RESUME_SMS_PATH, STOP_SMS_PATH},
    error::ApiError,
    http::{ApiClient, NO_QUERY},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Stopped,
    Completed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Stop,
    Resume,
}

impl SessionStatus {
    /// Controls offered for a session in this state. The backend owns the
    /// transitions; a completed session has none.
    pub fn actions(self) -> &'static [SessionAction] {
        match self {
            SessionStatus::Running => &[SessionAction::Stop, SessionAction::Resume],
            SessionStatus::Stopped => &[SessionAction::Resume],
            SessionStatus::Completed | SessionStatus::Unknown => &[],
        }
    }

    pub fn allows(self, action: SessionAction) -> bool {
        self.actions().contains(&action)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Running => "running",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Completed => "completed",
            SessionStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionAction::Stop => f.write_str("stop"),
            SessionAction::Resume => f.write_str("resume"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionItem {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub sent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagingSession {
    pub id: u64,
    pub status: SessionStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub items: Vec<SessionItem>,
}

impl MessagingSession {
    pub fn total_phones(&self) -> usize {
        self.items.len()
    }

    pub fn sent_count(&self) -> usize {
        self.items.iter().filter(|item| item.sent).count()
    }

    pub fn pending_count(&self) -> usize {
        self.total_phones() - self.sent_count()
    }
}

#[derive(Debug, Default, Deserialize)]
struct SessionsResponse {
    #[serde(default)]
    status: bool,
    #[serde(default)]
    sessions: Vec<MessagingSession>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionCommand {
    session_id: u64,
}

pub async fn list_sessions(client: &ApiClient) -> Result<Vec<MessagingSession>, ApiError> {
    let response: SessionsResponse = client
        .get_json(LIST_SESSIONS_PATH, NO_QUERY, "Failed to fetch sessions")
        .await?;
    if !response.status {
        tracing::warn!("Session listing reported status=false; showing no sessions");
        return Ok(Vec::new());
    }
    Ok(response.sessions)
}

pub async fn stop_session(client: &ApiClient, id: u64) -> Result<(), ApiError> {
    control(client, STOP_SMS_PATH, id, "Error stopping SMS sending!").await
}

pub async fn resume_session(client: &ApiClient, id: u64) -> Result<(), ApiError> {
    control(client, RESUME_SMS_PATH, id, "Error resuming SMS sending!").await
}

pub async fn apply_action(client: &ApiClient, id: u64, action: SessionAction) -> Result<(), ApiError> {
    match action {
        SessionAction::Stop => stop_session(client, id).await,
        SessionAction::Resume => resume_session(client, id).await,
    }
}

async fn control(client: &ApiClient, path: &str, id: u64, fallback: &str) -> Result<(), ApiError> {
    tracing::info!("POST {path} for session {id}");
    let _: serde_json::Value = client
        .post_lenient(path, &SessionCommand { session_id: id }, fallback)
        .await?;
    Ok(())
}
