//! Signed-in state shared by every command.
//!
//! The context is read once at startup, handed to the API client, updated on
//! sign-in/registration and wiped on sign-out or after a password reset.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::reset::ResetProgress;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{n}"),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Option<UserId>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub avatar: Option<String>,
}

/// Shape of the `user` object returned by the auth endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct RawUser {
    id: Option<UserId>,
    name: Option<String>,
    email: Option<String>,
    role: Option<String>,
    avatar: Option<String>,
    #[serde(rename = "photoURL")]
    photo_url: Option<String>,
    picture: Option<String>,
    pub(crate) token: Option<String>,
}

impl From<RawUser> for UserProfile {
    fn from(raw: RawUser) -> Self {
        let avatar = [raw.avatar, raw.photo_url, raw.picture]
            .into_iter()
            .flatten()
            .find(|v| !v.trim().is_empty());
        Self {
            id: raw.id,
            name: raw.name,
            email: raw.email,
            role: raw.role,
            avatar,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reset: Option<ResetProgress>,
}

impl SessionContext {
    pub fn signed_in(token: impl Into<String>, user: Option<UserProfile>) -> Self {
        Self {
            token: Some(token.into()),
            user,
            reset: None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    /// A user counts as signed in only with both a token and a profile.
    pub fn is_signed_in(&self) -> bool {
        self.token().is_some() && self.user.is_some()
    }

    pub fn sign_in(&mut self, token: String, user: Option<UserProfile>) {
        self.token = Some(token);
        self.user = user;
    }

    pub fn sign_out(&mut self) {
        *self = Self::default();
    }

    pub fn reset_progress(&self) -> Option<&ResetProgress> {
        self.reset.as_ref()
    }

    pub fn set_reset_progress(&mut self, progress: Option<ResetProgress>) {
        self.reset = progress;
    }
}

/// JSON file holding the [`SessionContext`] between invocations.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join("session.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<SessionContext> {
        if !self.path.exists() {
            return Ok(SessionContext::default());
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed reading session {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(SessionContext::default());
        }
        serde_json::from_str(&text)
            .with_context(|| format!("Failed parsing session {}", self.path.display()))
    }

    pub fn save(&self, session: &SessionContext) -> Result<()> {
        if *session == SessionContext::default() {
            return self.clear();
        }
        crate::handoff::write_json_atomic(&self.path, session)
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed deleting {}", self.path.display()))?;
        }
        Ok(())
    }
}
