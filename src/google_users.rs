use serde::Deserialize;

use crate::{
    constants::{APPROVE_USER_PATH, GOOGLE_USERS_PATH},
    error::ApiError,
    http::{ApiClient, NO_QUERY},
};

/// A user who signed in with Google and waits for admin approval.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleUser {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl GoogleUser {
    pub fn status_label(&self) -> &'static str {
        if self.approved { "Approved" } else { "Pending" }
    }
}

pub async fn list_google_users(client: &ApiClient) -> Result<Vec<GoogleUser>, ApiError> {
    client
        .get_json(GOOGLE_USERS_PATH, NO_QUERY, "Failed to fetch users")
        .await
}

/// Approves `id` and returns whatever the backend echoes back.
pub async fn approve_user(client: &ApiClient, id: u64) -> Result<serde_json::Value, ApiError> {
    let id = id.to_string();
    client
        .patch_lenient(APPROVE_USER_PATH, &[("id", id.as_str())], "Failed to approve user")
        .await
}

/// Local view after a successful approval; the list is not refetched.
pub fn mark_approved(users: &mut [GoogleUser], id: u64) -> bool {
    match users.iter_mut().find(|u| u.id == id) {
        Some(user) => {
            user.approved = true;
            true
        }
        None => false,
    }
}
