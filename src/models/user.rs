//! Signed-in user model.

use serde::{Deserialize, Serialize};

/// The authenticated user as returned by `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server-assigned user ID
    pub id: String,
    /// Email address used to log in
    pub email: String,
    /// Display name
    pub name: String,
    /// Whether the user holds a premium subscription (unlocks rewind)
    #[serde(default)]
    pub is_premium: bool,
    /// Whether the profile passed identity verification
    #[serde(default)]
    pub is_verified: bool,
    /// Profile photo URLs, first is the main photo
    #[serde(default)]
    pub photos: Vec<String>,
}
