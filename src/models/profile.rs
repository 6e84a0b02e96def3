//! Discovery candidate profile.

use serde::{Deserialize, Serialize};

/// A candidate shown in the discovery swipe deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateProfile {
    /// User ID of the candidate (target of like/pass/super-like)
    pub id: String,
    pub name: String,
    pub age: u8,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    /// Distance from the viewer in kilometres, if location is shared
    #[serde(default)]
    pub distance_km: Option<f64>,
    #[serde(default)]
    pub gender: Option<String>,
    /// Relationship goals the candidate listed
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub is_verified: bool,
}
