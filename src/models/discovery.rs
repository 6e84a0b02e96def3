//! Discovery action payloads.

use crate::models::CandidateProfile;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// User decision on the current candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwipeDirection {
    Pass,
    Like,
    SuperLike,
}

impl SwipeDirection {
    /// Path segment of the matching `/discovery/{action}/:id` endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            SwipeDirection::Pass => "pass",
            SwipeDirection::Like => "like",
            SwipeDirection::SuperLike => "super-like",
        }
    }
}

/// One page of `GET /discovery/profiles`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilesPage {
    #[serde(default)]
    pub profiles: Vec<CandidateProfile>,
}

/// A mutual match reported after a like.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    /// The other user in the match
    #[serde(default)]
    pub profile: Option<CandidateProfile>,
}

/// Response to like / pass / super-like.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwipeResponse {
    #[serde(default)]
    pub is_match: bool,
    #[serde(default, rename = "match")]
    pub matched: Option<Match>,
}

impl SwipeResponse {
    /// The match to surface, if the server reported one.
    pub fn into_match(self) -> Option<Match> {
        if self.is_match {
            self.matched
        } else {
            None
        }
    }
}

/// Response to `POST /discovery/rewind`.
#[derive(Debug, Clone, Deserialize)]
pub struct RewindResponse {
    pub profile: CandidateProfile,
}

/// Profile boost state from `/discovery/boost` and `/discovery/boost/status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoostStatus {
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Boosts left in the current billing period
    #[serde(default)]
    pub remaining_boosts: u32,
}

impl BoostStatus {
    /// Time left on the active boost, `None` when inactive or already expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.is_active {
            return None;
        }
        let left = self.expires_at? - now;
        (left > Duration::zero()).then_some(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swipe_response_without_match_flag_is_not_a_match() {
        let resp: SwipeResponse =
            serde_json::from_str(r#"{"isMatch":false,"match":{"id":"m1"}}"#).unwrap();
        assert!(resp.into_match().is_none());

        let resp: SwipeResponse =
            serde_json::from_str(r#"{"isMatch":true,"match":{"id":"m1"}}"#).unwrap();
        assert_eq!(resp.into_match().map(|m| m.id), Some("m1".to_string()));
    }

    #[test]
    fn test_boost_remaining() {
        let now = Utc::now();
        let status = BoostStatus {
            is_active: true,
            expires_at: Some(now + Duration::minutes(10)),
            remaining_boosts: 0,
        };
        assert_eq!(status.remaining(now), Some(Duration::minutes(10)));
        assert_eq!(status.remaining(now + Duration::minutes(11)), None);

        let inactive = BoostStatus {
            is_active: false,
            ..status
        };
        assert_eq!(inactive.remaining(now), None);
    }
}
