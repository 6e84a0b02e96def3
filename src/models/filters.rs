// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discovery filter set.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Youngest age the platform allows anyone to filter for.
pub const MIN_AGE: u8 = 18;

/// Filters applied to `GET /discovery/profiles`.
///
/// Changing any field invalidates the candidate pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_age_range"))]
pub struct FilterSet {
    #[validate(range(min = 18, max = 99, message = "Minimum age must be between 18 and 99"))]
    pub min_age: u8,
    #[validate(range(min = 18, max = 99, message = "Maximum age must be between 18 and 99"))]
    pub max_age: u8,
    /// Search radius in kilometres
    #[validate(range(min = 1, max = 500, message = "Distance must be between 1 and 500 km"))]
    pub max_distance: u32,
    /// Genders to include; empty means everyone
    #[serde(default)]
    pub genders: Vec<String>,
    /// Relationship goals to include; empty means any
    #[serde(default)]
    pub goals: Vec<String>,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            min_age: MIN_AGE,
            max_age: 50,
            max_distance: 50,
            genders: Vec::new(),
            goals: Vec::new(),
        }
    }
}

impl FilterSet {
    /// Query parameters for the profiles endpoint, excluding pagination.
    pub fn query_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("minAge".to_string(), self.min_age.to_string()),
            ("maxAge".to_string(), self.max_age.to_string()),
            ("maxDistance".to_string(), self.max_distance.to_string()),
        ];
        if !self.genders.is_empty() {
            params.push(("genders".to_string(), self.genders.join(",")));
        }
        if !self.goals.is_empty() {
            params.push(("goals".to_string(), self.goals.join(",")));
        }
        params
    }
}

fn validate_age_range(filters: &FilterSet) -> Result<(), ValidationError> {
    if filters.min_age > filters.max_age {
        return Err(ValidationError::new("age_range").with_message(Cow::Borrowed(
            "Minimum age cannot be greater than maximum age",
        )));
    }
    Ok(())
}
