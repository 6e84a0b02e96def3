// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discovery endpoints.

use crate::error::Result;
use crate::models::discovery::RewindResponse;
use crate::models::{BoostStatus, CandidateProfile, FilterSet, ProfilesPage, SwipeDirection, SwipeResponse};
use crate::services::api_client::{ApiClient, ApiRequest};
use async_trait::async_trait;

/// Remote operations the swipe queue depends on.
#[async_trait]
pub trait DiscoveryApi: Send + Sync {
    /// Fetch up to `limit` candidates starting at `offset` under `filters`.
    async fn fetch_profiles(
        &self,
        filters: &FilterSet,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CandidateProfile>>;

    /// Record a decision on a candidate.
    async fn swipe(&self, direction: SwipeDirection, profile_id: &str) -> Result<SwipeResponse>;

    /// Undo the most recent decision; returns the restorable profile.
    async fn rewind(&self) -> Result<CandidateProfile>;

    async fn boost(&self) -> Result<BoostStatus>;

    async fn boost_status(&self) -> Result<BoostStatus>;
}

/// `DiscoveryApi` over the platform REST API.
#[derive(Clone)]
pub struct DiscoveryClient {
    api: ApiClient,
}

impl DiscoveryClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl DiscoveryApi for DiscoveryClient {
    async fn fetch_profiles(
        &self,
        filters: &FilterSet,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CandidateProfile>> {
        let request = ApiRequest::get("/discovery/profiles")
            .query(filters.query_params())
            .query([
                ("offset".to_string(), offset.to_string()),
                ("limit".to_string(), limit.to_string()),
            ]);

        let page: ProfilesPage = self.api.send(request).await?;
        tracing::debug!(offset, count = page.profiles.len(), "Fetched discovery page");
        Ok(page.profiles)
    }

    async fn swipe(&self, direction: SwipeDirection, profile_id: &str) -> Result<SwipeResponse> {
        let path = format!(
            "/discovery/{}/{}",
            direction.endpoint(),
            urlencoding::encode(profile_id)
        );
        let response: Option<SwipeResponse> = self.api.send(ApiRequest::post(path)).await?;
        Ok(response.unwrap_or_default())
    }

    async fn rewind(&self) -> Result<CandidateProfile> {
        let response: RewindResponse = self.api.send(ApiRequest::post("/discovery/rewind")).await?;
        Ok(response.profile)
    }

    async fn boost(&self) -> Result<BoostStatus> {
        self.api.send(ApiRequest::post("/discovery/boost")).await
    }

    async fn boost_status(&self) -> Result<BoostStatus> {
        self.api.send(ApiRequest::get("/discovery/boost/status")).await
    }
}
