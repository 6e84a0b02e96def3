// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use spark_client::config::Config;
use spark_client::error::{ApiError, Result};
use spark_client::models::{
    BoostStatus, CandidateProfile, FilterSet, Match, SwipeDirection, SwipeResponse,
};
use spark_client::services::{ApiClient, DiscoveryApi, RefreshCoordinator};
use spark_client::storage::{keys, CredentialStore, MemoryStore};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Config pointing at a mock server.
#[allow(dead_code)]
pub fn test_config(api_url: &str) -> Config {
    Config {
        api_url: api_url.to_string(),
        ..Config::default()
    }
}

/// In-memory store pre-loaded with a credential pair.
#[allow(dead_code)]
pub async fn seeded_store(access: &str, refresh: &str) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.set(keys::ACCESS_TOKEN, access).await.unwrap();
    store.set(keys::REFRESH_TOKEN, refresh).await.unwrap();
    store
}

/// API client backed by `store`, talking to `api_url`.
#[allow(dead_code)]
pub fn test_client(api_url: &str, store: Arc<MemoryStore>) -> ApiClient {
    let coordinator = Arc::new(RefreshCoordinator::new(store));
    ApiClient::new(&test_config(api_url), coordinator).expect("Failed to build client")
}

/// JSON for a `User` as the API returns it.
#[allow(dead_code)]
pub fn user_json(id: &str, is_premium: bool) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "email": "a@b.com",
        "name": "Alex",
        "isPremium": is_premium,
        "isVerified": false,
        "photos": []
    })
}

#[allow(dead_code)]
pub fn profile(n: usize) -> CandidateProfile {
    CandidateProfile {
        id: format!("p{}", n),
        name: format!("Candidate {}", n),
        age: 25 + (n % 10) as u8,
        bio: None,
        photos: vec![format!("https://cdn.example.com/p{}.jpg", n)],
        distance_km: Some(n as f64),
        gender: None,
        goals: Vec::new(),
        is_verified: n % 2 == 0,
    }
}

/// Scriptable stand-in for the discovery endpoints.
#[allow(dead_code)]
pub struct FakeDiscovery {
    /// Everything the "server" can hand out, in order.
    pub server_profiles: Mutex<Vec<CandidateProfile>>,
    /// (offset, limit, filters) for every fetch.
    pub fetches: Mutex<Vec<(usize, usize, FilterSet)>>,
    pub swipes: Mutex<Vec<(SwipeDirection, String)>>,
    pub failing_swipes: Mutex<HashSet<String>>,
    pub matches: Mutex<HashSet<String>>,
    pub fail_fetch: AtomicBool,
    pub rewind_calls: AtomicUsize,
    /// When set, fetches wait for a permit on `fetch_gate`.
    pub gated: AtomicBool,
    pub fetch_gate: Semaphore,
    /// Profile the server restores on rewind instead of the last swiped one.
    pub rewind_profile: Mutex<Option<CandidateProfile>>,
    pub fail_rewind: AtomicBool,
    /// When set, rewinds wait for a permit on `rewind_gate`.
    pub gated_rewind: AtomicBool,
    pub rewind_gate: Semaphore,
}

#[allow(dead_code)]
impl FakeDiscovery {
    pub fn with_profiles(count: usize) -> Arc<Self> {
        Arc::new(Self {
            server_profiles: Mutex::new((0..count).map(profile).collect()),
            fetches: Mutex::new(Vec::new()),
            swipes: Mutex::new(Vec::new()),
            failing_swipes: Mutex::new(HashSet::new()),
            matches: Mutex::new(HashSet::new()),
            fail_fetch: AtomicBool::new(false),
            rewind_calls: AtomicUsize::new(0),
            gated: AtomicBool::new(false),
            fetch_gate: Semaphore::new(0),
            rewind_profile: Mutex::new(None),
            fail_rewind: AtomicBool::new(false),
            gated_rewind: AtomicBool::new(false),
            rewind_gate: Semaphore::new(0),
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetch_offsets(&self) -> Vec<usize> {
        self.fetches.lock().unwrap().iter().map(|f| f.0).collect()
    }
}

#[async_trait]
impl DiscoveryApi for FakeDiscovery {
    async fn fetch_profiles(
        &self,
        filters: &FilterSet,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<CandidateProfile>> {
        self.fetches
            .lock()
            .unwrap()
            .push((offset, limit, filters.clone()));

        if self.gated.load(Ordering::SeqCst) {
            self.fetch_gate.acquire().await.unwrap().forget();
        }

        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 500,
                message: "Failed to fetch profiles".to_string(),
            });
        }

        let profiles = self.server_profiles.lock().unwrap();
        let end = (offset + limit).min(profiles.len());
        Ok(profiles.get(offset..end).unwrap_or_default().to_vec())
    }

    async fn swipe(&self, direction: SwipeDirection, profile_id: &str) -> Result<SwipeResponse> {
        self.swipes
            .lock()
            .unwrap()
            .push((direction, profile_id.to_string()));

        if self.failing_swipes.lock().unwrap().contains(profile_id) {
            return Err(ApiError::Network("connection reset".to_string()));
        }

        let is_match = self.matches.lock().unwrap().contains(profile_id);
        Ok(SwipeResponse {
            is_match,
            matched: is_match.then(|| Match {
                id: format!("match-{}", profile_id),
                profile: None,
            }),
        })
    }

    async fn rewind(&self) -> Result<CandidateProfile> {
        self.rewind_calls.fetch_add(1, Ordering::SeqCst);

        if self.gated_rewind.load(Ordering::SeqCst) {
            self.rewind_gate.acquire().await.unwrap().forget();
        }

        if self.fail_rewind.load(Ordering::SeqCst) {
            return Err(ApiError::Network("connection reset".to_string()));
        }

        let restored = self.rewind_profile.lock().unwrap().clone();
        if let Some(restored) = restored {
            return Ok(restored);
        }

        let last_id = self
            .swipes
            .lock()
            .unwrap()
            .last()
            .map(|(_, id)| id.clone())
            .ok_or_else(|| ApiError::Api {
                status: 400,
                message: "Nothing to rewind".to_string(),
            })?;

        self.server_profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == last_id)
            .cloned()
            .ok_or_else(|| ApiError::Api {
                status: 404,
                message: "Profile not found".to_string(),
            })
    }

    async fn boost(&self) -> Result<BoostStatus> {
        Ok(BoostStatus {
            is_active: true,
            expires_at: Some(chrono::Utc::now() + chrono::Duration::minutes(30)),
            remaining_boosts: 2,
        })
    }

    async fn boost_status(&self) -> Result<BoostStatus> {
        Ok(BoostStatus {
            is_active: false,
            expires_at: None,
            remaining_boosts: 3,
        })
    }
}
