// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Spark client: session and discovery core for the Spark mobile app.
//!
//! This crate provides the API client with single-flight token refresh and
//! the client-side swipe queue used by the discovery screens.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;

use config::Config;
use error::ApiError;
use services::{ApiClient, AuthSession, DiscoveryClient, DiscoveryQueue, RefreshCoordinator};
use std::sync::Arc;
use storage::{CredentialStore, FileStore, MemoryStore};

/// Shared client state, built once at startup and handed to every screen.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub api: ApiClient,
    pub session: AuthSession,
    pub discovery: DiscoveryQueue,
}

impl AppContext {
    /// Wire storage, API client, session and discovery queue from `config`.
    ///
    /// Must be called inside a Tokio runtime (logout listeners are spawned).
    pub async fn new(config: Config) -> Result<Self, ApiError> {
        let store: Arc<dyn CredentialStore> = match &config.credentials_path {
            Some(path) => Arc::new(FileStore::open(path).await?),
            None => Arc::new(MemoryStore::new()),
        };

        Self::with_store(config, store)
    }

    /// Same as `new`, with an explicit credential store.
    pub fn with_store(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self, ApiError> {
        let coordinator = Arc::new(RefreshCoordinator::new(store));
        let api = ApiClient::new(&config, coordinator)?;

        let session = AuthSession::new(api.clone());
        let discovery = DiscoveryQueue::new(Arc::new(DiscoveryClient::new(api.clone())), &config);

        session.watch_logout();
        discovery.watch_logout(api.coordinator().subscribe());

        Ok(Self {
            config,
            api,
            session,
            discovery,
        })
    }
}
