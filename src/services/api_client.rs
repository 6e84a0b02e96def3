// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the platform REST API.
//!
//! Handles:
//! - Bearer credential attachment from storage
//! - One transparent refresh-and-replay on 401
//! - Mapping error bodies to `ApiError`

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{RefreshRequest, TokenPair};
use crate::services::refresh::RefreshCoordinator;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// A replayable API request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    /// Set once the request has been replayed after a refresh; a 401 on a
    /// retried request is returned to the caller unchanged.
    retry: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retry: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Validation(format!("Unserializable request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    /// Append query parameters.
    pub fn query<I>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.query.extend(params);
        self
    }

    /// Mark as already retried.
    pub fn retried(mut self) -> Self {
        self.retry = true;
        self
    }

    pub fn is_retry(&self) -> bool {
        self.retry
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Authenticated API client. Cheap to clone; clones share the coordinator.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    coordinator: Arc<RefreshCoordinator>,
}

impl ApiClient {
    /// Create a client for `config.api_url` using `coordinator` for credentials.
    pub fn new(config: &Config, coordinator: Arc<RefreshCoordinator>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            coordinator,
        })
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request with the stored credential attached.
    ///
    /// A 401 triggers (or joins) a credential refresh and the request is
    /// replayed once with the new token. Any other error is returned as is.
    pub async fn send<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        let token = self.coordinator.access_token().await;

        match self.dispatch(&request, token.as_deref()).await {
            Err(e) if e.is_unauthorized() && !request.is_retry() => {
                tracing::debug!(path = %request.path, "Request unauthorized, refreshing credentials");

                let fresh = self
                    .coordinator
                    .refresh(token.as_deref(), |refresh_token| {
                        self.exchange_refresh_token(refresh_token)
                    })
                    .await?;

                let replay = request.retried();
                tracing::debug!(path = %replay.path, "Replaying request with refreshed credentials");
                self.dispatch(&replay, Some(&fresh)).await
            }
            other => other,
        }
    }

    /// Send a request without a credential and without the refresh path.
    pub async fn send_unauthenticated<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R> {
        self.dispatch(&request, None).await
    }

    /// Trade a refresh token for a new pair via `POST /auth/refresh`.
    async fn exchange_refresh_token(&self, refresh_token: String) -> Result<TokenPair> {
        let request = ApiRequest::post("/auth/refresh").json(&RefreshRequest { refresh_token })?;
        self.dispatch(&request, None).await
    }

    /// Perform one HTTP round trip.
    async fn dispatch<R: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<R> {
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self.http.request(request.method.clone(), &url);
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(path = %request.path, error = %e, "Request failed");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &body);
            if status.as_u16() != 401 {
                tracing::warn!(path = %request.path, status = status.as_u16(), error = %err, "API error");
            }
            return Err(err);
        }

        // Some actions answer with an empty body.
        let payload = if body.trim().is_empty() {
            "null"
        } else {
            body.as_str()
        };

        serde_json::from_str(payload).map_err(|e| {
            ApiError::Decode(format!("{} {}: {}", request.method, request.path, e))
        })
    }
}
