// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authentication state container.

use crate::error::{ApiError, Result};
use crate::models::{AuthResponse, LoginRequest, RegisterRequest, User};
use crate::services::api_client::{ApiClient, ApiRequest};
use crate::services::refresh::{LogoutReason, SessionEvent};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use validator::Validate;

/// Snapshot of the signed-in session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    /// Latest user-facing error, replaced by the next attempt.
    pub error: Option<String>,
}

/// Login, registration and logout on top of an `ApiClient`.
#[derive(Clone)]
pub struct AuthSession {
    api: ApiClient,
    state: Arc<Mutex<SessionState>>,
}

impl AuthSession {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    pub fn state(&self) -> SessionState {
        lock(&self.state).clone()
    }

    pub fn is_authenticated(&self) -> bool {
        lock(&self.state).is_authenticated
    }

    pub fn user(&self) -> Option<User> {
        lock(&self.state).user.clone()
    }

    /// Whether the signed-in user can use premium features such as rewind.
    pub fn is_premium(&self) -> bool {
        lock(&self.state)
            .user
            .as_ref()
            .is_some_and(|u| u.is_premium)
    }

    /// Log in and persist the returned credential pair.
    pub async fn login(&self, request: LoginRequest) -> Result<User> {
        if let Err(e) = request.validate() {
            return Err(self.fail(ApiError::from(e)));
        }

        let http_request = ApiRequest::post("/auth/login").json(&request)?;
        self.start();
        let result = self.authenticate(http_request).await;
        self.finish(result)
    }

    /// Create an account and sign in with it.
    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        if let Err(e) = request.validate() {
            return Err(self.fail(ApiError::from(e)));
        }

        let http_request = ApiRequest::post("/auth/register").json(&request)?;
        self.start();
        let result = self.authenticate(http_request).await;
        self.finish(result)
    }

    /// Restore a previous session from stored credentials.
    ///
    /// Returns `Ok(None)` when nothing is stored or the stored pair could not
    /// be refreshed.
    pub async fn restore(&self) -> Result<Option<User>> {
        if !self.api.coordinator().has_credentials().await? {
            tracing::debug!("No stored credentials");
            return Ok(None);
        }

        match self.fetch_me().await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_session_expired() || e.is_unauthorized() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetch the signed-in user (`GET /users/me`).
    pub async fn fetch_me(&self) -> Result<User> {
        self.start();
        let result = self.api.send::<User>(ApiRequest::get("/users/me")).await;
        self.finish(result)
    }

    /// Clear credentials and session state, and notify other containers.
    pub async fn logout(&self) -> Result<()> {
        *lock(&self.state) = SessionState::default();
        self.api
            .coordinator()
            .logout(LogoutReason::UserRequested)
            .await
    }

    /// Clear the session whenever a logout is broadcast (e.g. refresh failure).
    pub fn watch_logout(&self) -> JoinHandle<()> {
        let mut events = self.api.coordinator().subscribe();
        let state = Arc::clone(&self.state);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::LoggedOut { reason }) => {
                        let mut current = lock(&state);
                        if let LogoutReason::RefreshFailed(_) = reason {
                            *current = SessionState {
                                error: Some(
                                    "Your session has expired. Please log in again.".to_string(),
                                ),
                                ..SessionState::default()
                            };
                        } else {
                            *current = SessionState::default();
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn authenticate(&self, request: ApiRequest) -> Result<User> {
        let response: AuthResponse = self.api.send_unauthenticated(request).await?;
        self.api
            .coordinator()
            .store_tokens(&response.tokens())
            .await?;
        tracing::info!(user_id = %response.user.id, "Signed in");
        Ok(response.user)
    }

    fn start(&self) {
        let mut state = lock(&self.state);
        state.is_loading = true;
        state.error = None;
    }

    fn finish(&self, result: Result<User>) -> Result<User> {
        let mut state = lock(&self.state);
        state.is_loading = false;
        match result {
            Ok(user) => {
                state.user = Some(user.clone());
                state.is_authenticated = true;
                Ok(user)
            }
            Err(e) => {
                state.error = Some(e.user_message());
                if e.is_session_expired() {
                    state.user = None;
                    state.is_authenticated = false;
                }
                Err(e)
            }
        }
    }

    fn fail(&self, e: ApiError) -> ApiError {
        let mut state = lock(&self.state);
        state.is_loading = false;
        state.error = Some(e.user_message());
        e
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
