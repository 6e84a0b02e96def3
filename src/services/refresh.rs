// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single-flight credential refresh.
//!
//! Owns the stored credential pair and guarantees:
//! - At most one refresh exchange is in flight at any time
//! - Every caller that hits a 401 while a refresh is running waits for it
//!   and receives the same outcome (all succeed or all fail)
//! - A failed exchange clears the stored pair and broadcasts a logout

use crate::error::{ApiError, Result};
use crate::models::TokenPair;
use crate::storage::{keys, CredentialStore};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, oneshot};

/// Capacity of the session event channel. Slow subscribers only miss
/// duplicate logout notifications.
const SESSION_EVENT_CAPACITY: usize = 16;

/// Why the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user logged out.
    UserRequested,
    /// The refresh exchange failed; the message is the underlying error.
    RefreshFailed(String),
}

/// Session-wide notifications for state containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedOut { reason: LogoutReason },
}

/// Refreshing flag plus the callers parked behind the in-flight refresh.
#[derive(Default)]
struct RefreshGate {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<Result<String>>>,
    /// Access token of the last pair written through this coordinator.
    /// `None` after the pair is cleared or before anything was written.
    latest: Option<String>,
}

/// Coordinates credential storage and token refresh for one API client.
pub struct RefreshCoordinator {
    store: Arc<dyn CredentialStore>,
    gate: Mutex<RefreshGate>,
    events: broadcast::Sender<SessionEvent>,
    exchanges: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self {
            store,
            gate: Mutex::new(RefreshGate::default()),
            events,
            exchanges: AtomicU64::new(0),
        }
    }

    /// Subscribe to session events (logout broadcasts).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    /// Whether a refresh exchange is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.gate().refreshing
    }

    /// Number of callers parked behind the in-flight refresh.
    pub fn pending_waiters(&self) -> usize {
        self.gate().waiters.len()
    }

    /// Number of refresh exchanges started since construction.
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    // ─── Credential Storage ──────────────────────────────────────

    /// Stored access token, if any.
    ///
    /// Storage failures are logged and treated as "no credential", so the
    /// request simply goes out unauthenticated.
    pub async fn access_token(&self) -> Option<String> {
        match self.store.get(keys::ACCESS_TOKEN).await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read access token from storage");
                None
            }
        }
    }

    /// Whether both halves of the credential pair are stored.
    pub async fn has_credentials(&self) -> Result<bool> {
        let access = self.store.get(keys::ACCESS_TOKEN).await?;
        let refresh = self.store.get(keys::REFRESH_TOKEN).await?;
        Ok(access.is_some() && refresh.is_some())
    }

    /// Persist a new credential pair (login, register, refresh).
    pub async fn store_tokens(&self, tokens: &TokenPair) -> Result<()> {
        self.store
            .set(keys::ACCESS_TOKEN, &tokens.access_token)
            .await?;
        self.store
            .set(keys::REFRESH_TOKEN, &tokens.refresh_token)
            .await?;
        self.gate().latest = Some(tokens.access_token.clone());
        Ok(())
    }

    /// Delete the stored credential pair.
    pub async fn clear_tokens(&self) -> Result<()> {
        self.gate().latest = None;
        self.store.remove(keys::ACCESS_TOKEN).await?;
        self.store.remove(keys::REFRESH_TOKEN).await?;
        Ok(())
    }

    /// Clear credentials and tell every subscriber the session is over.
    pub async fn logout(&self, reason: LogoutReason) -> Result<()> {
        let cleared = self.clear_tokens().await;
        self.broadcast_logout(reason);
        cleared
    }

    fn broadcast_logout(&self, reason: LogoutReason) {
        tracing::info!(reason = ?reason, "Session ended");
        // No subscribers is fine.
        let _ = self.events.send(SessionEvent::LoggedOut { reason });
    }

    // ─── Refresh ─────────────────────────────────────────────────

    /// Get a usable access token after a request failed with 401.
    ///
    /// `stale_token` is the token the failed request carried. If the stored
    /// pair has already been rotated past it, the current token is returned
    /// without another exchange.
    ///
    /// `exchange` trades a refresh token for a new pair. It is called at most
    /// once, and only by the caller that wins the gate; everyone else waits.
    pub async fn refresh<F, Fut>(&self, stale_token: Option<&str>, exchange: F) -> Result<String>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<TokenPair>>,
    {
        let current = self.access_token().await;

        let waiter = {
            let mut gate = self.gate();
            if gate.refreshing {
                let (tx, rx) = oneshot::channel();
                gate.waiters.push(tx);
                Some(rx)
            } else {
                // A pair written while `current` was being read wins over it.
                let known = gate.latest.clone().or(current);
                if let Some(known) = known {
                    if Some(known.as_str()) != stale_token {
                        tracing::debug!("Credential already rotated, reusing stored token");
                        return Ok(known);
                    }
                }
                gate.refreshing = true;
                None
            }
        };

        if let Some(rx) = waiter {
            tracing::debug!("Refresh in flight, waiting for it to settle");
            return rx.await.unwrap_or_else(|_| {
                Err(ApiError::Network("Token refresh was abandoned".to_string()))
            });
        }

        let mut flight = InFlight {
            coordinator: self,
            settled: false,
        };

        self.exchanges.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Access token rejected, refreshing credentials");

        let result = match self.run_exchange(exchange).await {
            Ok(access_token) => {
                tracing::info!("Credentials refreshed");
                Ok(access_token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, ending session");
                if let Err(clear_err) = self.clear_tokens().await {
                    tracing::error!(error = %clear_err, "Failed to clear stored credentials");
                }
                Err(ApiError::SessionExpired(e.to_string()))
            }
        };

        flight.settle(&result);

        if let Err(e) = &result {
            self.broadcast_logout(LogoutReason::RefreshFailed(e.to_string()));
        }

        result
    }

    async fn run_exchange<F, Fut>(&self, exchange: F) -> Result<String>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<TokenPair>>,
    {
        let refresh_token = self
            .store
            .get(keys::REFRESH_TOKEN)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("No refresh token available".to_string()))?;

        let tokens = exchange(refresh_token).await?;
        self.store_tokens(&tokens).await?;
        Ok(tokens.access_token)
    }

    fn gate(&self) -> MutexGuard<'_, RefreshGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the gate when the leading refresh finishes or is dropped.
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(&mut self, result: &Result<String>) {
        let waiters = {
            let mut gate = self.coordinator.gate();
            gate.refreshing = false;
            std::mem::take(&mut gate.waiters)
        };
        self.settled = true;

        if !waiters.is_empty() {
            tracing::debug!(count = waiters.len(), "Releasing queued requests");
        }
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Token refresh cancelled before completion");
            self.settle(&Err(ApiError::Network(
                "Token refresh was cancelled".to_string(),
            )));
        }
    }
}
