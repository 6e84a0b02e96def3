// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discovery swipe queue.
//!
//! Client-side pool of candidate profiles with a cursor. Swipes advance the
//! cursor before the network call returns and never remove entries, so a
//! rewind is a cursor step back. The pool refills itself whenever fewer than
//! `refill_threshold` candidates remain ahead of the cursor.

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{BoostStatus, CandidateProfile, FilterSet, Match, SwipeDirection};
use crate::services::discovery::DiscoveryApi;
use crate::services::refresh::SessionEvent;
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use validator::Validate;

/// Refill fires when fewer than this many candidates are left ahead of the cursor.
pub const DEFAULT_REFILL_THRESHOLD: usize = 3;

const NOTHING_TO_REWIND: &str = "No profiles to rewind";

/// How a load treats the existing pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Clear the pool and start again at offset zero.
    Replace,
    /// Fetch the page after the last pooled candidate.
    Append,
}

/// Lifecycle of the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolPhase {
    /// Nothing left to show, but the server may have more.
    Empty,
    Loading,
    /// At least one undecided candidate is pooled.
    Ready,
    /// Every candidate has been decided and the server has no more.
    Exhausted,
}

/// Snapshot of the swipe queue.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryState {
    pub profiles: Vec<CandidateProfile>,
    /// Index of the next undecided candidate; never exceeds `profiles.len()`.
    pub current_index: usize,
    pub has_more: bool,
    pub is_loading: bool,
    /// Most recently decided candidate, kept for a single rewind step.
    pub last_swiped: Option<CandidateProfile>,
    pub filters: FilterSet,
    /// Latest user-facing error, replaced by the next attempt.
    pub error: Option<String>,
    /// Bumped whenever the pool is invalidated; stale page results are dropped.
    generation: u64,
}

impl DiscoveryState {
    fn new(filters: FilterSet) -> Self {
        Self {
            profiles: Vec::new(),
            current_index: 0,
            has_more: true,
            is_loading: false,
            last_swiped: None,
            filters,
            error: None,
            generation: 0,
        }
    }

    /// Candidate under the cursor.
    pub fn current(&self) -> Option<&CandidateProfile> {
        self.profiles.get(self.current_index)
    }

    /// Undecided candidates ahead of (and including) the cursor.
    pub fn remaining(&self) -> usize {
        self.profiles.len().saturating_sub(self.current_index)
    }

    /// Level-triggered refill condition.
    pub fn needs_refill(&self, threshold: usize) -> bool {
        self.remaining() < threshold && self.has_more && !self.is_loading
    }

    pub fn phase(&self) -> PoolPhase {
        if self.is_loading {
            PoolPhase::Loading
        } else if self.remaining() > 0 {
            PoolPhase::Ready
        } else if self.has_more {
            PoolPhase::Empty
        } else {
            PoolPhase::Exhausted
        }
    }

    /// Drop every candidate and start over under the current filters.
    fn invalidate(&mut self) {
        self.profiles.clear();
        self.current_index = 0;
        self.last_swiped = None;
        self.has_more = true;
        self.is_loading = false;
        self.error = None;
        self.generation += 1;
    }

    /// Mark a load as started. `None` when an append is not allowed right now.
    fn begin_load(&mut self, mode: LoadMode) -> Option<LoadTicket> {
        match mode {
            LoadMode::Replace => self.invalidate(),
            LoadMode::Append => {
                if self.is_loading || !self.has_more {
                    return None;
                }
            }
        }

        self.is_loading = true;
        self.error = None;

        Some(LoadTicket {
            generation: self.generation,
            offset: self.profiles.len(),
            filters: self.filters.clone(),
        })
    }
}

/// Parameters captured when a load starts.
struct LoadTicket {
    generation: u64,
    offset: usize,
    filters: FilterSet,
}

/// State of a swipe whose network call has not succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum SwipeStatus {
    InFlight,
    Failed(String),
}

/// Entry in the pending-swipe log, keyed by candidate ID.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSwipe {
    pub profile: CandidateProfile,
    pub direction: SwipeDirection,
    pub status: SwipeStatus,
}

/// Result of a decision.
#[derive(Debug, Clone, PartialEq)]
pub struct SwipeOutcome {
    pub profile: CandidateProfile,
    pub direction: SwipeDirection,
    /// Mutual match reported by the server; callers show the match screen.
    pub matched: Option<Match>,
}

/// Errors from swipe queue operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("No more profiles")]
    NoCandidate,

    #[error("No profiles to rewind")]
    NothingToRewind,

    #[error("Rewind requires a premium subscription")]
    PremiumRequired,

    #[error("No failed swipe recorded for profile {0}")]
    NoFailedSwipe(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl DiscoveryError {
    /// Message suitable for an alert.
    pub fn user_message(&self) -> String {
        match self {
            DiscoveryError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

struct Inner {
    api: Arc<dyn DiscoveryApi>,
    state: Mutex<DiscoveryState>,
    pending: DashMap<String, PendingSwipe>,
    page_size: usize,
    refill_threshold: usize,
    load_settled: Notify,
}

/// Swipe queue handle. Clones share the same pool.
#[derive(Clone)]
pub struct DiscoveryQueue {
    inner: Arc<Inner>,
}

impl DiscoveryQueue {
    /// Create an empty queue with default filters and sizes from `config`.
    pub fn new(api: Arc<dyn DiscoveryApi>, config: &Config) -> Self {
        Self::with_options(
            api,
            FilterSet::default(),
            config.discovery_page_size,
            config.refill_threshold,
        )
    }

    pub fn with_options(
        api: Arc<dyn DiscoveryApi>,
        filters: FilterSet,
        page_size: usize,
        refill_threshold: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                state: Mutex::new(DiscoveryState::new(filters)),
                pending: DashMap::new(),
                page_size: page_size.max(1),
                refill_threshold,
                load_settled: Notify::new(),
            }),
        }
    }

    /// Copy of the current state.
    pub fn state(&self) -> DiscoveryState {
        self.lock().clone()
    }

    pub fn current(&self) -> Option<CandidateProfile> {
        self.lock().current().cloned()
    }

    pub fn filters(&self) -> FilterSet {
        self.lock().filters.clone()
    }

    // ─── Loading ─────────────────────────────────────────────────

    /// Load the next page of candidates.
    ///
    /// Returns how many candidates were added. An append while another load
    /// is in flight (or after the server ran out) is skipped and returns 0.
    pub async fn load_more(&self, mode: LoadMode) -> Result<usize, DiscoveryError> {
        let ticket = self.lock().begin_load(mode);
        let ticket = match ticket {
            Some(ticket) => ticket,
            None => {
                tracing::debug!(?mode, "Load skipped");
                return Ok(0);
            }
        };
        self.run_load(ticket).await
    }

    async fn run_load(&self, ticket: LoadTicket) -> Result<usize, DiscoveryError> {
        let result = self
            .inner
            .api
            .fetch_profiles(&ticket.filters, ticket.offset, self.inner.page_size)
            .await;

        let outcome = {
            let mut state = self.lock();
            if state.generation != ticket.generation {
                tracing::debug!(offset = ticket.offset, "Discarding page loaded under stale filters");
                return Ok(0);
            }

            state.is_loading = false;
            match result {
                Ok(page) => {
                    let count = page.len();
                    state.has_more = count >= self.inner.page_size;
                    state.profiles.extend(page);
                    tracing::debug!(
                        count,
                        pool = state.profiles.len(),
                        has_more = state.has_more,
                        "Candidates loaded"
                    );
                    Ok(count)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load candidates");
                    state.error = Some(e.user_message());
                    Err(DiscoveryError::Api(e))
                }
            }
        };

        self.inner.load_settled.notify_waiters();
        if outcome.is_ok() {
            self.maybe_refill();
        }
        outcome
    }

    /// Start a background append if the pool is running low.
    fn maybe_refill(&self) {
        let ticket = {
            let mut state = self.lock();
            if !state.needs_refill(self.inner.refill_threshold) {
                return;
            }
            match state.begin_load(LoadMode::Append) {
                Some(ticket) => ticket,
                None => return,
            }
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(offset = ticket.offset, "Pool running low, refilling");
                let queue = self.clone();
                handle.spawn(async move {
                    // Errors are already recorded in the state.
                    let _ = queue.run_load(ticket).await;
                });
            }
            Err(_) => {
                tracing::warn!("No async runtime available, skipping refill");
                self.lock().is_loading = false;
            }
        }
    }

    /// Wait until no load is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let settled = self.inner.load_settled.notified();
            let loading = self.lock().is_loading;
            if !loading {
                return;
            }
            settled.await;
        }
    }

    // ─── Filters ─────────────────────────────────────────────────

    /// Replace the filter set, invalidate the pool and start loading the
    /// first page under the new filters in the background.
    ///
    /// Returns `false` when `filters` equals the active set (nothing cleared).
    pub fn set_filters(&self, filters: FilterSet) -> Result<bool, DiscoveryError> {
        let changed = self.replace_filters(filters)?;
        if changed {
            self.maybe_refill();
        }
        Ok(changed)
    }

    /// Set new filters and load the first page under them.
    pub async fn apply_filters(&self, filters: FilterSet) -> Result<usize, DiscoveryError> {
        self.replace_filters(filters)?;
        self.load_more(LoadMode::Replace).await
    }

    fn replace_filters(&self, filters: FilterSet) -> Result<bool, DiscoveryError> {
        filters.validate().map_err(ApiError::from)?;

        {
            let mut state = self.lock();
            if state.filters == filters {
                return Ok(false);
            }
            state.filters = filters;
            state.invalidate();
        }

        self.inner.pending.clear();
        self.inner.load_settled.notify_waiters();
        tracing::info!("Discovery filters changed, candidate pool cleared");
        Ok(true)
    }

    // ─── Decisions ───────────────────────────────────────────────

    /// Decide on the candidate under the cursor.
    ///
    /// The cursor advances before the network call. A failed pass is ignored;
    /// a failed like or super-like leaves the cursor where it is and is kept in
    /// the pending-swipe log for `retry_swipe`.
    pub async fn decide(&self, direction: SwipeDirection) -> Result<SwipeOutcome, DiscoveryError> {
        let profile = {
            let mut state = self.lock();
            let profile = state.current().cloned().ok_or(DiscoveryError::NoCandidate)?;
            state.last_swiped = Some(profile.clone());
            state.current_index += 1;
            profile
        };

        self.inner.pending.insert(
            profile.id.clone(),
            PendingSwipe {
                profile: profile.clone(),
                direction,
                status: SwipeStatus::InFlight,
            },
        );
        self.maybe_refill();

        self.send_swipe(profile, direction).await
    }

    /// Re-send a like or super-like whose network call failed.
    pub async fn retry_swipe(&self, profile_id: &str) -> Result<SwipeOutcome, DiscoveryError> {
        let entry = self
            .inner
            .pending
            .get(profile_id)
            .map(|e| e.value().clone())
            .filter(|e| matches!(e.status, SwipeStatus::Failed(_)))
            .ok_or_else(|| DiscoveryError::NoFailedSwipe(profile_id.to_string()))?;

        self.inner.pending.insert(
            profile_id.to_string(),
            PendingSwipe {
                status: SwipeStatus::InFlight,
                ..entry.clone()
            },
        );

        self.send_swipe(entry.profile, entry.direction).await
    }

    /// Like and super-like calls that failed and have not been retried.
    pub fn failed_swipes(&self) -> Vec<PendingSwipe> {
        self.inner
            .pending
            .iter()
            .filter(|e| matches!(e.status, SwipeStatus::Failed(_)))
            .map(|e| e.value().clone())
            .collect()
    }

    async fn send_swipe(
        &self,
        profile: CandidateProfile,
        direction: SwipeDirection,
    ) -> Result<SwipeOutcome, DiscoveryError> {
        match self.inner.api.swipe(direction, &profile.id).await {
            Ok(response) => {
                self.inner.pending.remove(&profile.id);
                let matched = response.into_match();
                if matched.is_some() {
                    tracing::info!(profile_id = %profile.id, "It's a match");
                }
                Ok(SwipeOutcome {
                    profile,
                    direction,
                    matched,
                })
            }
            Err(e) if direction == SwipeDirection::Pass => {
                self.inner.pending.remove(&profile.id);
                tracing::debug!(profile_id = %profile.id, error = %e, "Pass failed, ignoring");
                Ok(SwipeOutcome {
                    profile,
                    direction,
                    matched: None,
                })
            }
            Err(e) => {
                tracing::warn!(
                    profile_id = %profile.id,
                    ?direction,
                    error = %e,
                    "Swipe failed"
                );
                if let Some(mut entry) = self.inner.pending.get_mut(&profile.id) {
                    entry.status = SwipeStatus::Failed(e.user_message());
                }
                self.lock().error = Some(e.user_message());
                Err(DiscoveryError::Api(e))
            }
        }
    }

    // ─── Rewind ──────────────────────────────────────────────────

    /// Step back to the most recently decided candidate.
    ///
    /// Only one step is kept. The server decides which profile is restored.
    pub async fn rewind(&self, is_premium: bool) -> Result<CandidateProfile, DiscoveryError> {
        let (last, generation) = {
            let mut state = self.lock();
            if state.last_swiped.is_none() {
                state.error = Some(NOTHING_TO_REWIND.to_string());
                return Err(DiscoveryError::NothingToRewind);
            }
            if !is_premium {
                state.error = Some(DiscoveryError::PremiumRequired.to_string());
                return Err(DiscoveryError::PremiumRequired);
            }
            // Taken now so a concurrent rewind is rejected.
            (state.last_swiped.take(), state.generation)
        };

        let profile = match self.inner.api.rewind().await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "Rewind failed");
                let mut state = self.lock();
                if state.generation == generation && state.last_swiped.is_none() {
                    state.last_swiped = last;
                }
                state.error = Some(e.user_message());
                return Err(DiscoveryError::Api(e));
            }
        };

        {
            let mut state = self.lock();
            if state.generation != generation {
                tracing::debug!(profile_id = %profile.id, "Pool reset during rewind, not restoring");
                return Ok(profile);
            }

            let index = state.current_index.saturating_sub(1);
            state.current_index = index;
            let same = state
                .profiles
                .get(index)
                .is_some_and(|p| p.id == profile.id);
            if same {
                state.profiles[index] = profile.clone();
            } else {
                state.profiles.insert(index, profile.clone());
            }
            state.error = None;
        }
        self.inner.pending.remove(&profile.id);
        tracing::info!(profile_id = %profile.id, "Rewound last swipe");

        self.maybe_refill();
        Ok(profile)
    }

    // ─── Boost ───────────────────────────────────────────────────

    /// Boost the user's profile in other people's decks.
    pub async fn boost(&self) -> Result<BoostStatus, DiscoveryError> {
        self.inner.api.boost().await.map_err(|e| self.record_error(e))
    }

    pub async fn boost_status(&self) -> Result<BoostStatus, DiscoveryError> {
        self.inner
            .api
            .boost_status()
            .await
            .map_err(|e| self.record_error(e))
    }

    // ─── Session ─────────────────────────────────────────────────

    /// Forget every candidate, e.g. after logout. No reload is started.
    pub fn reset(&self) {
        self.lock().invalidate();
        self.inner.pending.clear();
        self.inner.load_settled.notify_waiters();
    }

    /// Reset the queue whenever the session ends.
    pub fn watch_logout(&self, mut events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::LoggedOut { .. }) => {
                        let Some(inner) = inner.upgrade() else { break };
                        DiscoveryQueue { inner }.reset();
                        tracing::debug!("Discovery queue cleared after logout");
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn record_error(&self, e: ApiError) -> DiscoveryError {
        self.lock().error = Some(e.user_message());
        DiscoveryError::Api(e)
    }

    fn lock(&self) -> MutexGuard<'_, DiscoveryState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
