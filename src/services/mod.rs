// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - API access and client-side state containers.

pub mod api_client;
pub mod discovery;
pub mod refresh;
pub mod session;
pub mod swipe_queue;

pub use api_client::{ApiClient, ApiRequest};
pub use discovery::{DiscoveryApi, DiscoveryClient};
pub use refresh::{LogoutReason, RefreshCoordinator, SessionEvent};
pub use session::{AuthSession, SessionState};
pub use swipe_queue::{
    DiscoveryError, DiscoveryQueue, DiscoveryState, LoadMode, PendingSwipe, PoolPhase,
    SwipeOutcome, SwipeStatus,
};
