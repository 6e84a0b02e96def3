// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models exchanged with the platform API.

pub mod auth;
pub mod discovery;
pub mod filters;
pub mod profile;
pub mod user;

pub use auth::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, TokenPair};
pub use discovery::{BoostStatus, Match, ProfilesPage, SwipeDirection, SwipeResponse};
pub use filters::FilterSet;
pub use profile::CandidateProfile;
pub use user::User;
