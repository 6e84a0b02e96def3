// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spark client smoke run.
//!
//! Signs in against a Spark API deployment, loads the first discovery page
//! and logs what it sees. Useful for checking a backend from the command line.

use anyhow::Context;
use spark_client::{
    config::Config, models::LoginRequest, services::LoadMode, AppContext,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Candidates printed after the first load.
const PREVIEW_COUNT: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(api_url = %config.api_url, "Starting Spark client smoke run");

    let ctx = AppContext::new(config)
        .await
        .context("Failed to initialize client")?;

    // Reuse stored credentials when possible
    let user = match ctx.session.restore().await? {
        Some(user) => {
            tracing::info!("Restored stored session");
            user
        }
        None => {
            let email = std::env::var("SPARK_EMAIL").context("SPARK_EMAIL is not set")?;
            let password = std::env::var("SPARK_PASSWORD").context("SPARK_PASSWORD is not set")?;
            ctx.session
                .login(LoginRequest::new(email, password))
                .await
                .context("Login failed")?
        }
    };
    tracing::info!(
        user_id = %user.id,
        name = %user.name,
        premium = user.is_premium,
        "Signed in"
    );

    let loaded = ctx
        .discovery
        .load_more(LoadMode::Replace)
        .await
        .context("Failed to load discovery profiles")?;

    let state = ctx.discovery.state();
    tracing::info!(
        loaded,
        has_more = state.has_more,
        phase = ?state.phase(),
        "Discovery pool loaded"
    );

    for profile in state.profiles.iter().take(PREVIEW_COUNT) {
        tracing::info!(
            id = %profile.id,
            name = %profile.name,
            age = profile.age,
            distance_km = ?profile.distance_km,
            "Candidate"
        );
    }

    match ctx.discovery.boost_status().await {
        Ok(status) => tracing::info!(
            active = status.is_active,
            remaining_boosts = status.remaining_boosts,
            "Boost status"
        ),
        Err(e) => tracing::warn!(error = %e, "Could not fetch boost status"),
    }

    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("spark_client=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();

    Ok(())
}
